//! Host page event hooks.
//!
//! Hooks run under `catch_unwind`, so a panicking hook is logged and skipped
//! on native targets. With `panic = "abort"`, as on wasm32, it aborts.

use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

pub type Hook = Rc<dyn Fn()>;

/// Callbacks the host page can register. Each is called with no arguments.
#[derive(Clone, Default)]
pub struct EventHooks {
    /// The chat surface was opened.
    pub on_enter: Option<Hook>,
    /// The chat surface was closed.
    pub on_leave: Option<Hook>,
    /// The frame reported the session as connected.
    pub on_load: Option<Hook>,
}

impl EventHooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_on_enter(mut self, hook: impl Fn() + 'static) -> Self {
        self.on_enter = Some(Rc::new(hook));
        self
    }

    pub fn with_on_leave(mut self, hook: impl Fn() + 'static) -> Self {
        self.on_leave = Some(Rc::new(hook));
        self
    }

    pub fn with_on_load(mut self, hook: impl Fn() + 'static) -> Self {
        self.on_load = Some(Rc::new(hook));
        self
    }
}

impl std::fmt::Debug for EventHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHooks")
            .field("on_enter", &self.on_enter.is_some())
            .field("on_leave", &self.on_leave.is_some())
            .field("on_load", &self.on_load.is_some())
            .finish()
    }
}

/// Run a host hook, containing a panic to the hook itself.
pub fn invoke(name: &str, hook: Option<&Hook>) {
    let Some(hook) = hook else {
        return;
    };
    if panic::catch_unwind(AssertUnwindSafe(|| hook())).is_err() {
        crate::log_error!("Event hook '{}' panicked", name);
    }
}
