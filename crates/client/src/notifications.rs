//! Unread notification counter with observer fan-out.
//!
//! The count grows with every `ParentNotification` batch the frame posts and
//! drops to zero when the chat is opened. Observers (badge text, badge
//! visibility, host callbacks) are called synchronously after each change,
//! in subscription order.
//!
//! A panicking observer is contained with `catch_unwind`, which only works
//! where panics unwind. Under `panic = "abort"` (the usual wasm32 release
//! setup) a panic still takes the whole module down.

use std::cell::{Cell, RefCell};
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use blipchat_shared::NotificationBatch;

pub type Observer = Rc<dyn Fn(u32)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

#[derive(Default)]
struct Inner {
    count: Cell<u32>,
    next_id: Cell<u64>,
    observers: RefCell<Vec<(SubscriptionId, Observer)>>,
}

/// Shared handle; clones observe and mutate the same counter.
#[derive(Clone, Default)]
pub struct NotificationCounter {
    inner: Rc<Inner>,
}

impl NotificationCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> u32 {
        self.inner.count.get()
    }

    pub fn subscribe(&self, observer: impl Fn(u32) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.inner.next_id.get());
        self.inner.next_id.set(id.0 + 1);
        self.inner
            .observers
            .borrow_mut()
            .push((id, Rc::new(observer)));
        id
    }

    /// Returns whether `id` was subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut observers = self.inner.observers.borrow_mut();
        let before = observers.len();
        observers.retain(|(sub, _)| *sub != id);
        observers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.observers.borrow().len()
    }

    /// Add a batch to the count and notify.
    pub fn handle(&self, batch: NotificationBatch) {
        let count = self.inner.count.get().saturating_add(batch.count);
        self.inner.count.set(count);
        crate::log_debug!("Unread notifications: {} (+{})", count, batch.count);
        self.notify(count);
    }

    /// Reset to zero and notify.
    pub fn clear(&self) {
        self.inner.count.set(0);
        self.notify(0);
    }

    fn notify(&self, count: u32) {
        // Observers may subscribe or unsubscribe while being notified; this
        // round goes to whoever was subscribed when it started.
        let snapshot: Vec<(SubscriptionId, Observer)> = self.inner.observers.borrow().clone();
        for (id, observer) in snapshot {
            let result = panic::catch_unwind(AssertUnwindSafe(|| observer(count)));
            if result.is_err() {
                crate::log_error!("Notification observer {:?} panicked", id);
            }
        }
    }
}
