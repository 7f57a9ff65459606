//! Cross-platform logging.
//!
//! The `log_*!` macros dispatch to the backend of the current target:
//! - Web: `web_sys::console`, prefixed with `[blip-chat]` so host pages can filter
//! - Native: `tracing`, under the `blipchat_client` target

#[cfg(target_arch = "wasm32")]
const PREFIX: &str = "[blip-chat]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

#[cfg(target_arch = "wasm32")]
pub fn log_impl(level: Level, msg: &str) {
    let line: wasm_bindgen::JsValue = format!("{} {}", PREFIX, msg).into();
    match level {
        Level::Debug => web_sys::console::debug_1(&line),
        Level::Info => web_sys::console::log_1(&line),
        Level::Warn => web_sys::console::warn_1(&line),
        Level::Error => web_sys::console::error_1(&line),
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub fn log_impl(level: Level, msg: &str) {
    match level {
        Level::Debug => tracing::debug!(target: "blipchat_client", "{}", msg),
        Level::Info => tracing::info!(target: "blipchat_client", "{}", msg),
        Level::Warn => tracing::warn!(target: "blipchat_client", "{}", msg),
        Level::Error => tracing::error!(target: "blipchat_client", "{}", msg),
    }
}

#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::logging::log_impl($crate::logging::Level::Debug, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logging::log_impl($crate::logging::Level::Info, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logging::log_impl($crate::logging::Level::Warn, &format!($($arg)*))
    };
}

#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::logging::log_impl($crate::logging::Level::Error, &format!($($arg)*))
    };
}
