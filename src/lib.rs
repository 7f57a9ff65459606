//! Embeddable BLiP Chat widget.
//!
//! [`BlipChatWidget`] puts a chat frame on a host page, either behind a
//! launcher button or inside a given container, and talks to it over
//! `postMessage`. On wasm32 the `BlipChat` class is exported to JavaScript.

pub mod config;
pub mod presentation;
pub mod widget;

#[cfg(target_arch = "wasm32")]
mod bindings;

pub use blipchat_client::{ConnectionState, EventHooks, NotificationCounter};
pub use blipchat_shared::{AuthConfig, AuthType, Environment, WidgetError};
pub use config::{ButtonConfig, WidgetConfig};
pub use presentation::{Headless, Presentation};
pub use widget::BlipChatWidget;

#[cfg(target_arch = "wasm32")]
pub use bindings::BlipChat;
