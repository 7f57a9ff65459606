//! Channel to the embedded chat frame.
//!
//! A transport owns at most one frame for its lifetime. Outbound envelopes are
//! posted scoped to the destination the frame was opened with; inbound ones
//! are decoded by shape only and handed to a single listener. Deciding
//! whether to trust them is the dispatcher's job.
//!
//! Backends:
//! - [`IframeTransport`] (wasm32): a real `<iframe>` and `window.postMessage`
//! - [`LoopbackTransport`]: in-process, driven by the caller; used by tests
//!   and the native demo

use std::rc::Rc;

use blipchat_shared::{InboundEnvelope, OutboundEnvelope};
use serde_json::Value;

mod loopback;
pub use loopback::{LoopbackTransport, SentEnvelope};

#[cfg(target_arch = "wasm32")]
mod iframe;
#[cfg(target_arch = "wasm32")]
pub use iframe::{IframeTransport, FRAME_ID};

/// A decoded envelope together with the origin that posted it.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    pub origin: String,
    pub envelope: InboundEnvelope,
}

/// Receives every inbound envelope in delivery order.
pub type InboundListener = Rc<dyn Fn(InboundMessage)>;

/// Runs once, when the frame's document has loaded.
pub type LoadCallback = Box<dyn FnOnce()>;

pub trait FrameTransport {
    /// Create the frame pointing at `destination`. No-op if one exists.
    fn open(&self, destination: &str);

    /// Whether a frame exists.
    fn is_open(&self) -> bool;

    /// Post `envelope` to the frame, targeted at the destination origin.
    ///
    /// Dropped, not buffered, when no frame exists.
    fn send(&self, envelope: &OutboundEnvelope);

    /// Install the inbound listener, replacing any previous one.
    fn on_receive(&self, listener: InboundListener);

    /// Register a one-shot load callback. Runs immediately if the frame has
    /// already loaded.
    fn on_load(&self, callback: LoadCallback);

    /// Stop listening for inbound envelopes. The frame itself is left alone.
    fn close(&self);
}

/// Decode a posted message from its `JSON.stringify` text.
///
/// `None` means the value had no JSON form (`undefined`, a function). That and
/// anything not shaped like an envelope yield `None`.
pub fn decode_posted(json: Option<&str>) -> Option<InboundEnvelope> {
    InboundEnvelope::decode(json?).ok()
}

/// Parse a host-supplied payload from its `JSON.stringify` text, `None` when
/// there is nothing to send.
pub fn posted_value(json: Option<&str>) -> Option<Value> {
    serde_json::from_str(json?).ok()
}
