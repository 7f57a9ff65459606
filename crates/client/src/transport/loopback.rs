//! In-process transport: records what the host posts and lets the caller play
//! the frame's side (finish loading, deliver envelopes).

use std::cell::RefCell;

use blipchat_shared::{InboundEnvelope, OutboundEnvelope};

use super::{FrameTransport, InboundListener, InboundMessage, LoadCallback};

/// An envelope as posted by the host, with the origin it was scoped to.
#[derive(Debug, Clone, PartialEq)]
pub struct SentEnvelope {
    pub target_origin: String,
    pub envelope: OutboundEnvelope,
}

#[derive(Default)]
struct LoopbackState {
    destination: Option<String>,
    frames_created: usize,
    loaded: bool,
    load_callbacks: Vec<LoadCallback>,
    listener: Option<InboundListener>,
    sent: Vec<SentEnvelope>,
}

#[derive(Default)]
pub struct LoopbackTransport {
    state: RefCell<LoopbackState>,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many frames were ever created. Never more than one.
    pub fn frames_created(&self) -> usize {
        self.state.borrow().frames_created
    }

    pub fn destination(&self) -> Option<String> {
        self.state.borrow().destination.clone()
    }

    pub fn is_loaded(&self) -> bool {
        self.state.borrow().loaded
    }

    pub fn has_listener(&self) -> bool {
        self.state.borrow().listener.is_some()
    }

    pub fn sent(&self) -> Vec<SentEnvelope> {
        self.state.borrow().sent.clone()
    }

    /// Just the envelopes, in posting order.
    pub fn sent_envelopes(&self) -> Vec<OutboundEnvelope> {
        self.state
            .borrow()
            .sent
            .iter()
            .map(|s| s.envelope.clone())
            .collect()
    }

    pub fn take_sent(&self) -> Vec<SentEnvelope> {
        std::mem::take(&mut self.state.borrow_mut().sent)
    }

    /// Simulate the frame's load event. Ignored when no frame exists.
    pub fn complete_load(&self) {
        let callbacks = {
            let mut state = self.state.borrow_mut();
            if state.destination.is_none() {
                crate::log_debug!("loopback: load event without a frame, ignoring");
                return;
            }
            state.loaded = true;
            std::mem::take(&mut state.load_callbacks)
        };
        for callback in callbacks {
            callback();
        }
    }

    /// Deliver an envelope as if posted by `origin`.
    ///
    /// Returns `false` when nobody is listening.
    pub fn deliver(&self, origin: &str, envelope: InboundEnvelope) -> bool {
        let listener = self.state.borrow().listener.clone();
        let Some(listener) = listener else {
            crate::log_debug!("loopback: no listener for {}", envelope.kind());
            return false;
        };
        listener(InboundMessage {
            origin: origin.to_string(),
            envelope,
        });
        true
    }

    /// Deliver raw JSON, dropping payloads that are not envelopes.
    pub fn deliver_json(&self, origin: &str, json: &str) -> bool {
        match InboundEnvelope::decode(json) {
            Ok(envelope) => self.deliver(origin, envelope),
            Err(e) => {
                crate::log_debug!("loopback: dropping non-envelope payload: {}", e);
                false
            }
        }
    }
}

impl FrameTransport for LoopbackTransport {
    fn open(&self, destination: &str) {
        let mut state = self.state.borrow_mut();
        if state.destination.is_some() {
            return;
        }
        crate::log_info!("loopback: creating frame for {}", destination);
        state.destination = Some(destination.to_string());
        state.frames_created += 1;
    }

    fn is_open(&self) -> bool {
        self.state.borrow().destination.is_some()
    }

    fn send(&self, envelope: &OutboundEnvelope) {
        let mut state = self.state.borrow_mut();
        let Some(target_origin) = state.destination.clone() else {
            crate::log_debug!("loopback: no frame, dropping {}", envelope.kind());
            return;
        };
        state.sent.push(SentEnvelope {
            target_origin,
            envelope: envelope.clone(),
        });
    }

    fn on_receive(&self, listener: InboundListener) {
        self.state.borrow_mut().listener = Some(listener);
    }

    fn on_load(&self, callback: LoadCallback) {
        {
            let mut state = self.state.borrow_mut();
            if !state.loaded {
                state.load_callbacks.push(callback);
                return;
            }
        }
        callback();
    }

    fn close(&self) {
        self.state.borrow_mut().listener = None;
    }
}
