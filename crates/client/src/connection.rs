//! Connection lifecycle with the chat frame.
//!
//! ```text
//!  Uninitialized ──request_open──▶ FrameLoading ──frame load──▶ HandshakeSent
//!        ▲                                                          │
//!        └──────────── teardown ──────── Connected ◀── ChatConnected┘
//! ```
//!
//! Operations submitted before `Connected` are queued and replayed in
//! submission order right after the transition. The handshake goes out at
//! most once per instance; `request_open` is guarded by the state itself.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::{Rc, Weak};

use blipchat_shared::{OutboundEnvelope, SessionDescriptor};
use serde_json::Value;

use crate::credentials;
use crate::events::{self, Hook};
use crate::storage::KeyValueStore;
use crate::transport::FrameTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConnectionState {
    Uninitialized,
    FrameLoading,
    HandshakeSent,
    Connected,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        matches!(self, ConnectionState::Connected)
    }
}

/// An operation held back until the session is connected.
#[derive(Debug, Clone, PartialEq)]
pub enum PendingOperation {
    Message(Value),
    Command(Value),
}

impl PendingOperation {
    pub fn into_envelope(self) -> OutboundEnvelope {
        match self {
            PendingOperation::Message(content) => OutboundEnvelope::SendMessage { content },
            PendingOperation::Command(command) => OutboundEnvelope::SendCommand { command },
        }
    }
}

/// What a [`Connection`] needs to know about the session it opens.
#[derive(Clone)]
pub struct ConnectionOptions {
    /// Frame URL; also the origin outbound envelopes are scoped to.
    pub destination: String,
    pub session: SessionDescriptor,
    /// Forwarded as `UserIrisAccount` once connected.
    pub account: Option<Value>,
    pub on_load: Option<Hook>,
}

struct Inner {
    state: ConnectionState,
    pending: VecDeque<PendingOperation>,
    /// Set while the queue is replayed. Submissions keep queueing behind the
    /// replay until it finishes.
    draining: bool,
    torn_down: bool,
    options: ConnectionOptions,
}

/// Shared handle; clones drive the same state machine.
#[derive(Clone)]
pub struct Connection {
    inner: Rc<RefCell<Inner>>,
    transport: Rc<dyn FrameTransport>,
    store: Rc<dyn KeyValueStore>,
}

impl Connection {
    pub fn new(
        options: ConnectionOptions,
        transport: Rc<dyn FrameTransport>,
        store: Rc<dyn KeyValueStore>,
    ) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                state: ConnectionState::Uninitialized,
                pending: VecDeque::new(),
                draining: false,
                torn_down: false,
                options,
            })),
            transport,
            store,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.borrow().state
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    pub fn pending_len(&self) -> usize {
        self.inner.borrow().pending.len()
    }

    pub fn destination(&self) -> String {
        self.inner.borrow().options.destination.clone()
    }

    /// Start connecting: open the frame and send the handshake once it loads.
    ///
    /// Only the first call does anything.
    pub fn request_open(&self) {
        let (destination, session) = {
            let mut inner = self.inner.borrow_mut();
            if inner.torn_down {
                crate::log_debug!("request_open after teardown, ignoring");
                return;
            }
            if inner.state != ConnectionState::Uninitialized {
                return;
            }
            inner.state = ConnectionState::FrameLoading;
            (
                inner.options.destination.clone(),
                inner.options.session.clone(),
            )
        };
        crate::log_info!("Connection: Uninitialized -> FrameLoading");

        self.transport.open(&destination);

        let user_account = credentials::handshake_account(&session, self.store.as_ref());
        let inner = Rc::downgrade(&self.inner);
        let transport = Rc::downgrade(&self.transport);
        self.transport.on_load(Box::new(move || {
            send_handshake(&inner, &transport, user_account);
        }));
    }

    /// The frame reported `ChatConnected`.
    ///
    /// Forwards the account, runs the `on_load` hook, then replays the queue.
    /// Only accepted once our handshake is out; `Connected` is terminal and
    /// anything arriving earlier belongs to some other session.
    pub fn on_connected(&self) {
        let (account, on_load) = {
            let mut inner = self.inner.borrow_mut();
            if inner.torn_down {
                return;
            }
            match inner.state {
                ConnectionState::HandshakeSent => {}
                ConnectionState::Connected => {
                    crate::log_warn!("Ignoring repeated ChatConnected");
                    return;
                }
                other => {
                    crate::log_warn!("Ignoring ChatConnected while {:?}", other);
                    return;
                }
            }
            inner.state = ConnectionState::Connected;
            inner.draining = true;
            (inner.options.account.clone(), inner.options.on_load.clone())
        };
        crate::log_info!("Connection: -> Connected");

        if let Some(account) = account {
            self.transport
                .send(&OutboundEnvelope::IdentifyAccount { account });
        }
        events::invoke("on_load", on_load.as_ref());
        self.drain();
    }

    fn drain(&self) {
        let mut replayed = 0usize;
        loop {
            let next = {
                let mut inner = self.inner.borrow_mut();
                match inner.pending.pop_front() {
                    Some(op) => op,
                    None => {
                        inner.draining = false;
                        break;
                    }
                }
            };
            self.transport.send(&next.into_envelope());
            replayed += 1;
        }
        if replayed > 0 {
            crate::log_info!("Replayed {} pending operations", replayed);
        }
    }

    /// Send now if connected, otherwise queue and make sure a connection
    /// attempt is under way.
    pub fn submit(&self, op: PendingOperation) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.torn_down {
                crate::log_warn!("Widget destroyed, dropping operation");
                return;
            }
            if !inner.state.is_connected() || inner.draining {
                inner.pending.push_back(op);
                crate::log_debug!("Queued operation ({} pending)", inner.pending.len());
                drop(inner);
                self.request_open();
                return;
            }
        }
        self.transport.send(&op.into_envelope());
    }

    pub fn send_message(&self, content: Value) {
        self.submit(PendingOperation::Message(content));
    }

    pub fn send_command(&self, command: Value) {
        self.submit(PendingOperation::Command(command));
    }

    /// Stop processing. Queued operations are abandoned, not flushed.
    pub fn teardown(&self) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.torn_down {
                return;
            }
            inner.torn_down = true;
            inner.state = ConnectionState::Uninitialized;
            if !inner.pending.is_empty() {
                crate::log_debug!("Abandoning {} pending operations", inner.pending.len());
            }
        }
        self.transport.close();
        crate::log_info!("Connection torn down");
    }
}

fn send_handshake(
    inner: &Weak<RefCell<Inner>>,
    transport: &Weak<dyn FrameTransport>,
    user_account: Option<Value>,
) {
    let (Some(inner), Some(transport)) = (inner.upgrade(), transport.upgrade()) else {
        return;
    };
    {
        let mut inner = inner.borrow_mut();
        if inner.torn_down || inner.state != ConnectionState::FrameLoading {
            return;
        }
        inner.state = ConnectionState::HandshakeSent;
    }
    transport.send(&OutboundEnvelope::StartConnection { user_account });
    crate::log_info!("Connection: FrameLoading -> HandshakeSent");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use crate::transport::LoopbackTransport;
    use serde_json::json;
    use std::cell::Cell;

    fn connection(account: Option<Value>) -> (Connection, Rc<LoopbackTransport>) {
        let transport = Rc::new(LoopbackTransport::new());
        let options = ConnectionOptions {
            destination: "https://chat.example/?appKey=k".to_string(),
            session: SessionDescriptor::Guest,
            account,
            on_load: None,
        };
        let conn = Connection::new(options, transport.clone(), Rc::new(MemoryStore::new()));
        (conn, transport)
    }

    #[test]
    fn state_walks_forward() {
        let (conn, transport) = connection(None);
        assert_eq!(conn.state(), ConnectionState::Uninitialized);
        conn.request_open();
        assert_eq!(conn.state(), ConnectionState::FrameLoading);
        transport.complete_load();
        assert_eq!(conn.state(), ConnectionState::HandshakeSent);
        conn.on_connected();
        assert_eq!(conn.state(), ConnectionState::Connected);
        conn.teardown();
        assert_eq!(conn.state(), ConnectionState::Uninitialized);
    }

    #[test]
    fn handshake_waits_for_load() {
        let (conn, transport) = connection(None);
        conn.request_open();
        assert!(transport.sent().is_empty());
        transport.complete_load();
        assert_eq!(
            transport.sent_envelopes(),
            vec![OutboundEnvelope::StartConnection { user_account: None }]
        );
    }

    #[test]
    fn handshake_runs_when_frame_loaded_before_request() {
        let (conn, transport) = connection(None);
        transport.open(&conn.destination());
        transport.complete_load();

        conn.request_open();

        assert_eq!(conn.state(), ConnectionState::HandshakeSent);
        assert_eq!(transport.sent().len(), 1);
        assert_eq!(transport.frames_created(), 1);
    }

    #[test]
    fn account_is_forwarded_before_replay() {
        let (conn, transport) = connection(Some(json!({"fullName": "Alice"})));
        conn.send_message(json!("hi"));
        transport.complete_load();
        conn.on_connected();

        let sent = transport.sent_envelopes();
        assert_eq!(sent.len(), 3);
        assert_eq!(
            sent[1],
            OutboundEnvelope::IdentifyAccount {
                account: json!({"fullName": "Alice"})
            }
        );
        assert_eq!(sent[2], OutboundEnvelope::SendMessage { content: json!("hi") });
    }

    #[test]
    fn early_connected_does_not_skip_handshake() {
        let (conn, transport) = connection(None);
        conn.on_connected();
        assert_eq!(conn.state(), ConnectionState::Uninitialized);

        conn.send_message(json!("hi"));
        conn.on_connected();
        assert_eq!(conn.state(), ConnectionState::FrameLoading);

        transport.complete_load();
        conn.on_connected();

        assert_eq!(conn.state(), ConnectionState::Connected);
        assert_eq!(
            transport.sent_envelopes(),
            vec![
                OutboundEnvelope::StartConnection { user_account: None },
                OutboundEnvelope::SendMessage { content: json!("hi") },
            ]
        );
    }

    #[test]
    fn repeated_connected_is_ignored() {
        let transport = Rc::new(LoopbackTransport::new());
        let loads = Rc::new(Cell::new(0));
        let counter = loads.clone();
        let options = ConnectionOptions {
            destination: "https://chat.example/".to_string(),
            session: SessionDescriptor::Guest,
            account: Some(json!({"id": 1})),
            on_load: Some(Rc::new(move || counter.set(counter.get() + 1))),
        };
        let conn = Connection::new(options, transport.clone(), Rc::new(MemoryStore::new()));
        conn.request_open();
        transport.complete_load();

        conn.on_connected();
        conn.on_connected();

        assert_eq!(loads.get(), 1);
        // handshake + one identify
        assert_eq!(transport.sent().len(), 2);
    }

    #[test]
    fn submissions_from_on_load_hook_go_after_queued_ones() {
        let transport = Rc::new(LoopbackTransport::new());
        let slot: Rc<RefCell<Option<Connection>>> = Rc::new(RefCell::new(None));
        let hook_slot = slot.clone();
        let options = ConnectionOptions {
            destination: "https://chat.example/".to_string(),
            session: SessionDescriptor::Guest,
            account: None,
            on_load: Some(Rc::new(move || {
                if let Some(conn) = hook_slot.borrow().as_ref() {
                    conn.send_message(json!("from hook"));
                }
            })),
        };
        let conn = Connection::new(options, transport.clone(), Rc::new(MemoryStore::new()));
        *slot.borrow_mut() = Some(conn.clone());

        conn.send_message(json!("queued"));
        transport.complete_load();
        conn.on_connected();
        conn.send_message(json!("after"));

        let contents: Vec<Value> = transport
            .sent_envelopes()
            .into_iter()
            .filter_map(|env| match env {
                OutboundEnvelope::SendMessage { content } => Some(content),
                _ => None,
            })
            .collect();
        assert_eq!(contents, vec![json!("queued"), json!("from hook"), json!("after")]);
        assert_eq!(conn.pending_len(), 0);
        slot.borrow_mut().take();
    }

    #[test]
    fn teardown_abandons_queue_and_blocks_reopen() {
        let (conn, transport) = connection(None);
        conn.send_command(json!({"method": "get"}));
        conn.teardown();
        assert!(!transport.has_listener());

        transport.complete_load();
        conn.on_connected();
        conn.send_message(json!("late"));

        assert!(transport.sent().is_empty());
        assert_eq!(conn.pending_len(), 1);
    }
}
