//! End-to-end protocol flows over the loopback transport.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use blipchat_client::storage::USER_ACCOUNT_KEY;
use blipchat_client::transport::FrameTransport;
use blipchat_client::{
    ChatSurface, Connection, ConnectionOptions, ConnectionState, Dispatcher, DisplayMode,
    KeyValueStore, LoopbackTransport, MemoryStore, NotificationCounter,
};
use blipchat_shared::{InboundEnvelope, NotificationBatch, OutboundEnvelope, SessionDescriptor};
use serde_json::{json, Value};

const DESTINATION: &str = "https://chat.example/?appKey=a2V5";
const ORIGIN: &str = "https://chat.example";

#[derive(Default)]
struct RecordingSurface {
    shown: Cell<usize>,
    revealed: Cell<usize>,
}

impl ChatSurface for RecordingSurface {
    fn show_chat(&self) {
        self.shown.set(self.shown.get() + 1);
    }

    fn reveal_launcher(&self) {
        self.revealed.set(self.revealed.get() + 1);
    }
}

struct Harness {
    transport: Rc<LoopbackTransport>,
    store: Rc<MemoryStore>,
    connection: Connection,
    notifications: NotificationCounter,
    surface: Rc<RecordingSurface>,
}

impl Harness {
    fn new(mode: DisplayMode) -> Self {
        let transport = Rc::new(LoopbackTransport::new());
        let store = Rc::new(MemoryStore::new());
        let connection = Connection::new(
            ConnectionOptions {
                destination: DESTINATION.to_string(),
                session: SessionDescriptor::Guest,
                account: None,
                on_load: None,
            },
            transport.clone(),
            store.clone(),
        );
        let notifications = NotificationCounter::new();
        let surface = Rc::new(RecordingSurface::default());
        let weak_surface = Rc::downgrade(&surface) as Weak<dyn ChatSurface>;
        let dispatcher = Dispatcher::new(
            mode,
            connection.clone(),
            notifications.clone(),
            store.clone(),
            weak_surface,
        )
        .with_trusted_origin(ORIGIN);
        transport.on_receive(dispatcher.into_listener());

        Self {
            transport,
            store,
            connection,
            notifications,
            surface,
        }
    }

    fn frame_says(&self, envelope: InboundEnvelope) {
        assert!(self.transport.deliver(ORIGIN, envelope));
    }
}

#[test]
fn queued_message_and_command_replay_in_order() {
    let h = Harness::new(DisplayMode::Launcher);

    h.connection.send_message(json!({"content": "hi"}));
    h.connection.send_command(json!({"command": "reset"}));

    assert_eq!(h.transport.frames_created(), 1);
    assert_eq!(h.connection.state(), ConnectionState::FrameLoading);
    assert!(h.transport.sent().is_empty());

    h.transport.complete_load();
    h.frame_says(InboundEnvelope::Connected);

    assert_eq!(
        h.transport.sent_envelopes(),
        vec![
            OutboundEnvelope::StartConnection { user_account: None },
            OutboundEnvelope::SendMessage {
                content: json!({"content": "hi"})
            },
            OutboundEnvelope::SendCommand {
                command: json!({"command": "reset"})
            },
        ]
    );
    assert!(h
        .transport
        .sent()
        .iter()
        .all(|s| s.target_origin == DESTINATION));
}

#[test]
fn connected_submissions_send_immediately() {
    let h = Harness::new(DisplayMode::Launcher);
    h.connection.request_open();
    h.transport.complete_load();
    h.frame_says(InboundEnvelope::Connected);
    h.transport.take_sent();

    h.connection.send_message(json!("now"));

    assert_eq!(
        h.transport.sent_envelopes(),
        vec![OutboundEnvelope::SendMessage { content: json!("now") }]
    );
    assert_eq!(h.connection.pending_len(), 0);
}

#[test]
fn ready_reveals_launcher_or_shows_embedded_chat() {
    let launcher = Harness::new(DisplayMode::Launcher);
    launcher.frame_says(InboundEnvelope::Ready);
    assert_eq!(launcher.surface.revealed.get(), 1);
    assert_eq!(launcher.surface.shown.get(), 0);

    let embedded = Harness::new(DisplayMode::Embedded);
    embedded.frame_says(InboundEnvelope::Ready);
    assert_eq!(embedded.surface.shown.get(), 1);
    assert_eq!(embedded.surface.revealed.get(), 0);
}

#[test]
fn created_account_is_stored_and_used_by_next_handshake() {
    let h = Harness::new(DisplayMode::Launcher);
    let blob = BASE64.encode(r#"{"identity":"guest-1.org","password":"cHc="}"#);
    h.frame_says(InboundEnvelope::AccountCreated { user_account: blob });

    assert_eq!(
        h.store.get(USER_ACCOUNT_KEY),
        Some(json!({"identity": "guest-1.org", "password": "cHc="}))
    );

    h.connection.request_open();
    h.transport.complete_load();
    assert_eq!(
        h.transport.sent_envelopes(),
        vec![OutboundEnvelope::StartConnection {
            user_account: Some(json!({"identity": "guest-1.org", "password": "cHc="}))
        }]
    );
}

#[test]
fn malformed_account_is_not_stored() {
    let h = Harness::new(DisplayMode::Launcher);
    h.frame_says(InboundEnvelope::AccountCreated {
        user_account: "@@@".to_string(),
    });
    assert!(h.store.is_empty());
}

#[test]
fn notifications_reach_every_subscriber() {
    let h = Harness::new(DisplayMode::Launcher);
    let badge = Rc::new(RefCell::new(Vec::new()));
    let visible = Rc::new(RefCell::new(Vec::new()));
    let badge_sink = badge.clone();
    let visible_sink = visible.clone();
    h.notifications
        .subscribe(move |n| badge_sink.borrow_mut().push(n));
    h.notifications
        .subscribe(move |n| visible_sink.borrow_mut().push(n > 0));

    for _ in 0..3 {
        h.frame_says(InboundEnvelope::Notification {
            message_data: NotificationBatch::new(2),
        });
    }
    h.notifications.clear();

    assert_eq!(*badge.borrow(), vec![2, 4, 6, 0]);
    assert_eq!(*visible.borrow(), vec![true, true, true, false]);
}

#[test]
fn untrusted_origin_is_dropped() {
    let h = Harness::new(DisplayMode::Launcher);
    h.connection.request_open();
    h.transport.complete_load();

    h.transport
        .deliver("https://evil.example", InboundEnvelope::Connected);
    h.transport.deliver(
        "https://evil.example",
        InboundEnvelope::Notification {
            message_data: NotificationBatch::new(9),
        },
    );

    assert_eq!(h.connection.state(), ConnectionState::HandshakeSent);
    assert_eq!(h.notifications.count(), 0);
}

#[test]
fn unknown_and_shapeless_payloads_are_ignored() {
    let h = Harness::new(DisplayMode::Launcher);
    assert!(h
        .transport
        .deliver_json(ORIGIN, r#"{"code":"TypingStarted","who":"bot"}"#));
    assert!(!h.transport.deliver_json(ORIGIN, r#"{"hello":"world"}"#));
    assert!(!h.transport.deliver_json(ORIGIN, "[1,2,3]"));

    // Still fully functional afterwards
    h.connection.send_message(json!("ok"));
    h.transport.complete_load();
    assert!(h
        .transport
        .deliver_json(ORIGIN, r#"{"code":"ChatConnected"}"#));
    assert_eq!(h.transport.sent().len(), 2);
}

#[test]
fn sends_before_frame_exists_are_dropped_by_transport() {
    let transport = LoopbackTransport::new();
    transport.send(&OutboundEnvelope::SendMessage { content: Value::Null });
    assert!(transport.sent().is_empty());
}
