//! The widget: wires configuration, transport, storage and presentation
//! around one connection and one notification counter.

use std::cell::Cell;
use std::rc::{Rc, Weak};

use blipchat_client::dispatcher::origin_of;
use blipchat_client::{
    credentials, events, ChatSurface, Connection, ConnectionOptions, ConnectionState, Dispatcher,
    DisplayMode, EventHooks, FrameTransport, KeyValueStore, NotificationCounter,
};
use serde_json::Value;

use crate::config::WidgetConfig;
use crate::presentation::Presentation;

struct WidgetCore {
    connection: Connection,
    notifications: NotificationCounter,
    transport: Rc<dyn FrameTransport>,
    presentation: Rc<dyn Presentation>,
    events: EventHooks,
    destination: String,
    is_open: Cell<bool>,
}

impl WidgetCore {
    fn open_chat(&self) {
        if self.is_open.get() {
            return;
        }
        self.transport.open(&self.destination);
        self.connection.request_open();
        self.notifications.clear();
        self.is_open.set(true);
        self.presentation.set_chat_visible(true);
        events::invoke("on_enter", self.events.on_enter.as_ref());
    }

    fn close_chat(&self) {
        if !self.is_open.get() {
            return;
        }
        self.is_open.set(false);
        self.presentation.set_chat_visible(false);
        events::invoke("on_leave", self.events.on_leave.as_ref());
    }
}

impl ChatSurface for WidgetCore {
    fn show_chat(&self) {
        self.open_chat();
    }

    fn reveal_launcher(&self) {
        self.presentation.reveal_launcher();
    }
}

/// An embedded chat instance.
///
/// Dropping it has the same effect as [`BlipChatWidget::destroy`].
pub struct BlipChatWidget {
    core: Rc<WidgetCore>,
}

impl BlipChatWidget {
    /// Assemble a widget from explicit parts.
    ///
    /// Expired storage entries are swept first. In embedded mode the frame is
    /// created right away so it can boot while the page loads.
    pub fn with_parts(
        config: WidgetConfig,
        transport: Rc<dyn FrameTransport>,
        store: Rc<dyn KeyValueStore>,
        presentation: Rc<dyn Presentation>,
    ) -> Self {
        store.sweep_expired();

        let session = credentials::resolve(config.auth.as_ref(), &config.app_key);
        let destination = config.chat_url();
        let mode = config.display_mode();
        blipchat_client::log_info!(
            "Creating chat widget ({:?}, {} session) for {}",
            mode,
            session.auth_type(),
            destination
        );

        let connection = Connection::new(
            ConnectionOptions {
                destination: destination.clone(),
                session,
                account: config.account.clone(),
                on_load: config.events.on_load.clone(),
            },
            transport.clone(),
            store.clone(),
        );

        let notifications = NotificationCounter::new();
        let badge = presentation.clone();
        notifications.subscribe(move |count| badge.set_unread(count));

        let core = Rc::new(WidgetCore {
            connection: connection.clone(),
            notifications: notifications.clone(),
            transport: transport.clone(),
            presentation,
            events: config.events.clone(),
            destination: destination.clone(),
            is_open: Cell::new(false),
        });

        let surface = Rc::downgrade(&core) as Weak<dyn ChatSurface>;
        let mut dispatcher = Dispatcher::new(mode, connection, notifications, store, surface);
        if config.verify_origin {
            match origin_of(&destination) {
                Some(origin) => dispatcher = dispatcher.with_trusted_origin(origin),
                None => blipchat_client::log_warn!(
                    "Cannot derive origin of {}, accepting envelopes from any origin",
                    destination
                ),
            }
        }
        transport.on_receive(dispatcher.into_listener());

        if mode == DisplayMode::Embedded {
            transport.open(&destination);
        }

        Self { core }
    }

    pub fn open_chat(&self) {
        self.core.open_chat();
    }

    pub fn close_chat(&self) {
        self.core.close_chat();
    }

    /// What the launcher button does.
    pub fn toggle_chat(&self) {
        if self.core.is_open.get() {
            self.core.close_chat();
        } else {
            self.core.open_chat();
        }
    }

    pub fn is_open(&self) -> bool {
        self.core.is_open.get()
    }

    /// Send a message, queueing it until the chat is connected.
    pub fn send_message(&self, content: Value) {
        self.core.connection.send_message(content);
    }

    /// Send a command, queueing it until the chat is connected.
    pub fn send_command(&self, command: Value) {
        self.core.connection.send_command(command);
    }

    pub fn notifications(&self) -> &NotificationCounter {
        &self.core.notifications
    }

    pub fn unread_count(&self) -> u32 {
        self.core.notifications.count()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.core.connection.state()
    }

    pub fn chat_url(&self) -> &str {
        &self.core.destination
    }

    /// Stop listening to the frame. Later operations are ignored.
    pub fn destroy(&self) {
        self.core.connection.teardown();
    }
}

impl Drop for BlipChatWidget {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(target_arch = "wasm32")]
impl BlipChatWidget {
    /// Mount into the page: into the element with id `config.target`, or a
    /// new container appended to `<body>`.
    pub fn mount(config: WidgetConfig) -> Result<Self, blipchat_shared::WidgetError> {
        use blipchat_client::transport::IframeTransport;
        use blipchat_client::LocalStore;
        use blipchat_shared::WidgetError;

        use crate::presentation::DomPresentation;

        const CONTAINER_ID: &str = "blip-chat-container";

        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| WidgetError::transport("no document"))?;

        let container = match &config.target {
            Some(id) => document
                .get_element_by_id(id)
                .ok_or_else(|| WidgetError::transport(format!("no element with id '{}'", id)))?,
            None => {
                let div = document
                    .create_element("div")
                    .map_err(|e| WidgetError::transport(format!("create container: {:?}", e)))?;
                div.set_id(CONTAINER_ID);
                let body = document
                    .body()
                    .ok_or_else(|| WidgetError::transport("no body"))?;
                body.append_child(&div)
                    .map_err(|e| WidgetError::transport(format!("append container: {:?}", e)))?;
                div
            }
        };

        Ok(Self::with_parts(
            config,
            Rc::new(IframeTransport::new(container)),
            Rc::new(LocalStore),
            Rc::new(DomPresentation::new(document)),
        ))
    }
}
