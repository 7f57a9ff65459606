//! Routing of inbound envelopes.
//!
//! This is the trust boundary: the transport hands over anything shaped like
//! an envelope, whoever posted it. With a trusted origin configured, envelopes
//! from any other origin are dropped here.

use std::rc::{Rc, Weak};

use blipchat_shared::{decode_account, InboundEnvelope};
use url::Url;

use crate::connection::Connection;
use crate::notifications::NotificationCounter;
use crate::storage::{account_ttl, KeyValueStore, USER_ACCOUNT_KEY};
use crate::transport::{InboundListener, InboundMessage};

/// How the chat is presented on the host page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayMode {
    /// Floating button that opens the chat on click.
    #[default]
    Launcher,
    /// Chat rendered inside a host-provided container.
    Embedded,
}

/// The presentation side the dispatcher signals when the frame is ready.
pub trait ChatSurface {
    /// Open the chat. Used in [`DisplayMode::Embedded`].
    fn show_chat(&self);
    /// Let the user open the chat. Used in [`DisplayMode::Launcher`].
    fn reveal_launcher(&self);
}

/// Origin (`scheme://host[:port]`) of `url`, if it has one.
pub fn origin_of(url: &str) -> Option<String> {
    let origin = Url::parse(url).ok()?.origin();
    origin
        .is_tuple()
        .then(|| origin.ascii_serialization())
}

pub struct Dispatcher {
    mode: DisplayMode,
    trusted_origin: Option<String>,
    connection: Connection,
    notifications: NotificationCounter,
    store: Rc<dyn KeyValueStore>,
    surface: Weak<dyn ChatSurface>,
}

impl Dispatcher {
    pub fn new(
        mode: DisplayMode,
        connection: Connection,
        notifications: NotificationCounter,
        store: Rc<dyn KeyValueStore>,
        surface: Weak<dyn ChatSurface>,
    ) -> Self {
        Self {
            mode,
            trusted_origin: None,
            connection,
            notifications,
            store,
            surface,
        }
    }

    /// Only accept envelopes posted by `origin`.
    pub fn with_trusted_origin(mut self, origin: impl Into<String>) -> Self {
        self.trusted_origin = Some(origin.into());
        self
    }

    pub fn trusted_origin(&self) -> Option<&str> {
        self.trusted_origin.as_deref()
    }

    /// Wrap into the listener a transport calls for every inbound envelope.
    pub fn into_listener(self) -> InboundListener {
        let dispatcher = Rc::new(self);
        Rc::new(move |message| dispatcher.dispatch(message))
    }

    pub fn dispatch(&self, message: InboundMessage) {
        if let Some(trusted) = &self.trusted_origin {
            if &message.origin != trusted {
                crate::log_warn!(
                    "Dropping {} from untrusted origin '{}'",
                    message.envelope.kind(),
                    message.origin
                );
                return;
            }
        }
        self.route(message.envelope);
    }

    fn route(&self, envelope: InboundEnvelope) {
        crate::log_debug!("Dispatching {}", envelope.kind());
        match envelope {
            InboundEnvelope::Ready => self.on_ready(),
            InboundEnvelope::AccountCreated { user_account } => self.on_account_created(&user_account),
            InboundEnvelope::Connected => self.connection.on_connected(),
            InboundEnvelope::Notification { message_data } => self.notifications.handle(message_data),
            InboundEnvelope::Unknown => crate::log_debug!("Ignoring unknown envelope"),
        }
    }

    fn on_ready(&self) {
        let Some(surface) = self.surface.upgrade() else {
            crate::log_debug!("Chat ready, but no surface to notify");
            return;
        };
        match self.mode {
            DisplayMode::Embedded => surface.show_chat(),
            DisplayMode::Launcher => surface.reveal_launcher(),
        }
    }

    fn on_account_created(&self, user_account: &str) {
        let account = match decode_account(user_account) {
            Ok(account) => account,
            Err(e) => {
                crate::log_error!("Discarding malformed account from frame: {}", e);
                return;
            }
        };
        match self.store.set(USER_ACCOUNT_KEY, &account, Some(account_ttl())) {
            Ok(()) => crate::log_info!("Stored guest account"),
            Err(e) => crate::log_error!("Failed to store guest account: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_drops_path_and_query() {
        assert_eq!(
            origin_of("https://chat.blip.ai/?appKey=abc&authType=Dev").as_deref(),
            Some("https://chat.blip.ai")
        );
        assert_eq!(
            origin_of("http://localhost:3000/").as_deref(),
            Some("http://localhost:3000")
        );
        assert_eq!(origin_of("not a url"), None);
        assert_eq!(origin_of("data:text/html,hi"), None);
    }
}
