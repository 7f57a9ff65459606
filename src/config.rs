//! Widget construction parameters.

use blipchat_client::{DisplayMode, EventHooks};
use blipchat_shared::{AuthConfig, Environment};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DEFAULT_BUTTON_COLOR: &str = "#2CC3D5";

/// Environment variable consulted for the deployment when none is set.
pub const ENVIRONMENT_VAR: &str = "BLIP_CHAT_ENVIRONMENT";

/// Launcher button appearance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ButtonConfig {
    #[serde(default = "default_button_color")]
    pub color: String,
    /// Icon URL; the bundled brand icon when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

fn default_button_color() -> String {
    DEFAULT_BUTTON_COLOR.to_string()
}

impl Default for ButtonConfig {
    fn default() -> Self {
        Self {
            color: default_button_color(),
            icon: None,
        }
    }
}

/// Read the deployment from `BLIP_CHAT_ENVIRONMENT`.
///
/// Unset or unrecognized values yield `None`.
pub fn environment_from_env() -> Option<Environment> {
    let raw = std::env::var(ENVIRONMENT_VAR).ok()?;
    match raw.parse() {
        Ok(env) => Some(env),
        Err(e) => {
            blipchat_client::log_warn!("Ignoring {}: {}", ENVIRONMENT_VAR, e);
            None
        }
    }
}

#[derive(Debug, Clone)]
pub struct WidgetConfig {
    /// base64 of `<identifier>:<secret>`, issued per chatbot.
    pub app_key: String,
    pub button: ButtonConfig,
    /// `None` means guest users.
    pub auth: Option<AuthConfig>,
    /// Forwarded to the frame once connected.
    pub account: Option<Value>,
    /// Id of the element to render the chat into. `None` renders a launcher.
    pub target: Option<String>,
    pub events: EventHooks,
    pub environment: Environment,
    /// Drop inbound envelopes not posted by the chat origin.
    pub verify_origin: bool,
}

impl WidgetConfig {
    pub fn new(app_key: impl Into<String>) -> Self {
        Self {
            app_key: app_key.into(),
            button: ButtonConfig::default(),
            auth: None,
            account: None,
            target: None,
            events: EventHooks::default(),
            environment: environment_from_env().unwrap_or_default(),
            verify_origin: true,
        }
    }

    pub fn with_button(mut self, button: ButtonConfig) -> Self {
        self.button = button;
        self
    }

    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn with_account(mut self, account: Value) -> Self {
        self.account = Some(account);
        self
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_events(mut self, events: EventHooks) -> Self {
        self.events = events;
        self
    }

    pub fn with_environment(mut self, environment: Environment) -> Self {
        self.environment = environment;
        self
    }

    pub fn with_verify_origin(mut self, verify: bool) -> Self {
        self.verify_origin = verify;
        self
    }

    pub fn display_mode(&self) -> DisplayMode {
        if self.target.is_some() {
            DisplayMode::Embedded
        } else {
            DisplayMode::Launcher
        }
    }

    /// `<base>?appKey=<key>[&authType=<type>]`
    pub fn chat_url(&self) -> String {
        let mut url = format!(
            "{}?appKey={}",
            self.environment.base_url(),
            urlencoding::encode(&self.app_key)
        );
        if let Some(auth) = &self.auth {
            url.push_str("&authType=");
            url.push_str(auth.auth_type.as_str());
        }
        url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_url_encodes_key_and_adds_auth_type() {
        let config = WidgetConfig::new("b3JnMTIzOnh5eg==").with_environment(Environment::Homolog);
        assert_eq!(
            config.chat_url(),
            "https://hmg-chat.blip.ai/?appKey=b3JnMTIzOnh5eg%3D%3D"
        );

        let config = config.with_auth(AuthConfig::dev("alice", "secret"));
        assert_eq!(
            config.chat_url(),
            "https://hmg-chat.blip.ai/?appKey=b3JnMTIzOnh5eg%3D%3D&authType=Dev"
        );
    }

    #[test]
    fn target_selects_embedded_mode() {
        let config = WidgetConfig::new("k");
        assert_eq!(config.display_mode(), DisplayMode::Launcher);
        assert_eq!(
            config.with_target("chat-box").display_mode(),
            DisplayMode::Embedded
        );
    }

    #[test]
    fn button_color_defaults() {
        let button: ButtonConfig = serde_json::from_str(r#"{"icon":"/bot.svg"}"#).unwrap();
        assert_eq!(button.color, DEFAULT_BUTTON_COLOR);
        assert_eq!(button.icon.as_deref(), Some("/bot.svg"));
    }
}
