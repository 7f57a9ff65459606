use std::fmt;
use std::str::FromStr;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};

use crate::WidgetError;

// --- Auth ---

/// How the caller's users are identified to the chat backend.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum AuthType {
    /// Anonymous visitor, identity restored from local storage.
    Guest,
    /// Identity and password supplied by the host page.
    #[default]
    Dev,
}

impl AuthType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthType::Guest => "Guest",
            AuthType::Dev => "Dev",
        }
    }
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Credential configuration as handed over by the host page.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
    #[serde(default)]
    pub auth_type: AuthType,
    #[serde(default)]
    pub user_identity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_password: Option<String>,
}

impl AuthConfig {
    pub fn dev(user_identity: impl Into<String>, user_password: impl Into<String>) -> Self {
        Self {
            auth_type: AuthType::Dev,
            user_identity: user_identity.into(),
            user_password: Some(user_password.into()),
        }
    }

    pub fn guest() -> Self {
        Self {
            auth_type: AuthType::Guest,
            ..Self::default()
        }
    }
}

/// Normalized credentials: identity namespaced and percent-encoded, password base64.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    pub auth_type: AuthType,
    pub user_identity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_password: Option<String>,
}

impl Credentials {
    /// The form sent inside the handshake: base64 of the JSON object.
    pub fn obfuscated(&self) -> Result<String, WidgetError> {
        let json = serde_json::to_string(self)?;
        Ok(BASE64.encode(json))
    }
}

/// Resolved identity used to open a session with the chat frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionDescriptor {
    Guest,
    Authenticated(Credentials),
}

impl SessionDescriptor {
    pub fn is_guest(&self) -> bool {
        matches!(self, SessionDescriptor::Guest)
    }

    pub fn auth_type(&self) -> AuthType {
        match self {
            SessionDescriptor::Guest => AuthType::Guest,
            SessionDescriptor::Authenticated(creds) => creds.auth_type,
        }
    }
}

// --- Notifications ---

/// Payload of a `ParentNotification` envelope.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NotificationBatch {
    /// Unread events accumulated in the frame since the last notification.
    #[serde(default)]
    pub count: u32,
}

impl NotificationBatch {
    pub fn new(count: u32) -> Self {
        Self { count }
    }
}

// --- Environment ---

/// Deployment the chat frame is loaded from.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Homolog,
    #[default]
    Production,
    Local,
}

impl Environment {
    pub fn base_url(&self) -> &'static str {
        match self {
            Environment::Homolog => "https://hmg-chat.blip.ai/",
            Environment::Production => "https://chat.blip.ai/",
            Environment::Local => "http://localhost:3000/",
        }
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "homolog" | "hmg" => Ok(Environment::Homolog),
            "production" | "prod" => Ok(Environment::Production),
            "local" => Ok(Environment::Local),
            other => Err(format!("unknown environment '{}'", other)),
        }
    }
}
