//! Envelopes exchanged between the host page and the embedded chat frame.
//!
//! Every envelope is a JSON object tagged by its `code` field:
//!
//! ```json
//! { "code": "SendMessage", "content": { "type": "text/plain", "content": "hi" } }
//! ```

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{NotificationBatch, WidgetError};

/// Envelope codes
pub const CHAT_READY_CODE: &str = "BlipChatReady";
pub const CREATE_ACCOUNT_CODE: &str = "CreateAccount";
pub const CHAT_CONNECTED_CODE: &str = "ChatConnected";
pub const PARENT_NOTIFICATION_CODE: &str = "ParentNotification";
pub const START_CONNECTION_CODE: &str = "StartConnection";
pub const USER_ACCOUNT_CODE: &str = "UserIrisAccount";
pub const SEND_MESSAGE_CODE: &str = "SendMessage";
pub const SEND_COMMAND_CODE: &str = "SendCommand";

/// Messages posted by the chat frame to the host page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "code")]
pub enum InboundEnvelope {
    /// The frame finished booting and can be shown.
    #[serde(rename = "BlipChatReady")]
    Ready,
    /// The frame created a guest account; `user_account` is base64 JSON.
    #[serde(rename = "CreateAccount")]
    AccountCreated {
        #[serde(rename = "userAccount")]
        user_account: String,
    },
    #[serde(rename = "ChatConnected")]
    Connected,
    #[serde(rename = "ParentNotification")]
    Notification {
        #[serde(rename = "messageData", default)]
        message_data: NotificationBatch,
    },
    /// Any code this version does not know about.
    #[serde(other)]
    Unknown,
}

impl InboundEnvelope {
    /// Decode an envelope from its JSON text.
    ///
    /// Fails only when the text is not an object carrying a string `code`;
    /// unrecognized codes decode to [`InboundEnvelope::Unknown`].
    pub fn decode(json: &str) -> Result<Self, WidgetError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            InboundEnvelope::Ready => CHAT_READY_CODE,
            InboundEnvelope::AccountCreated { .. } => CREATE_ACCOUNT_CODE,
            InboundEnvelope::Connected => CHAT_CONNECTED_CODE,
            InboundEnvelope::Notification { .. } => PARENT_NOTIFICATION_CODE,
            InboundEnvelope::Unknown => "Unknown",
        }
    }
}

/// Messages posted by the host page to the chat frame.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "code")]
pub enum OutboundEnvelope {
    /// The handshake. `user_account` is the stored guest account or the
    /// obfuscated credentials, `null` for a first-time guest.
    #[serde(rename = "StartConnection")]
    StartConnection {
        #[serde(rename = "userAccount")]
        user_account: Option<Value>,
    },
    #[serde(rename = "UserIrisAccount")]
    IdentifyAccount { account: Value },
    #[serde(rename = "SendMessage")]
    SendMessage { content: Value },
    #[serde(rename = "SendCommand")]
    SendCommand { command: Value },
}

impl OutboundEnvelope {
    pub fn to_json(&self) -> Result<String, WidgetError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            OutboundEnvelope::StartConnection { .. } => START_CONNECTION_CODE,
            OutboundEnvelope::IdentifyAccount { .. } => USER_ACCOUNT_CODE,
            OutboundEnvelope::SendMessage { .. } => SEND_MESSAGE_CODE,
            OutboundEnvelope::SendCommand { .. } => SEND_COMMAND_CODE,
        }
    }
}

/// Decode the base64 account blob carried by a `CreateAccount` envelope.
pub fn decode_account(user_account: &str) -> Result<Value, WidgetError> {
    let bytes = BASE64.decode(user_account.trim())?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn decodes_each_inbound_kind() {
        assert_eq!(
            InboundEnvelope::decode(r#"{"code":"BlipChatReady"}"#).unwrap(),
            InboundEnvelope::Ready
        );
        assert_eq!(
            InboundEnvelope::decode(r#"{"code":"ChatConnected"}"#).unwrap(),
            InboundEnvelope::Connected
        );
        assert_eq!(
            InboundEnvelope::decode(r#"{"code":"CreateAccount","userAccount":"e30="}"#).unwrap(),
            InboundEnvelope::AccountCreated {
                user_account: "e30=".to_string()
            }
        );
        assert_eq!(
            InboundEnvelope::decode(r#"{"code":"ParentNotification","messageData":{"count":3}}"#)
                .unwrap(),
            InboundEnvelope::Notification {
                message_data: NotificationBatch::new(3)
            }
        );
    }

    #[test]
    fn unknown_codes_decode_to_unknown() {
        let env = InboundEnvelope::decode(r#"{"code":"SomethingNew","extra":1}"#).unwrap();
        assert_eq!(env, InboundEnvelope::Unknown);
    }

    #[test]
    fn shapeless_payloads_are_rejected() {
        assert!(InboundEnvelope::decode(r#"{"type":"BlipChatReady"}"#).is_err());
        assert!(InboundEnvelope::decode(r#""BlipChatReady""#).is_err());
        assert!(InboundEnvelope::decode("not json").is_err());
    }

    #[test]
    fn outbound_envelopes_are_tagged_by_code() {
        let env = OutboundEnvelope::SendCommand {
            command: json!({"method": "get", "uri": "/ping"}),
        };
        let value: Value = serde_json::from_str(&env.to_json().unwrap()).unwrap();
        assert_eq!(value, json!({"code": "SendCommand", "command": {"method": "get", "uri": "/ping"}}));

        let handshake = OutboundEnvelope::StartConnection { user_account: None };
        let value: Value = serde_json::from_str(&handshake.to_json().unwrap()).unwrap();
        assert_eq!(value, json!({"code": "StartConnection", "userAccount": null}));
    }

    #[test]
    fn account_blob_is_base64_json() {
        let blob = BASE64.encode(r#"{"identity":"guest.org","password":"cA=="}"#);
        let account = decode_account(&blob).unwrap();
        assert_eq!(account["identity"], "guest.org");

        assert!(matches!(decode_account("***"), Err(WidgetError::Decode(_))));
        assert!(matches!(
            decode_account(&BASE64.encode("not json")),
            Err(WidgetError::Json(_))
        ));
    }
}
