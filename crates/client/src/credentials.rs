//! Session resolution: caller-supplied credentials to a [`SessionDescriptor`].

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use blipchat_shared::{AuthConfig, AuthType, Credentials, SessionDescriptor, WidgetError};
use serde_json::Value;

use crate::storage::{KeyValueStore, USER_ACCOUNT_KEY};

/// Whether `value` is already canonical (padded) base64.
pub fn is_base64(value: &str) -> bool {
    BASE64.decode(value).is_ok()
}

/// Base64-encode a credential unless it already is.
///
/// Encoding an encoded value returns it unchanged.
pub fn encode_credential(value: &str) -> String {
    if is_base64(value) {
        value.to_string()
    } else {
        BASE64.encode(value)
    }
}

/// Identifier segment of an application key.
///
/// The key is base64 of `<identifier>:<secret>`.
pub fn app_identifier(app_key: &str) -> Result<String, WidgetError> {
    let bytes = BASE64
        .decode(app_key.trim())
        .map_err(|e| WidgetError::InvalidAppKey(e.to_string()))?;
    let decoded = String::from_utf8(bytes).map_err(|e| WidgetError::InvalidAppKey(e.to_string()))?;
    let identifier = decoded.split(':').next().unwrap_or_default();
    if identifier.is_empty() {
        return Err(WidgetError::InvalidAppKey("empty identifier".to_string()));
    }
    Ok(identifier.to_string())
}

/// Resolve the session for `auth` under `app_key`.
///
/// Never fails: a missing or guest config, or an undecodable key, resolves to
/// [`SessionDescriptor::Guest`].
pub fn resolve(auth: Option<&AuthConfig>, app_key: &str) -> SessionDescriptor {
    let Some(auth) = auth else {
        return SessionDescriptor::Guest;
    };
    if auth.auth_type == AuthType::Guest {
        return SessionDescriptor::Guest;
    }

    let identifier = match app_identifier(app_key) {
        Ok(identifier) => identifier,
        Err(e) => {
            crate::log_warn!("Falling back to guest session: {}", e);
            return SessionDescriptor::Guest;
        }
    };

    let identity = format!("{}.{}", auth.user_identity, identifier);
    SessionDescriptor::Authenticated(Credentials {
        auth_type: auth.auth_type,
        user_identity: urlencoding::encode(&identity).into_owned(),
        user_password: auth.user_password.as_deref().map(encode_credential),
    })
}

/// The `userAccount` value sent with the handshake.
///
/// Guests reuse the account the frame created on a previous visit, if it is
/// still stored. Authenticated sessions send their obfuscated credentials.
pub fn handshake_account(
    session: &SessionDescriptor,
    store: &dyn KeyValueStore,
) -> Option<Value> {
    match session {
        SessionDescriptor::Guest => store.get(USER_ACCOUNT_KEY),
        SessionDescriptor::Authenticated(creds) => match creds.obfuscated() {
            Ok(blob) => Some(Value::String(blob)),
            Err(e) => {
                crate::log_error!("Failed to encode credentials: {}", e);
                None
            }
        },
    }
}
