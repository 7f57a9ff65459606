//! Shared error type.
//!
//! None of these surface through the widget's public operations. The core logs
//! them and degrades (guest session, dropped envelope, skipped write) instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum WidgetError {
    /// The application key is not base64, or does not decode to UTF-8 text.
    #[error("invalid application key: {0}")]
    InvalidAppKey(String),

    /// A base64 payload from the frame could not be decoded.
    #[error("decode error: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("transport error: {0}")]
    Transport(String),
}

impl WidgetError {
    pub fn storage(detail: impl Into<String>) -> Self {
        Self::Storage(detail.into())
    }

    pub fn transport(detail: impl Into<String>) -> Self {
        Self::Transport(detail.into())
    }
}
