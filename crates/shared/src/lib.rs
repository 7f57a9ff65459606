//! Shared types for the BLiP Chat widget and the embedded chat frame.

pub mod models;
pub mod protocol;
pub mod error;

pub use models::*;
pub use protocol::*;
pub use error::*;
