//! BLiP Chat client core
//!
//! The protocol between a host page and the embedded chat frame: session
//! resolution, the frame transport, the connection state machine with its
//! pending-operation queue, inbound dispatch and the unread counter.

pub mod logging;

pub mod connection;
pub mod credentials;
pub mod dispatcher;
pub mod events;
pub mod notifications;
pub mod storage;
pub mod transport;

pub use connection::{Connection, ConnectionOptions, ConnectionState, PendingOperation};
pub use dispatcher::{ChatSurface, Dispatcher, DisplayMode};
pub use events::{EventHooks, Hook};
pub use notifications::{NotificationCounter, SubscriptionId};
pub use storage::{KeyValueStore, LocalStore, MemoryStore};
pub use transport::{FrameTransport, InboundMessage, LoopbackTransport};
