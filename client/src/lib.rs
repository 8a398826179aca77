//! Client-side core of the Feedme application protocol.
//!
//! [`Session`] is the session state machine: it enforces a protocol-compliant
//! message sequence with the server, tracks per-feed lifecycles, applies
//! feed-data deltas with hash verification, and surfaces a callback/event
//! interface to the application-facing layers above it. Reconnection,
//! timeouts, request retries and feed multiplexing are those layers'
//! business, not this crate's.

pub mod config;
pub mod error;
pub mod registry;
pub mod session;
pub mod transport;

pub use config::SessionConfig;
pub use error::RevelationFailure;
pub use error::SessionError;
pub use registry::FeedState;
pub use session::ActionCallback;
pub use session::FeedCloseCallback;
pub use session::FeedOpenCallback;
pub use session::Session;
pub use session::SessionEvent;
pub use session::SessionState;
pub use transport::Transport;
pub use transport::TransportError;
pub use transport::TransportEvent;
pub use transport::TransportState;
