//! The byte-stream transport boundary.
//!
//! The session consumes a transport through this interface and never owns its
//! lifecycle. Event *delivery* is inverted: the owning layer registers itself
//! with the concrete transport and forwards each occurrence to
//! [`crate::session::Session::handle_transport_event`], in order.

use strum_macros::Display;
use thiserror::Error;

use crate::error::SessionError;

/// Connection state of the underlying byte stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum TransportState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

/// Raised by transport implementations when an operation is invalid for the
/// current connection state or the stream fails outright.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransportError {
    #[error("transport is not connected")]
    NotConnected,
    #[error("transport is already connected")]
    AlreadyConnected,
    #[error("transport failure: {0}")]
    Failure(String),
}

/// A bidirectional message stream with a three-state connection model.
///
/// Legal event orderings and state-transition rules are the transport
/// wrapper's responsibility; the session only reacts to what it is handed.
pub trait Transport {
    fn state(&self) -> TransportState;

    fn connect(&mut self) -> Result<(), TransportError>;

    /// Ships one frame. Implementations must not emit events synchronously
    /// from inside this call.
    fn send(&mut self, frame: &str) -> Result<(), TransportError>;

    /// Drops the connection. `error`, if supplied, must be echoed back
    /// verbatim on the resulting [`TransportEvent::Disconnect`].
    fn disconnect(&mut self, error: Option<SessionError>) -> Result<(), TransportError>;
}

/// Transport-side occurrences, forwarded to the session in delivery order.
#[derive(Debug)]
pub enum TransportEvent {
    Connecting,
    Connect,
    Message(String),
    Disconnect { error: Option<SessionError> },
    TransportError { error: TransportError },
}
