//! Typed errors surfaced by the session.
//!
//! Every kind carries a stable machine code (see [`SessionError::code`]).
//! Argument and state errors surface synchronously from the offending call;
//! completion errors are delivered to the pending completion exactly once;
//! protocol violations ride the `bad_server_message` event and leave state
//! untouched except where they force a feed close.

use feedme_protocol::DeltaError;
use feedme_protocol::JsonObject;
use thiserror::Error;

use crate::registry::FeedState;
use crate::session::SessionState;
use crate::transport::TransportError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SessionError {
    /// A public method was handed a malformed input.
    #[error("INVALID_ARGUMENT: `{argument}` {reason}")]
    InvalidArgument {
        argument: &'static str,
        reason: &'static str,
    },

    /// A public method was called in the wrong session state.
    #[error("INVALID_STATE: session is {state}")]
    InvalidState { state: SessionState },

    /// A feed method was called in the wrong feed state.
    #[error("INVALID_FEED_STATE: feed is {state}")]
    InvalidFeedState { state: FeedState },

    /// The transport dropped while a completion was pending.
    #[error("DISCONNECTED: the transport connection was lost")]
    Disconnected,

    /// The server accepted none of the offered protocol versions.
    #[error("HANDSHAKE_REJECTED: the server refused every offered version")]
    HandshakeRejected,

    /// The server answered an action or feed-open with `Success: false`.
    #[error("REJECTED: the server rejected the request ({server_error_code})")]
    Rejected {
        server_error_code: String,
        server_error_data: JsonObject,
    },

    /// The server forcibly closed an open feed.
    #[error("TERMINATED: the server terminated the feed ({server_error_code})")]
    Terminated {
        server_error_code: String,
        server_error_data: JsonObject,
    },

    /// A revelation's deltas could not be applied or failed verification;
    /// the session is closing the feed.
    #[error("BAD_ACTION_REVELATION: {cause}")]
    BadActionRevelation { cause: RevelationFailure },

    /// A server frame failed JSON parsing or schema validation.
    #[error("INVALID_MESSAGE: {cause}")]
    InvalidMessage { raw: String, cause: String },

    /// A well-formed server frame arrived in a state where it is not valid.
    #[error("UNEXPECTED_MESSAGE: {message_type} is not valid in the current state")]
    UnexpectedMessage {
        raw: String,
        message_type: &'static str,
    },

    /// A delta was structurally valid but did not fit the feed data.
    #[error("INVALID_DELTA: {cause}")]
    InvalidDelta { raw: String, cause: DeltaError },

    /// Post-delta feed data did not match the server's fingerprint.
    #[error("INVALID_HASH: feed data failed hash verification")]
    InvalidHash { raw: String },

    /// The transport refused an operation.
    #[error("TRANSPORT_ERROR: {0}")]
    Transport(#[from] TransportError),
}

impl SessionError {
    /// Stable machine code for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            SessionError::InvalidArgument { .. } => "INVALID_ARGUMENT",
            SessionError::InvalidState { .. } => "INVALID_STATE",
            SessionError::InvalidFeedState { .. } => "INVALID_FEED_STATE",
            SessionError::Disconnected => "DISCONNECTED",
            SessionError::HandshakeRejected => "HANDSHAKE_REJECTED",
            SessionError::Rejected { .. } => "REJECTED",
            SessionError::Terminated { .. } => "TERMINATED",
            SessionError::BadActionRevelation { .. } => "BAD_ACTION_REVELATION",
            SessionError::InvalidMessage { .. } => "INVALID_MESSAGE",
            SessionError::UnexpectedMessage { .. } => "UNEXPECTED_MESSAGE",
            SessionError::InvalidDelta { .. } => "INVALID_DELTA",
            SessionError::InvalidHash { .. } => "INVALID_HASH",
            SessionError::Transport(_) => "TRANSPORT_ERROR",
        }
    }
}

/// Why a revelation forced a feed close.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RevelationFailure {
    #[error("a delta could not be applied: {0}")]
    Delta(DeltaError),
    #[error("hash verification failed")]
    HashMismatch,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn machine_codes_prefix_the_rendered_message() {
        let errors = vec![
            SessionError::Disconnected,
            SessionError::HandshakeRejected,
            SessionError::InvalidFeedState {
                state: FeedState::Opening,
            },
            SessionError::BadActionRevelation {
                cause: RevelationFailure::HashMismatch,
            },
            SessionError::Transport(TransportError::NotConnected),
        ];
        for error in errors {
            assert!(
                error.to_string().starts_with(error.code()),
                "{error} must start with {}",
                error.code()
            );
        }
    }

    #[test]
    fn feed_state_errors_render_the_offending_state() {
        let error = SessionError::InvalidFeedState {
            state: FeedState::Closing,
        };
        assert_eq!(error.to_string(), "INVALID_FEED_STATE: feed is closing");
    }
}
