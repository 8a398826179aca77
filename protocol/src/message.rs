//! Defines the messages exchanged in a Feedme conversation.
//!
//! Client-originated frames serialize directly. Server-originated frames are
//! the *validated* forms produced by [`crate::codec::decode`]: conditional
//! fields (success vs. failure payloads) are already resolved into sum types,
//! so consumers never see half-checked options.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::delta::FeedDelta;

/// Feed arguments: a string-to-string map. Ordered so that every rendering of
/// the same arguments is byte-identical.
pub type FeedArgs = BTreeMap<String, String>;

/// A JSON object, as carried in feed data, action data and error data.
pub type JsonObject = serde_json::Map<String, Value>;

/// The Feedme protocol version this crate converses in.
pub const FEEDME_VERSION: &str = "0.1";

/// Client-originated frame.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "MessageType")]
pub enum ClientMessage {
    /// Opens the conversation once the transport connects.
    #[serde(rename_all = "PascalCase")]
    Handshake { versions: Vec<String> },

    /// Invokes a one-shot server action. `callback_id` is echoed back in the
    /// matching [`ActionResponse`].
    #[serde(rename_all = "PascalCase")]
    Action {
        action_name: String,
        action_args: JsonObject,
        callback_id: String,
    },

    /// Requests that a feed be opened.
    #[serde(rename_all = "PascalCase")]
    FeedOpen {
        feed_name: String,
        feed_args: FeedArgs,
    },

    /// Requests that an open feed be closed.
    #[serde(rename_all = "PascalCase")]
    FeedClose {
        feed_name: String,
        feed_args: FeedArgs,
    },
}

/// Server-originated frame, already schema-checked.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    ViolationResponse(ViolationResponse),
    HandshakeResponse(HandshakeResponse),
    ActionResponse(ActionResponse),
    FeedOpenResponse(FeedOpenResponse),
    FeedCloseResponse(FeedCloseResponse),
    ActionRevelation(ActionRevelation),
    FeedTermination(FeedTermination),
}

impl ServerMessage {
    pub fn message_type(&self) -> &'static str {
        match self {
            ServerMessage::ViolationResponse(_) => "ViolationResponse",
            ServerMessage::HandshakeResponse(_) => "HandshakeResponse",
            ServerMessage::ActionResponse(_) => "ActionResponse",
            ServerMessage::FeedOpenResponse(_) => "FeedOpenResponse",
            ServerMessage::FeedCloseResponse(_) => "FeedCloseResponse",
            ServerMessage::ActionRevelation(_) => "ActionRevelation",
            ServerMessage::FeedTermination(_) => "FeedTermination",
        }
    }
}

/// The server flagged a client frame as protocol-violating.
#[derive(Debug, Clone, PartialEq)]
pub struct ViolationResponse {
    pub diagnostics: JsonObject,
}

/// Outcome of the version handshake.
#[derive(Debug, Clone, PartialEq)]
pub enum HandshakeResponse {
    Accepted { version: String, client_id: String },
    Rejected,
}

/// A failed action or feed-open, as reported by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerRejection {
    pub error_code: String,
    pub error_data: JsonObject,
}

/// Response to an [`ClientMessage::Action`] frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionResponse {
    pub callback_id: String,
    pub result: Result<JsonObject, ServerRejection>,
}

/// Response to a [`ClientMessage::FeedOpen`] frame. On success carries the
/// feed's reference data.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedOpenResponse {
    pub feed_name: String,
    pub feed_args: FeedArgs,
    pub result: Result<JsonObject, ServerRejection>,
}

/// Response to a [`ClientMessage::FeedClose`] frame.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedCloseResponse {
    pub feed_name: String,
    pub feed_args: FeedArgs,
}

/// Announces that an action occurred and carries the deltas that bring this
/// feed's data up to date, plus an optional integrity fingerprint.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionRevelation {
    pub action_name: String,
    pub action_data: JsonObject,
    pub feed_name: String,
    pub feed_args: FeedArgs,
    pub feed_deltas: Vec<FeedDelta>,
    pub feed_md5: Option<String>,
}

/// The server forcibly closed a feed.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedTermination {
    pub feed_name: String,
    pub feed_args: FeedArgs,
    pub error_code: String,
    pub error_data: JsonObject,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn client_messages_round_trip_through_serialization() {
        let mut action_args = JsonObject::new();
        action_args.insert("arg".to_string(), json!("val"));
        let messages = vec![
            ClientMessage::Handshake {
                versions: vec![FEEDME_VERSION.to_string()],
            },
            ClientMessage::Action {
                action_name: "myAction".to_string(),
                action_args,
                callback_id: "1".to_string(),
            },
            ClientMessage::FeedOpen {
                feed_name: "myFeed".to_string(),
                feed_args: FeedArgs::from([("arg".to_string(), "val".to_string())]),
            },
            ClientMessage::FeedClose {
                feed_name: "myFeed".to_string(),
                feed_args: FeedArgs::new(),
            },
        ];

        for message in messages {
            let frame = serde_json::to_string(&message).expect("serialize frame");
            let parsed: ClientMessage = serde_json::from_str(&frame).expect("parse frame");
            assert_eq!(parsed, message);
        }
    }

    #[test]
    fn handshake_frame_uses_the_versions_array() {
        let message = ClientMessage::Handshake {
            versions: vec!["0.1".to_string()],
        };
        let value = serde_json::to_value(&message).expect("serialize handshake");
        assert_eq!(
            value,
            json!({"MessageType": "Handshake", "Versions": ["0.1"]})
        );
    }

    #[test]
    fn feed_open_frame_matches_the_wire_shape() {
        let message = ClientMessage::FeedOpen {
            feed_name: "myFeed".to_string(),
            feed_args: FeedArgs::from([("arg".to_string(), "val".to_string())]),
        };
        let value = serde_json::to_value(&message).expect("serialize feed open");
        assert_eq!(
            value,
            json!({
                "MessageType": "FeedOpen",
                "FeedName": "myFeed",
                "FeedArgs": {"arg": "val"}
            })
        );
    }
}
