//! Serialization and validation at the wire boundary.
//!
//! Outbound frames serialize compactly. Inbound frames are parsed once, then
//! validated against a per-type schema keyed on `MessageType`. Serde's
//! internally tagged enums cannot reject unknown properties, so dispatch is
//! manual: strip the tag, deserialize the remainder into a raw struct with
//! `deny_unknown_fields`, then resolve conditional fields into the clean
//! types of [`crate::message`].

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::delta::FeedDelta;
use crate::message::ActionResponse;
use crate::message::ActionRevelation;
use crate::message::ClientMessage;
use crate::message::FeedArgs;
use crate::message::FeedCloseResponse;
use crate::message::FeedOpenResponse;
use crate::message::FeedTermination;
use crate::message::HandshakeResponse;
use crate::message::JsonObject;
use crate::message::ServerMessage;
use crate::message::ServerRejection;
use crate::message::ViolationResponse;

/// A server frame that failed JSON parsing or schema validation.
#[derive(Debug, Error)]
pub enum MessageError {
    #[error("frame is not valid JSON: {0}")]
    Json(#[source] serde_json::Error),
    #[error("frame is not a JSON object")]
    NotAnObject,
    #[error("frame has no string MessageType property")]
    MissingMessageType,
    #[error("unrecognized MessageType `{0}`")]
    UnknownMessageType(String),
    #[error("frame does not match the {message_type} schema: {source}")]
    Schema {
        message_type: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid {message_type} frame: {reason}")]
    Invalid {
        message_type: &'static str,
        reason: String,
    },
}

/// Renders an outbound frame.
pub fn encode(message: &ClientMessage) -> String {
    match serde_json::to_string(message) {
        Ok(frame) => frame,
        // Client messages contain only JSON-native types.
        Err(_) => unreachable!("client message serialization is infallible"),
    }
}

/// Parses and schema-checks an inbound frame.
pub fn decode(raw: &str) -> Result<ServerMessage, MessageError> {
    let value: Value = serde_json::from_str(raw).map_err(MessageError::Json)?;
    let Value::Object(mut frame) = value else {
        return Err(MessageError::NotAnObject);
    };
    let message_type = match frame.remove("MessageType") {
        Some(Value::String(message_type)) => message_type,
        _ => return Err(MessageError::MissingMessageType),
    };
    match message_type.as_str() {
        "ViolationResponse" => {
            let raw: RawViolationResponse = from_frame("ViolationResponse", frame)?;
            Ok(ServerMessage::ViolationResponse(ViolationResponse {
                diagnostics: raw.diagnostics,
            }))
        }
        "HandshakeResponse" => {
            let raw: RawHandshakeResponse = from_frame("HandshakeResponse", frame)?;
            finish("HandshakeResponse", raw.into_message()).map(ServerMessage::HandshakeResponse)
        }
        "ActionResponse" => {
            let raw: RawActionResponse = from_frame("ActionResponse", frame)?;
            finish("ActionResponse", raw.into_message()).map(ServerMessage::ActionResponse)
        }
        "FeedOpenResponse" => {
            let raw: RawFeedOpenResponse = from_frame("FeedOpenResponse", frame)?;
            finish("FeedOpenResponse", raw.into_message()).map(ServerMessage::FeedOpenResponse)
        }
        "FeedCloseResponse" => {
            let raw: RawFeedCloseResponse = from_frame("FeedCloseResponse", frame)?;
            finish("FeedCloseResponse", raw.into_message()).map(ServerMessage::FeedCloseResponse)
        }
        "ActionRevelation" => {
            let raw: RawActionRevelation = from_frame("ActionRevelation", frame)?;
            finish("ActionRevelation", raw.into_message()).map(ServerMessage::ActionRevelation)
        }
        "FeedTermination" => {
            let raw: RawFeedTermination = from_frame("FeedTermination", frame)?;
            finish("FeedTermination", raw.into_message()).map(ServerMessage::FeedTermination)
        }
        other => Err(MessageError::UnknownMessageType(other.to_string())),
    }
}

fn from_frame<T: DeserializeOwned>(
    message_type: &'static str,
    frame: JsonObject,
) -> Result<T, MessageError> {
    serde_json::from_value(Value::Object(frame)).map_err(|source| MessageError::Schema {
        message_type,
        source,
    })
}

fn finish<T>(message_type: &'static str, result: Result<T, String>) -> Result<T, MessageError> {
    result.map_err(|reason| MessageError::Invalid {
        message_type,
        reason,
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
struct RawViolationResponse {
    diagnostics: JsonObject,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
struct RawHandshakeResponse {
    success: bool,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    client_id: Option<String>,
}

impl RawHandshakeResponse {
    fn into_message(self) -> Result<HandshakeResponse, String> {
        if self.success {
            Ok(HandshakeResponse::Accepted {
                version: required_string("Version", self.version)?,
                client_id: required_string("ClientId", self.client_id)?,
            })
        } else {
            absent("Version", self.version.is_some())?;
            absent("ClientId", self.client_id.is_some())?;
            Ok(HandshakeResponse::Rejected)
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
struct RawActionResponse {
    callback_id: String,
    success: bool,
    #[serde(default)]
    action_data: Option<JsonObject>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error_data: Option<JsonObject>,
}

impl RawActionResponse {
    fn into_message(self) -> Result<ActionResponse, String> {
        non_empty("CallbackId", &self.callback_id)?;
        let result = resolve_outcome(
            "ActionData",
            self.success,
            self.action_data,
            self.error_code,
            self.error_data,
        )?;
        Ok(ActionResponse {
            callback_id: self.callback_id,
            result,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
struct RawFeedOpenResponse {
    feed_name: String,
    feed_args: FeedArgs,
    success: bool,
    #[serde(default)]
    feed_data: Option<JsonObject>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error_data: Option<JsonObject>,
}

impl RawFeedOpenResponse {
    fn into_message(self) -> Result<FeedOpenResponse, String> {
        non_empty("FeedName", &self.feed_name)?;
        let result = resolve_outcome(
            "FeedData",
            self.success,
            self.feed_data,
            self.error_code,
            self.error_data,
        )?;
        Ok(FeedOpenResponse {
            feed_name: self.feed_name,
            feed_args: self.feed_args,
            result,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
struct RawFeedCloseResponse {
    feed_name: String,
    feed_args: FeedArgs,
}

impl RawFeedCloseResponse {
    fn into_message(self) -> Result<FeedCloseResponse, String> {
        non_empty("FeedName", &self.feed_name)?;
        Ok(FeedCloseResponse {
            feed_name: self.feed_name,
            feed_args: self.feed_args,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
struct RawActionRevelation {
    action_name: String,
    action_data: JsonObject,
    feed_name: String,
    feed_args: FeedArgs,
    feed_deltas: Vec<FeedDelta>,
    #[serde(default)]
    feed_md5: Option<String>,
}

impl RawActionRevelation {
    fn into_message(self) -> Result<ActionRevelation, String> {
        non_empty("ActionName", &self.action_name)?;
        non_empty("FeedName", &self.feed_name)?;
        if let Some(feed_md5) = &self.feed_md5
            && feed_md5.len() != 24
        {
            return Err("FeedMd5 must be exactly 24 characters".to_string());
        }
        Ok(ActionRevelation {
            action_name: self.action_name,
            action_data: self.action_data,
            feed_name: self.feed_name,
            feed_args: self.feed_args,
            feed_deltas: self.feed_deltas,
            feed_md5: self.feed_md5,
        })
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase", deny_unknown_fields)]
struct RawFeedTermination {
    feed_name: String,
    feed_args: FeedArgs,
    error_code: String,
    error_data: JsonObject,
}

impl RawFeedTermination {
    fn into_message(self) -> Result<FeedTermination, String> {
        non_empty("FeedName", &self.feed_name)?;
        non_empty("ErrorCode", &self.error_code)?;
        Ok(FeedTermination {
            feed_name: self.feed_name,
            feed_args: self.feed_args,
            error_code: self.error_code,
            error_data: self.error_data,
        })
    }
}

fn resolve_outcome(
    data_field: &str,
    success: bool,
    data: Option<JsonObject>,
    error_code: Option<String>,
    error_data: Option<JsonObject>,
) -> Result<Result<JsonObject, ServerRejection>, String> {
    if success {
        absent("ErrorCode", error_code.is_some())?;
        absent("ErrorData", error_data.is_some())?;
        let data = data.ok_or_else(|| format!("{data_field} is required on success"))?;
        Ok(Ok(data))
    } else {
        absent(data_field, data.is_some())?;
        let error_code = required_string("ErrorCode", error_code)?;
        let error_data = error_data.ok_or_else(|| "ErrorData is required on failure".to_string())?;
        Ok(Err(ServerRejection {
            error_code,
            error_data,
        }))
    }
}

fn required_string(field: &str, value: Option<String>) -> Result<String, String> {
    match value {
        Some(value) if !value.is_empty() => Ok(value),
        Some(_) => Err(format!("{field} must be a non-empty string")),
        None => Err(format!("{field} is required")),
    }
}

fn non_empty(field: &str, value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Err(format!("{field} must be a non-empty string"));
    }
    Ok(())
}

fn absent(field: &str, present: bool) -> Result<(), String> {
    if present {
        return Err(format!("{field} is not allowed here"));
    }
    Ok(())
}
