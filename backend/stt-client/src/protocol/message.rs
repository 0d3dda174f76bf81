use crate::error::client::ClientError;

use common::ErrorLocation;

use std::fmt;
use std::panic::Location;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value, json};
use uuid::Uuid;

/// Message kinds with their fixed wire tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum MessageType {
    Command = 0,
    Subscribe = 1,
    Unsubscribe = 2,
    Transcription = 3,
    Status = 4,
    Error = 5,
    Acknowledgment = 6,
}

impl From<MessageType> for i64 {
    fn from(kind: MessageType) -> Self {
        kind as i64
    }
}

impl TryFrom<i64> for MessageType {
    type Error = String;

    fn try_from(tag: i64) -> Result<Self, String> {
        match tag {
            0 => Ok(MessageType::Command),
            1 => Ok(MessageType::Subscribe),
            2 => Ok(MessageType::Unsubscribe),
            3 => Ok(MessageType::Transcription),
            4 => Ok(MessageType::Status),
            5 => Ok(MessageType::Error),
            6 => Ok(MessageType::Acknowledgment),
            other => Err(format!("unknown message type tag {other}")),
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}({})", *self as i64)
    }
}

/// The JSON envelope carried by every frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "type")]
    pub kind: MessageType,

    /// Correlation id for commands and their acknowledgments; free-form on events.
    #[serde(default)]
    pub id: String,

    #[serde(default, deserialize_with = "null_as_empty")]
    pub data: Map<String, Value>,
}

impl Message {
    /// New message with a freshly generated id.
    pub fn new(kind: MessageType, data: Map<String, Value>) -> Self {
        Self {
            kind,
            id: Uuid::new_v4().to_string(),
            data,
        }
    }

    /// `Command` with `data = {action, params}`; missing params become `{}`.
    pub fn command(action: &str, params: Option<Value>) -> Self {
        let mut data = Map::new();
        data.insert("action".to_string(), Value::String(action.to_string()));
        data.insert("params".to_string(), params.unwrap_or_else(|| json!({})));
        Self::new(MessageType::Command, data)
    }

    pub fn subscribe() -> Self {
        Self::new(MessageType::Subscribe, Map::new())
    }

    pub fn unsubscribe() -> Self {
        Self::new(MessageType::Unsubscribe, Map::new())
    }

    /// Canonical JSON text of the envelope.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ClientError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Parse a frame payload.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::MalformedFrame`] for an empty payload, invalid JSON,
    /// or an unknown type tag.
    pub fn from_slice(payload: &[u8]) -> Result<Self, ClientError> {
        if payload.is_empty() {
            return Err(ClientError::MalformedFrame {
                message: "Empty frame payload".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        serde_json::from_slice(payload).map_err(|e| ClientError::MalformedFrame {
            message: format!("Invalid message JSON: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Map<String, Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Map<String, Value>>::deserialize(deserializer)?.unwrap_or_default())
}
