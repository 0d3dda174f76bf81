use crate::error::frame::FrameError;

use common::ErrorLocation;

use std::io::Error as IoError;
use std::panic::Location;
use std::path::PathBuf;
use std::time::Duration;

use serde_json::Value;
use thiserror::Error as ThisError;

/// Errors surfaced by the blocking side of the client (`connect`, `issue`, typed commands).
///
/// `CommandTimeout` and `CommandFailure` are deliberately separate: the first means
/// the daemon never answered, the second means it answered "no".
#[derive(Debug, ThisError)]
pub enum ClientError {
    #[error("Connection Failure Error: {path}: {message} {location}")]
    ConnectionFailure {
        path: PathBuf,
        message: String,
        location: ErrorLocation,
        #[source]
        source: IoError,
    },

    #[error("Connection Lost Error: {message} {location}")]
    ConnectionLost {
        message: String,
        location: ErrorLocation,
    },

    #[error("Not Connected Error: {message} {location}")]
    NotConnected {
        message: String,
        location: ErrorLocation,
    },

    #[error("Command Timeout Error: '{action}' got no reply within {timeout:?} {location}")]
    CommandTimeout {
        action: String,
        timeout: Duration,
        location: ErrorLocation,
    },

    #[error("Command Failure Error: '{action}' failed: {payload} {location}")]
    CommandFailure {
        action: String,
        payload: Value,
        location: ErrorLocation,
    },

    #[error("Malformed Frame Error: {message} {location}")]
    MalformedFrame {
        message: String,
        location: ErrorLocation,
    },

    #[error("Serialization Error: {message} {location}")]
    Serialization {
        message: String,
        location: ErrorLocation,
    },

    #[error("Duplicate Request Error: id {id} is already in flight {location}")]
    DuplicateRequestId { id: String, location: ErrorLocation },

    #[error("Invalid Argument Error: {message} {location}")]
    InvalidArgument {
        message: String,
        location: ErrorLocation,
    },
}

impl ClientError {
    #[track_caller]
    pub(crate) fn connection_lost(message: impl Into<String>) -> Self {
        ClientError::ConnectionLost {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub(crate) fn not_connected() -> Self {
        ClientError::NotConnected {
            message: "Not connected to daemon".to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ClientError::CommandTimeout { .. })
    }

    pub fn is_connection_lost(&self) -> bool {
        matches!(self, ClientError::ConnectionLost { .. })
    }

    /// Daemon diagnostic payload of a `CommandFailure`, if this is one.
    pub fn failure_payload(&self) -> Option<&Value> {
        match self {
            ClientError::CommandFailure { payload, .. } => Some(payload),
            _ => None,
        }
    }
}

impl From<FrameError> for ClientError {
    #[track_caller]
    fn from(error: FrameError) -> Self {
        ClientError::ConnectionLost {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<serde_json::Error> for ClientError {
    #[track_caller]
    fn from(error: serde_json::Error) -> Self {
        ClientError::Serialization {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
