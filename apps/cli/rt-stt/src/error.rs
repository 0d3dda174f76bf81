use common::ErrorLocation;

use stt_client::{ClientError, ConfigError};

use std::panic::Location;

use serde_json::Value;
use thiserror::Error;

/// Errors that end a CLI invocation with exit code 1.
///
/// Library errors are folded into the two categories users care about:
/// could not talk to the daemon, or the daemon refused the request.
#[derive(Debug, Error)]
pub enum CliError {
    /// Daemon unreachable or connection dropped
    #[error("Connection Error: {message} {location}")]
    Connection {
        message: String,
        location: ErrorLocation,
    },

    /// Command timed out or was rejected by the daemon
    #[error("Command Error: {message} {location}")]
    Command {
        message: String,
        location: ErrorLocation,
    },

    /// Bad user input caught before or instead of a daemon round trip
    #[error("Invalid Input Error: {message} {location}")]
    InvalidInput {
        message: String,
        location: ErrorLocation,
    },

    #[error("Config Error: {message} {location}")]
    Config {
        message: String,
        location: ErrorLocation,
    },

    #[error("Logger Error: {message} {location}")]
    Logger {
        message: String,
        location: ErrorLocation,
    },

    #[error("Output Error: {message} {location}")]
    Output {
        message: String,
        location: ErrorLocation,
    },
}

impl CliError {
    /// One line for the terminal, without the source location.
    pub fn summary(&self) -> String {
        match self {
            CliError::Connection { message, .. } => format!("Connection error: {message}"),
            CliError::Command { message, .. } => format!("Command error: {message}"),
            CliError::InvalidInput { message, .. } => format!("Error: {message}"),
            CliError::Config { message, .. } => format!("Config error: {message}"),
            CliError::Logger { message, .. } => format!("Logger error: {message}"),
            CliError::Output { message, .. } => format!("Output error: {message}"),
        }
    }
}

impl From<ClientError> for CliError {
    #[track_caller]
    fn from(error: ClientError) -> Self {
        let location = ErrorLocation::from(Location::caller());
        match error {
            ClientError::ConnectionFailure { path, source, .. } => CliError::Connection {
                message: format!(
                    "cannot reach daemon at {} ({source}); is it running?",
                    path.display()
                ),
                location,
            },
            ClientError::ConnectionLost { message, .. }
            | ClientError::NotConnected { message, .. } => CliError::Connection { message, location },
            ClientError::CommandFailure {
                action, payload, ..
            } => CliError::Command {
                message: format!("'{action}' failed: {}", failure_reason(&payload)),
                location,
            },
            ClientError::CommandTimeout {
                action, timeout, ..
            } => CliError::Command {
                message: format!("'{action}' got no reply within {timeout:?}"),
                location,
            },
            ClientError::InvalidArgument { message, .. } => {
                CliError::InvalidInput { message, location }
            }
            other => CliError::Command {
                message: other.to_string(),
                location,
            },
        }
    }
}

impl From<ConfigError> for CliError {
    #[track_caller]
    fn from(error: ConfigError) -> Self {
        CliError::Config {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<std::io::Error> for CliError {
    #[track_caller]
    fn from(error: std::io::Error) -> Self {
        CliError::Output {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

/// The daemon's `error` text if it sent one, else the whole payload.
fn failure_reason(payload: &Value) -> String {
    match payload.get("error").and_then(Value::as_str) {
        Some(reason) => reason.to_string(),
        None => payload.to_string(),
    }
}
