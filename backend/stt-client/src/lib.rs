//! Async client for the real-time speech-to-text daemon.
//!
//! Talks to the daemon over a Unix domain socket using length-prefixed JSON
//! frames. Commands are correlated with their acknowledgments by id; streamed
//! transcriptions, status updates and daemon errors are delivered to callbacks.

pub mod config;
pub mod error;
pub mod ipc;
pub mod protocol;

#[cfg(test)]
mod tests;

pub use config::{ClientConfig, DEFAULT_SOCKET_PATH};
pub use error::{ClientError, ConfigError, FrameError};
pub use ipc::{ConnectionState, SttClient};
pub use protocol::{Language, Message, MessageType, StatusSnapshot, TranscriptionResult, VadUpdate};
