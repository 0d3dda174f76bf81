//! Wire protocol spoken with the speech-to-text daemon.
//!
//! Every frame is `[4-byte big-endian length][UTF-8 JSON payload]`, the payload
//! being `{"type": <int>, "id": <string>, "data": <object>}`.
//!
//! - [`framer`]: length prefix encode/decode over any async byte stream
//! - [`message`]: the JSON envelope and its closed [`MessageType`] set
//! - [`events`]: typed views over event and reply payloads

pub mod events;
pub mod framer;
pub mod message;

pub use events::{Language, StatusSnapshot, TranscriptionResult, VadUpdate};
pub use message::{Message, MessageType};
