use common::ErrorLocation;

use std::io::{Error as IoError, ErrorKind};
use std::panic::Location;

use thiserror::Error as ThisError;

/// Failures while reading or writing a single length-prefixed frame.
///
/// `EndOfStream` is the orderly "peer went away" case and is kept apart from
/// `Io` so callers can tell a clean close from a broken transport.
#[derive(Debug, ThisError)]
pub enum FrameError {
    #[error("End Of Stream Error: {message} {location}")]
    EndOfStream {
        message: String,
        location: ErrorLocation,
    },

    #[error("IO Error: {message} {location}")]
    Io {
        message: String,
        location: ErrorLocation,
    },

    #[error("Oversized Frame Error: {length} bytes exceeds limit of {limit} {location}")]
    Oversized {
        length: usize,
        limit: usize,
        location: ErrorLocation,
    },
}

impl FrameError {
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, FrameError::EndOfStream { .. })
    }
}

impl From<IoError> for FrameError {
    #[track_caller]
    fn from(error: IoError) -> Self {
        match error.kind() {
            ErrorKind::UnexpectedEof => FrameError::EndOfStream {
                message: error.to_string(),
                location: ErrorLocation::from(Location::caller()),
            },
            _ => FrameError::Io {
                message: error.to_string(),
                location: ErrorLocation::from(Location::caller()),
            },
        }
    }
}
