//! Length-prefixed framing.
//!
//! Stateless: all state lives in the stream handed in.

use crate::error::frame::FrameError;

use common::ErrorLocation;

use std::panic::Location;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

pub const LENGTH_PREFIX_SIZE: usize = 4;

/// Largest payload accepted in either direction.
///
/// A length above this almost always means the stream is out of sync.
pub const MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

/// Prepend the 4-byte big-endian length of `payload`.
///
/// # Errors
///
/// Returns [`FrameError::Oversized`] if the payload exceeds [`MAX_FRAME_LEN`].
pub fn encode(payload: &[u8]) -> Result<Vec<u8>, FrameError> {
    let length = checked_length(payload.len())?;

    let mut frame = Vec::with_capacity(LENGTH_PREFIX_SIZE + payload.len());
    frame.extend_from_slice(&length.to_be_bytes());
    frame.extend_from_slice(payload);
    Ok(frame)
}

/// Read exactly one frame and return its payload.
///
/// A length prefix of zero yields an empty payload; rejecting it is up to the
/// message layer.
///
/// # Errors
///
/// - [`FrameError::EndOfStream`] if the stream closes before the prefix or the
///   payload is complete
/// - [`FrameError::Oversized`] if the announced length exceeds [`MAX_FRAME_LEN`]
/// - [`FrameError::Io`] on any other read failure
pub async fn read_frame<R>(reader: &mut R) -> Result<Vec<u8>, FrameError>
where
    R: AsyncRead + Unpin,
{
    let mut prefix = [0u8; LENGTH_PREFIX_SIZE];
    reader.read_exact(&mut prefix).await?;

    let length = u32::from_be_bytes(prefix) as usize;
    if length > MAX_FRAME_LEN {
        return Err(FrameError::Oversized {
            length,
            limit: MAX_FRAME_LEN,
            location: ErrorLocation::from(Location::caller()),
        });
    }

    let mut payload = vec![0u8; length];
    reader.read_exact(&mut payload).await?;
    Ok(payload)
}

/// Write `payload` as a single frame and flush.
///
/// Prefix and payload go out in one `write_all` so a concurrent writer on the
/// same stream can never interleave between them; callers still serialize
/// access to the writer.
pub async fn write_frame<W>(writer: &mut W, payload: &[u8]) -> Result<(), FrameError>
where
    W: AsyncWrite + Unpin,
{
    let frame = encode(payload)?;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}

#[track_caller]
fn checked_length(length: usize) -> Result<u32, FrameError> {
    if length > MAX_FRAME_LEN {
        return Err(FrameError::Oversized {
            length,
            limit: MAX_FRAME_LEN,
            location: ErrorLocation::from(Location::caller()),
        });
    }
    // MAX_FRAME_LEN fits in u32
    Ok(length as u32)
}
