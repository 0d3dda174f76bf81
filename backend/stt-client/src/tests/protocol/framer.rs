// Unit tests for the length-prefixed framer
// Byte layout, stream boundaries and the size ceiling

use crate::error::FrameError;
use crate::protocol::framer::{LENGTH_PREFIX_SIZE, MAX_FRAME_LEN, encode, read_frame, write_frame};

use tokio::io::AsyncWriteExt;

// ============================================
// ENCODING
// ============================================

/// **VALUE**: Verifies the exact bytes produced for a payload.
///
/// **WHY THIS MATTERS**: The daemon reads a 4-byte big-endian length and then exactly
/// that many bytes. Any deviation and every later frame is read from the wrong offset.
///
/// **BUG THIS CATCHES**: Little-endian prefixes, prefixes counting themselves, or a
/// missing payload copy.
#[test]
fn given_small_payload_when_encode_then_prefix_is_big_endian_length() {
    // GIVEN: A 13-byte JSON payload
    let payload = br#"{"type":1,"id"#;
    assert_eq!(payload.len(), 13);

    // WHEN: Encoded
    let frame = encode(payload).expect("encode should succeed");

    // THEN: Prefix is 0x0000000D followed by the payload verbatim
    assert_eq!(frame.len(), LENGTH_PREFIX_SIZE + 13);
    assert_eq!(&frame[..LENGTH_PREFIX_SIZE], &[0, 0, 0, 13]);
    assert_eq!(&frame[..LENGTH_PREFIX_SIZE], &(payload.len() as u32).to_be_bytes());
    assert_eq!(&frame[LENGTH_PREFIX_SIZE..], payload);
}

/// **VALUE**: Verifies payloads above the ceiling are refused before anything is written.
///
/// **BUG THIS CATCHES**: Silent truncation of the length to u32 or sending frames the
/// daemon will treat as a desynchronized stream.
#[test]
fn given_oversized_payload_when_encode_then_returns_oversized() {
    let payload = vec![b'x'; MAX_FRAME_LEN + 1];

    let result = encode(&payload);

    assert!(matches!(result, Err(FrameError::Oversized { length, .. }) if length == MAX_FRAME_LEN + 1));
}

// ============================================
// DECODING
// ============================================

/// **VALUE**: Verifies two frames arriving back to back are split at the right boundary.
///
/// **WHY THIS MATTERS**: Socket reads do not respect message boundaries; the framer is the
/// only thing that does.
///
/// **BUG THIS CATCHES**: Over-reading into the next frame or reading only what the first
/// `read` call returned.
#[tokio::test]
async fn given_two_frames_in_one_buffer_when_read_frame_twice_then_returns_each_payload() {
    // GIVEN: Two frames concatenated in one buffer
    let mut bytes = encode(b"first").expect("encode first");
    bytes.extend(encode(b"second-frame").expect("encode second"));
    let mut reader = bytes.as_slice();

    // WHEN: Reading twice
    let first = read_frame(&mut reader).await.expect("first frame");
    let second = read_frame(&mut reader).await.expect("second frame");

    // THEN: Each payload comes back intact and the stream is exhausted
    assert_eq!(first, b"first");
    assert_eq!(second, b"second-frame");
    assert!(reader.is_empty());
}

/// **VALUE**: Verifies a frame split across many small writes is reassembled.
///
/// **BUG THIS CATCHES**: Treating a short read as a complete frame.
#[tokio::test]
async fn given_frame_delivered_in_fragments_when_read_frame_then_reassembles_payload() {
    // GIVEN: A duplex pipe fed one byte at a time
    let (mut client, mut server) = tokio::io::duplex(64);
    let frame = encode(br#"{"type":6,"id":"a","data":{}}"#).expect("encode");

    let writer = tokio::spawn(async move {
        for byte in frame {
            server.write_all(&[byte]).await.expect("write byte");
            tokio::task::yield_now().await;
        }
    });

    // WHEN: Reading one frame
    let payload = read_frame(&mut client).await.expect("frame");

    // THEN: The whole payload is returned
    assert_eq!(payload, br#"{"type":6,"id":"a","data":{}}"#);
    writer.await.expect("writer task");
}

/// **VALUE**: Verifies a clean close between frames is reported as end of stream.
///
/// **WHY THIS MATTERS**: The receive loop logs a daemon shutdown differently from a broken
/// transport, and both trigger reconnect handling.
#[tokio::test]
async fn given_empty_stream_when_read_frame_then_returns_end_of_stream() {
    let mut reader: &[u8] = &[];

    let error = read_frame(&mut reader).await.expect_err("should fail");

    assert!(error.is_end_of_stream(), "Expected EndOfStream, got {error:?}");
}

/// **VALUE**: Verifies a stream that dies mid-payload is not mistaken for a frame.
///
/// **BUG THIS CATCHES**: Returning a zero-padded buffer when fewer bytes than announced
/// arrived.
#[tokio::test]
async fn given_truncated_payload_when_read_frame_then_returns_end_of_stream() {
    // GIVEN: Prefix announces 10 bytes, only 3 follow
    let bytes = [0u8, 0, 0, 10, b'a', b'b', b'c'];
    let mut reader = &bytes[..];

    // WHEN / THEN
    let error = read_frame(&mut reader).await.expect_err("should fail");
    assert!(error.is_end_of_stream());
}

/// **VALUE**: Verifies an absurd announced length is rejected without allocating it.
///
/// **BUG THIS CATCHES**: A desynchronized stream (e.g. reading JSON text as a prefix)
/// causing a multi-gigabyte allocation.
#[tokio::test]
async fn given_length_above_limit_when_read_frame_then_returns_oversized() {
    let bytes = [0xFFu8, 0xFF, 0xFF, 0xFF];
    let mut reader = &bytes[..];

    let error = read_frame(&mut reader).await.expect_err("should fail");

    assert!(matches!(error, FrameError::Oversized { .. }));
}

/// **VALUE**: Verifies a zero-length frame is accepted at this layer.
///
/// **WHY THIS MATTERS**: The frame is well-formed; it is the message layer that rejects
/// an empty payload, so the stream stays in sync.
#[tokio::test]
async fn given_zero_length_frame_when_read_frame_then_returns_empty_payload() {
    let bytes = [0u8, 0, 0, 0];
    let mut reader = &bytes[..];

    let payload = read_frame(&mut reader).await.expect("frame");

    assert!(payload.is_empty());
}

// ============================================
// WRITING
// ============================================

#[tokio::test]
async fn given_payload_when_write_frame_then_output_matches_encode() {
    let mut sink: Vec<u8> = Vec::new();

    write_frame(&mut sink, b"hello").await.expect("write");

    assert_eq!(sink, encode(b"hello").expect("encode"));
}

/// **VALUE**: Verifies a message survives serialize, frame, read and parse unchanged.
///
/// **WHY THIS MATTERS**: This is the full path every command takes to the daemon and
/// every reply takes back.
#[tokio::test]
async fn given_command_message_when_framed_and_read_back_then_equal() {
    // GIVEN
    let message = crate::protocol::message::Message::command(
        "set_language",
        Some(serde_json::json!({ "language": "es" })),
    );
    let mut wire: Vec<u8> = Vec::new();

    // WHEN
    write_frame(&mut wire, &message.to_bytes().expect("to_bytes"))
        .await
        .expect("write");
    let mut reader = wire.as_slice();
    let payload = read_frame(&mut reader).await.expect("read");

    // THEN
    let decoded = crate::protocol::message::Message::from_slice(&payload).expect("decode");
    assert_eq!(decoded, message);
}
