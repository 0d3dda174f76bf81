//! Test helpers for client integration tests.
//!
//! This module provides a scripted fake daemon:
//! - Listening on a Unix socket inside a temp dir
//! - Reading the client's frames as decoded messages
//! - Sending acknowledgments, events and raw bytes back

use stt_client::ClientConfig;
use stt_client::protocol::framer::{read_frame, write_frame};
use stt_client::protocol::message::{Message, MessageType};

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::{Map, Value, json};
use tempfile::TempDir;
use tokio::net::{UnixListener, UnixStream};

/// Upper bound for anything a test waits on.
pub const STEP_TIMEOUT: Duration = Duration::from_secs(5);

/// Listening side of the fake daemon.
pub struct FakeDaemon {
    // Keeps the socket directory alive for the test's duration.
    _dir: TempDir,
    path: PathBuf,
    listener: Option<UnixListener>,
}

impl FakeDaemon {
    pub fn start() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("rt-stt.sock");
        let listener = UnixListener::bind(&path).expect("Failed to bind fake daemon socket");
        Self {
            _dir: dir,
            path,
            listener: Some(listener),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Client config pointed at this daemon with test-friendly timings.
    pub fn config(&self) -> ClientConfig {
        ClientConfig::with_socket_path(&self.path)
            .with_reconnect_delay(Duration::from_millis(50))
            .with_command_timeout(Duration::from_secs(2))
    }

    pub async fn accept(&self) -> DaemonConn {
        let listener = self.listener.as_ref().expect("Fake daemon is stopped");
        let (stream, _) = tokio::time::timeout(STEP_TIMEOUT, listener.accept())
            .await
            .expect("Timed out waiting for client connection")
            .expect("Failed to accept client connection");
        DaemonConn { stream }
    }

    /// Wait up to `timeout` for a connection; `None` if nobody connects.
    pub async fn try_accept(&self, timeout: Duration) -> Option<DaemonConn> {
        let listener = self.listener.as_ref()?;
        match tokio::time::timeout(timeout, listener.accept()).await {
            Ok(Ok((stream, _))) => Some(DaemonConn { stream }),
            _ => None,
        }
    }

    /// Stop listening and remove the socket file so connects fail.
    pub fn stop(&mut self) {
        self.listener = None;
        let _ = std::fs::remove_file(&self.path);
    }

    /// Listen again on the same path.
    pub fn restart(&mut self) {
        let _ = std::fs::remove_file(&self.path);
        self.listener =
            Some(UnixListener::bind(&self.path).expect("Failed to rebind fake daemon socket"));
    }
}

/// One accepted client connection, seen from the daemon.
pub struct DaemonConn {
    stream: UnixStream,
}

impl DaemonConn {
    pub async fn recv(&mut self) -> Message {
        let payload = tokio::time::timeout(STEP_TIMEOUT, read_frame(&mut self.stream))
            .await
            .expect("Timed out waiting for client frame")
            .expect("Failed to read client frame");
        Message::from_slice(&payload).expect("Client sent malformed message")
    }

    /// Receive a command and check its action.
    pub async fn recv_command(&mut self, action: &str) -> Message {
        let message = self.recv().await;
        assert_eq!(message.kind, MessageType::Command, "Expected a command");
        assert_eq!(message.data["action"], json!(action), "Unexpected action");
        message
    }

    pub async fn send(&mut self, message: &Message) {
        let payload = message.to_bytes().expect("Failed to encode message");
        self.send_raw(&payload).await;
    }

    /// Write `payload` as one frame without any validation.
    pub async fn send_raw(&mut self, payload: &[u8]) {
        write_frame(&mut self.stream, payload)
            .await
            .expect("Failed to write frame");
    }

    pub async fn ack(&mut self, id: &str, data: Value) {
        self.send(&message(MessageType::Acknowledgment, id, data))
            .await;
    }

    pub async fn ack_success(&mut self, id: &str, result: Value) {
        self.ack(id, json!({ "success": true, "result": result }))
            .await;
    }

    pub async fn event(&mut self, kind: MessageType, data: Value) {
        self.send(&message(kind, "", data)).await;
    }
}

pub fn message(kind: MessageType, id: &str, data: Value) -> Message {
    Message {
        kind,
        id: id.to_string(),
        data: match data {
            Value::Object(map) => map,
            _ => Map::new(),
        },
    }
}

/// Poll `condition` until it holds or [`STEP_TIMEOUT`] passes.
pub async fn wait_until<F>(description: &str, mut condition: F)
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + STEP_TIMEOUT;
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "Timed out waiting for: {description}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
