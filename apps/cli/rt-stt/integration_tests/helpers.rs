//! Test helpers for CLI integration tests.
//!
//! A minimal fake daemon that answers exactly one command per call.

use stt_client::protocol::framer::{read_frame, write_frame};
use stt_client::protocol::message::{Message, MessageType};
use stt_client::{ClientConfig, SttClient};

use std::path::PathBuf;
use std::time::Duration;

use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::{UnixListener, UnixStream};

pub const STEP_TIMEOUT: Duration = Duration::from_secs(5);

pub struct FakeDaemon {
    _dir: TempDir,
    pub path: PathBuf,
    listener: UnixListener,
}

impl FakeDaemon {
    pub fn start() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let path = dir.path().join("rt-stt.sock");
        let listener = UnixListener::bind(&path).expect("Failed to bind fake daemon socket");
        Self {
            _dir: dir,
            path,
            listener,
        }
    }

    /// A client connected to this daemon, plus the daemon's end of the socket.
    pub async fn connected_client(&self) -> (SttClient, UnixStream) {
        let client = SttClient::new(ClientConfig::with_socket_path(&self.path));
        client.connect().await.expect("Failed to connect client");
        let (stream, _) = tokio::time::timeout(STEP_TIMEOUT, self.listener.accept())
            .await
            .expect("Timed out waiting for client")
            .expect("Failed to accept client");
        (client, stream)
    }
}

/// Read one command, check its action, and answer it with `reply` as the ack data.
///
/// Returns the command's `params` for further assertions.
pub async fn answer(stream: &mut UnixStream, action: &str, reply: Value) -> Value {
    let payload = tokio::time::timeout(STEP_TIMEOUT, read_frame(stream))
        .await
        .expect("Timed out waiting for command")
        .expect("Failed to read command");
    let command = Message::from_slice(&payload).expect("Malformed command");
    assert_eq!(command.kind, MessageType::Command);
    assert_eq!(command.data["action"], json!(action));

    let ack = Message {
        kind: MessageType::Acknowledgment,
        id: command.id.clone(),
        data: match reply {
            Value::Object(map) => map,
            _ => serde_json::Map::new(),
        },
    };
    let bytes = ack.to_bytes().expect("Failed to encode ack");
    write_frame(stream, &bytes).await.expect("Failed to write ack");

    command.data["params"].clone()
}
