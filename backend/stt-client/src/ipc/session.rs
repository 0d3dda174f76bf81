//! One live connection to the daemon socket.
//!
//! The read half is handed to the receive loop, which is its only reader. The
//! write half stays here behind an async mutex so frames from concurrent
//! senders never interleave. Once a read or write fails the session is dead
//! and is never reused; a reconnect builds a fresh one.

use crate::error::client::ClientError;
use crate::protocol::framer::write_frame;
use crate::protocol::message::Message;

use common::ErrorLocation;

use std::panic::Location;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use log::{debug, trace, warn};
use tokio::io::AsyncWriteExt;
use tokio::net::UnixStream;
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

pub(crate) struct TransportSession {
    path: PathBuf,
    writer: Mutex<Option<OwnedWriteHalf>>,
    dead: AtomicBool,
    closed: CancellationToken,
}

impl TransportSession {
    /// Connect to the daemon socket at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ConnectionFailure`] carrying the underlying I/O error.
    pub(crate) async fn open(path: &Path) -> Result<(Self, OwnedReadHalf), ClientError> {
        let stream = UnixStream::connect(path)
            .await
            .map_err(|e| ClientError::ConnectionFailure {
                path: path.to_path_buf(),
                message: format!("Failed to connect to daemon: {e}"),
                location: ErrorLocation::from(Location::caller()),
                source: e,
            })?;

        debug!("Socket connected at {}", path.display());

        let (reader, writer) = stream.into_split();
        let session = Self {
            path: path.to_path_buf(),
            writer: Mutex::new(Some(writer)),
            dead: AtomicBool::new(false),
            closed: CancellationToken::new(),
        };

        Ok((session, reader))
    }

    /// Serialize `message` and write it as one frame.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Serialization`] if the message cannot be encoded
    /// - [`ClientError::ConnectionLost`] if the session is closed or the write fails;
    ///   the session is dead afterwards
    pub(crate) async fn send(&self, message: &Message) -> Result<(), ClientError> {
        if self.is_dead() {
            return Err(ClientError::connection_lost("Session is closed"));
        }

        let payload = message.to_bytes()?;

        let mut writer_guard = self.writer.lock().await;
        let writer = writer_guard
            .as_mut()
            .ok_or_else(|| ClientError::connection_lost("Session is closed"))?;

        let result = tokio::select! {
            result = write_frame(writer, &payload) => result.map_err(ClientError::from),
            _ = self.closed.cancelled() => Err(ClientError::connection_lost("Session closed during send")),
        };

        match result {
            Ok(()) => {
                trace!(
                    "Sent {} (id={}, {} bytes)",
                    message.kind,
                    message.id,
                    payload.len()
                );
                Ok(())
            }
            Err(e) => {
                warn!("Write to {} failed: {e}", self.path.display());
                self.dead.store(true, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    /// Close the session. Idempotent and callable from any task.
    ///
    /// Wakes the receive loop through the closed token and shuts down the write
    /// half; the socket is fully released once the reader is dropped too.
    pub(crate) async fn close(&self) {
        self.dead.store(true, Ordering::SeqCst);
        self.closed.cancel();

        let writer = self.writer.lock().await.take();
        if let Some(mut writer) = writer {
            if let Err(e) = writer.shutdown().await {
                debug!("Shutdown of {} failed: {e}", self.path.display());
            }
            debug!("Session to {} closed", self.path.display());
        }
    }

    pub(crate) fn is_dead(&self) -> bool {
        self.dead.load(Ordering::SeqCst)
    }

    /// Token cancelled when this session is closed.
    pub(crate) fn closed_token(&self) -> CancellationToken {
        self.closed.clone()
    }
}
