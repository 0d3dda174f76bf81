//! Receive loop: the single reader of a session.
//!
//! Decodes frames and routes them either to the correlation table (replies) or
//! to the callback registry (events). Stream-level failures end the loop and
//! hand over to the client's disconnect handling; a bad payload only costs that
//! one frame.

use crate::ipc::callbacks::CallbackRegistry;
use crate::ipc::client::ClientInner;
use crate::ipc::handle::TaskHandle;
use crate::ipc::state::SharedState;
use crate::protocol::events::{StatusSnapshot, TranscriptionResult};
use crate::protocol::framer::read_frame;
use crate::protocol::message::{Message, MessageType};

use std::sync::Weak;

use log::{debug, error, info, trace, warn};
use serde_json::{Map, Value};
use tokio::net::unix::OwnedReadHalf;
use tokio_util::sync::CancellationToken;

const UNKNOWN_ERROR_MESSAGE: &str = "Unknown error";

/// Spawn the receive loop for the session of `generation`.
pub(crate) fn spawn(
    reader: OwnedReadHalf,
    client: Weak<ClientInner>,
    generation: u64,
    cancel: CancellationToken,
) -> TaskHandle {
    let task = tokio::spawn(receive_loop(reader, client, generation, cancel.clone()));
    TaskHandle::new("Receive loop", cancel, task)
}

async fn receive_loop(
    mut reader: OwnedReadHalf,
    client: Weak<ClientInner>,
    generation: u64,
    cancel: CancellationToken,
) {
    debug!("Receive loop started (generation {generation})");

    loop {
        let frame = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Receive loop stopped (generation {generation})");
                return;
            }
            frame = read_frame(&mut reader) => frame,
        };

        let Some(client) = client.upgrade() else {
            debug!("Client dropped; receive loop exiting (generation {generation})");
            return;
        };

        match frame {
            Ok(payload) => handle_frame(&payload, client.state(), client.callbacks()),
            Err(e) => {
                if e.is_end_of_stream() {
                    info!("Daemon closed the connection");
                } else {
                    warn!("Receive failed: {e}");
                }
                client.handle_disconnect(generation).await;
                return;
            }
        }
    }
}

/// Decode one frame payload and route it. Malformed payloads are logged and dropped.
pub(crate) fn handle_frame(payload: &[u8], state: &SharedState, callbacks: &CallbackRegistry) {
    match Message::from_slice(payload) {
        Ok(message) => route(message, state, callbacks),
        Err(e) => warn!("Skipping malformed frame: {e}"),
    }
}

/// Route a decoded message by its type.
pub(crate) fn route(message: Message, state: &SharedState, callbacks: &CallbackRegistry) {
    trace!("Received {} (id={})", message.kind, message.id);

    match message.kind {
        MessageType::Transcription => {
            let result = TranscriptionResult::from_data(&message.data);
            if !callbacks.emit_transcription(result) {
                trace!("Transcription dropped: no callback registered");
            }
        }
        MessageType::Status => {
            let status = StatusSnapshot::from_data(&message.data);
            if !callbacks.emit_status(status) {
                trace!("Status dropped: no callback registered");
            }
        }
        MessageType::Error => {
            let text = message
                .data
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or(UNKNOWN_ERROR_MESSAGE)
                .to_string();
            error!("Daemon error: {text}");

            // The daemon reports a failed command as an Error echoing its id.
            if !message.id.is_empty() {
                let mut failure = Map::new();
                failure.insert("success".to_string(), Value::Bool(false));
                failure.insert("error".to_string(), Value::String(text.clone()));
                if state.lock().pending.resolve(&message.id, Ok(failure)) {
                    debug!("Error reply settled pending command (id={})", message.id);
                }
            }

            callbacks.emit_error(text);
        }
        MessageType::Acknowledgment => {
            let resolved = state.lock().pending.resolve(&message.id, Ok(message.data));
            if !resolved {
                debug!(
                    "Discarding acknowledgment for unknown or retired id {}",
                    message.id
                );
            }
        }
        MessageType::Command | MessageType::Subscribe | MessageType::Unsubscribe => {
            warn!(
                "Ignoring unexpected client-only message {} from daemon (id={})",
                message.kind, message.id
            );
        }
    }
}
