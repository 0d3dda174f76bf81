//! Public client for the speech-to-text daemon.
//!
//! [`SttClient`] ties the pieces together: it opens sessions, starts a receive
//! loop per session, correlates command replies, delivers events to callbacks
//! and, when the daemon goes away unexpectedly, hands over to the reconnect
//! loop.
//!
//! # Tasks
//!
//! - caller task(s): `connect`, `issue`, `subscribe`, typed commands
//! - one receive-loop task per live session
//! - one reconnect task while reconnecting
//!
//! `connect`, `disconnect` and reconnect attempts are serialized by an async
//! lifecycle lock. The receive loop never takes that lock, so `disconnect` can
//! safely wait for it to exit.

use crate::config::ClientConfig;
use crate::error::client::ClientError;
use crate::ipc::callbacks::{
    CallbackRegistry, ConnectionCallback, ErrorCallback, StatusCallback, TranscriptionCallback,
};
use crate::ipc::connection_state::ConnectionState;
use crate::ipc::dispatcher;
use crate::ipc::handle::TaskHandle;
use crate::ipc::reconnect::{self, ReconnectOutcome};
use crate::ipc::session::TransportSession;
use crate::ipc::state::SharedState;
use crate::protocol::events::{StatusSnapshot, TranscriptionResult, VadUpdate};
use crate::protocol::message::Message;

use common::ErrorLocation;

use std::panic::Location;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use log::{debug, info, warn};
use serde_json::{Map, Value, json};
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;

pub(crate) struct ClientInner {
    config: ClientConfig,
    state: SharedState,
    callbacks: CallbackRegistry,
    lifecycle: AsyncMutex<()>,
    dispatcher: Mutex<Option<TaskHandle>>,
    reconnect: Mutex<Option<TaskHandle>>,
}

/// Handle to the daemon connection.
///
/// Cheap to clone; all clones drive the same connection.
///
/// # Examples
///
/// ```no_run
/// use stt_client::{ClientConfig, SttClient};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let client = SttClient::new(ClientConfig::default());
///     client
///         .on_transcription(|result| println!("{}", result.text))
///         .await?;
///     client.connect().await?;
///     client.start_listening().await?;
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct SttClient {
    inner: Arc<ClientInner>,
}

impl SttClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                config,
                state: SharedState::default(),
                callbacks: CallbackRegistry::default(),
                lifecycle: AsyncMutex::new(()),
                dispatcher: Mutex::new(None),
                reconnect: Mutex::new(None),
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.inner.state.lock().connection
    }

    pub fn is_connected(&self) -> bool {
        self.connection_state().is_connected()
    }

    pub fn is_subscribed(&self) -> bool {
        self.inner.state.lock().subscribed
    }

    /// Number of commands currently waiting for a reply.
    pub fn pending_requests(&self) -> usize {
        self.inner.state.lock().pending.len()
    }

    // ============================================
    // LIFECYCLE
    // ============================================

    /// Connect to the daemon. A no-op if already connected.
    ///
    /// Re-enables automatic reconnection after a previous [`disconnect`](Self::disconnect).
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ConnectionFailure`] if the socket cannot be opened;
    /// the client is left `Disconnected` and no retry is scheduled.
    pub async fn connect(&self) -> Result<(), ClientError> {
        let _lifecycle = self.inner.lifecycle.lock().await;

        {
            let mut state = self.inner.state.lock();
            state.stopped = false;
            if state.connection.is_connected() {
                return Ok(());
            }
        }

        // An explicit connect supersedes a reconnect run still in flight.
        if let Some(reconnect) = self.inner.take_reconnect() {
            reconnect.cancel();
        }

        self.inner.connect_once(false).await
    }

    /// Disconnect from the daemon.
    ///
    /// Stops reconnect attempts, closes the session, releases every pending
    /// command with `ConnectionLost`, waits (bounded) for the receive loop to
    /// exit and fires the connection callback with `false`.
    pub async fn disconnect(&self) {
        self.inner.state.lock().stopped = true;
        let reconnect = self.inner.take_reconnect();
        if let Some(reconnect) = &reconnect {
            reconnect.cancel();
        }

        {
            let _lifecycle = self.inner.lifecycle.lock().await;

            let (session, released) = {
                let mut state = self.inner.state.lock();
                state.stopped = true;
                state.connection = ConnectionState::Disconnected;
                state.subscribed = false;
                let released = state.pending.fail_all("Client disconnected");
                (state.session.take(), released)
            };

            if released > 0 {
                debug!("Released {released} pending command(s) on disconnect");
            }

            if let Some(session) = session {
                session.close().await;
            }

            let dispatcher = self.inner.take_dispatcher();
            if let Some(dispatcher) = dispatcher {
                dispatcher.join(self.inner.config.disconnect_timeout()).await;
            }

            self.inner.callbacks.emit_connection(false);
            info!("Disconnected from daemon");
        }

        if let Some(reconnect) = reconnect {
            reconnect.join(self.inner.config.disconnect_timeout()).await;
        }
    }

    // ============================================
    // CALLBACKS
    // ============================================

    /// Register the transcription callback, replacing any previous one.
    ///
    /// Subscribes right away if connected and not yet subscribed.
    ///
    /// # Errors
    ///
    /// Returns an error if the immediate subscribe fails to send.
    pub async fn on_transcription<F>(&self, callback: F) -> Result<(), ClientError>
    where
        F: Fn(TranscriptionResult) + Send + Sync + 'static,
    {
        let callback: TranscriptionCallback = Arc::new(callback);
        self.inner.callbacks.set_transcription(callback);

        let needs_subscribe = {
            let state = self.inner.state.lock();
            state.connection.is_connected() && !state.subscribed
        };
        if needs_subscribe {
            self.inner.subscribe().await?;
        }
        Ok(())
    }

    pub fn on_status<F>(&self, callback: F)
    where
        F: Fn(StatusSnapshot) + Send + Sync + 'static,
    {
        let callback: StatusCallback = Arc::new(callback);
        self.inner.callbacks.set_status(callback);
    }

    pub fn on_error<F>(&self, callback: F)
    where
        F: Fn(String) + Send + Sync + 'static,
    {
        let callback: ErrorCallback = Arc::new(callback);
        self.inner.callbacks.set_error(callback);
    }

    /// Called with `true` on every successful (re)connect and `false` on every loss.
    pub fn on_connection<F>(&self, callback: F)
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        let callback: ConnectionCallback = Arc::new(callback);
        self.inner.callbacks.set_connection(callback);
    }

    // ============================================
    // SUBSCRIPTION
    // ============================================

    pub async fn subscribe(&self) -> Result<(), ClientError> {
        self.inner.subscribe().await
    }

    pub async fn unsubscribe(&self) -> Result<(), ClientError> {
        let (session, generation) = self.inner.live_session()?;
        self.inner
            .send(&session, generation, &Message::unsubscribe())
            .await?;

        {
            let mut state = self.inner.state.lock();
            if state.generation == generation {
                state.subscribed = false;
            }
        }
        info!("Unsubscribed from transcriptions");
        Ok(())
    }

    // ============================================
    // COMMANDS
    // ============================================

    /// Send a command with the configured timeout and return its `result`.
    pub async fn issue(&self, action: &str, params: Option<Value>) -> Result<Value, ClientError> {
        self.issue_with_timeout(action, params, self.inner.config.command_timeout())
            .await
    }

    /// Send a command and wait up to `timeout` for its acknowledgment.
    ///
    /// # Errors
    ///
    /// - [`ClientError::NotConnected`] if there is no live session
    /// - [`ClientError::CommandTimeout`] if no reply arrives in time
    /// - [`ClientError::CommandFailure`] if the daemon replies without `success: true`
    /// - [`ClientError::ConnectionLost`] if the connection drops while waiting
    pub async fn issue_with_timeout(
        &self,
        action: &str,
        params: Option<Value>,
        timeout: Duration,
    ) -> Result<Value, ClientError> {
        let message = Message::command(action, params);

        let (session, generation, waiter) = {
            let mut state = self.inner.state.lock();
            let (session, generation) = state
                .live_session()
                .ok_or_else(ClientError::not_connected)?;
            let waiter = state.pending.register(&message.id, action, timeout)?;
            (session, generation, waiter)
        };

        debug!("Issuing '{action}' (id={})", waiter.id());

        if let Err(e) = self.inner.send(&session, generation, &message).await {
            self.inner.state.lock().pending.retire(&message.id);
            return Err(e);
        }

        let reply = waiter
            .wait(timeout, action, |id| self.inner.state.lock().pending.retire(id))
            .await?;

        interpret_reply(action, reply)
    }

    pub async fn pause(&self) -> Result<Value, ClientError> {
        self.issue("pause", None).await
    }

    pub async fn resume(&self) -> Result<Value, ClientError> {
        self.issue("resume", None).await
    }

    pub async fn get_status(&self) -> Result<StatusSnapshot, ClientError> {
        let result = self.issue("get_status", None).await?;
        Ok(StatusSnapshot::from_value(&result))
    }

    pub async fn set_language(&self, language: &str) -> Result<Value, ClientError> {
        self.issue("set_language", Some(json!({ "language": language })))
            .await
    }

    pub async fn set_model(&self, model: &str) -> Result<Value, ClientError> {
        self.issue("set_model", Some(json!({ "model": model }))).await
    }

    /// Set the VAD start threshold multiplier (e.g. 1.08).
    pub async fn set_vad_sensitivity(&self, sensitivity: f64) -> Result<Value, ClientError> {
        self.issue(
            "set_vad_sensitivity",
            Some(json!({ "sensitivity": sensitivity })),
        )
        .await
    }

    pub async fn get_config(&self) -> Result<Value, ClientError> {
        self.issue("get_config", None).await
    }

    /// Merge `config` into the daemon configuration; `save` persists it to disk.
    pub async fn set_config(&self, config: Value, save: bool) -> Result<Value, ClientError> {
        self.issue("set_config", Some(json!({ "config": config, "save": save })))
            .await
    }

    /// Update individual VAD settings through `set_config`.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidArgument`] if `update` sets nothing.
    pub async fn set_vad_config(&self, update: &VadUpdate) -> Result<Value, ClientError> {
        if update.is_empty() {
            return Err(ClientError::InvalidArgument {
                message: "No VAD settings specified".to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let vad = serde_json::to_value(update)?;
        self.set_config(json!({ "stt": { "vad": vad } }), true).await
    }

    pub async fn get_metrics(&self) -> Result<Value, ClientError> {
        self.issue("get_metrics", None).await
    }

    /// Subscribe if needed, then resume listening.
    pub async fn start_listening(&self) -> Result<Value, ClientError> {
        if !self.is_subscribed() {
            self.subscribe().await?;
        }
        self.resume().await
    }

    pub async fn stop_listening(&self) -> Result<Value, ClientError> {
        self.pause().await
    }
}

/// Turn an acknowledgment payload into the command's result.
pub(crate) fn interpret_reply(action: &str, reply: Map<String, Value>) -> Result<Value, ClientError> {
    let succeeded = reply
        .get("success")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    if !succeeded {
        return Err(ClientError::CommandFailure {
            action: action.to_string(),
            payload: Value::Object(reply),
            location: ErrorLocation::from(Location::caller()),
        });
    }

    Ok(reply
        .get("result")
        .cloned()
        .unwrap_or_else(|| Value::Object(Map::new())))
}

impl ClientInner {
    pub(crate) fn state(&self) -> &SharedState {
        &self.state
    }

    pub(crate) fn callbacks(&self) -> &CallbackRegistry {
        &self.callbacks
    }

    fn take_dispatcher(&self) -> Option<TaskHandle> {
        self.dispatcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn take_reconnect(&self) -> Option<TaskHandle> {
        self.reconnect
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    fn live_session(&self) -> Result<(Arc<TransportSession>, u64), ClientError> {
        self.state
            .lock()
            .live_session()
            .ok_or_else(ClientError::not_connected)
    }

    /// Send on `session`; a write failure is treated as losing the connection.
    async fn send(
        self: &Arc<Self>,
        session: &TransportSession,
        generation: u64,
        message: &Message,
    ) -> Result<(), ClientError> {
        let result = session.send(message).await;
        if let Err(ClientError::ConnectionLost { .. }) = &result {
            self.handle_disconnect(generation).await;
        }
        result
    }

    async fn subscribe(self: &Arc<Self>) -> Result<(), ClientError> {
        let (session, generation) = self.live_session()?;
        self.send(&session, generation, &Message::subscribe()).await?;

        {
            let mut state = self.state.lock();
            if state.generation == generation {
                state.subscribed = true;
            }
        }
        info!("Subscribed to transcriptions");
        Ok(())
    }

    /// Open a session and bring it up. Caller holds the lifecycle lock.
    ///
    /// On failure the state falls back to `Reconnecting` when called from the
    /// reconnect loop and to `Disconnected` otherwise.
    async fn connect_once(self: &Arc<Self>, reconnecting: bool) -> Result<(), ClientError> {
        self.state.lock().connection = ConnectionState::Connecting;

        let stale = self.take_dispatcher();
        if let Some(stale) = stale {
            stale.join(self.config.disconnect_timeout()).await;
        }

        let path = self.config.socket_path.as_path();
        let (session, reader) = match TransportSession::open(path).await {
            Ok(opened) => opened,
            Err(e) => {
                self.state.lock().connection = if reconnecting {
                    ConnectionState::Reconnecting
                } else {
                    ConnectionState::Disconnected
                };
                if !reconnecting {
                    debug!("Connect failed: {e}");
                }
                return Err(e);
            }
        };

        let session = Arc::new(session);
        let generation = {
            let mut state = self.state.lock();
            state.generation += 1;
            state.connection = ConnectionState::Connected;
            state.subscribed = false;
            state.session = Some(Arc::clone(&session));
            state.generation
        };

        let receive_loop = dispatcher::spawn(
            reader,
            Arc::downgrade(self),
            generation,
            session.closed_token(),
        );
        *self
            .dispatcher
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(receive_loop);

        info!("Connected to daemon at {}", path.display());
        self.callbacks.emit_connection(true);

        if self.callbacks.has_transcription() {
            if let Err(e) = self.subscribe().await {
                warn!("Failed to restore transcription subscription: {e}");
            }
        }

        Ok(())
    }

    /// One reconnect attempt, run from the reconnect loop.
    pub(crate) async fn try_reconnect(
        self: &Arc<Self>,
        cancel: &CancellationToken,
    ) -> ReconnectOutcome {
        let _lifecycle = self.lifecycle.lock().await;

        if cancel.is_cancelled() {
            return ReconnectOutcome::Stopped;
        }
        {
            let state = self.state.lock();
            if state.stopped || state.connection.is_connected() {
                return ReconnectOutcome::Stopped;
            }
        }

        match self.connect_once(true).await {
            Ok(()) => ReconnectOutcome::Connected,
            Err(e) => ReconnectOutcome::Failed(e),
        }
    }

    /// Tear down after the session of `generation` failed underneath us.
    ///
    /// Ignored if that session is no longer current or an explicit disconnect
    /// already took over.
    pub(crate) async fn handle_disconnect(self: &Arc<Self>, generation: u64) {
        let (session, reconnect, released) = {
            let mut state = self.state.lock();
            if state.generation != generation || !state.connection.is_connected() {
                return;
            }

            let reconnect = self.config.auto_reconnect && !state.stopped;
            state.connection = if reconnect {
                ConnectionState::Reconnecting
            } else {
                ConnectionState::Disconnected
            };
            state.subscribed = false;
            let released = state.pending.fail_all("Connection to daemon lost");
            (state.session.take(), reconnect, released)
        };

        warn!("Connection to daemon lost");
        if released > 0 {
            warn!("Released {released} pending command(s) after connection loss");
        }

        if let Some(session) = session {
            session.close().await;
        }

        self.callbacks.emit_connection(false);

        if reconnect {
            info!(
                "Reconnecting to daemon every {:?}",
                self.config.reconnect_delay()
            );
            let handle = reconnect::spawn(Arc::downgrade(self), self.config.reconnect_delay());
            let previous = self
                .reconnect
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .replace(handle);
            if let Some(previous) = previous {
                if !previous.is_finished() {
                    previous.cancel();
                }
            }
        }
    }
}
