//! Mutable client state shared by the caller, receive-loop and reconnect tasks.
//!
//! Everything sits behind one `std::sync::Mutex`. Critical sections only touch
//! the fields below; no guard is ever held across an `.await`.

use crate::ipc::connection_state::ConnectionState;
use crate::ipc::correlation::CorrelationTable;
use crate::ipc::session::TransportSession;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Default)]
pub(crate) struct ClientState {
    pub(crate) connection: ConnectionState,

    /// True after a successful `Subscribe` send on the current session.
    pub(crate) subscribed: bool,

    /// Set by an explicit `disconnect()`; stops reconnect attempts.
    pub(crate) stopped: bool,

    /// Bumped for every new session so a stale receive loop cannot tear down its successor.
    pub(crate) generation: u64,

    pub(crate) session: Option<Arc<TransportSession>>,

    pub(crate) pending: CorrelationTable,
}

impl ClientState {
    /// The live session and its generation, if connected.
    pub(crate) fn live_session(&self) -> Option<(Arc<TransportSession>, u64)> {
        match (&self.connection, &self.session) {
            (ConnectionState::Connected, Some(session)) => {
                Some((Arc::clone(session), self.generation))
            }
            _ => None,
        }
    }
}

#[derive(Default)]
pub(crate) struct SharedState {
    inner: Mutex<ClientState>,
}

impl SharedState {
    /// Lock the state. A panic in another holder does not leave the fields
    /// half-updated in a way that matters here, so poisoning is ignored.
    pub(crate) fn lock(&self) -> MutexGuard<'_, ClientState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
