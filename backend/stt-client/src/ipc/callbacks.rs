//! User callbacks for streamed events.
//!
//! One slot per event category. Callbacks run on the receive-loop task with no
//! client lock held; a panicking callback is logged and swallowed.

use crate::protocol::events::{StatusSnapshot, TranscriptionResult};

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, PoisonError, RwLock};

use log::error;

pub type TranscriptionCallback = Arc<dyn Fn(TranscriptionResult) + Send + Sync>;
pub type StatusCallback = Arc<dyn Fn(StatusSnapshot) + Send + Sync>;
pub type ErrorCallback = Arc<dyn Fn(String) + Send + Sync>;
pub type ConnectionCallback = Arc<dyn Fn(bool) + Send + Sync>;

#[derive(Default)]
pub(crate) struct CallbackRegistry {
    transcription: RwLock<Option<TranscriptionCallback>>,
    status: RwLock<Option<StatusCallback>>,
    error: RwLock<Option<ErrorCallback>>,
    connection: RwLock<Option<ConnectionCallback>>,
}

impl CallbackRegistry {
    pub(crate) fn set_transcription(&self, callback: TranscriptionCallback) {
        *self
            .transcription
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(callback);
    }

    pub(crate) fn set_status(&self, callback: StatusCallback) {
        *self.status.write().unwrap_or_else(PoisonError::into_inner) = Some(callback);
    }

    pub(crate) fn set_error(&self, callback: ErrorCallback) {
        *self.error.write().unwrap_or_else(PoisonError::into_inner) = Some(callback);
    }

    pub(crate) fn set_connection(&self, callback: ConnectionCallback) {
        *self
            .connection
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(callback);
    }

    pub(crate) fn has_transcription(&self) -> bool {
        self.transcription
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Returns false when no transcription callback is registered.
    pub(crate) fn emit_transcription(&self, result: TranscriptionResult) -> bool {
        invoke("transcription", snapshot(&self.transcription), result)
    }

    pub(crate) fn emit_status(&self, status: StatusSnapshot) -> bool {
        invoke("status", snapshot(&self.status), status)
    }

    pub(crate) fn emit_error(&self, message: String) -> bool {
        invoke("error", snapshot(&self.error), message)
    }

    pub(crate) fn emit_connection(&self, connected: bool) -> bool {
        invoke("connection", snapshot(&self.connection), connected)
    }
}

/// Clone the callback out so the slot lock is released before it runs.
fn snapshot<T: ?Sized>(slot: &RwLock<Option<Arc<T>>>) -> Option<Arc<T>> {
    slot.read().unwrap_or_else(PoisonError::into_inner).clone()
}

fn invoke<T>(kind: &str, callback: Option<Arc<dyn Fn(T) + Send + Sync>>, value: T) -> bool {
    let Some(callback) = callback else {
        return false;
    };

    if catch_unwind(AssertUnwindSafe(|| callback(value))).is_err() {
        error!("The {kind} callback panicked; event dropped");
    }
    true
}
