//! Matches command acknowledgments to the callers waiting on them.
//!
//! Each request id lives in the table from registration until it is retired,
//! either by a reply or by its waiter timing out. Whichever happens first wins;
//! the other finds nothing and is a no-op.

use crate::error::client::ClientError;

use common::ErrorLocation;

use std::collections::HashMap;
use std::panic::Location;
use std::time::{Duration, Instant};

use log::{debug, trace};
use serde_json::{Map, Value};
use tokio::sync::oneshot;

/// What a waiter eventually receives: the acknowledgment `data`, or why there is none.
pub(crate) type Reply = Result<Map<String, Value>, ClientError>;

pub(crate) struct PendingRequest {
    action: String,
    deadline: Instant,
    sender: oneshot::Sender<Reply>,
}

#[derive(Default)]
pub(crate) struct CorrelationTable {
    pending: HashMap<String, PendingRequest>,
}

impl CorrelationTable {
    /// Start tracking `id` and hand back the waiter for it.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::DuplicateRequestId`] if `id` is already in flight.
    pub(crate) fn register(
        &mut self,
        id: &str,
        action: &str,
        timeout: Duration,
    ) -> Result<Waiter, ClientError> {
        if self.pending.contains_key(id) {
            return Err(ClientError::DuplicateRequestId {
                id: id.to_string(),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let (sender, receiver) = oneshot::channel();
        self.pending.insert(
            id.to_string(),
            PendingRequest {
                action: action.to_string(),
                deadline: Instant::now() + timeout,
                sender,
            },
        );

        Ok(Waiter {
            id: id.to_string(),
            receiver,
        })
    }

    /// Deliver `reply` to the waiter for `id` and retire it.
    ///
    /// Returns false when `id` is unknown, e.g. a reply arriving after its waiter
    /// already timed out.
    pub(crate) fn resolve(&mut self, id: &str, reply: Reply) -> bool {
        let Some(request) = self.pending.remove(id) else {
            return false;
        };

        let now = Instant::now();
        if now > request.deadline {
            debug!(
                "Reply for '{}' (id={id}) arrived {:?} past its deadline",
                request.action,
                now - request.deadline
            );
        } else {
            trace!(
                "Resolved '{}' (id={id}) with {:?} to spare",
                request.action,
                request.deadline - now
            );
        }

        // Receiver gone means the waiter was dropped; nothing left to notify.
        let _ = request.sender.send(reply);
        true
    }

    /// Stop tracking `id` without delivering anything.
    pub(crate) fn retire(&mut self, id: &str) -> bool {
        self.pending.remove(id).is_some()
    }

    /// Release every waiter with a `ConnectionLost` error; returns how many there were.
    #[track_caller]
    pub(crate) fn fail_all(&mut self, reason: &str) -> usize {
        let location = ErrorLocation::from(Location::caller());
        let count = self.pending.len();

        for (id, request) in self.pending.drain() {
            trace!("Failing pending '{}' (id={id}): {reason}", request.action);
            let _ = request.sender.send(Err(ClientError::ConnectionLost {
                message: format!("{reason} while waiting for '{}'", request.action),
                location,
            }));
        }

        count
    }

    pub(crate) fn len(&self) -> usize {
        self.pending.len()
    }
}

/// The caller's end of a pending request.
pub(crate) struct Waiter {
    id: String,
    receiver: oneshot::Receiver<Reply>,
}

impl Waiter {
    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    /// Wait for the reply, giving up after `timeout`.
    ///
    /// On timeout `retire` is asked to drop the table entry. If it reports the
    /// entry already gone, a reply won the race and is returned instead of the
    /// timeout, so each id is settled exactly once.
    pub(crate) async fn wait<F>(mut self, timeout: Duration, action: &str, retire: F) -> Reply
    where
        F: FnOnce(&str) -> bool,
    {
        match tokio::time::timeout(timeout, &mut self.receiver).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => Err(ClientError::connection_lost(format!(
                "Reply channel for '{action}' closed"
            ))),
            Err(_) => {
                if retire(&self.id) {
                    debug!("Command '{action}' (id={}) timed out after {timeout:?}", self.id);
                    return Err(ClientError::CommandTimeout {
                        action: action.to_string(),
                        timeout,
                        location: ErrorLocation::from(Location::caller()),
                    });
                }

                match self.receiver.try_recv() {
                    Ok(reply) => reply,
                    Err(_) => Err(ClientError::connection_lost(format!(
                        "Reply channel for '{action}' closed"
                    ))),
                }
            }
        }
    }
}
