//! Client side of the daemon's Unix-socket IPC.
//!
//! # Architecture
//!
//! - [`SttClient`] is the public handle; clones share one connection
//! - a `TransportSession` owns one socket and serializes writes to it
//! - the receive loop is the only reader and routes replies and events
//! - the correlation table pairs acknowledgments with waiting commands
//! - the reconnect loop retries on a fixed interval after a connection loss
//!
//! # Lifecycle
//!
//! See [`ConnectionState`] for the state machine.

mod callbacks;
mod client;
mod connection_state;
mod correlation;
mod dispatcher;
mod handle;
mod reconnect;
mod session;
mod state;

pub use callbacks::{ConnectionCallback, ErrorCallback, StatusCallback, TranscriptionCallback};
pub use client::SttClient;
pub use connection_state::ConnectionState;

#[cfg(test)]
pub(crate) use callbacks::CallbackRegistry;
#[cfg(test)]
pub(crate) use client::interpret_reply;
#[cfg(test)]
pub(crate) use correlation::CorrelationTable;
#[cfg(test)]
pub(crate) use dispatcher::{handle_frame, route};
#[cfg(test)]
pub(crate) use state::SharedState;
