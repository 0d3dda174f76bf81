//! Reconnect loop run after an unexpected disconnect.
//!
//! Retries on a fixed interval until a connection is re-established or the
//! run is cancelled by `disconnect()`. Subscription restore happens inside the
//! client's connect path.

use crate::error::client::ClientError;
use crate::ipc::client::ClientInner;
use crate::ipc::handle::TaskHandle;

use std::sync::Weak;
use std::time::Duration;

use backoff::backoff::{Backoff, Constant};
use log::{debug, info};
use tokio::time::sleep as TokioSleep;
use tokio_util::sync::CancellationToken;

/// Result of one reconnect attempt.
pub(crate) enum ReconnectOutcome {
    Connected,
    /// Nothing left to do: stopped explicitly, or someone else already connected.
    Stopped,
    Failed(ClientError),
}

pub(crate) fn spawn(client: Weak<ClientInner>, delay: Duration) -> TaskHandle {
    let cancel = CancellationToken::new();
    let task = tokio::spawn(reconnect_loop(client, delay, cancel.clone()));
    TaskHandle::new("Reconnect", cancel, task)
}

async fn reconnect_loop(client: Weak<ClientInner>, delay: Duration, cancel: CancellationToken) {
    let mut backoff = Constant::new(delay);
    let mut attempt: u32 = 0;

    loop {
        let wait = backoff.next_backoff().unwrap_or(delay);

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!("Reconnect cancelled after {attempt} attempt(s)");
                return;
            }
            _ = TokioSleep(wait) => {}
        }

        let Some(client) = client.upgrade() else {
            debug!("Client dropped; reconnect loop exiting");
            return;
        };

        attempt += 1;
        match client.try_reconnect(&cancel).await {
            ReconnectOutcome::Connected => {
                info!("Reconnected to daemon after {attempt} attempt(s)");
                return;
            }
            ReconnectOutcome::Stopped => {
                debug!("Reconnect no longer needed");
                return;
            }
            ReconnectOutcome::Failed(e) => {
                debug!("Reconnect attempt {attempt} failed: {e}");
            }
        }
    }
}
