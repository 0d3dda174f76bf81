//! Handle to a supervised background task.
//!
//! The receive loop and the reconnect loop each run as a tokio task paired with
//! a [`CancellationToken`]. Cancelling asks the task to stop at its next await
//! point; [`TaskHandle::join`] additionally waits for it, bounded.

use std::time::Duration;

use log::warn;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub(crate) struct TaskHandle {
    name: &'static str,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl TaskHandle {
    pub(crate) fn new(name: &'static str, cancel: CancellationToken, task: JoinHandle<()>) -> Self {
        Self { name, cancel, task }
    }

    pub(crate) fn cancel(&self) {
        self.cancel.cancel();
    }

    pub(crate) fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancel and wait up to `timeout` for the task to exit.
    ///
    /// A task still running after the bound is aborted. Returns true if it
    /// exited on its own.
    pub(crate) async fn join(mut self, timeout: Duration) -> bool {
        self.cancel.cancel();

        match tokio::time::timeout(timeout, &mut self.task).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!("{} task ended abnormally: {e}", self.name);
                true
            }
            Err(_) => {
                warn!(
                    "{} task did not stop within {timeout:?}; aborting it",
                    self.name
                );
                self.task.abort();
                false
            }
        }
    }
}
