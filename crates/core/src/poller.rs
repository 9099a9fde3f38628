//! Spawn/stop/join plumbing shared by the two sensor pollers.

use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

/// A background task that runs `tick` once per interval until stopped.
///
/// The stop signal is observed inside the inter-poll sleep, so a sleeping
/// poller exits immediately rather than after a full interval. `stop()`
/// awaits the task, making shutdown ordering deterministic for the caller.
pub(crate) struct PollTask {
    stop_tx: watch::Sender<bool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl PollTask {
    pub(crate) fn spawn<F>(name: &'static str, interval: Duration, mut tick: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            debug!(task = name, interval_ms = interval.as_millis() as u64, "poller running");
            loop {
                tick();
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {}
                    _ = stop_rx.changed() => break,
                }
            }
            debug!(task = name, "poller exited");
        });

        Self {
            stop_tx,
            handle: Mutex::new(Some(handle)),
        }
    }

    /// Signal the task to stop and wait for it to exit. Idempotent.
    pub(crate) async fn stop(&self) {
        let _ = self.stop_tx.send(true);
        let handle = self.handle.lock().expect("lock poisoned").take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}
