//! Idle detection for interactive sessions.
//!
//! One tracker per process owns a cancellable timer task. Every observed
//! input event pushes the deadline out by the configured timeout; once the
//! deadline passes with no input the tracker reports idle until the next event.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Kinds of user input that count as activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    Key,
    Pointer,
    Touch,
}

#[derive(Debug)]
pub struct ActivityTracker {
    timeout: Duration,
    activity: Arc<Notify>,
    idle: watch::Receiver<bool>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ActivityTracker {
    /// Start the timer task. Must be called inside a tokio runtime.
    pub fn spawn(timeout: Duration) -> Self {
        let activity = Arc::new(Notify::new());
        let (idle_tx, idle_rx) = watch::channel(false);
        let cancel = CancellationToken::new();

        let task = tokio::spawn(run_timer(
            timeout,
            Arc::clone(&activity),
            idle_tx,
            cancel.clone(),
        ));

        Self {
            timeout,
            activity,
            idle: idle_rx,
            cancel,
            task,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Reset the idle deadline.
    pub fn record(&self, event: InputEvent) {
        tracing::trace!("Activity: {:?}", event);
        self.activity.notify_one();
    }

    pub fn is_idle(&self) -> bool {
        *self.idle.borrow()
    }

    /// Resolve once the tracker reports idle. Returns immediately if it
    /// already does, and never resolves after shutdown.
    pub async fn idle(&self) {
        let mut idle = self.idle.clone();
        if idle.wait_for(|idle| *idle).await.is_err() {
            std::future::pending::<()>().await;
        }
    }

    /// Stop the timer task and wait for it to exit.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            tracing::warn!("Activity timer task failed: {}", e);
        }
    }
}

async fn run_timer(
    timeout: Duration,
    activity: Arc<Notify>,
    idle: watch::Sender<bool>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = activity.notified() => {
                idle.send_if_modified(|idle| std::mem::replace(idle, false));
            }
            _ = tokio::time::sleep(timeout), if !*idle.borrow() => {
                tracing::info!("No input for {:?}, session idle", timeout);
                idle.send_replace(true);
            }
        }
    }
    tracing::debug!("Activity timer stopped");
}
