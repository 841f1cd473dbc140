//! Debounced trigger
//!
//! Collapses bursts of change events into one run. Every [`schedule`] call
//! cancels the run still waiting out its quiet period and starts a new timer;
//! the job only runs once no new call arrives for the whole delay.
//!
//! [`schedule`]: DebouncedTrigger::schedule

use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::debug;

struct PendingRun {
    cancel: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// A cancellable delayed task, reset on every new event
pub struct DebouncedTrigger {
    delay: Duration,
    pending: Mutex<Option<PendingRun>>,
}

impl DebouncedTrigger {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Schedules `job` to run after the quiet period, superseding any run
    /// still waiting
    ///
    /// A job that has already started is left to finish. Must be called from
    /// within a tokio runtime.
    pub fn schedule<F, Fut>(&self, job: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut pending = self.lock_pending();
        if let Some(previous) = pending.take() {
            // Fails only if the previous run already fired
            let _ = previous.cancel.send(());
        }

        let (cancel, cancelled) = oneshot::channel();
        let delay = self.delay;
        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(delay) => job().await,
                _ = cancelled => debug!("Scheduled run superseded"),
            }
        });

        *pending = Some(PendingRun { cancel, handle });
    }

    /// Cancels the waiting run, if any
    ///
    /// Returns true if a run was waiting or in progress when called.
    pub fn cancel(&self) -> bool {
        match self.lock_pending().take() {
            Some(run) => {
                let active = !run.handle.is_finished();
                let _ = run.cancel.send(());
                active
            }
            None => false,
        }
    }

    /// Returns true while a run is waiting or in progress
    pub fn is_pending(&self) -> bool {
        self.lock_pending()
            .as_ref()
            .is_some_and(|run| !run.handle.is_finished())
    }

    fn lock_pending(&self) -> MutexGuard<'_, Option<PendingRun>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for DebouncedTrigger {
    fn drop(&mut self) {
        if let Some(run) = self.lock_pending().take() {
            let _ = run.cancel.send(());
        }
    }
}
