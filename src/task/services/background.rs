//! Periodic background jobs with cooperative shutdown.

use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

const MIN_PERIOD: Duration = Duration::from_millis(1);

/// When the first cycle of a periodic job runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartMode {
    /// Run a cycle as soon as the job starts.
    Immediately,
    /// Wait one full interval before the first cycle.
    AfterInterval,
}

/// Runs `cycle` every `interval` until `cancel` fires.
///
/// Cancellation is checked between cycles, so a cycle that has started
/// always runs to completion before this function returns.
pub async fn run_periodic<F, Fut>(
    name: &'static str,
    interval: Duration,
    cancel: CancellationToken,
    start: StartMode,
    mut cycle: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = ()>,
{
    let mut ticker = tokio::time::interval(interval.max(MIN_PERIOD));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    // The first tick completes immediately.
    if start == StartMode::AfterInterval {
        ticker.tick().await;
    }
    tracing::info!(job = name, interval_ms = interval.as_millis(), "background job started");

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => cycle().await,
        }
    }

    tracing::info!(job = name, "background job stopped");
}

/// Background jobs sharing one cancellation token.
#[derive(Debug, Default)]
pub struct BackgroundJobs {
    cancel: CancellationToken,
    handles: Vec<(&'static str, JoinHandle<()>)>,
}

impl BackgroundJobs {
    /// Creates an empty job set with a fresh token.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a clone of the shared cancellation token.
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Tracks a spawned job under `name`.
    pub fn push(&mut self, name: &'static str, handle: JoinHandle<()>) {
        self.handles.push((name, handle));
    }

    /// Returns the number of tracked jobs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    /// Returns `true` when no job is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Cancels every job and waits for each to finish its current cycle.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for (name, handle) in self.handles {
            if let Err(err) = handle.await {
                tracing::error!(job = name, error = %err, "background job aborted");
            }
        }
    }
}
