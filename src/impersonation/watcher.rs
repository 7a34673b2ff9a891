//! Caller-side poll loop for impersonated runs.
//!
//! Polls the orchestrator on a fixed interval for a bounded number of
//! attempts. The handle owns a cancellation token and the task, so teardown
//! deterministically stops the loop; the background run itself is never
//! forcibly cancelled.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use super::{Orchestrator, PollState};
use crate::config::ImpersonationConfig;
use crate::gateway::ExecutionResult;

/// Polling knobs for one watch.
#[derive(Debug, Clone, Copy)]
pub struct WatchOptions {
    /// Fixed interval between polls.
    pub poll_interval: Duration,
    /// Attempts before the watch gives up.
    pub max_polls: u32,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(2),
            max_polls: 30,
        }
    }
}

impl WatchOptions {
    /// Builds options from the `[impersonation]` config section.
    pub fn from_config(config: &ImpersonationConfig) -> Self {
        Self {
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            max_polls: config.max_polls,
        }
    }
}

/// Terminal outcome of a watch.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchEvent {
    /// The impersonated run completed.
    Completed(ExecutionResult),
    /// The impersonated run failed with a sanitized message.
    Failed { message: String },
    /// The attempt cap was exhausted with no terminal state. The outcome is
    /// indeterminate, not negative; the background run keeps going.
    TimedOut,
    /// The watch was cancelled before a terminal state.
    Cancelled,
}

/// Handle to a running watch.
///
/// Dropping the handle cancels the token and aborts the poll task, so no
/// event can be delivered to a consumer that no longer exists.
pub struct PollHandle {
    cancel: CancellationToken,
    task: Option<JoinHandle<WatchEvent>>,
}

impl PollHandle {
    /// Requests cancellation without consuming the handle.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A clone of the watch's cancellation token.
    pub fn token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Waits for the watch to finish and returns its terminal event.
    pub async fn join(mut self) -> WatchEvent {
        match self.task.take() {
            Some(task) => task.await.unwrap_or(WatchEvent::Cancelled),
            None => WatchEvent::Cancelled,
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

/// Spawns a watch that polls the orchestrator for a target user until a
/// terminal state, the attempt cap, or cancellation.
pub fn spawn_watch(
    orchestrator: Arc<Orchestrator>,
    target_user_id: &str,
    options: WatchOptions,
) -> PollHandle {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    let target = target_user_id.to_string();

    let task = tokio::spawn(async move {
        // First poll happens one full interval after enqueue
        let mut ticker = tokio::time::interval_at(
            Instant::now() + options.poll_interval,
            options.poll_interval,
        );

        for attempt in 1..=options.max_polls {
            tokio::select! {
                biased;

                _ = token.cancelled() => {
                    trace!(target = %target, attempt, "Watch cancelled");
                    return WatchEvent::Cancelled;
                }
                _ = ticker.tick() => {}
            }

            match orchestrator.poll_execution_state(&target) {
                PollState::NotReady => {
                    trace!(target = %target, attempt, "Run not ready");
                }
                PollState::Completed(result) => return WatchEvent::Completed(result),
                PollState::Failed { message } => return WatchEvent::Failed { message },
            }
        }

        WatchEvent::TimedOut
    });

    PollHandle {
        cancel,
        task: Some(task),
    }
}

/// At most one live watch per target key.
///
/// Starting a watch for a target that already has one cancels the old loop
/// first, so a terminal state is never delivered twice.
#[derive(Default)]
pub struct WatcherSet {
    active: HashMap<String, CancellationToken>,
}

impl WatcherSet {
    /// Creates an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a watch for a target, cancelling any prior watch on the same
    /// key.
    pub fn start(
        &mut self,
        orchestrator: Arc<Orchestrator>,
        target_user_id: &str,
        options: WatchOptions,
    ) -> PollHandle {
        if let Some(previous) = self.active.remove(target_user_id) {
            previous.cancel();
        }
        let handle = spawn_watch(orchestrator, target_user_id, options);
        self.active.insert(target_user_id.to_string(), handle.token());
        handle
    }

    /// Cancels the watch for a target, if one is live.
    pub fn cancel(&mut self, target_user_id: &str) -> bool {
        match self.active.remove(target_user_id) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Cancels every live watch.
    pub fn cancel_all(&mut self) {
        for (_, token) in self.active.drain() {
            token.cancel();
        }
    }
}

impl Drop for WatcherSet {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
