//! TTL-bound shared cache for impersonated-run states.
//!
//! Hands state off between the enqueue call and later poll calls. Writes are
//! single-writer per run and polling is read-only, so a plain `RwLock` map
//! is sufficient; expired slots read as absent.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// State of one impersonated run, keyed by target user id.
///
/// Transitions: `Queued → Running → {Completed | Failed}`. There is no
/// server-side `Cancelled`; giving up is a caller-side concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    /// Accepted, privileged run not yet started.
    Queued { job_id: Uuid },
    /// Privileged run in progress.
    Running { job_id: Uuid },
    /// Terminal: serialized `ExecutionResult`.
    Completed { payload: String },
    /// Terminal: sanitized error message.
    Failed { message: String },
}

impl RunState {
    /// True for the `Completed` and `Failed` states.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed { .. } | Self::Failed { .. })
    }
}

struct Slot {
    state: RunState,
    stored_at: Instant,
}

/// Shared run-state cache with a fixed time-to-live.
pub struct RunStateCache {
    ttl: Duration,
    slots: RwLock<HashMap<String, Slot>>,
}

impl RunStateCache {
    /// Creates a cache whose entries expire after `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slots: RwLock::new(HashMap::new()),
        }
    }

    /// Stores the state for a target user, overwriting any prior entry.
    ///
    /// Stale entries for other targets are pruned opportunistically here,
    /// keeping reads lock-light.
    pub fn put(&self, target_user_id: &str, state: RunState) {
        let now = Instant::now();
        let mut slots = self
            .slots
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        slots.retain(|_, slot| now.duration_since(slot.stored_at) < self.ttl);
        slots.insert(
            target_user_id.to_string(),
            Slot {
                state,
                stored_at: now,
            },
        );
    }

    /// Reads the state for a target user; expired entries read as absent.
    pub fn get(&self, target_user_id: &str) -> Option<RunState> {
        let slots = self
            .slots
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let slot = slots.get(target_user_id)?;
        if slot.stored_at.elapsed() >= self.ttl {
            return None;
        }
        Some(slot.state.clone())
    }
}
