//! Impersonated-execution orchestration.
//!
//! Verifies access-control behavior by running a query as another identity.
//! An impersonated run cannot happen synchronously inside the caller's own
//! execution context, so enqueueing schedules the privileged run out of
//! band and persists its outcome in a TTL-bound cache keyed by the target
//! user id; completion is observed only through the poll accessor.

mod cache;
mod watcher;

pub use cache::{RunState, RunStateCache};
pub use watcher::{spawn_watch, PollHandle, WatchEvent, WatchOptions, WatcherSet};

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::directory::Directory;
use crate::error::{Result, VantageError};
use crate::gateway::{ExecutionGateway, ExecutionResult, GatewayRequest, ParameterBindings};

/// Longest sanitized message stored in the cache.
const MAX_SANITIZED_LEN: usize = 200;

/// Synchronous outcome of an enqueue call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnqueueReceipt {
    pub accepted: bool,
    pub job_id: Uuid,
    pub message: String,
}

/// Poll outcome for a target user.
#[derive(Debug, Clone, PartialEq)]
pub enum PollState {
    /// No terminal state yet (queued, running, missing, or expired).
    NotReady,
    /// The impersonated run completed.
    Completed(ExecutionResult),
    /// The impersonated run failed; the message is already sanitized.
    Failed { message: String },
}

/// Orchestrates impersonated runs against the execution gateway.
pub struct Orchestrator {
    gateway: Arc<dyn ExecutionGateway>,
    directory: Arc<dyn Directory>,
    cache: Arc<RunStateCache>,
}

impl Orchestrator {
    /// Creates an orchestrator with the given cache TTL.
    pub fn new(
        gateway: Arc<dyn ExecutionGateway>,
        directory: Arc<dyn Directory>,
        cache_ttl: Duration,
    ) -> Self {
        Self {
            gateway,
            directory,
            cache: Arc::new(RunStateCache::new(cache_ttl)),
        }
    }

    /// Enqueues a privileged run of a query configuration as the target
    /// user.
    ///
    /// Fails synchronously with `Permission` when the caller lacks
    /// impersonation rights, `NotFound` for unknown or inactive targets and
    /// configurations, and `Validation` for malformed bindings; none of
    /// these are retried. On success the state transitions to `Queued`, a
    /// background task drives it to `Running` and then a terminal state,
    /// and a second enqueue for the same target overwrites the first.
    pub fn enqueue_impersonated_execution(
        &self,
        target_user_key: &str,
        config_id: &str,
        bindings_json: &str,
    ) -> Result<EnqueueReceipt> {
        let caller = self.directory.caller();
        if !caller.can_impersonate {
            return Err(VantageError::permission(format!(
                "User '{}' may not run queries as another user",
                caller.name
            )));
        }

        let target = self
            .directory
            .user(target_user_key)
            .ok_or_else(|| VantageError::not_found(format!("User '{target_user_key}'")))?;
        if !target.active {
            return Err(VantageError::not_found(format!(
                "User '{}' is inactive",
                target.name
            )));
        }

        let config = self
            .directory
            .query_config(config_id)
            .ok_or_else(|| VantageError::not_found(format!("Query configuration '{config_id}'")))?;
        if !config.active {
            return Err(VantageError::not_found(format!(
                "Query configuration '{config_id}' is inactive"
            )));
        }

        let bindings = ParameterBindings::parse(bindings_json)?;

        let job_id = Uuid::new_v4();
        let target_user_id = target.id.clone();
        let target_name = target.name.clone();
        self.cache.put(&target_user_id, RunState::Queued { job_id });
        info!(%job_id, target = %target_user_id, config = %config.id, "Impersonated run queued");

        let request = GatewayRequest {
            config_id: Some(config.id.clone()),
            bindings_json: Some(bindings.to_json()),
            query_override: None,
            run_as_user_id: Some(target_user_id.clone()),
        };
        self.spawn_run(job_id, target_user_id, request);

        Ok(EnqueueReceipt {
            accepted: true,
            job_id,
            message: format!("Impersonated run queued for {target_name}"),
        })
    }

    fn spawn_run(&self, job_id: Uuid, target_user_id: String, request: GatewayRequest) {
        let gateway = Arc::clone(&self.gateway);
        let cache = Arc::clone(&self.cache);

        tokio::spawn(async move {
            cache.put(&target_user_id, RunState::Running { job_id });

            let terminal = match gateway.execute(&request).await {
                Ok(response) => match response.into_result() {
                    Ok(result) => serialize_result(&result),
                    Err(message) => {
                        warn!(%job_id, "Impersonated run failed: {message}");
                        RunState::Failed {
                            message: sanitize_error(&message),
                        }
                    }
                },
                Err(e) => {
                    warn!(%job_id, "Impersonated run transport failure: {e}");
                    RunState::Failed {
                        message: sanitize_error(&e.to_string()),
                    }
                }
            };

            debug!(%job_id, target = %target_user_id, "Impersonated run finished");
            cache.put(&target_user_id, terminal);
        });
    }

    /// Polls the state for a target user id.
    ///
    /// Missing and TTL-expired entries poll as `NotReady`; the caller-side
    /// attempt cap is what turns indefinite `NotReady` into a timeout.
    pub fn poll_execution_state(&self, target_user_id: &str) -> PollState {
        match self.cache.get(target_user_id) {
            None | Some(RunState::Queued { .. }) | Some(RunState::Running { .. }) => {
                PollState::NotReady
            }
            Some(RunState::Completed { payload }) => match serde_json::from_str(&payload) {
                Ok(result) => PollState::Completed(result),
                Err(_) => PollState::Failed {
                    message: "Stored result could not be decoded".to_string(),
                },
            },
            Some(RunState::Failed { message }) => PollState::Failed { message },
        }
    }
}

fn serialize_result(result: &ExecutionResult) -> RunState {
    match serde_json::to_string(result) {
        Ok(payload) => RunState::Completed { payload },
        Err(_) => RunState::Failed {
            message: "Result could not be stored".to_string(),
        },
    }
}

/// Reduces an execution-time error to a short human-readable string.
///
/// Takes the first line, strips leading exception-class or category
/// prefixes (`System.QueryException:`, `Gateway error:`), and caps the
/// length. Raw internal detail never reaches the poller.
pub fn sanitize_error(raw: &str) -> String {
    let first_line = raw.lines().next().unwrap_or("").trim();

    let mut message = first_line;
    loop {
        let Some((prefix, rest)) = message.split_once(':') else {
            break;
        };
        let prefix = prefix.trim();
        let lowered = prefix.to_ascii_lowercase();
        let class_like = !prefix.is_empty()
            && prefix
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == ' ')
            && (lowered.ends_with("exception") || lowered.ends_with("error"));
        if !class_like {
            break;
        }
        message = rest.trim_start();
    }

    if message.is_empty() {
        return "The impersonated run failed".to_string();
    }

    let mut capped: String = message.chars().take(MAX_SANITIZED_LEN).collect();
    if capped.len() < message.len() {
        capped.push_str("...");
    }
    capped
}
