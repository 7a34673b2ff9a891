//! Impersonation orchestration integration tests.
//!
//! Drives the enqueue/poll protocol end to end over the mock gateway:
//! liveness, sanitization, overwrite-per-target, TTL expiry, and watcher
//! replacement.

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;

use db_vantage::gateway::MockGateway;
use db_vantage::impersonation::{spawn_watch, PollState, WatchEvent, WatchOptions, WatcherSet};

use super::common::{test_orchestrator, test_orchestrator_with_ttl};

fn quick_options() -> WatchOptions {
    WatchOptions {
        poll_interval: Duration::from_millis(10),
        max_polls: 100,
    }
}

#[tokio::test]
async fn liveness_terminal_state_within_attempt_cap() {
    let orchestrator = test_orchestrator(MockGateway::with_demo_data(), "admin");
    orchestrator
        .enqueue_impersonated_execution("jo", "accounts", "{}")
        .unwrap();

    let handle = spawn_watch(Arc::clone(&orchestrator), "005-jo", quick_options());
    match handle.join().await {
        WatchEvent::Completed(result) => {
            assert_eq!(result.record_count, 3);
            assert_eq!(result.fields.len(), 4);
        }
        other => panic!("expected completion within the attempt cap, got {other:?}"),
    }
}

#[tokio::test]
async fn liveness_timeout_when_nothing_enqueued() {
    // With no enqueue the watch must time out, and only time out
    let orchestrator = test_orchestrator(MockGateway::with_demo_data(), "admin");
    let handle = spawn_watch(
        Arc::clone(&orchestrator),
        "005-jo",
        WatchOptions {
            poll_interval: Duration::from_millis(5),
            max_polls: 4,
        },
    );
    assert_eq!(handle.join().await, WatchEvent::TimedOut);
    assert_eq!(
        orchestrator.poll_execution_state("005-jo"),
        PollState::NotReady
    );
}

#[tokio::test]
async fn denied_access_surfaces_sanitized_failure() {
    let mut gateway = MockGateway::with_demo_data();
    gateway.deny_user(
        "005-jo",
        "System.SecurityException: Insufficient access to object Account\n  at QueryRunner.run",
    );
    let orchestrator = test_orchestrator(gateway, "admin");
    orchestrator
        .enqueue_impersonated_execution("jo", "accounts", "{}")
        .unwrap();

    let handle = spawn_watch(Arc::clone(&orchestrator), "005-jo", quick_options());
    match handle.join().await {
        WatchEvent::Failed { message } => {
            assert_eq!(message, "Insufficient access to object Account");
            // No raw exception type names or stack frames reach the poller
            assert!(!message.contains("Exception"));
            assert!(!message.contains("at QueryRunner"));
        }
        other => panic!("expected a failed run, got {other:?}"),
    }
}

#[tokio::test]
async fn enqueue_failures_are_synchronous() {
    let orchestrator = test_orchestrator(MockGateway::with_demo_data(), "jo");

    // Caller without elevation rights
    let err = orchestrator
        .enqueue_impersonated_execution("admin", "accounts", "{}")
        .unwrap_err();
    assert_eq!(err.category(), "Permission Error");

    let orchestrator = test_orchestrator(MockGateway::with_demo_data(), "admin");

    // Unknown target, unknown config, malformed bindings
    assert_eq!(
        orchestrator
            .enqueue_impersonated_execution("nobody", "accounts", "{}")
            .unwrap_err()
            .category(),
        "Not Found"
    );
    assert_eq!(
        orchestrator
            .enqueue_impersonated_execution("jo", "unknown", "{}")
            .unwrap_err()
            .category(),
        "Not Found"
    );
    assert_eq!(
        orchestrator
            .enqueue_impersonated_execution("jo", "accounts", "{bad")
            .unwrap_err()
            .category(),
        "Validation Error"
    );
}

#[tokio::test]
async fn second_enqueue_overwrites_prior_state() {
    let mut gateway = MockGateway::with_demo_data();
    gateway.deny_user("005-jo", "Access denied");
    let orchestrator = test_orchestrator(gateway, "admin");

    orchestrator
        .enqueue_impersonated_execution("jo", "accounts", "{}")
        .unwrap();
    let first = spawn_watch(Arc::clone(&orchestrator), "005-jo", quick_options())
        .join()
        .await;
    assert!(matches!(first, WatchEvent::Failed { .. }));

    // The failed terminal state is replaced, not appended to
    let receipt = orchestrator
        .enqueue_impersonated_execution("jo", "accounts", "{}")
        .unwrap();
    assert!(receipt.accepted);
    let second = spawn_watch(Arc::clone(&orchestrator), "005-jo", quick_options())
        .join()
        .await;
    assert!(matches!(second, WatchEvent::Failed { .. }));
}

#[tokio::test]
async fn ttl_expiry_polls_as_not_ready() {
    let orchestrator = test_orchestrator_with_ttl(
        MockGateway::with_demo_data(),
        "admin",
        Duration::from_millis(50),
    );
    orchestrator
        .enqueue_impersonated_execution("jo", "accounts", "{}")
        .unwrap();

    // Wait for completion, then for the entry to expire
    let handle = spawn_watch(Arc::clone(&orchestrator), "005-jo", quick_options());
    assert!(matches!(handle.join().await, WatchEvent::Completed(_)));

    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(
        orchestrator.poll_execution_state("005-jo"),
        PollState::NotReady
    );
}

#[tokio::test]
async fn watcher_set_keeps_one_loop_per_target() {
    let gateway = MockGateway::with_demo_data().with_latency(Duration::from_millis(100));
    let orchestrator = test_orchestrator(gateway, "admin");
    orchestrator
        .enqueue_impersonated_execution("jo", "accounts", "{}")
        .unwrap();

    let mut watchers = WatcherSet::new();
    let first = watchers.start(Arc::clone(&orchestrator), "005-jo", quick_options());
    let second = watchers.start(Arc::clone(&orchestrator), "005-jo", quick_options());

    // Starting the second watch cancels the first, so the terminal state is
    // delivered exactly once
    assert_eq!(first.join().await, WatchEvent::Cancelled);
    assert!(matches!(second.join().await, WatchEvent::Completed(_)));
}

#[tokio::test]
async fn dropping_a_handle_cancels_its_loop() {
    let gateway = MockGateway::with_demo_data().with_latency(Duration::from_secs(10));
    let orchestrator = test_orchestrator(gateway, "admin");
    orchestrator
        .enqueue_impersonated_execution("jo", "accounts", "{}")
        .unwrap();

    let handle = spawn_watch(Arc::clone(&orchestrator), "005-jo", quick_options());
    let token = handle.token();
    drop(handle);
    assert!(token.is_cancelled());
}
