//! Try-Confirm-Cancel end-to-end against the SQLite store and in-process backends

mod common;

use common::{harness, harness_with, request, Harness};
use healthcheck_core::application::constants::{lock_key, ROUTING_KEY, STAGING_TTL};
use healthcheck_core::application::tcc::{CANCELLED_MESSAGE, CONFIRMED_MESSAGE};
use healthcheck_core::application::CoordinatorConfig;
use healthcheck_core::domain::{Protocol, TaskStatus};
use healthcheck_core::port::KeyValueCache;
use std::time::Duration;

async fn short_deadline_harness() -> Harness {
    harness_with(CoordinatorConfig {
        phase_timeout: Duration::from_millis(200),
        compensation_timeout: Duration::from_secs(1),
    })
    .await
}

#[tokio::test]
async fn test_confirm_records_task_and_releases_lock() {
    let h = harness().await;

    let outcome = h.service.create_with_tcc(request("t1")).await.unwrap();

    assert!(outcome.success);
    assert_eq!(outcome.pattern, Protocol::Tcc);
    assert_eq!(outcome.message, CONFIRMED_MESSAGE);

    let record = h.record("t1").await.unwrap();
    assert_eq!(record.status, TaskStatus::Completed);
    assert!(record.completed_at.is_some());

    assert_eq!(h.cached_status("t1").as_deref(), Some("COMPLETED"));
    assert!(h.lock_holder("t1").is_none());

    let logs = h.task_logs("t1");
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["status"], "COMPLETED");
    assert!(logs[0]["completedAt"].is_i64());

    assert_eq!(h.published_statuses(ROUTING_KEY), vec!["COMPLETED"]);
}

#[tokio::test]
async fn test_document_try_failure_cancels_everything() {
    let h = harness().await;
    h.documents.faults().fail("insert", "primary unavailable");

    let outcome = h.service.create_with_tcc(request("t1")).await.unwrap();

    assert!(!outcome.success);
    assert_eq!(outcome.message, CANCELLED_MESSAGE);

    // No confirmed trace anywhere
    assert_eq!(h.record("t1").await.unwrap().status, TaskStatus::Cancelled);
    assert!(h.cached_status("t1").is_none());
    assert!(h.lock_holder("t1").is_none());
    assert!(h.task_logs("t1").is_empty());
    assert!(h.broker.published().is_empty());
}

#[tokio::test]
async fn test_held_lock_rejects_reservation() {
    let h = harness().await;
    h.cache
        .set_if_absent(&lock_key("t1"), "other-tx", STAGING_TTL)
        .await
        .unwrap();

    let outcome = h.service.create_with_tcc(request("t1")).await.unwrap();

    assert!(!outcome.success);
    assert_eq!(h.record("t1").await.unwrap().status, TaskStatus::Cancelled);
    // Someone else's lock is left alone
    assert_eq!(h.lock_holder("t1").as_deref(), Some("other-tx"));
    assert!(h.cached_status("t1").is_none());
}

#[tokio::test]
async fn test_confirm_failure_reverts_confirmed_participants() {
    let h = harness().await;
    h.broker.faults().fail("publish", "channel closed");

    let outcome = h.service.create_with_tcc(request("t1")).await.unwrap();

    assert!(!outcome.success);
    assert_eq!(outcome.message, CANCELLED_MESSAGE);

    assert_eq!(h.record("t1").await.unwrap().status, TaskStatus::Cancelled);
    assert!(h.cached_status("t1").is_none());
    assert!(h.lock_holder("t1").is_none());
    assert!(h.task_logs("t1").is_empty());
    assert!(h.broker.published().is_empty());
}

#[tokio::test]
async fn test_cancelled_task_can_be_retried() {
    let h = harness().await;
    h.documents.faults().fail("insert", "primary unavailable");
    assert!(!h.service.create_with_tcc(request("t1")).await.unwrap().success);

    h.documents.faults().heal_all();
    let outcome = h.service.create_with_tcc(request("t1")).await.unwrap();

    assert!(outcome.success);
    assert_eq!(h.record("t1").await.unwrap().status, TaskStatus::Completed);
}

#[tokio::test]
async fn test_concurrent_reservations_for_one_task() {
    let h = harness().await;

    let (a, b) = tokio::join!(
        h.service.create_with_tcc(request("t1")),
        h.service.create_with_tcc(request("t1")),
    );
    let successes = [a.unwrap(), b.unwrap()]
        .iter()
        .filter(|o| o.success)
        .count();

    assert_eq!(successes, 1);
    assert_eq!(h.record("t1").await.unwrap().status, TaskStatus::Completed);
    assert!(h.lock_holder("t1").is_none());
    assert_eq!(h.published_statuses(ROUTING_KEY).len(), 1);
}

#[tokio::test]
async fn test_lock_taken_after_deadline_is_released() {
    let h = short_deadline_harness().await;
    // The lock is written but the reply arrives after the try deadline
    h.cache_stalls.after_lock.arm(Duration::from_secs(5));

    let outcome = h.service.create_with_tcc(request("t1")).await.unwrap();

    assert!(!outcome.success);
    assert_eq!(outcome.message, CANCELLED_MESSAGE);
    assert!(h.lock_holder("t1").is_none());
    assert!(h.cached_status("t1").is_none());
    assert_eq!(h.record("t1").await.unwrap().status, TaskStatus::Cancelled);

    // Nothing is left to block the next attempt
    let retry = h.service.create_with_tcc(request("t1")).await.unwrap();
    assert!(retry.success);
    assert!(h.lock_holder("t1").is_none());
}

#[tokio::test]
async fn test_reservation_row_written_after_deadline_is_cancelled() {
    let h = short_deadline_harness().await;
    h.store_stalls.after_insert.arm(Duration::from_secs(5));

    let outcome = h.service.create_with_tcc(request("t1")).await.unwrap();

    assert!(!outcome.success);
    assert_eq!(h.record("t1").await.unwrap().status, TaskStatus::Cancelled);
    assert!(h.lock_holder("t1").is_none());

    let retry = h.service.create_with_tcc(request("t1")).await.unwrap();
    assert!(retry.success);
    assert_eq!(h.record("t1").await.unwrap().status, TaskStatus::Completed);
}
