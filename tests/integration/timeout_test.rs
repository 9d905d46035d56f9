//! Timeout and cancellation integration tests.
//!
//! Time is paused so poll sleeps advance the clock deterministically.

use std::sync::Arc;
use std::time::Duration;

use conduit_client::query::{CancelOutcome, ExecutionOutcome, ExecutionState, QuerySession};
use conduit_client::wire::ScriptedTransport;
use conduit_client::ConduitClient;
use pretty_assertions::assert_eq;
use tokio_test::assert_ok;

const RUNNING_Q1: &str = r#"{"queryId":"q-1","status":"Running"}"#;

/// Scenario: Query outlives its budget
/// Given a 3 second timeout and a query that stays Running
/// When the query is executed
/// Then it is polled once, cancelled once, and reported as timed out
#[tokio::test(start_paused = true)]
async fn test_timeout_cancels_running_query() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .with_response(200, RUNNING_Q1)
            .with_response(200, RUNNING_Q1)
            .with_response(200, r#"{"isCancelled":true}"#),
    );
    let client = ConduitClient::with_transport(transport.clone());

    let execution = assert_ok!(client.execute_query("SELECT pg_sleep(60)", 10, 3).await);

    assert_eq!(
        execution.outcome,
        ExecutionOutcome::TimedOut {
            cancel: CancelOutcome::Cancelled
        }
    );
    assert!(!execution.is_complete());
    assert_eq!(execution.session.state(), ExecutionState::Cancelled);
    assert!(execution.session.pages().is_empty());
    assert_eq!(
        transport.paths(),
        vec![
            "/query/execute",
            "/query/execute/q-1/result",
            "/query/cancel?queryId=q-1",
        ]
    );
    assert_eq!(transport.remaining(), 0);
}

/// Scenario: Timeout while fetching a later page
/// Given the first page arrives after one poll and the second page keeps running
/// When the budget runs out
/// Then the cancel targets the most recent query id and the first page is kept
#[tokio::test(start_paused = true)]
async fn test_timeout_during_paging_cancels_latest_query() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .with_response(200, RUNNING_Q1)
            .with_response(
                200,
                r#"{"queryId":"q-1","status":"Finished","data":{"hasNext":true,"columns":["n"],"rows":[{"n":1}]}}"#,
            )
            .with_response(200, r#"{"queryId":"q-2","status":"Running"}"#)
            .with_response(200, r#"{"isCancelled":true}"#),
    );
    let client = ConduitClient::with_transport(transport.clone());
    let mut session = QuerySession::new("SELECT n FROM numbers", 1, 3);

    let outcome = assert_ok!(client.run(&mut session).await);

    assert_eq!(
        outcome,
        ExecutionOutcome::TimedOut {
            cancel: CancelOutcome::Cancelled
        }
    );
    assert_eq!(session.active_query_id(), "q-2");
    assert_eq!(session.pages().len(), 1);
    assert_eq!(session.offset(), 1);
    assert_eq!(
        transport.paths().last().map(String::as_str),
        Some("/query/cancel?queryId=q-2")
    );
}

/// Scenario: Budget runs out between pages
/// Given a slow server whose first answer is a finished page with more to come
/// When the budget is spent before the next page is requested
/// Then nothing is cancelled because the last known status is Finished
#[tokio::test(start_paused = true)]
async fn test_timeout_at_page_boundary_skips_cancel() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .with_response(
                200,
                r#"{"queryId":"q-1","status":"Finished","data":{"hasNext":true,"columns":["n"],"rows":[{"n":1}]}}"#,
            )
            .with_latency(Duration::from_secs(5)),
    );
    let client = ConduitClient::with_transport(transport.clone())
        .with_poll_interval(Duration::from_secs(60));

    let execution = assert_ok!(client.execute_query("SELECT n FROM numbers", 1, 3).await);

    assert_eq!(
        execution.outcome,
        ExecutionOutcome::TimedOut {
            cancel: CancelOutcome::NothingToCancel
        }
    );
    assert_eq!(execution.session.active_query_id(), "q-1");
    assert_eq!(execution.session.pages().len(), 1);
    assert_eq!(execution.session.state(), ExecutionState::Cancelled);
    assert_eq!(transport.paths(), vec!["/query/execute"]);
    assert!(!transport
        .paths()
        .iter()
        .any(|p| p.starts_with("/query/cancel")));
}

/// Scenario: Server refuses the cancel
/// Given the cancel endpoint answers isCancelled false
/// When the query times out
/// Then the outcome reports the rejection and no retry is made
#[tokio::test(start_paused = true)]
async fn test_rejected_cancel_is_not_retried() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .with_response(200, RUNNING_Q1)
            .with_response(200, r#"{"isCancelled":false}"#),
    );
    let client = ConduitClient::with_transport(transport.clone())
        .with_poll_interval(Duration::from_secs(5));

    let execution = assert_ok!(client.execute_query("SELECT 1", 10, 3).await);

    assert_eq!(
        execution.outcome,
        ExecutionOutcome::TimedOut {
            cancel: CancelOutcome::Rejected
        }
    );
    assert_eq!(transport.request_count(), 2);
}

/// Scenario: Cancel request fails
/// Given the cancel endpoint answers 500
/// When the query times out
/// Then the error is returned and the session is marked failed
#[tokio::test(start_paused = true)]
async fn test_cancel_failure_is_an_error() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .with_response(200, RUNNING_Q1)
            .with_response(500, "cancel unavailable"),
    );
    let client = ConduitClient::with_transport(transport.clone())
        .with_poll_interval(Duration::from_secs(3));
    let mut session = QuerySession::new("SELECT 1", 10, 3);

    let err = client.run(&mut session).await.unwrap_err();

    assert_eq!(err.status_code(), Some(500));
    assert_eq!(session.state(), ExecutionState::Failed);
    assert_eq!(session.active_query_id(), "q-1");
}

/// Scenario: Cancelling a session that never ran
/// Given a fresh session with no active query id
/// When cancel is requested
/// Then nothing is sent
#[tokio::test]
async fn test_cancel_without_active_query() {
    let transport = Arc::new(ScriptedTransport::new());
    let client = ConduitClient::with_transport(transport.clone());
    let session = QuerySession::new("SELECT 1", 10, 30);

    let cancel = assert_ok!(client.cancel(&session).await);

    assert_eq!(cancel, CancelOutcome::NothingToCancel);
    assert!(!cancel.is_cancelled());
    assert_eq!(transport.request_count(), 0);
}

/// Scenario: Slow polling within budget
/// Given a 30 second timeout and a query that finishes on the third poll
/// When the query is executed
/// Then it completes after the clock advanced by three poll intervals
#[tokio::test(start_paused = true)]
async fn test_completes_within_budget_after_several_polls() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .with_response(200, RUNNING_Q1)
            .with_response(200, RUNNING_Q1)
            .with_response(200, RUNNING_Q1)
            .with_response(
                200,
                r#"{"queryId":"q-1","status":"Finished","data":{"hasNext":false,"columns":["n"],"rows":[{"n":7}]}}"#,
            ),
    );
    let client = ConduitClient::with_transport(transport.clone());

    let execution = assert_ok!(client.execute_query("SELECT 7 AS n", 10, 30).await);

    assert!(execution.is_complete());
    assert_eq!(transport.request_count(), 4);
    let elapsed = execution.session.elapsed().unwrap();
    assert!(elapsed >= Duration::from_secs(6) && elapsed < Duration::from_secs(7));
}
