//! Query execution integration tests.
//!
//! Drives `ConduitClient` through submit, poll and page scenarios.

use std::sync::Arc;

use conduit_client::query::{ExecutionOutcome, ExecutionState, QuerySession, Value};
use conduit_client::wire::{Method, ScriptedTransport};
use conduit_client::{ConduitClient, ConduitError};
use pretty_assertions::assert_eq;
use serde_json::json;
use tokio_test::{assert_err, assert_ok};

fn client_for(transport: &Arc<ScriptedTransport>) -> ConduitClient {
    ConduitClient::with_transport(transport.clone())
}

fn page(query_id: &str, has_next: bool, rows: serde_json::Value) -> String {
    json!({
        "queryId": query_id,
        "status": "Finished",
        "message": "",
        "data": {
            "hasNext": has_next,
            "hasPrevious": false,
            "columns": ["id", "name"],
            "rows": rows,
        }
    })
    .to_string()
}

/// Scenario: Query finishes on submission
/// Given the service answers Finished with one row and no further pages
/// When the query is executed
/// Then one page with one column and one row is returned
#[tokio::test(start_paused = true)]
async fn test_submission_and_immediate_finish() {
    let transport = Arc::new(ScriptedTransport::new().with_response(
        200,
        r#"{"status":"Finished","data":{"hasNext":false,"columns":["a"],"rows":[{"a":1}]}}"#,
    ));
    let client = client_for(&transport);

    let execution = assert_ok!(client.execute_query("SELECT a FROM t", 100, 30).await);

    assert!(execution.is_complete());
    assert_eq!(execution.session.state(), ExecutionState::Finished);
    assert_eq!(execution.session.pages().len(), 1);
    assert_eq!(execution.session.columns(), ["a".to_string()]);
    assert_eq!(execution.session.row_count(), 1);
    let row = execution.session.rows().next().unwrap();
    assert_eq!(row.get("a"), Some(&Value::Int(1)));
}

/// Scenario: Query runs, is polled, then finishes
/// Given the service first answers Running
/// When the query is executed
/// Then exactly one poll GET is issued before finishing
#[tokio::test(start_paused = true)]
async fn test_poll_then_finish() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .with_response(200, r#"{"queryId":"q-77","status":"Running"}"#)
            .with_response(200, page("q-77", false, json!([{"id": 1, "name": "Ann"}]))),
    );
    let client = client_for(&transport);

    let execution = assert_ok!(client.execute_query("SELECT id, name FROM people", 10, 30).await);

    assert_eq!(execution.outcome, ExecutionOutcome::Completed);
    let polls: Vec<_> = transport
        .requests()
        .into_iter()
        .filter(|r| r.method == Method::Get)
        .collect();
    assert_eq!(polls.len(), 1);
    assert_eq!(polls[0].path(), "/query/execute/q-77/result");
    assert_eq!(execution.session.active_query_id(), "q-77");
}

/// Scenario: Two pages
/// Given the first page reports hasNext and the second does not
/// When the query is executed
/// Then both pages are accumulated and the final offset equals the page size
#[tokio::test(start_paused = true)]
async fn test_two_pages() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .with_response(200, page("q-1", true, json!([{"id": 1, "name": "Ann"}])))
            .with_response(200, page("q-2", false, json!([{"id": 2, "name": "Ben"}]))),
    );
    let client = client_for(&transport);
    let mut session = QuerySession::new("SELECT id, name FROM people", 1, 30);

    let outcome = assert_ok!(client.run(&mut session).await);

    assert_eq!(outcome, ExecutionOutcome::Completed);
    assert_eq!(session.pages().len(), 2);
    assert_eq!(session.offset(), 1);
    assert_eq!(session.active_query_id(), "q-2");

    let bodies: Vec<_> = transport
        .requests()
        .into_iter()
        .map(|r| r.body.unwrap())
        .collect();
    assert_eq!(bodies[0]["offset"], json!(0));
    assert_eq!(bodies[1]["offset"], json!(1));
    assert_eq!(bodies[1]["limit"], json!(1));
    assert_eq!(bodies[1]["query"], json!("SELECT id, name FROM people"));
    assert_eq!(bodies[1]["queryId"], json!(null));

    let names: Vec<_> = session.rows().map(|r| r["name"].to_string()).collect();
    assert_eq!(names, vec!["Ann", "Ben"]);
}

/// Scenario: Running, then paging after the poll finishes
/// Given a running query whose polled result has another page
/// When the query is executed
/// Then the next page is requested with a fresh submission at the advanced offset
#[tokio::test(start_paused = true)]
async fn test_poll_then_page() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .with_response(200, r#"{"queryId":"q-1","status":"Running"}"#)
            .with_response(200, page("q-1", true, json!([{"id": 1, "name": "Ann"}])))
            .with_response(200, page("q-2", false, json!([]))),
    );
    let client = client_for(&transport);

    let execution = assert_ok!(client.execute_query("SELECT * FROM people", 500, 30).await);

    assert_eq!(
        transport.paths(),
        vec![
            "/query/execute",
            "/query/execute/q-1/result",
            "/query/execute",
        ]
    );
    assert_eq!(execution.session.pages().len(), 2);
    assert_eq!(execution.session.offset(), 500);
    assert_eq!(execution.session.row_count(), 1);
}

/// Scenario: Oversized page request
/// Given a page size above the service maximum
/// When the query is submitted
/// Then the request carries the clamped limit
#[tokio::test]
async fn test_page_size_clamped_on_the_wire() {
    let transport = Arc::new(ScriptedTransport::new().with_response(200, page("q", false, json!([]))));
    let client = client_for(&transport);

    assert_ok!(client.execute_query("SELECT 1", 50_000, 30).await);

    let body = transport.requests()[0].body.clone().unwrap();
    assert_eq!(body["limit"], json!(1000));
}

/// Scenario: Server error
/// Given the service answers 500
/// When the query is executed
/// Then an HTTP error with the server message is returned, not a process exit
#[tokio::test]
async fn test_server_error_is_recoverable() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .with_response(500, r#"{"message":"warehouse is suspended"}"#)
            .with_response(200, page("q", false, json!([{"id": 1, "name": "Ann"}]))),
    );
    let client = client_for(&transport);

    let err = assert_err!(client.execute_query("SELECT 1", 10, 30).await);
    assert_eq!(err.status_code(), Some(500));
    assert!(err.to_string().contains("warehouse is suspended"));

    // The same client keeps working for the next query
    let execution = assert_ok!(client.execute_query("SELECT 1", 10, 30).await);
    assert!(execution.is_complete());
}

/// Scenario: Unknown remote status
/// Given the service answers with a status other than Running or Finished
/// When the query is executed
/// Then the error names the status and carries the session snapshot
#[tokio::test]
async fn test_unknown_status_is_fatal() {
    let transport = Arc::new(
        ScriptedTransport::new()
            .with_response(200, r#"{"queryId":"q-3","status":"Failed","message":"syntax error"}"#),
    );
    let client = client_for(&transport);
    let mut session = QuerySession::new("SELEC 1", 10, 30);

    let err = assert_err!(client.run(&mut session).await);

    match err {
        ConduitError::UnexpectedStatus { status, session: snapshot } => {
            assert_eq!(status, "Failed");
            assert!(snapshot.contains("page size 10"));
        }
        other => panic!("Expected UnexpectedStatus, got {other:?}"),
    }
    assert_eq!(session.state(), ExecutionState::Failed);
    assert_eq!(session.active_query_id(), "q-3");
    assert!(session.pages().is_empty());
}

/// Scenario: Malformed rows inside a finished page
/// Given a finished page whose rows are partly malformed
/// When the query is executed
/// Then the execution completes and the good rows survive
#[tokio::test]
async fn test_partially_malformed_page_completes() {
    let transport = Arc::new(ScriptedTransport::new().with_response(
        200,
        r#"{"queryId":"q","status":"Finished","data":{"hasNext":false,"columns":["id"],"rows":[{"id":1},42,{"id":3}]}}"#,
    ));
    let client = client_for(&transport);

    let execution = assert_ok!(client.execute_query("SELECT id FROM t", 10, 30).await);

    let ids: Vec<_> = execution
        .session
        .rows()
        .map(|r| r.get("id").cloned().unwrap_or_default())
        .collect();
    assert_eq!(ids, vec![Value::Int(1), Value::Null, Value::Int(3)]);
}
