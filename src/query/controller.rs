//! Execution controller: drives a query session through submit, poll, page
//! and cancel round-trips until it finishes, times out, or fails.

use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::result::{QueryResultPage, RemoteStatus};
use super::session::{ExecutionState, QuerySession};
use crate::error::{ConduitError, Result};
use crate::wire::{self, Transport, WireRequest, WireResponse};

/// Delay before polling a query the server reports as running.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Result of a cancellation attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// No active query, or the last one already finished; no request was sent.
    NothingToCancel,
    /// The server confirmed the cancellation.
    Cancelled,
    /// The server answered but did not cancel. Not retried.
    Rejected,
}

impl CancelOutcome {
    /// Returns true only if the server confirmed the cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// How a query execution ended, when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionOutcome {
    /// Every page was received.
    Completed,
    /// The timeout budget ran out before the query completed.
    TimedOut { cancel: CancelOutcome },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CancelResponse {
    #[serde(default)]
    is_cancelled: bool,
}

/// Drives one query session at a time over a transport.
///
/// Performs one request at a time; never issues concurrent requests for a
/// session.
pub struct ExecutionController<'a> {
    transport: &'a dyn Transport,
    poll_interval: Duration,
}

impl<'a> ExecutionController<'a> {
    /// Creates a controller with the default poll interval.
    pub fn new(transport: &'a dyn Transport) -> Self {
        Self {
            transport,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Sets the delay between polls of a running query.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Runs the session to a terminal state.
    ///
    /// Returns `Completed` when the last page lands and `TimedOut` when the
    /// budget runs out (after one best-effort cancel). Transport, HTTP and
    /// unexpected-status failures are returned as errors and leave the session
    /// in `Failed` with its last successful state intact.
    pub async fn run(&self, session: &mut QuerySession) -> Result<ExecutionOutcome> {
        if session.state() != ExecutionState::Idle {
            return Err(ConduitError::internal(format!(
                "Query session already ran (state {})",
                session.state()
            )));
        }

        let result = self.drive(session).await;
        if result.is_err() {
            session.set_state(ExecutionState::Failed);
        }
        result
    }

    async fn drive(&self, session: &mut QuerySession) -> Result<ExecutionOutcome> {
        let mut state = ExecutionState::Submitting;

        loop {
            session.set_state(state);

            state = match state {
                ExecutionState::Submitting | ExecutionState::Paging => {
                    if session.timed_out() {
                        ExecutionState::Cancelled
                    } else {
                        let page = self.submit(session).await?;
                        self.dispatch(session, page)?
                    }
                }
                ExecutionState::AwaitingPoll => {
                    tokio::time::sleep(self.poll_interval).await;
                    if session.timed_out() {
                        ExecutionState::Cancelled
                    } else {
                        let page = self.poll(session).await?;
                        self.dispatch(session, page)?
                    }
                }
                ExecutionState::Finished => {
                    info!(
                        pages = session.pages().len(),
                        rows = session.row_count(),
                        "Query finished"
                    );
                    return Ok(ExecutionOutcome::Completed);
                }
                ExecutionState::Cancelled => {
                    let cancel = self.cancel(session).await?;
                    return Ok(ExecutionOutcome::TimedOut { cancel });
                }
                ExecutionState::Idle | ExecutionState::Failed => {
                    return Err(ConduitError::internal(format!(
                        "Controller cannot continue from state {}",
                        state
                    )));
                }
            };
        }
    }

    /// Posts the SQL with the session's current offset and page size.
    async fn submit(&self, session: &QuerySession) -> Result<QueryResultPage> {
        info!(
            offset = session.offset(),
            limit = session.page_size(),
            "Submitting query"
        );

        let body = json!({
            "queryId": null,
            "query": session.sql(),
            "offset": session.offset(),
            "limit": session.page_size(),
        });
        let response = self
            .transport
            .send(WireRequest::post(["query", "execute"], body))
            .await?;

        Self::decode(response)
    }

    /// Fetches the status/result of the active query.
    async fn poll(&self, session: &QuerySession) -> Result<QueryResultPage> {
        let request = WireRequest::get(["query", "execute", session.active_query_id(), "result"]);
        info!("Getting URL: {}", request.path());

        let response = self.transport.send(request).await?;
        Self::decode(response)
    }

    /// Decodes an envelope, turning non-200 responses into errors.
    fn decode(response: WireResponse) -> Result<QueryResultPage> {
        let page = QueryResultPage::from_json(&response.body);

        if !response.is_ok() {
            let message = if page.message.is_empty() {
                response.body.trim().to_string()
            } else {
                page.message
            };
            warn!("Status Code {} returned with message {}", response.status, message);
            return Err(ConduitError::http(response.status, message));
        }

        Ok(page)
    }

    /// Records the response on the session and picks the next state.
    fn dispatch(&self, session: &mut QuerySession, page: QueryResultPage) -> Result<ExecutionState> {
        session.record_response(&page);

        match page.remote_status() {
            RemoteStatus::Finished => {
                if session.append_page(page) {
                    info!("Query is finished, but has more, so paging...");
                    debug!("{}", session);
                    Ok(ExecutionState::Paging)
                } else {
                    Ok(ExecutionState::Finished)
                }
            }
            RemoteStatus::Running => {
                info!("Query is Running, need to poll for completion...");
                Ok(ExecutionState::AwaitingPoll)
            }
            RemoteStatus::Other(status) => {
                Err(ConduitError::unexpected_status(status, session.to_string()))
            }
        }
    }

    /// Attempts to cancel the session's active query once.
    ///
    /// Sends nothing when there is no active query id or the last known status
    /// is already `Finished`.
    pub async fn cancel(&self, session: &QuerySession) -> Result<CancelOutcome> {
        let query_id = session.active_query_id();
        if query_id.is_empty() || session.active_status() == Some(&RemoteStatus::Finished) {
            info!("There isn't any active query to attempt to cancel...");
            return Ok(CancelOutcome::NothingToCancel);
        }

        info!("Canceling query {}....", query_id);
        let request = WireRequest::get(["query", "cancel"]).with_query("queryId", query_id);
        let response: CancelResponse = wire::get_json(self.transport, request).await?;

        if response.is_cancelled {
            info!("Query {} successfully canceled.", query_id);
            Ok(CancelOutcome::Cancelled)
        } else {
            warn!("Query {} was not canceled by the server", query_id);
            Ok(CancelOutcome::Rejected)
        }
    }
}
