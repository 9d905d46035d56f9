//! State of one logical query across all of its HTTP round-trips.

use std::fmt;
use std::time::Duration;
use tokio::time::Instant;
use tracing::info;

use super::result::{QueryResultPage, RemoteStatus, Row};

/// Largest page the service will return.
pub const MAX_PAGE_SIZE: usize = 1000;

/// Timeout substituted when the caller passes 0.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Lifecycle state of a query execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionState {
    /// Constructed, nothing sent yet.
    #[default]
    Idle,
    /// First page request in flight.
    Submitting,
    /// Waiting on a running query; the next request is a poll.
    AwaitingPoll,
    /// Requesting a further page of a finished query.
    Paging,
    /// All pages received.
    Finished,
    /// Timeout budget exhausted; cancellation attempted.
    Cancelled,
    /// Stopped on an error.
    Failed,
}

impl ExecutionState {
    /// Returns true for states the controller never leaves.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Cancelled | Self::Failed)
    }

    /// Returns the lowercase name used in logs and snapshots.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Submitting => "submitting",
            Self::AwaitingPoll => "awaiting poll",
            Self::Paging => "paging",
            Self::Finished => "finished",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ExecutionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One logical query: its SQL, pagination window, timeout budget, and the
/// pages received so far.
///
/// Owned by the caller and mutated only by the execution controller.
#[derive(Debug, Clone)]
pub struct QuerySession {
    sql: String,
    page_size: usize,
    timeout_secs: u64,
    offset: usize,
    started_at: Option<Instant>,
    active_query_id: String,
    active_status: Option<RemoteStatus>,
    pages: Vec<QueryResultPage>,
    state: ExecutionState,
}

impl QuerySession {
    /// Creates a session. No network activity happens here.
    ///
    /// `page_size` is clamped to [`MAX_PAGE_SIZE`] (0 also means the maximum);
    /// a `timeout_secs` of 0 becomes [`DEFAULT_TIMEOUT_SECS`].
    pub fn new(sql: impl Into<String>, page_size: usize, timeout_secs: u64) -> Self {
        let page_size = if page_size == 0 {
            MAX_PAGE_SIZE
        } else {
            page_size.min(MAX_PAGE_SIZE)
        };
        let timeout_secs = if timeout_secs == 0 {
            DEFAULT_TIMEOUT_SECS
        } else {
            timeout_secs
        };

        Self {
            sql: sql.into(),
            page_size,
            timeout_secs,
            offset: 0,
            started_at: None,
            active_query_id: String::new(),
            active_status: None,
            pages: Vec::new(),
            state: ExecutionState::Idle,
        }
    }

    /// The SQL text submitted for every page.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Rows requested per page, already clamped.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Timeout budget in seconds, with 0 already replaced.
    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs
    }

    /// Row offset of the next page request.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// When the timeout window opened, if it has.
    pub fn started_at(&self) -> Option<Instant> {
        self.started_at
    }

    /// Identifier of the outstanding remote query; empty before the first response.
    pub fn active_query_id(&self) -> &str {
        &self.active_query_id
    }

    /// Last status reported by the server.
    pub fn active_status(&self) -> Option<&RemoteStatus> {
        self.active_status.as_ref()
    }

    /// Pages received so far, in order.
    pub fn pages(&self) -> &[QueryResultPage] {
        &self.pages
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ExecutionState {
        self.state
    }

    /// Columns of the first page that reports any.
    pub fn columns(&self) -> &[String] {
        self.pages
            .iter()
            .find(|p| !p.columns.is_empty())
            .map(|p| p.columns.as_slice())
            .unwrap_or_default()
    }

    /// Rows of every page, in order.
    pub fn rows(&self) -> impl Iterator<Item = &Row> {
        self.pages.iter().flat_map(|p| p.rows.iter())
    }

    /// Total rows across all pages.
    pub fn row_count(&self) -> usize {
        self.pages.iter().map(QueryResultPage::row_count).sum()
    }

    /// Checks the timeout budget.
    ///
    /// The first call opens the window and never reports a timeout. Later calls
    /// report a timeout once whole elapsed seconds reach `timeout_secs`.
    pub fn timed_out(&mut self) -> bool {
        let Some(started_at) = self.started_at else {
            self.started_at = Some(Instant::now());
            return false;
        };

        let elapsed = started_at.elapsed();
        if elapsed.as_secs() >= self.timeout_secs {
            info!(
                elapsed_secs = elapsed.as_secs(),
                timeout_secs = self.timeout_secs,
                "Timed out..."
            );
            return true;
        }
        false
    }

    /// Time since the window opened.
    pub fn elapsed(&self) -> Option<Duration> {
        self.started_at.map(|s| s.elapsed())
    }

    /// Records the identity and status of the latest response.
    pub(crate) fn record_response(&mut self, page: &QueryResultPage) {
        self.active_query_id = page.query_id.clone();
        self.active_status = Some(page.remote_status());
    }

    /// Appends a finished page. Advances the offset only if more pages follow,
    /// and returns whether they do.
    pub(crate) fn append_page(&mut self, page: QueryResultPage) -> bool {
        let has_next = page.has_next;
        self.pages.push(page);
        if has_next {
            self.offset += self.page_size;
        }
        has_next
    }

    pub(crate) fn set_state(&mut self, state: ExecutionState) {
        self.state = state;
    }
}

impl fmt::Display for QuerySession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Query session is using offset {}, page size {}, with timeout {}s",
            self.offset, self.page_size, self.timeout_secs
        )?;
        match self.elapsed() {
            Some(elapsed) => write!(f, ", started {}s ago", elapsed.as_secs())?,
            None => write!(f, ", not started")?,
        }
        let status = self
            .active_status
            .as_ref()
            .map(RemoteStatus::as_str)
            .unwrap_or("none");
        write!(
            f,
            ", active query id '{}', status {}, {} page(s), state {}",
            self.active_query_id,
            status,
            self.pages.len(),
            self.state
        )
    }
}
