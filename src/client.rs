//! Conduit client facade.
//!
//! Ties the wire transport to query execution and metadata lookups.

use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::Credentials;
use crate::error::Result;
use crate::metadata::{self, Databases, TableSchema, Tables};
use crate::query::{
    CancelOutcome, ExecutionController, ExecutionOutcome, QuerySession, DEFAULT_POLL_INTERVAL,
};
use crate::wire::{self, HttpTransport, Transport, WireRequest};

/// A finished query execution: the session and how it ended.
#[derive(Debug)]
pub struct QueryExecution {
    pub session: QuerySession,
    pub outcome: ExecutionOutcome,
}

impl QueryExecution {
    /// Returns true if every page was received.
    pub fn is_complete(&self) -> bool {
        self.outcome == ExecutionOutcome::Completed
    }
}

/// Client for the Conduit query service.
#[derive(Clone)]
pub struct ConduitClient {
    transport: Arc<dyn Transport>,
    poll_interval: Duration,
}

impl ConduitClient {
    /// Creates a client talking HTTPS to the configured server.
    pub fn new(credentials: &Credentials) -> Result<Self> {
        info!("Conduit client uses {}", credentials.display_string());
        let transport = HttpTransport::new(credentials)?;
        Ok(Self::with_transport(Arc::new(transport)))
    }

    /// Creates a client over an arbitrary transport.
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
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

    fn controller(&self) -> ExecutionController<'_> {
        ExecutionController::new(self.transport.as_ref()).with_poll_interval(self.poll_interval)
    }

    /// Runs a caller-owned session to completion, timeout, or failure.
    ///
    /// On error the session keeps its last successful state for inspection.
    pub async fn run(&self, session: &mut QuerySession) -> Result<ExecutionOutcome> {
        self.controller().run(session).await
    }

    /// Creates a session for `sql` and runs it.
    pub async fn execute_query(
        &self,
        sql: &str,
        page_size: usize,
        timeout_secs: u64,
    ) -> Result<QueryExecution> {
        let mut session = QuerySession::new(sql, page_size, timeout_secs);
        let outcome = self.run(&mut session).await?;
        Ok(QueryExecution { session, outcome })
    }

    /// Attempts a single cancel of the session's active query.
    pub async fn cancel(&self, session: &QuerySession) -> Result<CancelOutcome> {
        self.controller().cancel(session).await
    }

    /// Sends a GET and decodes the 200 response into `T`.
    pub async fn get_json<T>(&self, request: WireRequest) -> Result<T>
    where
        T: DeserializeOwned,
    {
        wire::get_json(self.transport.as_ref(), request).await
    }

    /// Lists databases.
    pub async fn databases(&self) -> Result<Databases> {
        self.get_json(metadata::databases_request()).await
    }

    /// Lists the tables of a database.
    pub async fn tables(&self, database: &str) -> Result<Tables> {
        self.get_json(metadata::tables_request(database)).await
    }

    /// Describes the columns of a table.
    pub async fn table_schema(&self, database: &str, table: &str) -> Result<TableSchema> {
        let schema: TableSchema = self
            .get_json(metadata::table_schema_request(database, table))
            .await?;
        Ok(schema.with_identity(database, table))
    }
}

impl std::fmt::Debug for ConduitClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConduitClient")
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}
