//! Query execution lifecycle for the Conduit client.
//!
//! A [`QuerySession`] holds the state of one logical query; the
//! [`ExecutionController`] turns it into submit, poll, page and cancel
//! round-trips; [`QueryResultPage`] decodes each response.

pub mod controller;
pub mod result;
pub mod session;

pub use controller::{CancelOutcome, ExecutionController, ExecutionOutcome, DEFAULT_POLL_INTERVAL};
pub use result::{QueryResultPage, RemoteStatus, Row, Value};
pub use session::{ExecutionState, QuerySession, DEFAULT_TIMEOUT_SECS, MAX_PAGE_SIZE};
