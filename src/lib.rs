//! Conduit client - a client for the Conduit SQL query service.
//!
//! The core is the query execution lifecycle in [`query`]: a caller builds a
//! [`query::QuerySession`], and [`client::ConduitClient`] drives it through
//! submission, polling, pagination and timeout cancellation over a
//! [`wire::Transport`].

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod metadata;
pub mod output;
pub mod query;
pub mod wire;

pub use client::{ConduitClient, QueryExecution};
pub use error::{ConduitError, Result};
