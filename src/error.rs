//! Error types for the Conduit client.
//!
//! Defines the main error enum used throughout the crate.

use thiserror::Error;

/// Main error type for Conduit client operations.
#[derive(Error, Debug)]
pub enum ConduitError {
    /// Transport errors (DNS, TLS, connection refused, request build failures).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The server answered with a non-200 status code.
    #[error("Status code {status} returned with message: {message}")]
    Http { status: u16, message: String },

    /// The remote query reported a status that is neither `Running` nor `Finished`.
    #[error("Query isn't running or finished (status '{status}'). {session}")]
    UnexpectedStatus { status: String, session: String },

    /// A payload that must decode strictly could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Configuration errors (missing server or token, unreadable config file).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal errors (unexpected states, exhausted test scripts).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ConduitError {
    /// Creates a transport error with the given message.
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Creates an HTTP status error.
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    /// Creates an unexpected-status error carrying a session snapshot.
    pub fn unexpected_status(status: impl Into<String>, session: impl Into<String>) -> Self {
        Self::UnexpectedStatus {
            status: status.into(),
            session: session.into(),
        }
    }

    /// Creates a decode error with the given message.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Creates a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates an internal error with the given message.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Returns the error category as a string for display purposes.
    pub fn category(&self) -> &'static str {
        match self {
            Self::Transport(_) => "Transport Error",
            Self::Http { .. } => "HTTP Error",
            Self::UnexpectedStatus { .. } => "Query Error",
            Self::Decode(_) => "Decode Error",
            Self::Config(_) => "Configuration Error",
            Self::Internal(_) => "Internal Error",
        }
    }

    /// Returns the HTTP status code if this is an HTTP status error.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result type alias using ConduitError.
pub type Result<T> = std::result::Result<T, ConduitError>;
