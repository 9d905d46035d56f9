//! Wire primitive for the Conduit query service.
//!
//! Provides a trait-based interface for single authenticated HTTP round-trips,
//! so the query controller can run against the real service or a scripted mock.

mod http;
mod mock;

pub use http::HttpTransport;
pub use mock::ScriptedTransport;

use crate::error::{ConduitError, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use url::Url;

/// HTTP method of a wire request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    /// Returns the method name as sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

/// One request against the query service, relative to the server root.
#[derive(Debug, Clone, PartialEq)]
pub struct WireRequest {
    /// HTTP method.
    pub method: Method,
    /// Unencoded path segments (e.g. `["query", "execute"]`).
    pub segments: Vec<String>,
    /// Unencoded query string pairs.
    pub query: Vec<(String, String)>,
    /// JSON body, only sent for POST.
    pub body: Option<serde_json::Value>,
}

impl WireRequest {
    /// Creates a GET request for the given path segments.
    pub fn get<I, S>(segments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            method: Method::Get,
            segments: segments.into_iter().map(Into::into).collect(),
            query: Vec::new(),
            body: None,
        }
    }

    /// Creates a POST request with a JSON body.
    pub fn post<I, S>(segments: I, body: serde_json::Value) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            method: Method::Post,
            segments: segments.into_iter().map(Into::into).collect(),
            query: Vec::new(),
            body: Some(body),
        }
    }

    /// Adds a query string pair.
    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Resolves this request against a base URL, percent-encoding segments and query.
    pub fn resolve(&self, base: &Url) -> Result<Url> {
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|_| ConduitError::transport(format!("Cannot use {base} as a base URL")))?
            .pop_if_empty()
            .extend(&self.segments);

        if !self.query.is_empty() {
            url.query_pairs_mut().extend_pairs(&self.query);
        }

        Ok(url)
    }

    /// Returns the encoded path and query (e.g. `/query/cancel?queryId=q1`).
    pub fn path(&self) -> String {
        Url::parse("http://localhost/")
            .ok()
            .and_then(|base| self.resolve(&base).ok())
            .map(|url| url[url::Position::BeforePath..].to_string())
            .unwrap_or_else(|| format!("/{}", self.segments.join("/")))
    }
}

/// Raw response from the query service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireResponse {
    /// HTTP status code.
    pub status: u16,
    /// Response body as text.
    pub body: String,
}

impl WireResponse {
    /// Creates a response with the given status and body.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns true for HTTP 200; every other status is a hard failure.
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// Trait defining one authenticated round-trip to the query service.
///
/// Implementations attach the bearer token and JSON headers; they do not
/// interpret the status code.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends a request and returns the raw response.
    async fn send(&self, request: WireRequest) -> Result<WireResponse>;
}

/// Sends a GET and decodes a 200 response strictly into `T`.
///
/// Non-200 responses become `ConduitError::Http` carrying the raw body.
pub async fn get_json<T>(transport: &dyn Transport, request: WireRequest) -> Result<T>
where
    T: DeserializeOwned,
{
    let path = request.path();
    let response = transport.send(request).await?;

    if !response.is_ok() {
        tracing::warn!("Status Code {} returned for {}", response.status, path);
        return Err(ConduitError::http(response.status, response.body.trim()));
    }

    serde_json::from_str(&response.body)
        .map_err(|e| ConduitError::decode(format!("Failed to parse response from {path}: {e}")))
}
