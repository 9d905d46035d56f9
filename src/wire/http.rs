//! HTTPS transport backed by reqwest.

use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

use super::{Method, Transport, WireRequest, WireResponse};
use crate::config::Credentials;
use crate::error::{ConduitError, Result};

/// Default timeout for a single HTTP round-trip.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

/// Transport that talks to `https://{server}` with bearer-token auth.
#[derive(Clone)]
pub struct HttpTransport {
    base_url: Url,
    token: String,
    client: Client,
}

impl HttpTransport {
    /// Creates a transport for the given credentials.
    pub fn new(credentials: &Credentials) -> Result<Self> {
        let base_url = Url::parse(&format!("https://{}/", credentials.server)).map_err(|e| {
            ConduitError::config(format!("Invalid server '{}': {e}", credentials.server))
        })?;
        Self::with_base_url(base_url, &credentials.token)
    }

    /// Creates a transport against an explicit base URL (e.g. a plain-HTTP test server).
    pub fn with_base_url(base_url: Url, token: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, token, DEFAULT_REQUEST_TIMEOUT_SECS)
    }

    /// Creates a transport with a custom per-request timeout.
    pub fn with_timeout(base_url: Url, token: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ConduitError::transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url,
            token: token.into(),
            client,
        })
    }

    /// Returns the base URL requests are resolved against.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn map_send_error(e: reqwest::Error) -> ConduitError {
        if e.is_timeout() {
            ConduitError::transport("Request timed out. Try again.")
        } else if e.is_connect() {
            ConduitError::transport(format!("Failed to connect to query service: {}", e))
        } else if e.is_builder() {
            ConduitError::transport(format!("Error forming request: {}", e))
        } else {
            ConduitError::transport(format!("Error doing request: {}", e))
        }
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("base_url", &self.base_url.as_str())
            .field("token", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: WireRequest) -> Result<WireResponse> {
        let url = request.resolve(&self.base_url)?;
        debug!("{} {}", request.method.as_str(), url);

        let builder = match request.method {
            Method::Get => self.client.get(url),
            Method::Post => {
                let builder = self.client.post(url);
                match &request.body {
                    Some(body) => builder.json(body),
                    None => builder,
                }
            }
        };

        let start = Instant::now();
        let response = builder
            .header(reqwest::header::ACCEPT, "application/json")
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(Self::map_send_error)?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| ConduitError::transport(format!("Failed to read response: {}", e)))?;

        debug!(
            status,
            duration_ms = start.elapsed().as_millis() as u64,
            "Response received"
        );

        Ok(WireResponse { status, body })
    }
}
