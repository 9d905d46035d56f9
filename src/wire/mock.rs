//! Scripted transport for testing.
//!
//! Replays queued responses in order and records every request it receives.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use super::{Transport, WireRequest, WireResponse};
use crate::error::{ConduitError, Result};

#[derive(Debug, Clone)]
enum Reply {
    Respond(WireResponse),
    Fail(String),
}

/// A mock transport that returns predefined responses.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<Reply>>,
    requests: Mutex<Vec<WireRequest>>,
    latency: Duration,
}

impl ScriptedTransport {
    /// Creates a transport with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a response with the given status and body.
    pub fn with_response(self, status: u16, body: impl Into<String>) -> Self {
        self.push(Reply::Respond(WireResponse::new(status, body)));
        self
    }

    /// Queues a transport-level failure (e.g. connection refused).
    pub fn with_transport_error(self, message: impl Into<String>) -> Self {
        self.push(Reply::Fail(message.into()));
        self
    }

    /// Delays every reply by `latency`, as a slow server would.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Returns a copy of every request received so far.
    pub fn requests(&self) -> Vec<WireRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    /// Returns the number of requests received so far.
    pub fn request_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or_default()
    }

    /// Returns the encoded paths of every request received so far.
    pub fn paths(&self) -> Vec<String> {
        self.requests().iter().map(WireRequest::path).collect()
    }

    /// Returns the number of queued replies not yet consumed.
    pub fn remaining(&self) -> usize {
        self.replies.lock().map(|r| r.len()).unwrap_or_default()
    }

    fn push(&self, reply: Reply) {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(reply);
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: WireRequest) -> Result<WireResponse> {
        let path = request.path();

        self.requests
            .lock()
            .map_err(|_| ConduitError::internal("request log poisoned"))?
            .push(request);

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let reply = self
            .replies
            .lock()
            .map_err(|_| ConduitError::internal("reply script poisoned"))?
            .pop_front();

        match reply {
            Some(Reply::Respond(response)) => Ok(response),
            Some(Reply::Fail(message)) => Err(ConduitError::transport(message)),
            None => Err(ConduitError::internal(format!(
                "No scripted response left for {path}"
            ))),
        }
    }
}
