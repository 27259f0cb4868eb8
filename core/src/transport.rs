//! Executes `HttpRequest` values against the network.
//!
//! `MovieClient` never performs I/O; a `Transport` is the one place a round
//! trip happens. `UreqTransport` is the blocking production implementation.
//! Tests substitute their own.

use std::time::Duration;

use tracing::debug;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};

/// Performs one HTTP round trip.
///
/// Non-2xx responses are not errors at this layer: they come back as an
/// `HttpResponse` for the client to interpret. `Err` means no response was
/// obtained at all.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError>;
}

/// Blocking transport backed by a shared `ureq` agent.
#[derive(Debug, Clone)]
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    /// Build an agent that returns 4xx/5xx responses as data instead of
    /// `Err`, so the core client handles status interpretation.
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    headers: &[(String, String)],
) -> ureq::RequestBuilder<B> {
    for (key, value) in headers {
        builder = builder.header(key.as_str(), value.as_str());
    }
    builder
}

impl Transport for UreqTransport {
    fn execute(&self, req: &HttpRequest) -> Result<HttpResponse, ApiError> {
        debug!(method = %req.method, path = %req.path, "sending request");

        let url = req.path.as_str();
        let result = match (req.method, req.body.as_deref()) {
            (HttpMethod::Get, _) => with_headers(self.agent.get(url), &req.headers).call(),
            (HttpMethod::Delete, _) => with_headers(self.agent.delete(url), &req.headers).call(),
            (HttpMethod::Post, Some(body)) => {
                with_headers(self.agent.post(url), &req.headers).send(body.as_bytes())
            }
            (HttpMethod::Post, None) => {
                with_headers(self.agent.post(url), &req.headers).send_empty()
            }
            (HttpMethod::Put, Some(body)) => {
                with_headers(self.agent.put(url), &req.headers).send(body.as_bytes())
            }
            (HttpMethod::Put, None) => with_headers(self.agent.put(url), &req.headers).send_empty(),
        };
        let mut response = result.map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| ApiError::Transport(format!("failed to read response body: {e}")))?;

        debug!(status, bytes = body.len(), "response received");
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
