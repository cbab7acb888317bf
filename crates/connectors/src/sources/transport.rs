//! HTTP transport seam used by the REST adapter.
//!
//! The adapter only needs "send this request, give me status and body"; the
//! reqwest-backed implementation is the default and tests can swap in their
//! own.

use anyquery_error::{ErrorCode, ErrorContext, QueryError, Result};
use async_trait::async_trait;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: String,
    pub url: String,
    /// Ordered query pairs; a key may repeat.
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parsed JSON body; an empty body reads as JSON `null`.
    pub fn json(&self, endpoint: &str) -> Result<serde_json::Value> {
        if self.body.trim().is_empty() {
            return Ok(serde_json::Value::Null);
        }
        serde_json::from_str(&self.body).map_err(|e| {
            QueryError::new(
                ErrorCode::SerializationFailed,
                format!("Response from {} is not valid JSON: {}", endpoint, e),
            )
            .with_context(ErrorContext::Transport {
                endpoint: endpoint.to_string(),
                status: Some(self.status),
                body: excerpt(&self.body),
            })
        })
    }
}

/// First 512 characters of a body, for error context.
pub fn excerpt(body: &str) -> String {
    const LIMIT: usize = 512;
    match body.char_indices().nth(LIMIT) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[async_trait]
pub trait Transport: Send + Sync + fmt::Debug {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let method = reqwest::Method::from_bytes(request.method.to_uppercase().as_bytes())
            .map_err(|_| {
                QueryError::new(
                    ErrorCode::InvalidConfig,
                    format!("Unsupported HTTP method '{}'", request.method),
                )
            })?;

        let mut req = self
            .client
            .request(method, &request.url)
            .query(&request.query);
        for (k, v) in &request.headers {
            req = req.header(k, v);
        }

        let resp = req.send().await.map_err(|e| {
            QueryError::new(
                ErrorCode::SourceUnavailable,
                format!("Request to {} failed: {}", request.url, e),
            )
            .with_context(ErrorContext::Transport {
                endpoint: request.url.clone(),
                status: None,
                body: String::new(),
            })
        })?;

        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(|e| {
            QueryError::new(
                ErrorCode::TransportFailed,
                format!("Failed to read response body from {}: {}", request.url, e),
            )
        })?;

        Ok(HttpResponse { status, body })
    }
}
