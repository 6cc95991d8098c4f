//! Network transport port and the reqwest-backed implementation.

use crate::{OutboundRequest, OutboxError, OutboxResult};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method};
use std::time::Duration;
use tracing::debug;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Response of a completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Whether the status is in the 2xx range.
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one HTTP request.
///
/// `Err` means the exchange did not complete (DNS, connect, timeout, or a
/// request that cannot be encoded). Any HTTP status, including errors, is
/// returned as `Ok`.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: &OutboundRequest) -> OutboxResult<TransportResponse>;
}

/// Transport backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Create a transport whose requests time out after `timeout_secs`.
    pub fn new(timeout_secs: u64) -> OutboxResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self { client })
    }

    /// Wrap an existing client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

/// Parse the stored verb and headers into reqwest types.
fn prepare(request: &OutboundRequest) -> OutboxResult<(Method, HeaderMap)> {
    let method = Method::from_bytes(request.method.as_bytes())
        .map_err(|_| OutboxError::InvalidMethod(request.method.clone()))?;

    let mut headers = HeaderMap::with_capacity(request.headers.len());
    for (name, value) in &request.headers {
        let header_name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| OutboxError::InvalidHeader(format!("{name}: {e}")))?;
        let header_value = HeaderValue::from_str(value)
            .map_err(|e| OutboxError::InvalidHeader(format!("{name}: {e}")))?;
        headers.append(header_name, header_value);
    }

    Ok((method, headers))
}

/// Response text, or a description of why it could not be read.
fn body_or_error<E: std::fmt::Display>(url: &str, body: Result<String, E>) -> String {
    match body {
        Ok(text) => text,
        Err(e) => {
            debug!(url = %url, error = %e, "Failed to read response body");
            format!("<unreadable response body: {e}>")
        }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &OutboundRequest) -> OutboxResult<TransportResponse> {
        let (method, headers) = prepare(request)?;

        debug!(url = %request.url, method = %method, bytes = request.body.len(), "Sending request");

        let response = self
            .client
            .request(method, &request.url)
            .headers(headers)
            .body(request.body.clone())
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = body_or_error(&request.url, response.text().await);
        Ok(TransportResponse { status, body })
    }
}
