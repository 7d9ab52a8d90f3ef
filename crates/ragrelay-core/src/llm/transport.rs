//! Network boundary for provider calls
//!
//! Shape adapters build a [`ProviderRequest`]; a [`ProviderTransport`]
//! delivers it. The HTTP transport is the production implementation, tests
//! plug in scripted transports.

use crate::error::{FailureKind, ProviderFailure, Result};
use crate::providers::ProviderDescriptor;
use async_trait::async_trait;
use std::time::Duration;

/// Outgoing provider request
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: serde_json::Value,
}

/// Raw provider response
#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub status: u16,
    pub body: String,
}

impl ProviderResponse {
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Delivers requests to provider endpoints
#[async_trait]
pub trait ProviderTransport: Send + Sync {
    async fn send(
        &self,
        provider: &ProviderDescriptor,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderFailure>;
}

/// reqwest-backed transport
pub struct HttpTransport {
    http_client: reqwest::Client,
}

impl HttpTransport {
    /// Create transport; `timeout` bounds each HTTP exchange
    pub fn new(timeout: Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http_client })
    }
}

#[async_trait]
impl ProviderTransport for HttpTransport {
    async fn send(
        &self,
        provider: &ProviderDescriptor,
        request: ProviderRequest,
    ) -> std::result::Result<ProviderResponse, ProviderFailure> {
        let mut req = self.http_client.post(&request.url).json(&request.body);
        for (name, value) in &request.headers {
            req = req.header(name.as_str(), value.as_str());
        }

        let response = req.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderFailure::timeout(&provider.name)
            } else {
                ProviderFailure::new(&provider.name, FailureKind::Unclassified, e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                ProviderFailure::timeout(&provider.name)
            } else {
                ProviderFailure::malformed(&provider.name, e.to_string())
            }
        })?;

        Ok(ProviderResponse { status, body })
    }
}

/// Send a request under a deadline and decode the JSON body.
///
/// Non-success statuses are classified, an elapsed deadline is a timeout
/// and an undecodable body is a malformed response.
pub async fn exchange(
    transport: &dyn ProviderTransport,
    provider: &ProviderDescriptor,
    request: ProviderRequest,
    deadline: Duration,
) -> std::result::Result<serde_json::Value, ProviderFailure> {
    let response = match tokio::time::timeout(deadline, transport.send(provider, request)).await {
        Ok(result) => result?,
        Err(_) => return Err(ProviderFailure::timeout(&provider.name)),
    };

    if !response.is_success() {
        return Err(ProviderFailure::from_status(
            &provider.name,
            response.status,
            &response.body,
        ));
    }

    serde_json::from_str(&response.body)
        .map_err(|e| ProviderFailure::malformed(&provider.name, format!("invalid JSON: {}", e)))
}
