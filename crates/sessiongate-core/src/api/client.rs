//! Outbound HTTP client used to reach backend destinations.
//!
//! The client reports whatever status the backend answered with; turning a
//! status into an outcome is done by [`ApiError::from_status`](super::ApiError::from_status).

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{header, Client, Method};
use tracing::debug;

use crate::error::GatewayError;
use crate::routes::ProxyMethod;

/// Raw backend answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

#[async_trait]
pub trait UpstreamClient: Send + Sync {
    /// Perform one call. Only transport failures are errors here.
    async fn call(
        &self,
        method: ProxyMethod,
        url: &str,
        body: Option<Vec<u8>>,
    ) -> Result<UpstreamResponse, GatewayError>;
}

/// `UpstreamClient` over reqwest.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ReqwestUpstream {
    client: Client,
}

impl ReqwestUpstream {
    /// Create a client. Without a timeout, reqwest's defaults apply.
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }

    fn method(method: ProxyMethod) -> Method {
        match method {
            ProxyMethod::Get => Method::GET,
            ProxyMethod::Post => Method::POST,
            ProxyMethod::Put => Method::PUT,
            ProxyMethod::Delete => Method::DELETE,
        }
    }
}

#[async_trait]
impl UpstreamClient for ReqwestUpstream {
    async fn call(
        &self,
        method: ProxyMethod,
        url: &str,
        body: Option<Vec<u8>>,
    ) -> Result<UpstreamResponse, GatewayError> {
        debug!(method = %method, url = url, "Forwarding to upstream");

        let mut request = self.client.request(Self::method(method), url);
        if method.carries_body() {
            request = request
                .header(header::CONTENT_TYPE, "application/json")
                .body(body.unwrap_or_default());
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();

        debug!(url = url, status = status, bytes = body.len(), "Upstream answered");
        Ok(UpstreamResponse { status, body })
    }
}
