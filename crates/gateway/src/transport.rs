//! The transport seam between the gateway's retry loop and the wire.

use async_trait::async_trait;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use bytes::Bytes;
use std::time::Duration;
use trackdash_client::RetryableHttpFetcher;
use trackdash_core::{Error, Result};
use url::Url;

/// An incoming request, reduced to what the gateway relays.
#[derive(Debug, Clone)]
pub struct ProxiedRequest {
    pub method: Method,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// The relayed response.
#[derive(Debug, Clone)]
pub struct ProxiedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// One attempt at delivering a request to the upstream.
///
/// Implementations return `Ok` for any HTTP status — the gateway relays
/// upstream error statuses verbatim — and `Err` only for transport
/// failures, classified for retryability.
#[async_trait]
pub trait ProxyTransport: Send + Sync {
    async fn send(
        &self,
        request: &ProxiedRequest,
        target: &Url,
        timeout: Duration,
    ) -> Result<ProxiedResponse>;
}

/// The production transport, delegating the bounded call and its failure
/// classification to [`RetryableHttpFetcher`].
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    fetcher: RetryableHttpFetcher,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        Ok(Self {
            fetcher: RetryableHttpFetcher::new()?,
        })
    }
}

#[async_trait]
impl ProxyTransport for ReqwestTransport {
    async fn send(
        &self,
        request: &ProxiedRequest,
        target: &Url,
        timeout: Duration,
    ) -> Result<ProxiedResponse> {
        let method =
            reqwest::Method::from_bytes(request.method.as_str().as_bytes()).map_err(|e| {
                Error::configuration(format!("invalid method '{}': {e}", request.method))
            })?;

        let mut builder = self
            .fetcher
            .client()
            .request(method, target.clone())
            .body(request.body.clone());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_bytes());
        }
        let outbound = builder
            .build()
            .map_err(|e| Error::configuration(format!("failed to build proxied request: {e}")))?;

        let response = self.fetcher.fetch(outbound, timeout).await?;
        let status = StatusCode::from_u16(response.status().as_u16())
            .map_err(|e| Error::parse(target.as_str(), format!("invalid status: {e}")))?;

        let mut headers = HeaderMap::new();
        for (name, value) in response.headers() {
            let Ok(name) = HeaderName::from_bytes(name.as_str().as_bytes()) else {
                continue;
            };
            let Ok(value) = HeaderValue::from_bytes(value.as_bytes()) else {
                continue;
            };
            headers.append(name, value);
        }

        let body = response.bytes().await.map_err(|e| {
            Error::network(
                target.as_str(),
                trackdash_core::NetworkErrorKind::Other,
                format!("failed to read proxied body: {e}"),
            )
        })?;
        Ok(ProxiedResponse {
            status,
            headers,
            body,
        })
    }
}
