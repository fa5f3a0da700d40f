//! The gateway's forward path: target computation, header filtering, retry,
//! and response sanitization.

use crate::transport::{ProxiedRequest, ProxiedResponse, ProxyTransport, ReqwestTransport};
use axum::http::header::{CACHE_CONTROL, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use bytes::Bytes;
use std::sync::Arc;
use std::time::Duration;
use trackdash_config::Settings;
use trackdash_core::{constants, retry, Diagnostics, Error, Result, RetryPolicy};
use url::Url;

/// Transparently relays requests to a single fixed upstream origin.
///
/// Applies its own retry/backoff loop for connection-level failures,
/// independent of the report client's endpoint fallback, and sanitizes
/// headers on the way back so intermediate caches never serve stale
/// proxied bytes.
pub struct ProxyGateway {
    transport: Arc<dyn ProxyTransport>,
    upstream_base: Url,
    policy: RetryPolicy,
    timeout: Duration,
    diagnostics: Diagnostics,
}

impl ProxyGateway {
    /// Create a gateway backed by the production transport.
    pub fn new(settings: &Settings, diagnostics: Diagnostics) -> Result<Self> {
        Ok(Self::with_transport(
            Arc::new(ReqwestTransport::new()?),
            settings.upstream_base.clone(),
            RetryPolicy::default(),
            settings.fetch_timeout,
            diagnostics,
        ))
    }

    /// Create a gateway with an explicit transport and retry policy.
    pub fn with_transport(
        transport: Arc<dyn ProxyTransport>,
        upstream_base: Url,
        policy: RetryPolicy,
        timeout: Duration,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            transport,
            upstream_base,
            policy,
            timeout,
            diagnostics,
        }
    }

    /// Relay a request to the upstream.
    ///
    /// `path` and `query` are the remainder after the dashboard's own proxy
    /// prefix has been stripped. Never returns an error: on final failure
    /// the outcome is a 502 gateway-error response carrying the last
    /// error's message and kind.
    pub async fn forward(
        &self,
        request: ProxiedRequest,
        path: &str,
        query: Option<&str>,
    ) -> ProxiedResponse {
        let target = match self.target_url(path, query) {
            Ok(target) => target,
            Err(error) => return gateway_error(&error),
        };
        tracing::debug!(method = %request.method, target = %target, "forwarding to upstream");

        let filtered = ProxiedRequest {
            method: request.method.clone(),
            headers: filter_request_headers(&request.headers),
            body: request.body.clone(),
        };

        let outcome = retry(&self.policy, &self.diagnostics, "proxy_forward", || {
            let filtered = filtered.clone();
            let target = target.clone();
            async move { self.transport.send(&filtered, &target, self.timeout).await }
        })
        .await;

        match outcome {
            Ok(mut response) => {
                sanitize_response_headers(&mut response.headers);
                response
            }
            Err(error) => {
                tracing::error!(target = %target, error = %error, "proxy forward failed");
                gateway_error(&error)
            }
        }
    }

    /// Substitute the dashboard's proxy prefix with the upstream's root.
    fn target_url(&self, path: &str, query: Option<&str>) -> Result<Url> {
        let mut target = self.upstream_base.clone();
        let base_path = target.path().trim_end_matches('/').to_string();
        let suffix = path.trim_start_matches('/');
        target.set_path(&format!("{base_path}/{suffix}"));
        target.set_query(query.filter(|q| !q.is_empty()));
        Ok(target)
    }
}

/// Forward only the safe allow-list of request headers. `accept-encoding`
/// stays behind so the upstream never double-compresses.
fn filter_request_headers(headers: &HeaderMap) -> HeaderMap {
    let mut filtered = HeaderMap::new();
    for name in constants::FORWARDED_REQUEST_HEADERS {
        if let Some(value) = headers.get(*name) {
            if let Ok(name) = axum::http::HeaderName::from_bytes(name.as_bytes()) {
                filtered.insert(name, value.clone());
            }
        }
    }
    filtered
}

/// Strip hop-by-hop and encoding headers, then pin `Cache-Control:
/// no-store` so intermediaries never cache proxied bytes.
fn sanitize_response_headers(headers: &mut HeaderMap) {
    for name in constants::STRIPPED_RESPONSE_HEADERS {
        headers.remove(*name);
    }
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
}

fn gateway_error(error: &Error) -> ProxiedResponse {
    let body = serde_json::json!({
        "error": {
            "kind": error.kind_label(),
            "message": error.to_string(),
        }
    });
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    ProxiedResponse {
        status: StatusCode::BAD_GATEWAY,
        headers,
        body: Bytes::from(body.to_string()),
    }
}
