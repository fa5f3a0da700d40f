//! Single bounded HTTP calls with failure classification.

use std::time::Duration;
use trackdash_core::{Error, NetworkErrorKind, Result};

/// Performs one HTTP call bounded by a timeout and classifies the outcome.
///
/// HTTP-level error statuses are successful transport and are returned as-is
/// for the caller to interpret; only transport failures become errors, with
/// connection resets, aborts, and connection timeouts marked retryable.
#[derive(Debug, Clone)]
pub struct RetryableHttpFetcher {
    client: reqwest::Client,
}

impl RetryableHttpFetcher {
    /// Create a fetcher. Per-call timeouts are applied in [`fetch`], not on
    /// the client, because upstream report computation can take minutes.
    ///
    /// [`fetch`]: RetryableHttpFetcher::fetch
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| Error::configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// The underlying client, for building requests
    #[must_use]
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// Issue one call, aborted when `timeout` fires.
    pub async fn fetch(
        &self,
        request: reqwest::Request,
        timeout: Duration,
    ) -> Result<reqwest::Response> {
        let endpoint = request.url().to_string();
        match tokio::time::timeout(timeout, self.client.execute(request)).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(error)) => Err(classify_transport_error(&endpoint, &error)),
            Err(_elapsed) => Err(Error::network(
                endpoint,
                NetworkErrorKind::Aborted,
                format!("aborted after {timeout:?}"),
            )),
        }
    }
}

/// Map a reqwest transport failure onto the retryability taxonomy.
fn classify_transport_error(endpoint: &str, error: &reqwest::Error) -> Error {
    let kind = if error.is_timeout() {
        NetworkErrorKind::Aborted
    } else if error.is_connect() {
        NetworkErrorKind::ConnectTimeout
    } else if source_is_connection_reset(error) {
        NetworkErrorKind::ConnectionReset
    } else {
        NetworkErrorKind::Other
    };
    Error::network(endpoint, kind, error.to_string())
}

fn source_is_connection_reset(error: &reqwest::Error) -> bool {
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        if let Some(io_error) = cause.downcast_ref::<std::io::Error>() {
            if io_error.kind() == std::io::ErrorKind::ConnectionReset {
                return true;
            }
        }
        source = cause.source();
    }
    false
}
