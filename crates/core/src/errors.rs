use std::path::PathBuf;
use std::time::Duration;

/// Result type alias for trackdash operations
pub type Result<T> = std::result::Result<T, Error>;

/// Classification of a transport-level failure, used to decide whether a
/// call is worth retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkErrorKind {
    /// The peer reset the connection mid-flight
    ConnectionReset,
    /// The bounded call was aborted by its timeout signal
    Aborted,
    /// The connection could not be established in time
    ConnectTimeout,
    /// Any other transport failure (DNS, TLS, protocol, ...)
    Other,
}

impl NetworkErrorKind {
    /// Connection resets, aborts, and connection timeouts are transient;
    /// everything else is not.
    #[must_use]
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            NetworkErrorKind::ConnectionReset
                | NetworkErrorKind::Aborted
                | NetworkErrorKind::ConnectTimeout
        )
    }
}

impl std::fmt::Display for NetworkErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NetworkErrorKind::ConnectionReset => "connection reset",
            NetworkErrorKind::Aborted => "aborted",
            NetworkErrorKind::ConnectTimeout => "connect timeout",
            NetworkErrorKind::Other => "other",
        };
        f.write_str(s)
    }
}

/// One failed trial in an endpoint fallback chain, kept for the aggregated
/// all-endpoints-failed report.
#[derive(Debug, Clone)]
pub struct EndpointAttempt {
    pub endpoint: String,
    pub status: Option<u16>,
    pub message: String,
}

impl std::fmt::Display for EndpointAttempt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} (status {}): {}", self.endpoint, status, self.message),
            None => write!(f, "{}: {}", self.endpoint, self.message),
        }
    }
}

/// Core error type for trackdash operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport-level network errors
    #[error("network error for '{endpoint}' ({kind}): {message}")]
    Network {
        endpoint: String,
        kind: NetworkErrorKind,
        message: String,
    },

    /// The upstream answered with a well-formed error payload
    #[error("upstream error from '{endpoint}' ({code}): {message}")]
    Upstream {
        endpoint: String,
        code: String,
        message: String,
    },

    /// The upstream answered with a non-2xx status and no usable payload
    #[error("upstream '{endpoint}' returned HTTP {status}: {message}")]
    HttpStatus {
        endpoint: String,
        status: u16,
        message: String,
    },

    /// The upstream was reachable but its payload was unusable
    #[error("failed to parse response from '{endpoint}': {message}")]
    Parse { endpoint: String, message: String },

    /// Every endpoint in a fallback chain was exhausted
    #[error("report {report_id}: all endpoints failed: {}", format_attempts(.attempts))]
    AllEndpointsFailed {
        report_id: u32,
        attempts: Vec<EndpointAttempt>,
    },

    /// File system operations
    #[error("file system {operation} operation failed for '{path}': {source}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    /// Both sources of a combined report came back empty
    #[error("refusing to persist an empty combined report (sources '{source_a}' and '{source_b}' both returned zero rows)")]
    EmptyCombinedResult { source_a: String, source_b: String },

    /// Configuration errors
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// Shared-secret check failed
    #[error("unauthorized: {message}")]
    Unauthorized { message: String },

    /// Operation timeout errors
    #[error("operation '{operation}' timed out after {duration:?}")]
    Timeout {
        operation: String,
        duration: Duration,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },
}

fn format_attempts(attempts: &[EndpointAttempt]) -> String {
    attempts
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::Json {
            message: error.to_string(),
            source: error,
        }
    }
}

impl Error {
    /// Create a network error with its retryability classification
    #[must_use]
    pub fn network(
        endpoint: impl Into<String>,
        kind: NetworkErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Error::Network {
            endpoint: endpoint.into(),
            kind,
            message: message.into(),
        }
    }

    /// Create an upstream application error
    #[must_use]
    pub fn upstream(
        endpoint: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Error::Upstream {
            endpoint: endpoint.into(),
            code: code.into(),
            message: message.into(),
        }
    }

    /// Create an HTTP status error
    #[must_use]
    pub fn http_status(endpoint: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Error::HttpStatus {
            endpoint: endpoint.into(),
            status,
            message: message.into(),
        }
    }

    /// Create a parse error
    #[must_use]
    pub fn parse(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Parse {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create a file system error with context
    #[must_use]
    pub fn file_system(
        path: impl Into<PathBuf>,
        operation: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Error::FileSystem {
            path: path.into(),
            operation: operation.into(),
            source,
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Create an unauthorized error
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Error::Unauthorized {
            message: message.into(),
        }
    }

    /// Create a timeout error
    #[must_use]
    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Error::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Whether retrying the same call could plausibly succeed.
    ///
    /// Only transient transport failures qualify. HTTP-level error statuses,
    /// upstream application errors, and parse failures never do.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Network { kind, .. } => kind.is_retryable(),
            Error::Timeout { .. } => true,
            _ => false,
        }
    }

    /// A short stable identifier for the error kind, used in structured
    /// failure payloads at the HTTP boundary.
    #[must_use]
    pub fn kind_label(&self) -> &'static str {
        match self {
            Error::Network { .. } => "network",
            Error::Upstream { .. } => "upstream",
            Error::HttpStatus { .. } => "http_status",
            Error::Parse { .. } => "parse",
            Error::AllEndpointsFailed { .. } => "all_endpoints_failed",
            Error::FileSystem { .. } => "file_system",
            Error::EmptyCombinedResult { .. } => "empty_combined_result",
            Error::Configuration { .. } => "configuration",
            Error::Unauthorized { .. } => "unauthorized",
            Error::Timeout { .. } => "timeout",
            Error::Json { .. } => "json",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryability_follows_network_kind() {
        assert!(Error::network("u", NetworkErrorKind::ConnectionReset, "reset").is_retryable());
        assert!(Error::network("u", NetworkErrorKind::Aborted, "abort").is_retryable());
        assert!(Error::network("u", NetworkErrorKind::ConnectTimeout, "ct").is_retryable());
        assert!(!Error::network("u", NetworkErrorKind::Other, "dns").is_retryable());
        assert!(!Error::http_status("u", 500, "fault").is_retryable());
        assert!(!Error::upstream("u", "invalidtoken", "bad token").is_retryable());
        assert!(!Error::parse("u", "not json").is_retryable());
    }

    #[test]
    fn aggregated_error_lists_every_attempt() {
        let err = Error::AllEndpointsFailed {
            report_id: 7,
            attempts: vec![
                EndpointAttempt {
                    endpoint: "get_report_data".into(),
                    status: Some(500),
                    message: "internal error".into(),
                },
                EndpointAttempt {
                    endpoint: "run_report".into(),
                    status: None,
                    message: "connection reset".into(),
                },
            ],
        };
        let rendered = err.to_string();
        assert!(rendered.contains("get_report_data (status 500)"));
        assert!(rendered.contains("run_report: connection reset"));
    }
}
