//! The remote report client.
//!
//! Resilience at this layer is about *endpoint* fallback, not network
//! retry: each endpoint strategy is tried exactly once, in order, and the
//! chain short-circuits on first success. Network-level retries belong to
//! the proxy gateway.

use crate::fetcher::RetryableHttpFetcher;
use chrono::Utc;
use serde_json::Value;
use std::time::{Duration, Instant};
use trackdash_config::Settings;
use trackdash_core::{
    constants, DiagnosticEvent, Diagnostics, EndpointAttempt, Error, FetchResult, ReportRow,
    Result,
};
use url::Url;

/// Client for the upstream's report RPC.
#[derive(Debug, Clone)]
pub struct RemoteReportClient {
    fetcher: RetryableHttpFetcher,
    upstream_base: Url,
    access_token: String,
    heavy_report_ids: Vec<u32>,
    timeout: Duration,
    diagnostics: Diagnostics,
}

impl RemoteReportClient {
    pub fn new(settings: &Settings, diagnostics: Diagnostics) -> Result<Self> {
        Ok(Self {
            fetcher: RetryableHttpFetcher::new()?,
            upstream_base: settings.upstream_base.clone(),
            access_token: settings.access_token.clone(),
            heavy_report_ids: settings.heavy_report_ids.clone(),
            timeout: settings.fetch_timeout,
            diagnostics,
        })
    }

    /// Run a configurable report, with the view-report fallback enabled for
    /// heavy report IDs.
    pub async fn run_report(
        &self,
        report_id: u32,
        filters: &[(String, String)],
    ) -> Result<FetchResult> {
        self.run(report_id, filters, true).await
    }

    /// Run a configurable report through the RPC path only.
    pub async fn run_report_rest_only(
        &self,
        report_id: u32,
        filters: &[(String, String)],
    ) -> Result<FetchResult> {
        self.run(report_id, filters, false).await
    }

    async fn run(
        &self,
        report_id: u32,
        filters: &[(String, String)],
        allow_fallback: bool,
    ) -> Result<FetchResult> {
        let started = Instant::now();
        let mut attempts: Vec<EndpointAttempt> = Vec::new();
        let mut saw_server_fault = false;

        for function in constants::RPC_FUNCTION_CANDIDATES {
            let url = self.rpc_url(function, report_id, filters);
            match self.try_endpoint(function, url).await {
                TrialOutcome::Rows(rows) => {
                    return Ok(self.finish(rows, function, started));
                }
                TrialOutcome::ServerFault { status, message } => {
                    tracing::warn!(
                        report_id,
                        endpoint = function,
                        status,
                        "RPC endpoint returned a server fault"
                    );
                    saw_server_fault = true;
                    attempts.push(EndpointAttempt {
                        endpoint: (*function).to_string(),
                        status: Some(status),
                        message,
                    });
                }
                TrialOutcome::Transport(error) => {
                    tracing::warn!(
                        report_id,
                        endpoint = function,
                        error = %error,
                        "RPC endpoint unreachable"
                    );
                    attempts.push(EndpointAttempt {
                        endpoint: (*function).to_string(),
                        status: None,
                        message: error.to_string(),
                    });
                }
                // Upstream application errors, parse failures, and client
                // errors mean the upstream is reachable and rejecting us;
                // another endpoint will not change that.
                TrialOutcome::Fatal(error) => return Err(error),
            }
        }

        if allow_fallback && saw_server_fault && self.heavy_report_ids.contains(&report_id) {
            self.diagnostics.emit(DiagnosticEvent::FallbackEngaged {
                report_id,
                endpoint: "viewreport".to_string(),
            });
            tracing::info!(report_id, "engaging view-report fallback");
            let url = self.view_report_url(report_id, filters);
            match self.try_fallback(url).await {
                Ok(rows) => return Ok(self.finish(rows, "viewreport", started)),
                Err(error) => attempts.push(EndpointAttempt {
                    endpoint: "viewreport".to_string(),
                    status: match &error {
                        Error::HttpStatus { status, .. } => Some(*status),
                        _ => None,
                    },
                    message: error.to_string(),
                }),
            }
        }

        Err(Error::AllEndpointsFailed {
            report_id,
            attempts,
        })
    }

    fn finish(&self, rows: Vec<ReportRow>, source_label: &str, started: Instant) -> FetchResult {
        let result = FetchResult {
            rows,
            fetched_at: Utc::now(),
            fetch_duration: started.elapsed(),
            source_label: source_label.to_string(),
        };
        tracing::info!(
            source = source_label,
            rows = result.rows.len(),
            duration_ms = result.fetch_duration.as_millis() as u64,
            "report fetched"
        );
        result
    }

    /// One RPC trial. Network retry is deliberately absent here.
    async fn try_endpoint(&self, endpoint: &str, url: Url) -> TrialOutcome {
        let request = match self.fetcher.client().get(url).build() {
            Ok(request) => request,
            Err(e) => {
                return TrialOutcome::Fatal(Error::configuration(format!(
                    "failed to build request for '{endpoint}': {e}"
                )))
            }
        };
        let response = match self.fetcher.fetch(request, self.timeout).await {
            Ok(response) => response,
            Err(error) => return TrialOutcome::Transport(error),
        };

        let status = response.status().as_u16();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                return TrialOutcome::Transport(Error::network(
                    endpoint,
                    trackdash_core::NetworkErrorKind::Other,
                    format!("failed to read body: {e}"),
                ))
            }
        };

        if (500..600).contains(&status) {
            return TrialOutcome::ServerFault {
                status,
                message: snippet(&body),
            };
        }
        if status >= 400 {
            return TrialOutcome::Fatal(Error::http_status(endpoint, status, snippet(&body)));
        }
        match parse_report_body(endpoint, &body) {
            Ok(rows) => TrialOutcome::Rows(rows),
            Err(error) => TrialOutcome::Fatal(error),
        }
    }

    /// The view-report fallback trial. Attempted at most once per run.
    async fn try_fallback(&self, url: Url) -> Result<Vec<ReportRow>> {
        let endpoint = "viewreport";
        let request = self
            .fetcher
            .client()
            .get(url)
            .build()
            .map_err(|e| Error::configuration(format!("failed to build fallback request: {e}")))?;
        let response = self.fetcher.fetch(request, self.timeout).await?;
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| {
            Error::network(
                endpoint,
                trackdash_core::NetworkErrorKind::Other,
                format!("failed to read body: {e}"),
            )
        })?;
        if status >= 400 {
            return Err(Error::http_status(endpoint, status, snippet(&body)));
        }
        parse_fallback_body(endpoint, &body)
    }

    fn rpc_url(&self, function: &str, report_id: u32, filters: &[(String, String)]) -> Url {
        let mut url = self.upstream_base.clone();
        url.set_path(constants::RPC_PATH);
        url.query_pairs_mut()
            .append_pair("function", function)
            .append_pair("token", &self.access_token)
            .append_pair("reportid", &report_id.to_string());
        append_filters(&mut url, filters);
        url
    }

    fn view_report_url(&self, report_id: u32, filters: &[(String, String)]) -> Url {
        let mut url = self.upstream_base.clone();
        url.set_path(constants::VIEW_REPORT_PATH);
        url.query_pairs_mut()
            .append_pair("id", &report_id.to_string())
            .append_pair("token", &self.access_token)
            .append_pair("format", "json");
        append_filters(&mut url, filters);
        url
    }
}

fn append_filters(url: &mut Url, filters: &[(String, String)]) {
    let mut pairs = url.query_pairs_mut();
    for (key, value) in filters {
        pairs.append_pair(key, value);
    }
}

enum TrialOutcome {
    Rows(Vec<ReportRow>),
    /// 5xx: eligible to trigger the heavy-report fallback
    ServerFault { status: u16, message: String },
    /// Transport failure: move on to the next endpoint
    Transport(Error),
    /// Reachable-but-rejecting: abort the whole chain
    Fatal(Error),
}

/// Parse an RPC response body into rows.
///
/// An empty payload is a successful zero-row fetch. A 2xx body may still
/// carry an upstream error payload (`exception` / `errorcode` fields).
fn parse_report_body(endpoint: &str, body: &str) -> Result<Vec<ReportRow>> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    let value: Value = serde_json::from_str(body)
        .map_err(|e| Error::parse(endpoint, format!("body is not valid JSON: {e}")))?;
    rows_from_value(endpoint, value)
}

/// Parse a view-report fallback body, which may itself be a JSON-encoded
/// string containing the actual JSON document.
fn parse_fallback_body(endpoint: &str, body: &str) -> Result<Vec<ReportRow>> {
    if body.trim().is_empty() {
        return Ok(Vec::new());
    }
    let value: Value = serde_json::from_str(body)
        .map_err(|e| Error::parse(endpoint, format!("body is not valid JSON: {e}")))?;
    match value {
        Value::String(inner) => {
            let inner_value: Value = serde_json::from_str(&inner).map_err(|e| {
                Error::parse(
                    endpoint,
                    format!("string-wrapped body is not valid JSON: {e}"),
                )
            })?;
            rows_from_value(endpoint, inner_value)
        }
        other => rows_from_value(endpoint, other),
    }
}

fn rows_from_value(endpoint: &str, value: Value) -> Result<Vec<ReportRow>> {
    if let Some(error) = detect_upstream_error(endpoint, &value) {
        return Err(error);
    }
    let records = match value {
        Value::Array(records) => records,
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(records)) => records,
            Some(_) => {
                return Err(Error::parse(endpoint, "'data' field is not an array"));
            }
            None => {
                return Err(Error::parse(
                    endpoint,
                    "body is neither an array nor an object with a 'data' field",
                ));
            }
        },
        _ => {
            return Err(Error::parse(
                endpoint,
                "body is neither an array nor an object with a 'data' field",
            ));
        }
    };

    records
        .into_iter()
        .map(|record| match record {
            Value::Object(map) => Ok(map.into_iter().collect()),
            other => Err(Error::parse(
                endpoint,
                format!("expected a record object, got: {other}"),
            )),
        })
        .collect()
}

/// A well-formed response carrying an exception or error-code field is an
/// upstream application error, never a transport problem.
fn detect_upstream_error(endpoint: &str, value: &Value) -> Option<Error> {
    let map = value.as_object()?;
    let code = map
        .get("errorcode")
        .or_else(|| map.get("exception"))
        .and_then(Value::as_str)?;
    let message = map
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("upstream reported an error");
    Some(Error::upstream(endpoint, code, message))
}

fn snippet(body: &str) -> String {
    const LIMIT: usize = 200;
    let trimmed = body.trim();
    if trimmed.len() <= LIMIT {
        trimmed.to_string()
    } else {
        let mut end = LIMIT;
        while !trimmed.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}...", &trimmed[..end])
    }
}
