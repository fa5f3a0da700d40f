//! Route table and handlers.

use crate::error::error_response;
use crate::state::AppState;
use axum::body::Body;
use axum::extract::{Path, Query, RawQuery, State};
use axum::http::{HeaderMap, Method};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use bytes::Bytes;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use trackdash_cache::ReadOutcome;
use trackdash_core::{Error, Result};
use trackdash_gateway::ProxiedRequest;
use trackdash_refresh::{CombinedReportBuilder, RefreshOutcome};

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/cache/report/latest", get(latest_report))
        .route("/cache/report", post(refresh_report))
        .route("/proxy/*path", get(proxy_passthrough).post(proxy_passthrough))
        .route("/auto-refresh", get(auto_refresh).post(auto_refresh))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct LatestQuery {
    #[serde(rename = "readOnly")]
    read_only: Option<String>,
}

/// Serve the latest artifact without touching the upstream. An empty cache
/// directory is a distinct, successful condition.
async fn latest_report(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LatestQuery>,
) -> Response {
    match state.reader.read_latest().await {
        Ok(ReadOutcome::NoArtifacts) => Json(json!({ "hasFile": false })).into_response(),
        Ok(ReadOutcome::Latest(latest)) => {
            let mut body = json!({
                "hasFile": true,
                "artifact": {
                    "name": latest.artifact.name,
                    "mtime": latest.artifact.mtime.to_rfc3339(),
                    "sizeBytes": latest.artifact.size_bytes,
                },
                "metadata": latest.metadata,
            });
            if query.read_only.as_deref() == Some("true") {
                body["rows"] = serde_json::to_value(&latest.rows).unwrap_or(Value::Null);
            }
            Json(body).into_response()
        }
        Err(error) => error_response(&error).into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct RefreshQuery {
    #[serde(rename = "forceRefresh")]
    force_refresh: Option<String>,
}

/// Trigger a fresh upstream fetch and artifact write.
async fn refresh_report(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RefreshQuery>,
) -> Response {
    if query.force_refresh.as_deref() != Some("true") {
        let error = Error::configuration(
            "refusing to refresh without forceRefresh=true".to_string(),
        );
        return error_response(&error).into_response();
    }
    match run_combined_refresh(&state).await {
        Ok(outcome) => Json(refresh_summary(&outcome)).into_response(),
        Err(error) => error_response(&error).into_response(),
    }
}

/// Generic passthrough to the upstream origin. No report semantics.
async fn proxy_passthrough(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
    RawQuery(query): RawQuery,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let proxied = state
        .gateway
        .forward(
            ProxiedRequest {
                method,
                headers,
                body,
            },
            &path,
            query.as_deref(),
        )
        .await;

    let mut response = Response::new(Body::from(proxied.body));
    *response.status_mut() = proxied.status;
    *response.headers_mut() = proxied.headers;
    response
}

#[derive(Debug, Deserialize)]
struct AutoRefreshQuery {
    token: Option<String>,
    #[serde(rename = "refreshData")]
    refresh_data: Option<String>,
}

/// Scheduled-refresh trigger, guarded by the configured shared secret.
async fn auto_refresh(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AutoRefreshQuery>,
) -> Response {
    if query.token.as_deref() != Some(state.settings.refresh_secret.as_str()) {
        tracing::warn!("auto-refresh called with a bad or missing token");
        let error = Error::unauthorized("invalid auto-refresh token");
        return error_response(&error).into_response();
    }

    let next_run_due = (Utc::now() + state.settings.refresh_interval).to_rfc3339();
    if query.refresh_data.as_deref() != Some("true") {
        return Json(json!({ "refreshed": false, "nextRunDue": next_run_due })).into_response();
    }

    match run_combined_refresh(&state).await {
        Ok(outcome) => {
            let mut body = refresh_summary(&outcome);
            body["refreshed"] = json!(true);
            body["nextRunDue"] = json!(next_run_due);
            Json(body).into_response()
        }
        Err(error) => error_response(&error).into_response(),
    }
}

async fn run_combined_refresh(state: &AppState) -> Result<RefreshOutcome> {
    let (report_a, report_b) = state.settings.combined_report_ids()?;
    let builder = CombinedReportBuilder::new(
        state.client.clone(),
        state.store.clone(),
        report_a,
        report_b,
    );
    builder.build_and_persist().await
}

fn refresh_summary(outcome: &RefreshOutcome) -> Value {
    json!({
        "artifact": outcome.artifact.name,
        "totalRows": outcome.result.rows.len(),
        "sourceACount": outcome.result.counts.source_a,
        "sourceBCount": outcome.result.counts.source_b,
        "fetchDurationMs": outcome.result.fetch_duration.as_millis() as u64,
    })
}
