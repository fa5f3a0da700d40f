//! Mapping core errors onto structured HTTP failure payloads.

use axum::http::StatusCode;
use axum::Json;
use serde_json::{json, Value};
use trackdash_core::Error;

/// Render an error as `{ "error": { kind, message, upstreamCode? } }` with
/// a status that distinguishes "we rejected you" from "the upstream let us
/// down".
pub fn error_response(error: &Error) -> (StatusCode, Json<Value>) {
    let status = match error {
        Error::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
        Error::Configuration { .. } => StatusCode::BAD_REQUEST,
        Error::Network { .. }
        | Error::Upstream { .. }
        | Error::HttpStatus { .. }
        | Error::Parse { .. }
        | Error::AllEndpointsFailed { .. }
        | Error::Timeout { .. }
        | Error::EmptyCombinedResult { .. } => StatusCode::BAD_GATEWAY,
        Error::FileSystem { .. } | Error::Json { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let mut payload = json!({
        "kind": error.kind_label(),
        "message": error.to_string(),
    });
    if let Error::Upstream { code, .. } = error {
        payload["upstreamCode"] = json!(code);
    }
    (status, Json(json!({ "error": payload })))
}
