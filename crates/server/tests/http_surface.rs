//! End-to-end exercises of the HTTP surface against a mock upstream and a
//! temporary cache directory.

use std::time::Duration;
use tempfile::TempDir;
use trackdash_config::Settings;
use trackdash_server::{router, AppState};
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const REPORT_A: u32 = 1;
const REPORT_B: u32 = 2;

fn settings(upstream: &str, cache_dir: &TempDir) -> Settings {
    Settings {
        upstream_base: Url::parse(upstream).unwrap(),
        access_token: "test-token".into(),
        refresh_secret: "hush".into(),
        cache_dir: cache_dir.path().to_path_buf(),
        retention: 7,
        fetch_timeout: Duration::from_secs(10),
        refresh_interval: Duration::from_secs(21600),
        heavy_report_ids: vec![42],
        report_a: Some(REPORT_A),
        report_b: Some(REPORT_B),
        listen: "127.0.0.1:0".parse().unwrap(),
    }
}

async fn spawn_app(settings: Settings) -> String {
    let state = AppState::new(settings).unwrap();
    let app = router(state);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn mount_report(server: &MockServer, report_id: u32, body: &str) {
    Mock::given(method("GET"))
        .and(path("/reporting/rpc"))
        .and(query_param("function", "get_report_data"))
        .and(query_param("token", "test-token"))
        .and(query_param("reportid", report_id.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

#[tokio::test]
async fn empty_cache_reports_no_file() {
    let upstream = MockServer::start().await;
    let cache = TempDir::new().unwrap();
    let base = spawn_app(settings(&upstream.uri(), &cache)).await;

    let body: serde_json::Value = reqwest::get(format!("{base}/cache/report/latest"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["hasFile"], serde_json::json!(false));
}

#[tokio::test]
async fn refresh_requires_the_force_flag() {
    let upstream = MockServer::start().await;
    let cache = TempDir::new().unwrap();
    let base = spawn_app(settings(&upstream.uri(), &cache)).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/cache/report"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 400);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"]["kind"], serde_json::json!("configuration"));
}

#[tokio::test]
async fn forced_refresh_persists_and_reads_back() {
    let upstream = MockServer::start().await;
    mount_report(
        &upstream,
        REPORT_A,
        r#"[{"user":"u1","score":10},{"user":"u2","score":20}]"#,
    )
    .await;
    mount_report(&upstream, REPORT_B, r#"[{"user":"u3","score":30}]"#).await;

    let cache = TempDir::new().unwrap();
    let base = spawn_app(settings(&upstream.uri(), &cache)).await;
    let http = reqwest::Client::new();

    let response = http
        .post(format!("{base}/cache/report?forceRefresh=true"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    let summary: serde_json::Value = response.json().await.unwrap();
    assert_eq!(summary["totalRows"], serde_json::json!(3));
    assert_eq!(summary["sourceACount"], serde_json::json!(2));
    assert_eq!(summary["sourceBCount"], serde_json::json!(1));
    let artifact = summary["artifact"].as_str().unwrap();
    assert!(artifact.starts_with("report-"));

    let body: serde_json::Value = http
        .get(format!("{base}/cache/report/latest?readOnly=true"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["hasFile"], serde_json::json!(true));
    assert_eq!(body["artifact"]["name"], serde_json::json!(artifact));
    assert_eq!(body["metadata"]["total_rows"], serde_json::json!("3"));
    let rows = body["rows"].as_array().unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[0]["user"], serde_json::json!("u1"));
    assert_eq!(rows[2]["user"], serde_json::json!("u3"));

    // Without readOnly the rows stay out of the payload.
    let body: serde_json::Value = http
        .get(format!("{base}/cache/report/latest"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(body.get("rows").is_none());
}

#[tokio::test]
async fn failed_upstream_fetch_surfaces_as_bad_gateway() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reporting/rpc"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"errorcode":"invalidtoken","message":"nope"}"#),
        )
        .mount(&upstream)
        .await;

    let cache = TempDir::new().unwrap();
    let base = spawn_app(settings(&upstream.uri(), &cache)).await;

    let response = reqwest::Client::new()
        .post(format!("{base}/cache/report?forceRefresh=true"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 502);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"]["upstreamCode"], serde_json::json!("invalidtoken"));
}

#[tokio::test]
async fn auto_refresh_rejects_a_bad_token() {
    let upstream = MockServer::start().await;
    let cache = TempDir::new().unwrap();
    let base = spawn_app(settings(&upstream.uri(), &cache)).await;

    let response = reqwest::get(format!("{base}/auto-refresh?token=wrong&refreshData=true"))
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 401);

    let response = reqwest::get(format!("{base}/auto-refresh")).await.unwrap();
    assert_eq!(response.status().as_u16(), 401);
}

#[tokio::test]
async fn auto_refresh_without_the_data_flag_only_reports_the_schedule() {
    let upstream = MockServer::start().await;
    let cache = TempDir::new().unwrap();
    let base = spawn_app(settings(&upstream.uri(), &cache)).await;

    let body: serde_json::Value = reqwest::get(format!("{base}/auto-refresh?token=hush"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["refreshed"], serde_json::json!(false));
    assert!(body["nextRunDue"].as_str().is_some());
    assert_eq!(upstream.received_requests().await.unwrap().len(), 0);
}

#[tokio::test]
async fn auto_refresh_with_the_data_flag_runs_the_refresh() {
    let upstream = MockServer::start().await;
    mount_report(&upstream, REPORT_A, r#"[{"user":"u1"}]"#).await;
    mount_report(&upstream, REPORT_B, r#"[{"user":"u2"}]"#).await;

    let cache = TempDir::new().unwrap();
    let base = spawn_app(settings(&upstream.uri(), &cache)).await;

    let body: serde_json::Value =
        reqwest::get(format!("{base}/auto-refresh?token=hush&refreshData=true"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
    assert_eq!(body["refreshed"], serde_json::json!(true));
    assert_eq!(body["totalRows"], serde_json::json!(2));
    assert!(body["nextRunDue"].as_str().is_some());
}

#[tokio::test]
async fn proxy_passthrough_sanitizes_response_headers() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reporting/status"))
        .and(query_param("verbose", "1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("ok")
                .insert_header("content-encoding", "gzip")
                .insert_header("x-upstream-build", "9.7"),
        )
        .mount(&upstream)
        .await;

    let cache = TempDir::new().unwrap();
    let base = spawn_app(settings(&upstream.uri(), &cache)).await;

    let response = reqwest::get(format!("{base}/proxy/reporting/status?verbose=1"))
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert!(response.headers().get("content-encoding").is_none());
    assert_eq!(
        response.headers().get("cache-control").unwrap(),
        "no-store"
    );
    assert_eq!(response.headers().get("x-upstream-build").unwrap(), "9.7");
    assert_eq!(response.text().await.unwrap(), "ok");
}
