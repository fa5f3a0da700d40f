//! Endpoint fallback behavior of the remote report client, exercised
//! against a mock upstream.

use std::time::Duration;
use trackdash_client::RemoteReportClient;
use trackdash_config::Settings;
use trackdash_core::{DiagnosticEvent, Diagnostics, Error};
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const HEAVY_ID: u32 = 42;
const LIGHT_ID: u32 = 7;

fn settings(upstream: &str) -> Settings {
    Settings {
        upstream_base: Url::parse(upstream).unwrap(),
        access_token: "test-token".into(),
        refresh_secret: "unused".into(),
        cache_dir: "./cache".into(),
        retention: 7,
        fetch_timeout: Duration::from_secs(10),
        refresh_interval: Duration::from_secs(21600),
        heavy_report_ids: vec![HEAVY_ID],
        report_a: None,
        report_b: None,
        listen: "127.0.0.1:0".parse().unwrap(),
    }
}

fn client(upstream: &str, diagnostics: Diagnostics) -> RemoteReportClient {
    RemoteReportClient::new(&settings(upstream), diagnostics).unwrap()
}

#[tokio::test]
async fn first_successful_endpoint_short_circuits_the_chain() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reporting/rpc"))
        .and(query_param("function", "get_report_data"))
        .and(query_param("token", "test-token"))
        .and(query_param("reportid", LIGHT_ID.to_string()))
        .and(query_param("course", "31"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"[{"user":"u1","score":10}]"#))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/reporting/rpc"))
        .and(query_param("function", "run_report"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .expect(0)
        .mount(&server)
        .await;

    let client = client(&server.uri(), Diagnostics::default());
    let filters = vec![("course".to_string(), "31".to_string())];
    let result = client.run_report(LIGHT_ID, &filters).await.unwrap();
    assert_eq!(result.rows.len(), 1);
    assert_eq!(result.source_label, "get_report_data");
}

#[tokio::test]
async fn server_faults_move_on_to_the_next_candidate() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reporting/rpc"))
        .and(query_param("function", "get_report_data"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/reporting/rpc"))
        .and(query_param("function", "run_report"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"data":[{"a":1}]}"#))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server.uri(), Diagnostics::default());
    let result = client.run_report(LIGHT_ID, &[]).await.unwrap();
    assert_eq!(result.rows.len(), 1);
    assert_eq!(result.source_label, "run_report");
}

#[tokio::test]
async fn non_heavy_reports_never_engage_the_fallback() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reporting/rpc"))
        .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/reporting/viewreport.php"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .expect(0)
        .mount(&server)
        .await;

    let client = client(&server.uri(), Diagnostics::default());
    let error = client.run_report(LIGHT_ID, &[]).await.unwrap_err();
    match error {
        Error::AllEndpointsFailed { report_id, attempts } => {
            assert_eq!(report_id, LIGHT_ID);
            assert_eq!(attempts.len(), 2);
            assert!(attempts.iter().all(|a| a.status == Some(500)));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn heavy_reports_fall_back_exactly_once_on_server_fault() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reporting/rpc"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .expect(2)
        .mount(&server)
        .await;
    // The fallback body is a JSON-encoded string wrapping the document.
    let wrapped = serde_json::to_string(r#"[{"user":"u1"},{"user":"u2"}]"#).unwrap();
    Mock::given(method("GET"))
        .and(path("/reporting/viewreport.php"))
        .and(query_param("id", HEAVY_ID.to_string()))
        .and(query_param("format", "json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(wrapped))
        .expect(1)
        .mount(&server)
        .await;

    let diagnostics = Diagnostics::default();
    let mut events = diagnostics.subscribe();
    let client = client(&server.uri(), diagnostics);
    let result = client.run_report(HEAVY_ID, &[]).await.unwrap();
    assert_eq!(result.rows.len(), 2);
    assert_eq!(result.source_label, "viewreport");
    assert!(matches!(
        events.try_recv().unwrap(),
        DiagnosticEvent::FallbackEngaged {
            report_id: HEAVY_ID,
            ..
        }
    ));
}

#[tokio::test]
async fn rest_only_mode_disables_the_fallback_even_for_heavy_reports() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reporting/rpc"))
        .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/reporting/viewreport.php"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .expect(0)
        .mount(&server)
        .await;

    let client = client(&server.uri(), Diagnostics::default());
    let error = client.run_report_rest_only(HEAVY_ID, &[]).await.unwrap_err();
    assert!(matches!(error, Error::AllEndpointsFailed { .. }));
}

#[tokio::test]
async fn upstream_error_payloads_abort_the_chain_immediately() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reporting/rpc"))
        .and(query_param("function", "get_report_data"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"exception":"invalidtoken","message":"Invalid token"}"#),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/reporting/rpc"))
        .and(query_param("function", "run_report"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/reporting/viewreport.php"))
        .respond_with(ResponseTemplate::new(200).set_body_string("[]"))
        .expect(0)
        .mount(&server)
        .await;

    let client = client(&server.uri(), Diagnostics::default());
    let error = client.run_report(HEAVY_ID, &[]).await.unwrap_err();
    match error {
        Error::Upstream { code, message, .. } => {
            assert_eq!(code, "invalidtoken");
            assert_eq!(message, "Invalid token");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn empty_upstream_payload_is_a_successful_zero_row_fetch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/reporting/rpc"))
        .and(query_param("function", "get_report_data"))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server.uri(), Diagnostics::default());
    let result = client.run_report(LIGHT_ID, &[]).await.unwrap();
    assert!(result.rows.is_empty());
}
