//! Integration tests for the authenticated request pipeline
//!
//! **Coverage:**
//! - Token attacher: bearer header, unauthenticated fallback, ejection
//! - Facade: readiness gate, pass-through of successful bodies
//! - Session retry: one forced-token retry on 500 + session payload only
//! - Diagnostics: curl reproduction logged on terminal failures
//! - Timeouts and connection failures surface as no-response errors
//!
//! **Infrastructure:**
//! - WireMock HTTP server standing in for the CRM backend
//! - Scripted session provider from `support.rs`

#![allow(dead_code)]

#[path = "support.rs"]
mod support;

use std::time::Duration;

use fieldcrm_infra::api::ApiErrorCategory;
use fieldcrm_infra::{ApiCommands, ApiError, HttpClient, QueryParams};
use reqwest::StatusCode;
use serde_json::json;
use support::{capture_logs, Harness, MockSessionProvider};
use wiremock::matchers::{body_json, header, header_exists, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn session_expired() -> ResponseTemplate {
    ResponseTemplate::new(500)
        .set_body_json(json!({ "session_id": null, "error_message": "session expired" }))
}

fn ok(body: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}

// ============================================================================
// Concrete scenarios
// ============================================================================

#[tokio::test]
async fn onboarding_success_is_returned_unchanged() {
    let server = MockServer::start().await;
    let payload = json!({
        "success": true,
        "data": {
            "is_onboarded": false,
            "user_data": { "user_name": "", "sales_person_id": "SP-3", "email": "a@b.c" }
        },
        "session_id": "sess_9",
        "execution_time": 0.031
    });
    Mock::given(method("GET"))
        .and(path("/preferences/is-onboarded"))
        .and(header("authorization", "Bearer cached-token"))
        .respond_with(ok(payload.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let provider = MockSessionProvider::new(Some("cached-token"), Some("fresh-token"));
    let harness = Harness::new(&server, provider.clone());

    let body = harness.client.get("preferences/is-onboarded", None).await.unwrap();
    assert_eq!(body, payload);
    assert_eq!(provider.forced_calls(), 0);
}

#[tokio::test]
async fn session_failure_is_retried_with_forced_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/crm_data/meetings_split/"))
        .and(header("authorization", "Bearer cached-token"))
        .respond_with(session_expired())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/crm_data/meetings_split/"))
        .and(header("authorization", "Bearer fresh-token"))
        .respond_with(ok(json!({ "success": true, "data": { "yearly": {} } })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = MockSessionProvider::new(Some("cached-token"), Some("fresh-token"));
    let harness = Harness::new(&server, provider.clone());

    let body = harness.client.get("crm_data/meetings_split/", None).await.unwrap();
    assert_eq!(body, json!({ "success": true, "data": { "yearly": {} } }));
    assert_eq!(provider.forced_calls(), 1);
}

#[tokio::test]
async fn missing_fresh_token_logs_and_returns_original_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/crm_data/meetings_split/"))
        .respond_with(session_expired())
        .expect(1)
        .mount(&server)
        .await;

    let (logs, _guard) = capture_logs();
    let provider = MockSessionProvider::new(Some("cached-token"), None);
    let harness = Harness::new(&server, provider.clone());

    let err = harness.client.get("crm_data/meetings_split/", None).await.unwrap_err();
    assert!(err.is_session_recoverable());
    assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    assert_eq!(err.failure().unwrap().error_message(), Some("session expired"));
    assert_eq!(provider.forced_calls(), 1);

    assert!(logs.contains("API request failed"));
    assert!(logs.contains(&format!("curl -X GET \"{}/crm_data/meetings_split/\"", server.uri())));
    assert!(logs.contains("-H \"Authorization: Bearer cached-token\""));
    assert!(logs.contains(concat!("-H \"User-Agent: fieldcrm/", env!("CARGO_PKG_VERSION"))));
    assert!(logs.contains("-H \"Content-Type: application/json\""));
}

#[tokio::test]
async fn not_found_post_is_raised_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/calendar/pre-plan"))
        .and(body_json(json!({ "year": "2025", "month": "10" })))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "error_message": "not found" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (logs, _guard) = capture_logs();
    let provider = MockSessionProvider::new(Some("cached-token"), Some("fresh-token"));
    let harness = Harness::new(&server, provider.clone());

    let err = harness
        .client
        .post("calendar/pre-plan", Some(json!({ "year": "2025", "month": "10" })))
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Status(_)));
    assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
    assert_eq!(err.category(), ApiErrorCategory::Client);
    assert_eq!(provider.forced_calls(), 0);
    assert!(logs.contains(r#"-d '{"month":"10","year":"2025"}'"#));
}

// ============================================================================
// Retry policy properties
// ============================================================================

#[tokio::test]
async fn server_error_without_session_payload_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_json(json!({ "error_message": "database unavailable" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let provider = MockSessionProvider::new(Some("cached-token"), Some("fresh-token"));
    let harness = Harness::new(&server, provider.clone());

    let err = harness.client.get("crm_data/target_status/teu", None).await.unwrap_err();
    assert_eq!(err.category(), ApiErrorCategory::Server);
    assert_eq!(provider.forced_calls(), 0);
}

#[tokio::test]
async fn other_statuses_are_not_retried_even_with_session_payload() {
    for status in [400_u16, 401, 403, 502, 503] {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(status).set_body_json(json!({
                    "session_id": null,
                    "error_message": "session expired"
                })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let provider = MockSessionProvider::new(Some("cached-token"), Some("fresh-token"));
        let harness = Harness::new(&server, provider.clone());

        let err = harness.client.get("crm_data/meetings_split/", None).await.unwrap_err();
        assert_eq!(err.status().map(|s| s.as_u16()), Some(status));
        assert_eq!(provider.forced_calls(), 0, "status {status} must not trigger a retry");
    }
}

#[tokio::test]
async fn at_most_one_retry_per_call() {
    let server = MockServer::start().await;
    Mock::given(method("PUT")).respond_with(session_expired()).expect(2).mount(&server).await;

    let (logs, _guard) = capture_logs();
    let provider = MockSessionProvider::new(Some("cached-token"), Some("fresh-token"));
    let harness = Harness::new(&server, provider.clone());

    let err = harness.client.put("preferences/profile", Some(json!({ "a": 1 }))).await.unwrap_err();
    assert!(err.is_session_recoverable());
    assert_eq!(provider.forced_calls(), 1);

    // Both the failed retry and the terminal failure are reported.
    assert!(logs.contains("API retry failed"));
    assert!(logs.contains("-H \"Authorization: Bearer fresh-token\""));
    assert!(logs.contains("API request failed"));
}

#[tokio::test]
async fn failed_retry_returns_the_original_error_not_the_retry_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/crm_data/meetings_split/"))
        .and(header("authorization", "Bearer cached-token"))
        .respond_with(session_expired())
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/crm_data/meetings_split/"))
        .and(header("authorization", "Bearer fresh-token"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({ "error_message": "no such report" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (logs, _guard) = capture_logs();
    let provider = MockSessionProvider::new(Some("cached-token"), Some("fresh-token"));
    let harness = Harness::new(&server, provider.clone());

    let err = harness.client.get("crm_data/meetings_split/", None).await.unwrap_err();
    assert!(matches!(err, ApiError::Session(_)));
    assert_eq!(err.status(), Some(StatusCode::INTERNAL_SERVER_ERROR));
    assert_eq!(err.failure().unwrap().error_message(), Some("session expired"));
    assert_eq!(provider.forced_calls(), 1);

    assert!(logs.contains("API retry failed"));
    assert!(logs.contains("no such report"));
    assert!(logs.contains("API request failed"));
}

#[tokio::test]
async fn failing_forced_refresh_skips_retry_and_returns_original_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/crm_data/meetings_split/"))
        .respond_with(session_expired())
        .expect(1)
        .mount(&server)
        .await;

    let (logs, _guard) = capture_logs();
    let provider = MockSessionProvider::new(Some("cached-token"), Some("fresh-token"));
    provider.fail_refresh();
    let harness = Harness::new(&server, provider.clone());

    let err = harness.client.get("crm_data/meetings_split/", None).await.unwrap_err();
    assert!(matches!(err, ApiError::Session(_)));
    assert_eq!(err.failure().unwrap().error_message(), Some("session expired"));
    assert_eq!(provider.forced_calls(), 1);

    assert!(logs.contains("Forced token refresh failed"));
    assert!(logs.contains("token endpoint unavailable"));
    assert!(!logs.contains("API retry failed"));
    assert!(logs.contains("API request failed"));
}

#[tokio::test]
async fn forced_token_does_not_leak_to_later_requests() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/crm_data/meetings_split/"))
        .and(header("authorization", "Bearer cached-token"))
        .respond_with(session_expired())
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/crm_data/meetings_split/"))
        .and(header("authorization", "Bearer fresh-token"))
        .respond_with(ok(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/preferences/is-onboarded"))
        .and(header("authorization", "Bearer cached-token"))
        .respond_with(ok(json!({ "success": true })))
        .expect(2)
        .mount(&server)
        .await;

    let provider = MockSessionProvider::new(Some("cached-token"), Some("fresh-token"));
    let harness = Harness::new(&server, provider.clone());

    let (retried, concurrent) = tokio::join!(
        harness.client.get("crm_data/meetings_split/", None),
        harness.client.get("preferences/is-onboarded", None),
    );
    assert!(retried.is_ok());
    assert!(concurrent.is_ok());

    harness.client.get("preferences/is-onboarded", None).await.unwrap();
    assert_eq!(harness.http.interceptors().len(), 1);
}

#[tokio::test]
async fn repeated_calls_are_not_memoized() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/calendar/pre-plan"))
        .and(query_param("month", "10"))
        .respond_with(ok(json!({ "success": true, "data": { "calendar_meetings": {} } })))
        .expect(2)
        .mount(&server)
        .await;

    let provider = MockSessionProvider::new(Some("cached-token"), None);
    let harness = Harness::new(&server, provider.clone());
    let mut params = QueryParams::new();
    params.insert("year".into(), "2025".into());
    params.insert("month".into(), "10".into());

    let first = harness.client.get("calendar/pre-plan", Some(params.clone())).await.unwrap();
    let second = harness.client.get("calendar/pre-plan", Some(params)).await.unwrap();
    assert_eq!(first, second);
    assert_eq!(provider.cached_calls(), 2);
}

// ============================================================================
// Readiness and token attachment
// ============================================================================

#[tokio::test]
async fn calls_before_provider_is_ready_never_reach_transport() {
    let server = MockServer::start().await;
    Mock::given(method("GET")).respond_with(ok(json!({}))).expect(0).mount(&server).await;
    Mock::given(method("DELETE")).respond_with(ok(json!({}))).expect(0).mount(&server).await;

    let provider = MockSessionProvider::new(Some("cached-token"), Some("fresh-token"));
    provider.set_ready(false);
    let harness = Harness::new(&server, provider.clone());

    assert!(matches!(harness.client.get("x", None).await, Err(ApiError::AuthNotReady)));
    assert!(matches!(harness.client.delete("customers/1").await, Err(ApiError::AuthNotReady)));
    assert_eq!(provider.cached_calls(), 0);
}

#[tokio::test]
async fn request_without_token_goes_out_unauthenticated() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header_exists("authorization"))
        .respond_with(ok(json!({ "unexpected": true })))
        .expect(0)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({ "error_message": "unauthorized" })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let (logs, _guard) = capture_logs();
    let provider = MockSessionProvider::new(None, None);
    let harness = Harness::new(&server, provider);

    let err = harness.client.get("preferences/is-onboarded", None).await.unwrap_err();
    assert_eq!(err.category(), ApiErrorCategory::Authentication);
    assert!(logs.contains("-H \"Authorization: MISSING\""));
}

#[tokio::test]
async fn ejected_attacher_stops_attaching_and_ejects_once() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(header("authorization", "Bearer cached-token"))
        .respond_with(ok(json!({ "with": "token" })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ok(json!({ "with": "nothing" })))
        .expect(1)
        .mount(&server)
        .await;

    let provider = MockSessionProvider::new(Some("cached-token"), None);
    let harness = Harness::new(&server, provider);

    assert_eq!(harness.client.get("a", None).await.unwrap(), json!({ "with": "token" }));

    harness.attacher.eject();
    harness.attacher.eject();
    assert!(harness.attacher.is_ejected());
    assert!(harness.http.interceptors().is_empty());

    assert_eq!(harness.client.get("a", None).await.unwrap(), json!({ "with": "nothing" }));
}

#[tokio::test]
async fn masked_failure_log_hides_token() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .respond_with(
            ResponseTemplate::new(409).set_body_json(json!({ "error_message": "conflict" })),
        )
        .mount(&server)
        .await;

    let (logs, _guard) = capture_logs();
    let token = "abcdefgh-very-long-session-token-12345678";
    let provider = MockSessionProvider::new(Some(token), None);
    let harness = Harness::with_options(&server, provider, Duration::from_secs(5), true);

    harness.client.delete("customers/42").await.unwrap_err();
    assert!(logs.contains("-H \"Authorization: Bearer abcdefgh...12345678\""));
    assert!(!logs.contains(token));
}

// ============================================================================
// No-response failures
// ============================================================================

#[tokio::test]
async fn timeout_is_reported_without_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(session_expired().set_delay(Duration::from_millis(500)))
        .mount(&server)
        .await;

    let provider = MockSessionProvider::new(Some("cached-token"), Some("fresh-token"));
    let harness =
        Harness::with_options(&server, provider.clone(), Duration::from_millis(50), false);

    let err = harness.client.get("crm_data/meetings_split/", None).await.unwrap_err();
    assert!(matches!(err, ApiError::Timeout(t) if t == Duration::from_millis(50)));
    assert!(err.is_no_response());
    assert_eq!(provider.forced_calls(), 0);
}

#[tokio::test]
async fn connection_failure_is_network_error() {
    let http = HttpClient::builder()
        .base_url("http://127.0.0.1:9")
        .timeout(Duration::from_secs(2))
        .build()
        .unwrap();
    let provider = MockSessionProvider::new(Some("cached-token"), Some("fresh-token"));
    let client = fieldcrm_infra::ApiClient::builder()
        .http(std::sync::Arc::new(http))
        .session(provider.clone())
        .build()
        .unwrap();

    let err = client.get("preferences/is-onboarded", None).await.unwrap_err();
    assert!(err.is_no_response(), "unexpected error: {err:?}");
    assert_eq!(provider.forced_calls(), 0);
}

// ============================================================================
// Typed endpoints over the full pipeline
// ============================================================================

#[tokio::test]
async fn typed_meetings_split_survives_session_retry() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/crm_data/meetings_split/"))
        .and(header("authorization", "Bearer cached-token"))
        .respond_with(session_expired())
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/crm_data/meetings_split/"))
        .and(header("authorization", "Bearer fresh-token"))
        .respond_with(ok(json!({
            "success": true,
            "data": {
                "monthly": {
                    "10": { "Direct Meetings": 1, "Phone Calls": 0, "Business Meetings": 2 },
                    "2": { "Direct Meetings": 4, "Phone Calls": 1, "Business Meetings": 0 }
                },
                "quarterly": {
                    "4": { "Direct Meetings": 1, "Phone Calls": 0, "Business Meetings": 2 }
                },
                "yearly": { "Direct Meetings": 5, "Phone Calls": 1, "Business Meetings": 2 }
            }
        })))
        .mount(&server)
        .await;

    let provider = MockSessionProvider::new(Some("cached-token"), Some("fresh-token"));
    let harness = Harness::new(&server, provider);
    let commands = ApiCommands::new(std::sync::Arc::new(harness.client.clone()));

    let split = commands.meetings_split().await.unwrap();
    let months: Vec<u32> = split.monthly_in_order().iter().map(|(m, _)| *m).collect();
    assert_eq!(months, vec![2, 10]);
    assert_eq!(split.yearly.total(), 8);
}

#[tokio::test]
async fn requests_carry_default_json_headers() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(header("accept", "application/json"))
        .and(header("content-type", "application/json"))
        .respond_with(|request: &Request| {
            ResponseTemplate::new(200).set_body_json(json!({ "echo": request.url.path() }))
        })
        .expect(1)
        .mount(&server)
        .await;

    let harness = Harness::new(&server, MockSessionProvider::new(Some("cached-token"), None));
    let body = harness.client.post("customers", None).await.unwrap();
    assert_eq!(body, json!({ "echo": "/customers" }));
}
