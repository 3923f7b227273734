#![allow(clippy::unwrap_used)]
// Integration tests for `ApiClient` using wiremock.

use pretty_assertions::assert_eq;
use serde_json::json;
use url::Url;
use wiremock::matchers::{body_json, body_string_contains, header, header_regex, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use pairup_api::{AccessLevel, ApiClient, DeviceIdentity, Error, ReportReason, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

const DEVICE: &str = "0f8e1c2d3b4a59687766554433221100";

async fn setup() -> (MockServer, ApiClient) {
    let server = MockServer::start().await;
    let client = ApiClient::with_client(reqwest::Client::new(), Url::parse(&server.uri()).unwrap());
    client.configure(DeviceIdentity::new(DEVICE).unwrap()).unwrap();
    (server, client)
}

fn profile() -> serde_json::Value {
    json!({
        "device_id": DEVICE,
        "gender": null,
        "nickname": "owl",
        "bio": "night shift",
        "karma_score": 100,
        "access_level": "full",
        "daily_matches_remaining": 20,
        "is_verified": false
    })
}

fn message_of(err: &Error) -> String {
    err.to_string()
}

// ── Auth ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_register_sends_identity_header_and_empty_body() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/register"))
        .and(header("X-Device-ID", DEVICE))
        .and(header("Content-Type", "application/json"))
        .and(body_json(json!({})))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile()))
        .expect(1)
        .mount(&server)
        .await;

    let user = client.register().await.unwrap();
    assert_eq!(user.device_id, DEVICE);
    assert_eq!(user.nickname.as_deref(), Some("owl"));
    assert_eq!(user.access_level, AccessLevel::Full);
}

#[tokio::test]
async fn test_me_and_update_profile() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .and(header("X-Device-ID", DEVICE))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile()))
        .mount(&server)
        .await;

    let mut updated = profile();
    updated["nickname"] = json!("lark");
    updated["bio"] = json!("");
    Mock::given(method("PUT"))
        .and(path("/api/auth/profile"))
        .and(body_json(json!({"nickname": "lark", "bio": ""})))
        .respond_with(ResponseTemplate::new(200).set_body_json(updated))
        .expect(1)
        .mount(&server)
        .await;

    assert_eq!(client.me().await.unwrap().karma_score, 100);
    let user = client.update_profile("lark", "").await.unwrap();
    assert_eq!(user.nickname.as_deref(), Some("lark"));
}

#[tokio::test]
async fn test_verify_gender_uploads_multipart_image() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/verify-gender"))
        .and(header("X-Device-ID", DEVICE))
        .and(header_regex("Content-Type", "^multipart/form-data; boundary="))
        .and(body_string_contains("name=\"image\""))
        .and(body_string_contains("filename=\"selfie.png\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "gender": "female",
            "message": "Verified"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let result = client
        .verify_gender(b"\x89PNG fake".to_vec(), "selfie.png")
        .await
        .unwrap();
    assert!(result.success);
    assert_eq!(result.gender.as_deref(), Some("female"));
}

#[tokio::test]
async fn test_verify_gender_failure_uses_verification_fallback() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/auth/verify-gender"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = client.verify_gender(vec![1, 2, 3], "selfie.jpg").await.unwrap_err();
    assert_eq!(message_of(&err), "Verification failed");
    assert_eq!(err.status(), Some(500));
}

#[tokio::test]
async fn configured_transport_sends_client_headers() {
    let server = MockServer::start().await;
    let client = ApiClient::new(
        Url::parse(&server.uri()).unwrap(),
        &TransportConfig::default(),
    )
    .unwrap();
    client.configure(DeviceIdentity::new(DEVICE).unwrap()).unwrap();

    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .and(header("accept", "application/json"))
        .and(header_regex("user-agent", "^pairup/"))
        .and(header("X-Device-ID", DEVICE))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile()))
        .expect(1)
        .mount(&server)
        .await;

    assert_eq!(client.me().await.unwrap().device_id, DEVICE);
}

// ── Error shapes ────────────────────────────────────────────────────

#[tokio::test]
async fn test_error_detail_string_is_surfaced() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(403).set_body_json(json!({"detail": "Bad thing"})))
        .mount(&server)
        .await;

    let err = client.me().await.unwrap_err();
    assert_eq!(message_of(&err), "Bad thing");
    assert!(err.is_forbidden());
}

#[tokio::test]
async fn test_validation_errors_are_joined() {
    let (server, client) = setup().await;

    Mock::given(method("PUT"))
        .and(path("/api/auth/profile"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "detail": [
                {"loc": ["body", "nickname"], "msg": "too long"},
                {"loc": ["body", "bio"], "msg": "contains a link"}
            ]
        })))
        .mount(&server)
        .await;

    let err = client.update_profile(&"x".repeat(80), "http://spam").await.unwrap_err();
    assert_eq!(message_of(&err), "too long; contains a link");
}

#[tokio::test]
async fn test_empty_error_body_uses_generic_fallback() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/auth/me"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let err = client.me().await.unwrap_err();
    assert_eq!(message_of(&err), "Request failed");
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_unreachable_server_is_a_request_error() {
    let client = ApiClient::with_client(
        reqwest::Client::new(),
        Url::parse("http://127.0.0.1:9").unwrap(),
    );
    client.configure(DeviceIdentity::new(DEVICE).unwrap()).unwrap();

    let err = client.me().await.unwrap_err();
    assert!(matches!(err, Error::Request { status: None, .. }));
    assert_eq!(message_of(&err), "Request failed");
}

// ── Identity ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_unconfigured_client_sends_nothing() {
    let server = MockServer::start().await;
    let client = ApiClient::with_client(reqwest::Client::new(), Url::parse(&server.uri()).unwrap());

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile()))
        .expect(0)
        .mount(&server)
        .await;

    let err = client.me().await.unwrap_err();
    assert!(matches!(err, Error::NotConfigured));
    assert!(err.is_configuration());
}

// ── Reports & karma ─────────────────────────────────────────────────

#[tokio::test]
async fn test_submit_report_composes_reason() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/reports/submit"))
        .and(body_json(json!({
            "reported_device_id": "partner-7",
            "reason": "harassment: kept insulting me"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 41,
            "status": "pending",
            "message": "Report submitted"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let receipt = client
        .submit_report("partner-7", ReportReason::Harassment, "kept insulting me")
        .await
        .unwrap();
    assert_eq!(receipt.id, 41);
    assert_eq!(receipt.status, "pending");
}

#[tokio::test]
async fn test_karma_passes_device_id_query() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/api/reports/karma"))
        .and(query_param("device_id", DEVICE))
        .and(header("X-Device-ID", DEVICE))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "device_id": DEVICE,
            "karma_score": 35,
            "access_level": "warning"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let karma = client.karma().await.unwrap();
    assert_eq!(karma.karma_score, 35);
    assert_eq!(karma.access_level, AccessLevel::Warning);
}

#[tokio::test]
async fn test_complete_chat_posts_with_query() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/api/reports/chat-complete"))
        .and(query_param("device_id", DEVICE))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "new_karma": 101,
            "message": "Chat completed"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let done = client.complete_chat().await.unwrap();
    assert!(done.success);
    assert_eq!(done.new_karma, 101);
}

#[tokio::test]
async fn test_base_path_prefix_is_kept() {
    let server = MockServer::start().await;
    let base = Url::parse(&format!("{}/backend", server.uri())).unwrap();
    let client = ApiClient::with_client(reqwest::Client::new(), base);
    client.configure(DeviceIdentity::new(DEVICE).unwrap()).unwrap();

    Mock::given(method("GET"))
        .and(path("/backend/api/auth/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(profile()))
        .expect(1)
        .mount(&server)
        .await;

    client.me().await.unwrap();
}
