use axum::http::StatusCode;
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use waiverdesk_core::ValidationOutcome;
use waiverdesk_tin::TinValidator;
use wiremock::{Mock, MockServer, ResponseTemplate};

use super::tin_from_body;
use crate::api::test_support::{app, body_json, body_text, get_request, json_request, send};

const LOOKUP_PATH: &str = "/api/ValidateTin";

fn upstream_url(server: &MockServer) -> String {
    format!("{}{LOOKUP_PATH}", server.uri())
}

fn cache_control(response: &axum::http::Response<axum::body::Body>) -> Option<&str> {
    response
        .headers()
        .get("cache-control")
        .and_then(|v| v.to_str().ok())
}

#[test]
fn tin_from_body_accepts_both_casings_and_numbers() {
    assert_eq!(tin_from_body(&json!({"tin": "12345678"})).as_deref(), Some("12345678"));
    assert_eq!(tin_from_body(&json!({"TIN": "87654321"})).as_deref(), Some("87654321"));
    assert_eq!(tin_from_body(&json!({"tin": 12_345_678})).as_deref(), Some("12345678"));
    assert_eq!(tin_from_body(&json!({"tin": null})), None);
    assert_eq!(tin_from_body(&json!({"other": "12345678"})), None);
}

#[test]
fn tin_from_body_skips_empty_lowercase_key() {
    assert_eq!(
        tin_from_body(&json!({"tin": null, "TIN": "12345678"})).as_deref(),
        Some("12345678")
    );
    assert_eq!(
        tin_from_body(&json!({"tin": "", "TIN": "12345678"})).as_deref(),
        Some("12345678")
    );
}

#[tokio::test]
async fn read_falls_back_to_uppercase_when_lowercase_is_blank() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LOOKUP_PATH))
        .and(query_param("TIN", "12345678"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"TIN": "12345678"})))
        .expect(1)
        .mount(&server)
        .await;

    let response = send(
        app(&upstream_url(&server)),
        get_request("/api/v1/tin?tin=&TIN=12345678"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn read_accepts_uppercase_query_and_relays_json() {
    let server = MockServer::start().await;
    let record = json!({"TIN": "12345678", "TaxpayerName": "Acme"});
    Mock::given(method("GET"))
        .and(path(LOOKUP_PATH))
        .and(query_param("TIN", "12345678"))
        .respond_with(ResponseTemplate::new(200).set_body_json(record.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let response = send(
        app(&upstream_url(&server)),
        get_request("/api/v1/tin?TIN=12345678"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(cache_control(&response), Some("no-store"));
    assert_eq!(body_json(response).await, record);
}

#[tokio::test]
async fn read_without_tin_is_rejected_without_upstream_call() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    for uri in ["/api/v1/tin", "/api/v1/tin?tin=", "/api/v1/tin?TIN=%20%20"] {
        let response = send(app(&upstream_url(&server)), get_request(uri)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        let json = body_json(response).await;
        assert_eq!(json["error"]["message"], "TIN is required");
    }
}

#[tokio::test]
async fn validate_with_malformed_tin_is_rejected_without_upstream_call() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    for body in [json!({"tin": "1234567"}), json!({"tin": "abcdefgh"}), json!({})] {
        let response = send(
            app(&upstream_url(&server)),
            json_request("POST", "/api/v1/tin/validate", &body),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body}");
        let json = body_json(response).await;
        assert_eq!(json["error"]["message"], "TIN must be exactly 8 digits");
    }
}

#[tokio::test]
async fn validate_relays_json_with_upstream_status() {
    let server = MockServer::start().await;
    let record = json!({"TIN": "12345678", "TaxpayerName": "Acme", "Extra": {"a": 1}});
    Mock::given(method("GET"))
        .and(path(LOOKUP_PATH))
        .and(query_param("TIN", "12345678"))
        .and(header("x-api-key", "test-key"))
        .and(header("cache-control", "no-cache"))
        .respond_with(ResponseTemplate::new(200).set_body_json(record.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let response = send(
        app(&upstream_url(&server)),
        json_request("POST", "/api/v1/tin/validate", &json!({"tin": "12345678"})),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(cache_control(&response), Some("no-store"));
    assert_eq!(body_json(response).await, record);
}

#[tokio::test]
async fn read_relays_plain_text_not_found() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LOOKUP_PATH))
        .and(query_param("TIN", "99999999"))
        .respond_with(
            ResponseTemplate::new(404)
                .insert_header("content-type", "text/html")
                .set_body_string("TIN was not found"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let response = send(
        app(&upstream_url(&server)),
        get_request("/api/v1/tin?TIN=99999999"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok()),
        Some("text/plain; charset=utf-8")
    );
    assert_eq!(cache_control(&response), Some("no-store"));
    assert_eq!(body_text(response).await, "TIN was not found");
}

#[tokio::test]
async fn upstream_server_error_status_is_preserved() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(502)
                .insert_header("content-type", "application/json")
                .set_body_json(json!({"message": "gateway down"})),
        )
        .mount(&server)
        .await;

    let response = send(
        app(&upstream_url(&server)),
        get_request("/api/v1/tin?tin=12345678"),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_json(response).await["message"], "gateway down");
}

#[tokio::test]
async fn network_failure_becomes_server_error_with_message() {
    let response = send(
        app("http://127.0.0.1:1/api/ValidateTin"),
        json_request("POST", "/api/v1/tin/validate", &json!({"tin": "12345678"})),
    )
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "upstream_error");
    let message = json["error"]["message"].as_str().unwrap_or_default();
    assert!(message.contains("HTTP error"), "unexpected message: {message}");
}

#[tokio::test]
async fn unconfigured_upstream_becomes_server_error() {
    let response = send(app(""), get_request("/api/v1/tin?tin=12345678")).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(
        json["error"]["message"],
        "upstream tax service is not configured"
    );
}

#[tokio::test]
async fn malformed_json_body_gets_error_envelope() {
    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/api/v1/tin/validate")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{not json"))
        .expect("request");

    let response = send(app(""), request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"]["code"], "bad_request");
}

/// Serves the router on an ephemeral port and returns its base URL.
async fn serve(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("serve");
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn validator_reads_relayed_record_through_running_server() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LOOKUP_PATH))
        .and(query_param("TIN", "12345678"))
        .respond_with(ResponseTemplate::new(200).set_body_json(
            json!({"TIN": "12345678", "TaxpayerName": "Acme", "TaxTypes": ["VAT"]}),
        ))
        .expect(1)
        .mount(&upstream)
        .await;

    let base = serve(app(&upstream_url(&upstream))).await;
    let validator = TinValidator::new(&base, 5).expect("validator");
    let outcome = validator.check("12345678").await;

    let ValidationOutcome::Found { taxpayer } = outcome else {
        panic!("expected Found, got {outcome:?}");
    };
    assert_eq!(taxpayer.taxpayer_name.as_deref(), Some("Acme"));
    assert_eq!(taxpayer.tax_types, vec!["VAT".to_string()]);
    assert!(validator.state().error.is_none());
}

#[tokio::test]
async fn validator_sees_relayed_not_found_through_running_server() {
    let upstream = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LOOKUP_PATH))
        .respond_with(ResponseTemplate::new(404).set_body_string("TIN was not found"))
        .mount(&upstream)
        .await;

    let base = serve(app(&upstream_url(&upstream))).await;
    let validator = TinValidator::new(&base, 5).expect("validator");

    assert_eq!(validator.check("99999999").await, ValidationOutcome::NotFound);
}
