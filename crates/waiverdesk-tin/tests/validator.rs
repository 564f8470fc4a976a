//! Integration tests for `TinValidator` against a wiremock stand-in for the proxy.

use waiverdesk_core::{OutcomeKind, ValidationOutcome};
use waiverdesk_tin::{TinValidator, ValidationState};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const VALIDATE_PATH: &str = "/api/v1/tin/validate";

fn validator(server: &MockServer) -> TinValidator {
    TinValidator::new(&server.uri(), 5).expect("validator construction should not fail")
}

async fn request_count(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .map_or(0, |requests| requests.len())
}

#[tokio::test]
async fn malformed_tins_are_rejected_without_network_calls() {
    let server = MockServer::start().await;
    let validator = validator(&server);

    for candidate in ["", "1234567", "123456789", "abcdefgh", "1234 678", "12345678\n"] {
        let result = validator.validate(candidate).await;
        assert!(result.is_none(), "{candidate:?} should be rejected");
        assert_eq!(
            validator.state(),
            ValidationState {
                loading: false,
                error: Some("TIN must be exactly 8 digits".to_string()),
            }
        );
    }

    assert_eq!(request_count(&server).await, 0);
}

#[tokio::test]
async fn valid_tin_issues_exactly_one_call_with_that_value() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(VALIDATE_PATH))
        .and(body_json(serde_json::json!({"tin": "12345678"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"TIN": "12345678", "TaxpayerName": "Acme"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let validator = validator(&server);
    validator.validate("12345678").await;

    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn success_returns_decoded_record_and_clears_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(VALIDATE_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"TIN": "12345678", "TaxpayerName": "Acme"})),
        )
        .mount(&server)
        .await;

    let validator = validator(&server);
    // Leave an error behind first so the success path has something to clear.
    validator.validate("bad").await;
    assert!(validator.state().error.is_some());

    let record = validator
        .validate("12345678")
        .await
        .expect("record should decode");

    assert_eq!(record.tin.as_deref(), Some("12345678"));
    assert_eq!(record.taxpayer_name.as_deref(), Some("Acme"));
    assert_eq!(validator.state(), ValidationState::default());
}

#[tokio::test]
async fn plain_text_404_is_not_found() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(VALIDATE_PATH))
        .respond_with(
            ResponseTemplate::new(404)
                .insert_header("content-type", "text/plain; charset=utf-8")
                .set_body_string("TIN was not found"),
        )
        .mount(&server)
        .await;

    let validator = validator(&server);
    let outcome = validator.check("99999999").await;

    assert_eq!(outcome, ValidationOutcome::NotFound);
    assert_eq!(
        validator.state().error.as_deref(),
        Some("TIN was not found")
    );
    assert!(!validator.state().loading);
}

#[tokio::test]
async fn server_error_text_becomes_error_state() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(VALIDATE_PATH))
        .respond_with(
            ResponseTemplate::new(500)
                .insert_header("content-type", "text/plain")
                .set_body_string("Internal error"),
        )
        .mount(&server)
        .await;

    let validator = validator(&server);
    let result = validator.validate("12345678").await;

    assert!(result.is_none());
    assert_eq!(validator.state().error.as_deref(), Some("Internal error"));
    assert!(!validator.state().loading);
}

#[tokio::test]
async fn empty_failure_body_reports_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let validator = validator(&server);
    validator.validate("12345678").await;

    assert_eq!(
        validator.state().error.as_deref(),
        Some("Validation failed (503)")
    );
}

#[tokio::test]
async fn proxy_error_envelope_message_is_surfaced() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500).set_body_json(serde_json::json!({
            "error": {"code": "upstream_error", "message": "upstream tax service is not configured"},
            "meta": {"request_id": "req-1", "timestamp": "2026-01-01T00:00:00Z"}
        })))
        .mount(&server)
        .await;

    let validator = validator(&server);
    validator.validate("12345678").await;

    assert_eq!(
        validator.state().error.as_deref(),
        Some("upstream tax service is not configured")
    );
}

#[tokio::test]
async fn transport_failure_sets_error_and_clears_loading() {
    let validator = TinValidator::new("http://127.0.0.1:1", 5).expect("validator");
    let outcome = validator.check("12345678").await;

    assert_eq!(outcome.kind(), OutcomeKind::Failed);
    let state = validator.state();
    assert!(!state.loading);
    assert!(
        state.error.as_deref().is_some_and(|e| !e.is_empty()),
        "expected transport error message, got: {state:?}"
    );
}

#[tokio::test]
async fn bearer_token_is_forwarded() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(header("authorization", "Bearer tok-123"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"TIN": "12345678"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let validator = validator(&server).with_bearer_token("tok-123");
    assert!(validator.validate("12345678").await.is_some());
}

#[tokio::test]
async fn repeated_validation_classifies_identically() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(body_json(serde_json::json!({"tin": "11111111"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"TIN": "11111111"})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_json(serde_json::json!({"tin": "22222222"})))
        .respond_with(ResponseTemplate::new(404).set_body_string("TIN was not found"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_json(serde_json::json!({"tin": "33333333"})))
        .respond_with(ResponseTemplate::new(500).set_body_string("Internal error"))
        .mount(&server)
        .await;

    let validator = validator(&server);
    for (tin, expected) in [
        ("11111111", OutcomeKind::Found),
        ("22222222", OutcomeKind::NotFound),
        ("33333333", OutcomeKind::Failed),
    ] {
        let first = validator.check(tin).await.kind();
        let second = validator.check(tin).await.kind();
        assert_eq!(first, expected, "first classification for {tin}");
        assert_eq!(first, second, "classification changed for {tin}");
    }
}

#[tokio::test]
async fn subscribers_observe_final_state() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404).set_body_string("TIN was not found"))
        .mount(&server)
        .await;

    let validator = validator(&server);
    let mut rx = validator.subscribe();
    validator.validate("12345678").await;

    assert!(rx.has_changed().expect("sender alive"));
    let seen = rx.borrow_and_update().clone();
    assert_eq!(
        seen,
        ValidationState {
            loading: false,
            error: Some("TIN was not found".to_string()),
        }
    );
}

#[tokio::test]
async fn loosely_typed_success_payloads_are_found() {
    let server = MockServer::start().await;
    let validator = validator(&server);

    for body in [
        serde_json::json!({"TIN": "12345678", "TaxpayerName": "Acme", "TaxTypes": null}),
        serde_json::json!({"TIN": 12_345_678, "TaxpayerName": "Acme"}),
        serde_json::json!({"TaxpayerName": "Acme"}),
    ] {
        server.reset().await;
        Mock::given(method("POST"))
            .and(path(VALIDATE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(body.clone()))
            .mount(&server)
            .await;

        let outcome = validator.check("12345678").await;
        assert_eq!(outcome.kind(), OutcomeKind::Found, "{body} should decode");
        let taxpayer = outcome.into_taxpayer().expect("taxpayer");
        assert_eq!(taxpayer.taxpayer_name.as_deref(), Some("Acme"));
        assert_eq!(validator.state(), ValidationState::default());
    }
}
