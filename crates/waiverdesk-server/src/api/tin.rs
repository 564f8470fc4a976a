//! TIN proxy handlers. Both endpoints forward to the tax authority and relay
//! its answer untouched, so the credential never leaves the server.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Deserialize;
use serde_json::Value;
use waiverdesk_core::{Tin, TIN_FORMAT_MESSAGE};
use waiverdesk_tin::{TinError, UpstreamBody, UpstreamReply};

use crate::middleware::RequestId;

use super::{ApiError, AppState};

const READ_FALLBACK: &str = "Server error";
const VALIDATE_FALLBACK: &str = "Proxy error";

#[derive(Debug, Deserialize)]
pub(super) struct TinQuery {
    tin: Option<String>,
    #[serde(rename = "TIN")]
    tin_upper: Option<String>,
}

impl TinQuery {
    /// First non-blank of `tin` and `TIN`, trimmed.
    fn value(&self) -> Option<&str> {
        [self.tin.as_deref(), self.tin_upper.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|v| !v.is_empty())
    }
}

/// GET /api/v1/tin?tin=…
pub(super) async fn read_tin(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<TinQuery>,
) -> Response {
    let Some(tin) = query.value() else {
        return no_store(ApiError::new(&req_id.0, "bad_request", "TIN is required"));
    };

    forward(&state, &req_id.0, tin, READ_FALLBACK).await
}

/// POST /api/v1/tin/validate with `{"tin": "…"}`.
///
/// The body is parsed by hand so malformed JSON still gets the error envelope.
pub(super) async fn validate_tin(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Bytes,
) -> Response {
    let rid = &req_id.0;

    let payload: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(e) => {
            return no_store(ApiError::new(
                rid,
                "bad_request",
                format!("request body must be JSON: {e}"),
            ));
        }
    };

    let candidate = tin_from_body(&payload).unwrap_or_default();
    let tin = match Tin::parse(&candidate) {
        Ok(tin) => tin,
        Err(_) => return no_store(ApiError::new(rid, "validation_error", TIN_FORMAT_MESSAGE)),
    };

    forward(&state, rid, tin.as_str(), VALIDATE_FALLBACK).await
}

/// Accepts `tin` or `TIN`, as a string or a bare integer. A `tin` that is
/// null or blank does not hide a usable `TIN`.
fn tin_from_body(payload: &Value) -> Option<String> {
    ["tin", "TIN"]
        .into_iter()
        .filter_map(|key| match payload.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) if n.is_u64() => Some(n.to_string()),
            _ => None,
        })
        .find(|candidate| !candidate.trim().is_empty())
}

async fn forward(state: &AppState, rid: &str, tin: &str, fallback: &str) -> Response {
    match state.tax_authority.fetch_taxpayer(tin).await {
        Ok(reply) => {
            tracing::info!(request_id = rid, status = reply.status, "tax authority lookup relayed");
            relay(reply)
        }
        Err(e) => {
            tracing::error!(request_id = rid, error = %e, "tax authority lookup failed");
            no_store(upstream_failure(rid, &e, fallback))
        }
    }
}

fn upstream_failure(rid: &str, error: &TinError, fallback: &str) -> ApiError {
    let message = error.to_string();
    let message = if message.trim().is_empty() {
        fallback.to_owned()
    } else {
        message
    };
    ApiError::new(rid, "upstream_error", message)
}

fn relay(reply: UpstreamReply) -> Response {
    let status = StatusCode::from_u16(reply.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let response = match reply.body {
        UpstreamBody::Json(value) => (status, Json(value)).into_response(),
        UpstreamBody::Text(text) => (
            status,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            text,
        )
            .into_response(),
    };
    no_store(response)
}

fn no_store(response: impl IntoResponse) -> Response {
    let mut response = response.into_response();
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

#[cfg(test)]
#[path = "tin_test.rs"]
mod tests;
