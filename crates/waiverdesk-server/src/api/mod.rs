mod aeo;
mod dashboard;
mod duty_waivers;
mod tin;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;
use waiverdesk_core::{ApplicationError, ApplicationStatus};
use waiverdesk_tin::TaxAuthorityClient;

use crate::middleware::{
    enforce_rate_limit, request_id, require_bearer_auth, AuthState, RateLimitState, RequestId,
};
use crate::store::{ApplicationStore, ListFilter, StoreError};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ApplicationStore>,
    pub tax_authority: Arc<TaxAuthorityClient>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    upstream: &'static str,
}

/// Query parameters shared by the application list endpoints.
#[derive(Debug, Deserialize)]
pub(super) struct ListParams {
    pub status: Option<String>,
    pub tin: Option<String>,
    pub limit: Option<i64>,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn normalize_limit(limit: Option<i64>) -> usize {
    // Clamped to 1..=200 first, so the cast cannot truncate or lose sign.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let limit = limit.unwrap_or(50).clamp(1, 200) as usize;
    limit
}

impl ListParams {
    pub(super) fn into_filter(self, request_id: &str) -> Result<ListFilter, ApiError> {
        let status = self
            .status
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.trim().parse::<ApplicationStatus>())
            .transpose()
            .map_err(|e| ApiError::new(request_id, "validation_error", e.to_string()))?;
        Ok(ListFilter {
            status,
            tin: self.tin.map(|t| t.trim().to_owned()).filter(|t| !t.is_empty()),
            limit: normalize_limit(self.limit),
        })
    }
}

pub(super) fn parse_id(request_id: &str, raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| {
        ApiError::new(
            request_id,
            "validation_error",
            format!("'{raw}' is not a valid application id"),
        )
    })
}

/// Decodes a JSON request body. Any shape problem, from a malformed document
/// to an unknown enum value, is reported as a `validation_error` envelope.
pub(super) fn parse_json_body<T: DeserializeOwned>(
    request_id: &str,
    body: &[u8],
) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| {
        ApiError::new(
            request_id,
            "validation_error",
            format!("invalid request body: {e}"),
        )
    })
}

pub(super) fn map_store_error(request_id: &str, error: &StoreError) -> ApiError {
    match error {
        StoreError::NotFound(id) => {
            ApiError::new(request_id, "not_found", format!("application {id} not found"))
        }
        StoreError::Conflict(message) => ApiError::new(request_id, "conflict", message.clone()),
        StoreError::Invalid(ApplicationError::InvalidTransition { .. }) => {
            ApiError::new(request_id, "conflict", error.to_string())
        }
        StoreError::Invalid(e) => ApiError::new(request_id, "validation_error", e.to_string()),
        StoreError::Poisoned => {
            tracing::error!(error = %error, "application store unavailable");
            ApiError::new(request_id, "internal_error", "application store unavailable")
        }
    }
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn protected_router(auth: AuthState, rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/tin", get(tin::read_tin))
        .route("/api/v1/tin/validate", post(tin::validate_tin))
        .route(
            "/api/v1/duty-waivers",
            get(duty_waivers::list_duty_waivers).post(duty_waivers::create_duty_waiver),
        )
        .route(
            "/api/v1/duty-waivers/{id}",
            get(duty_waivers::get_duty_waiver)
                .patch(duty_waivers::update_duty_waiver)
                .delete(duty_waivers::delete_duty_waiver),
        )
        .route(
            "/api/v1/aeo-applications",
            get(aeo::list_aeo_applications).post(aeo::create_aeo_application),
        )
        .route(
            "/api/v1/aeo-applications/{id}",
            get(aeo::get_aeo_application)
                .patch(aeo::update_aeo_application)
                .delete(aeo::delete_aeo_application),
        )
        .route("/api/v1/dashboard/summary", get(dashboard::get_summary))
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    auth,
                    require_bearer_auth,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                )),
        )
}

pub fn build_app(state: AppState, auth: AuthState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new().route("/api/v1/health", get(health));

    Router::new()
        .merge(public_routes)
        .merge(protected_router(auth, rate_limit))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors())
                .layer(axum::middleware::from_fn(request_id)),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let upstream = if state.tax_authority.is_configured() {
        "configured"
    } else {
        "unconfigured"
    };

    Json(ApiResponse {
        data: HealthData {
            status: "ok",
            upstream,
        },
        meta: ResponseMeta::new(req_id.0),
    })
}

pub fn rate_limit_state(per_minute: usize) -> RateLimitState {
    RateLimitState::new(per_minute, Duration::from_secs(60))
}
