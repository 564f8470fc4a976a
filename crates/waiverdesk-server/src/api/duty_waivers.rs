//! Duty waiver application handlers.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use waiverdesk_core::{DutyWaiverApplication, DutyWaiverPatch, NewDutyWaiver};

use crate::middleware::RequestId;
use crate::store::StoreError;

use super::{
    map_store_error, parse_id, parse_json_body, ApiError, ApiResponse, AppState, ListParams,
    ResponseMeta,
};

/// GET /api/v1/duty-waivers
pub(super) async fn list_duty_waivers(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<ListParams>,
) -> Result<Json<ApiResponse<Vec<DutyWaiverApplication>>>, ApiError> {
    let filter = params.into_filter(&req_id.0)?;
    let data = state
        .store
        .list_duty_waivers(&filter)
        .map_err(|e| map_store_error(&req_id.0, &e))?;

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /api/v1/duty-waivers/{id}
pub(super) async fn get_duty_waiver(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<DutyWaiverApplication>>, ApiError> {
    let rid = &req_id.0;
    let id = parse_id(rid, &id)?;
    let data = state
        .store
        .get_duty_waiver(id)
        .map_err(|e| map_store_error(rid, &e))?
        .ok_or_else(|| map_store_error(rid, &StoreError::NotFound(id)))?;

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/duty-waivers
pub(super) async fn create_duty_waiver(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Bytes,
) -> Result<(StatusCode, Json<ApiResponse<DutyWaiverApplication>>), ApiError> {
    let rid = &req_id.0;
    let body: NewDutyWaiver = parse_json_body(rid, &body)?;
    let application = DutyWaiverApplication::create(&body, Utc::now())
        .map_err(|e| map_store_error(rid, &StoreError::Invalid(e)))?;

    state
        .store
        .insert_duty_waiver(application.clone())
        .map_err(|e| map_store_error(rid, &e))?;

    tracing::info!(
        request_id = %rid,
        id = %application.id,
        tin = %application.tin,
        "duty waiver application created"
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: application,
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// PATCH /api/v1/duty-waivers/{id}
pub(super) async fn update_duty_waiver(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<ApiResponse<DutyWaiverApplication>>, ApiError> {
    let rid = &req_id.0;
    let id = parse_id(rid, &id)?;
    let patch: DutyWaiverPatch = parse_json_body(rid, &body)?;
    let data = state
        .store
        .update_duty_waiver(id, &patch, Utc::now())
        .map_err(|e| map_store_error(rid, &e))?;

    tracing::info!(request_id = %rid, %id, status = data.status.as_str(), "duty waiver application updated");

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// DELETE /api/v1/duty-waivers/{id}
pub(super) async fn delete_duty_waiver(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let rid = &req_id.0;
    let id = parse_id(rid, &id)?;
    state
        .store
        .delete_duty_waiver(id)
        .map_err(|e| map_store_error(rid, &e))?;

    tracing::info!(request_id = %rid, %id, "duty waiver application deleted");
    Ok(StatusCode::NO_CONTENT)
}
