//! AEO (Authorized Economic Operator) application handlers.

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use waiverdesk_core::{AeoApplication, AeoApplicationPatch, NewAeoApplication};

use crate::middleware::RequestId;
use crate::store::StoreError;

use super::{
    map_store_error, parse_id, parse_json_body, ApiError, ApiResponse, AppState, ListParams,
    ResponseMeta,
};

/// GET /api/v1/aeo-applications
pub(super) async fn list_aeo_applications(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(params): Query<ListParams>,
) -> Result<Json<ApiResponse<Vec<AeoApplication>>>, ApiError> {
    let filter = params.into_filter(&req_id.0)?;
    let data = state
        .store
        .list_aeo_applications(&filter)
        .map_err(|e| map_store_error(&req_id.0, &e))?;

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// GET /api/v1/aeo-applications/{id}
pub(super) async fn get_aeo_application(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<AeoApplication>>, ApiError> {
    let rid = &req_id.0;
    let id = parse_id(rid, &id)?;
    let data = state
        .store
        .get_aeo_application(id)
        .map_err(|e| map_store_error(rid, &e))?
        .ok_or_else(|| map_store_error(rid, &StoreError::NotFound(id)))?;

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// POST /api/v1/aeo-applications
pub(super) async fn create_aeo_application(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    body: Bytes,
) -> Result<(StatusCode, Json<ApiResponse<AeoApplication>>), ApiError> {
    let rid = &req_id.0;
    let body: NewAeoApplication = parse_json_body(rid, &body)?;
    let application = AeoApplication::create(&body, Utc::now())
        .map_err(|e| map_store_error(rid, &StoreError::Invalid(e)))?;

    state
        .store
        .insert_aeo_application(application.clone())
        .map_err(|e| map_store_error(rid, &e))?;

    tracing::info!(
        request_id = %rid,
        id = %application.id,
        tin = %application.tin,
        "AEO application created"
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse {
            data: application,
            meta: ResponseMeta::new(req_id.0),
        }),
    ))
}

/// PATCH /api/v1/aeo-applications/{id}
pub(super) async fn update_aeo_application(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Json<ApiResponse<AeoApplication>>, ApiError> {
    let rid = &req_id.0;
    let id = parse_id(rid, &id)?;
    let patch: AeoApplicationPatch = parse_json_body(rid, &body)?;
    let data = state
        .store
        .update_aeo_application(id, &patch, Utc::now())
        .map_err(|e| map_store_error(rid, &e))?;

    tracing::info!(request_id = %rid, %id, status = data.status.as_str(), "AEO application updated");

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}

/// DELETE /api/v1/aeo-applications/{id}
pub(super) async fn delete_aeo_application(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let rid = &req_id.0;
    let id = parse_id(rid, &id)?;
    state
        .store
        .delete_aeo_application(id)
        .map_err(|e| map_store_error(rid, &e))?;

    tracing::info!(request_id = %rid, %id, "AEO application deleted");
    Ok(StatusCode::NO_CONTENT)
}
