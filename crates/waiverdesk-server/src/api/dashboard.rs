use axum::{extract::State, Extension, Json};

use crate::middleware::RequestId;
use crate::store::DashboardSummary;

use super::{map_store_error, ApiError, ApiResponse, AppState, ResponseMeta};

/// GET /api/v1/dashboard/summary: per-module counts for the sidebar badges.
pub(super) async fn get_summary(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<DashboardSummary>>, ApiError> {
    let data = state
        .store
        .summary()
        .map_err(|e| map_store_error(&req_id.0, &e))?;

    Ok(Json(ApiResponse {
        data,
        meta: ResponseMeta::new(req_id.0),
    }))
}
