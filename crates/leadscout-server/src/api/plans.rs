use axum::{extract::State, Extension, Json};
use leadscout_core::PlanConfig;

use crate::middleware::RequestId;

use super::{ApiResponse, AppState};

/// `GET /api/v1/plans`: the catalog in configured order.
pub(super) async fn list_plans(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Json<ApiResponse<Vec<PlanConfig>>> {
    Json(ApiResponse::new(req_id.0, state.plans.plans.clone()))
}
