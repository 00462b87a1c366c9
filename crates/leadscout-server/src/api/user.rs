//! Account endpoints for the signed-in user.
//!
//! - `GET  /api/v1/user/credits`          : plan usage for the current cycle
//! - `GET  /api/v1/user/history`          : most recent searches
//! - `POST /api/v1/subscription/upgrade`  : switch plans and restart the cycle

use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use leadscout_core::{HistoryEntry, LedgerError, QuotaState};
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{json_body, resolve_user, ApiError, ApiResponse, AppState};

const HISTORY_LIMIT: usize = 10;

#[derive(Debug, Serialize)]
pub(super) struct CreditsData {
    plan: String,
    plan_name: Option<String>,
    leads_used: u32,
    leads_limit: u32,
    remaining: u32,
    cycle_start: DateTime<Utc>,
    cycle_ends_at: DateTime<Utc>,
    expired: bool,
}

#[derive(Debug, Deserialize)]
pub(super) struct UpgradeRequest {
    plan_id: String,
}

fn credits_data(state: &AppState, quota: &QuotaState) -> CreditsData {
    CreditsData {
        plan: quota.plan_id.clone(),
        plan_name: state.plans.find(&quota.plan_id).map(|p| p.name.clone()),
        leads_used: quota.used_count,
        leads_limit: quota.limit_count,
        remaining: quota.remaining(),
        cycle_start: quota.cycle_start,
        cycle_ends_at: quota.cycle_ends_at(),
        expired: quota.is_expired(Utc::now()),
    }
}

/// `GET /api/v1/user/credits`
pub(super) async fn get_credits(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<CreditsData>>, ApiError> {
    let user = resolve_user(&state, &headers, &req_id.0).await?;
    let data = credits_data(&state, &user.quota_state());
    Ok(Json(ApiResponse::new(req_id.0, data)))
}

/// `GET /api/v1/user/history`
pub(super) async fn list_history(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
) -> Result<Json<ApiResponse<Vec<HistoryEntry>>>, ApiError> {
    let user = resolve_user(&state, &headers, &req_id.0).await?;
    let entries = state
        .history
        .recent(user.id, HISTORY_LIMIT)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, user_id = %user.id, "history lookup failed");
            ApiError::new(&req_id.0, "internal_error", "history lookup failed")
        })?;
    Ok(Json(ApiResponse::new(req_id.0, entries)))
}

/// `POST /api/v1/subscription/upgrade`
pub(super) async fn upgrade_plan(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
    payload: Result<Json<UpgradeRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<CreditsData>>, ApiError> {
    let user = resolve_user(&state, &headers, &req_id.0).await?;
    let body = json_body(&req_id.0, payload)?;
    let plan_id = body.plan_id.trim();
    let Some(plan) = state.plans.find(plan_id) else {
        return Err(ApiError::new(
            &req_id.0,
            "validation_error",
            format!("unknown plan '{plan_id}'"),
        ));
    };

    let quota = state
        .ledger
        .reset_on_plan_change(user.id, plan)
        .await
        .map_err(|e| match e {
            LedgerError::UserNotFound(id) => {
                ApiError::new(&req_id.0, "not_found", format!("user {id} not found"))
            }
            other => {
                tracing::error!(error = %other, user_id = %user.id, "plan change failed");
                ApiError::new(&req_id.0, "internal_error", "plan change failed")
            }
        })?;

    tracing::info!(user_id = %user.id, plan = %plan.id, limit = plan.limit, "plan changed");
    let data = credits_data(&state, &quota);
    Ok(Json(ApiResponse::new(req_id.0, data)))
}
