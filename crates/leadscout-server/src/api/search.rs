use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    Extension, Json,
};
use leadscout_core::{Lead, QuotaError, SearchRequest};
use leadscout_search::SearchError;
use serde::Serialize;

use crate::middleware::RequestId;

use super::{json_body, resolve_user, ApiError, ApiResponse, AppState};

#[derive(Debug, Serialize)]
pub(super) struct SearchData {
    leads: Vec<Lead>,
}

/// `POST /api/v1/search`
pub(super) async fn run_search(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    headers: HeaderMap,
    payload: Result<Json<SearchRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<SearchData>>, ApiError> {
    let user = resolve_user(&state, &headers, &req_id.0).await?;
    let request = json_body(&req_id.0, payload)?;

    let outcome = state
        .engine
        .search(user.id, request)
        .await
        .map_err(|e| map_search_error(&req_id.0, &e))?;

    // History is written in the background; the response does not wait on it.
    drop(outcome.history_task);

    Ok(Json(ApiResponse::new(
        req_id.0,
        SearchData {
            leads: outcome.leads,
        },
    )))
}

pub(super) fn map_search_error(request_id: &str, error: &SearchError) -> ApiError {
    match error {
        SearchError::Malformed(e) => ApiError::new(request_id, "validation_error", e.to_string()),
        SearchError::Quota(e @ QuotaError::SubscriptionExpired { .. }) => {
            ApiError::new(request_id, "subscription_expired", e.to_string())
        }
        SearchError::Quota(e) => ApiError::new(request_id, "quota_exceeded", e.to_string()),
        SearchError::UserNotFound(id) => {
            ApiError::new(request_id, "not_found", format!("user {id} not found"))
        }
        SearchError::Internal(msg) => {
            tracing::error!(error = %msg, "search failed");
            ApiError::new(request_id, "internal_error", "search failed; please try again")
        }
    }
}
