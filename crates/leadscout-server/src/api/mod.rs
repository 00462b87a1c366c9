mod plans;
mod search;
mod user;

use std::{sync::Arc, time::Duration};

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap, HeaderName, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use leadscout_core::{AppConfig, HistoryStore, PlanCatalog, QuotaLedger};
use leadscout_db::{PgHistoryStore, PgQuotaLedger, UserRow};
use leadscout_osm::{FeatureClient, FeatureQueryOptions, GeocoderClient, HttpSettings};
use leadscout_search::{EngineOptions, SearchEngine, SyntheticEnricher};
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::middleware::{
    enforce_rate_limit, request_id, require_bearer_auth, AuthState, RateLimitState, RequestId,
};

/// Set by the upstream session layer to the signed-in user's email.
pub(crate) const USER_EMAIL_HEADER: &str = "x-user-email";

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub engine: Arc<SearchEngine>,
    pub plans: Arc<PlanCatalog>,
    pub ledger: Arc<dyn QuotaLedger>,
    pub history: Arc<dyn HistoryStore>,
}

impl AppState {
    /// Wires the map clients and Postgres-backed stores into a search engine.
    pub fn from_config(
        pool: PgPool,
        config: &AppConfig,
        plans: PlanCatalog,
    ) -> anyhow::Result<Self> {
        let settings = HttpSettings::from_app_config(config);
        let geocoder = GeocoderClient::new(
            &config.geocoder_url,
            settings.clone(),
            config.geocoder_result_limit,
        )?;
        let features = FeatureClient::new(
            &config.features_url,
            settings,
            FeatureQueryOptions::from_app_config(config),
        )?;
        let ledger: Arc<dyn QuotaLedger> = Arc::new(PgQuotaLedger::new(pool.clone()));
        let history: Arc<dyn HistoryStore> = Arc::new(PgHistoryStore::new(pool.clone()));

        let engine = SearchEngine::new(
            Arc::new(geocoder),
            Arc::new(features),
            Arc::clone(&ledger),
            Arc::clone(&history),
            Arc::new(SyntheticEnricher::default()),
        )
        .with_options(EngineOptions::from_app_config(config));

        Ok(Self {
            pool,
            engine: Arc::new(engine),
            plans: Arc::new(plans),
            ledger,
            history,
        })
    }
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
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn new(request_id: String, data: T) -> Self {
        Self {
            data,
            meta: ResponseMeta::new(request_id),
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

    fn status(&self) -> StatusCode {
        match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthenticated" | "unauthorized" => StatusCode::UNAUTHORIZED,
            "quota_exceeded" | "subscription_expired" => StatusCode::FORBIDDEN,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status(), Json(self)).into_response()
    }
}

pub(super) fn map_db_error(request_id: String, error: &leadscout_db::DbError) -> ApiError {
    tracing::error!(error = %error, "database query failed");
    ApiError::new(request_id, "internal_error", "database query failed")
}

/// Unwraps a JSON body, turning axum's rejection into the standard envelope.
pub(super) fn json_body<T>(
    request_id: &str,
    payload: Result<Json<T>, JsonRejection>,
) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::new(request_id, "bad_request", rejection.body_text()))
}

/// Resolves the caller from [`USER_EMAIL_HEADER`]: 401 when absent, 404 when
/// no account has that email.
pub(super) async fn resolve_user(
    state: &AppState,
    headers: &HeaderMap,
    request_id: &str,
) -> Result<UserRow, ApiError> {
    let email = headers
        .get(USER_EMAIL_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::new(request_id, "unauthenticated", "sign in to continue"))?;

    leadscout_db::get_user_by_email(&state.pool, email)
        .await
        .map_err(|e| map_db_error(request_id.to_owned(), &e))?
        .ok_or_else(|| ApiError::new(request_id, "not_found", format!("user '{email}' not found")))
}

fn build_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(tower_http::cors::Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
            HeaderName::from_static(USER_EMAIL_HEADER),
        ])
}

fn protected_router(auth: AuthState, rate_limit: RateLimitState) -> Router<AppState> {
    Router::new()
        .route("/api/v1/search", post(search::run_search))
        .route("/api/v1/user/credits", get(user::get_credits))
        .route("/api/v1/user/history", get(user::list_history))
        .route("/api/v1/subscription/upgrade", post(user::upgrade_plan))
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                ))
                .layer(axum::middleware::from_fn_with_state(
                    auth,
                    require_bearer_auth,
                )),
        )
}

pub fn build_app(state: AppState, auth: AuthState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new()
        .route("/api/v1/health", get(health))
        .route("/api/v1/plans", get(plans::list_plans));

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
    let meta = ResponseMeta::new(req_id.0);

    match leadscout_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(120, Duration::from_secs(60))
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
