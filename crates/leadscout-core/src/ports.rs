//! Collaborator traits the search engine is wired through.
//!
//! The geocoder and map feature clients live in `leadscout-osm`; the quota
//! ledger and history store live in `leadscout-db`. Tests substitute
//! in-memory implementations.

use async_trait::async_trait;
use chrono::Duration;
use thiserror::Error;
use uuid::Uuid;

use crate::features::{GeocodedPlace, RawFeature};
use crate::geo::BoundingBox;
use crate::history::{HistoryEntry, NewHistoryEntry};
use crate::plans::PlanConfig;
use crate::quota::{QuotaError, QuotaState, Reservation};
use crate::search::TagPredicate;

/// A failed call to an external data source. Callers may treat it as "zero
/// results", but it stays distinguishable from an empty success.
#[derive(Debug, Error)]
#[error("{service} call failed: {message}")]
pub struct UpstreamError {
    pub service: &'static str,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Quota(#[from] QuotaError),

    #[error("user {0} not found")]
    UserNotFound(Uuid),

    #[error("quota storage error: {0}")]
    Storage(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("history storage error: {0}")]
    Backend(String),
}

#[async_trait]
pub trait Geocoder: Send + Sync {
    /// Resolves free text to candidate places, each with its reported extent.
    async fn geocode(&self, query: &str) -> Result<Vec<GeocodedPlace>, UpstreamError>;
}

#[async_trait]
pub trait FeatureSource: Send + Sync {
    /// Runs one union query of `predicates` over `bbox`.
    async fn query_features(
        &self,
        bbox: BoundingBox,
        predicates: &[TagPredicate],
    ) -> Result<Vec<RawFeature>, UpstreamError>;
}

/// Owner of each user's [`QuotaState`].
#[async_trait]
pub trait QuotaLedger: Send + Sync {
    /// Current state without any gating.
    async fn quota_state(&self, user_id: Uuid) -> Result<QuotaState, LedgerError>;

    /// Gate a search for `requested` leads. Nothing is charged yet.
    async fn check_and_reserve(
        &self,
        user_id: Uuid,
        requested: u32,
    ) -> Result<Reservation, LedgerError>;

    /// Charge `actual` leads. Implementations apply this as one conditional
    /// update and fail with a quota error if it would overspend.
    async fn debit(&self, user_id: Uuid, actual: u32) -> Result<QuotaState, LedgerError>;

    /// Switch plans: usage zeroed, new limit, cycle restarted now.
    async fn reset_on_plan_change(
        &self,
        user_id: Uuid,
        plan: &PlanConfig,
    ) -> Result<QuotaState, LedgerError>;
}

#[async_trait]
pub trait HistoryStore: Send + Sync {
    /// Appends `entry` unless the same user recorded the same query within
    /// `window` of `entry.recorded_at`. Returns whether a row was written.
    async fn append_unless_recent(
        &self,
        entry: &NewHistoryEntry,
        window: Duration,
    ) -> Result<bool, StoreError>;

    /// Most recent entries for a user, newest first.
    async fn recent(&self, user_id: Uuid, limit: usize) -> Result<Vec<HistoryEntry>, StoreError>;
}
