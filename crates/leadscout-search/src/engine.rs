//! Result fusion engine: quota gate, geocoder primary pass, map feature
//! secondary pass, identity dedup, cap, enrichment, debit, history.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{Duration, Utc};
use leadscout_core::{
    AppConfig, FeatureSource, GeocodedPlace, Geocoder, HistoryStore, Lead, LedgerError,
    NewHistoryEntry, QuotaError, QuotaLedger, QuotaState, RawFeature, RequestError,
    SearchRequest,
};
use thiserror::Error;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::classifier::Classifier;
use crate::enrich::Enricher;

const DEFAULT_FUSION_THRESHOLD: usize = 3;
const DEFAULT_HISTORY_WINDOW_SECS: i64 = 300;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("malformed request: {0}")]
    Malformed(#[from] RequestError),

    #[error(transparent)]
    Quota(#[from] QuotaError),

    #[error("user {0} not found")]
    UserNotFound(Uuid),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<LedgerError> for SearchError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Quota(q) => SearchError::Quota(q),
            LedgerError::UserNotFound(id) => SearchError::UserNotFound(id),
            LedgerError::Storage(msg) => SearchError::Internal(msg),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EngineOptions {
    /// Primary-pass candidate counts below this trigger the secondary pass.
    pub fusion_threshold: usize,
    /// Identical queries by one user inside this window share a history entry.
    pub history_window: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            fusion_threshold: DEFAULT_FUSION_THRESHOLD,
            history_window: Duration::seconds(DEFAULT_HISTORY_WINDOW_SECS),
        }
    }
}

impl EngineOptions {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        let history_window = i64::try_from(config.history_dedup_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or_else(|| Duration::seconds(DEFAULT_HISTORY_WINDOW_SECS));
        Self {
            fusion_threshold: config.fusion_threshold,
            history_window,
        }
    }
}

/// What a completed search hands back.
#[derive(Debug)]
pub struct SearchOutcome {
    pub leads: Vec<Lead>,
    /// Quota after the debit, or unchanged when no leads were found.
    pub quota: QuotaState,
    /// Background history append. Callers may drop it; awaiting is for tests
    /// and short-lived processes.
    pub history_task: JoinHandle<()>,
}

pub struct SearchEngine {
    geocoder: Arc<dyn Geocoder>,
    features: Arc<dyn FeatureSource>,
    ledger: Arc<dyn QuotaLedger>,
    history: Arc<dyn HistoryStore>,
    enricher: Arc<dyn Enricher>,
    classifier: Classifier,
    options: EngineOptions,
}

impl SearchEngine {
    #[must_use]
    pub fn new(
        geocoder: Arc<dyn Geocoder>,
        features: Arc<dyn FeatureSource>,
        ledger: Arc<dyn QuotaLedger>,
        history: Arc<dyn HistoryStore>,
        enricher: Arc<dyn Enricher>,
    ) -> Self {
        Self {
            geocoder,
            features,
            ledger,
            history,
            enricher,
            classifier: Classifier::default(),
            options: EngineOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    /// Runs one search for `user_id`.
    ///
    /// External lookups never fail the search; they only reduce the number of
    /// candidates. Quota is debited by the number of leads actually returned,
    /// and not at all when none were found.
    ///
    /// # Errors
    ///
    /// - [`SearchError::Malformed`] for a missing location or search term, or a zero limit.
    /// - [`SearchError::Quota`] when the cycle has expired or credits are short,
    ///   including a concurrent search spending them first.
    /// - [`SearchError::UserNotFound`] when the ledger has no record for the user.
    /// - [`SearchError::Internal`] on quota storage failure.
    pub async fn search(
        &self,
        user_id: Uuid,
        request: SearchRequest,
    ) -> Result<SearchOutcome, SearchError> {
        request.validate()?;
        let reservation = self
            .ledger
            .check_and_reserve(user_id, request.requested_count)
            .await?;
        tracing::debug!(
            %user_id,
            remaining = reservation.remaining,
            requested = request.requested_count,
            "quota reserved"
        );

        let candidates = self.collect_candidates(&request).await;
        let cap = usize::try_from(request.requested_count).unwrap_or(usize::MAX);
        let survivors: Vec<RawFeature> = candidates.into_iter().take(cap).collect();
        let leads = self.enricher.enrich(&survivors, &request);

        let quota = if leads.is_empty() {
            reservation.state
        } else {
            let count = u32::try_from(leads.len())
                .map_err(|_| SearchError::Internal("lead count overflow".to_string()))?;
            self.ledger.debit(user_id, count).await?
        };

        tracing::info!(
            %user_id,
            query = %request.composed_query(),
            leads = leads.len(),
            used = quota.used_count,
            limit = quota.limit_count,
            "search completed"
        );

        let history_task = self.record_history(user_id, &request, &leads);
        Ok(SearchOutcome {
            leads,
            quota,
            history_task,
        })
    }

    /// Primary pass, plus the secondary pass when the primary under-returns.
    async fn collect_candidates(&self, request: &SearchRequest) -> Vec<RawFeature> {
        let primary: Vec<RawFeature> = self
            .geocode("primary", &request.composed_query())
            .await
            .into_iter()
            .map(|place| place.feature)
            .collect();
        if primary.len() >= self.options.fusion_threshold {
            return primary;
        }

        let secondary = self.secondary_pass(request).await;
        fuse_candidates(primary, secondary)
    }

    async fn secondary_pass(&self, request: &SearchRequest) -> Vec<RawFeature> {
        let places = self.geocode("location", request.location.trim()).await;
        let Some(bbox) = places.first().and_then(|p| p.bounding_box) else {
            tracing::debug!(location = %request.location, "no bounding box for location; skipping map feature pass");
            return Vec::new();
        };

        let terms = self.classifier.classify(request.search_term());
        let predicates = Classifier::merged_predicates(&terms);
        tracing::debug!(terms = terms.len(), predicates = predicates.len(), "criteria classified");

        match self.features.query_features(bbox, &predicates).await {
            Ok(features) if features.is_empty() => {
                tracing::debug!(outcome = "empty", "map feature query");
                features
            }
            Ok(features) => {
                tracing::debug!(outcome = "ok", candidates = features.len(), "map feature query");
                features
            }
            Err(e) => {
                tracing::warn!(outcome = "failed", error = %e, "map feature query");
                Vec::new()
            }
        }
    }

    async fn geocode(&self, pass: &'static str, query: &str) -> Vec<GeocodedPlace> {
        match self.geocoder.geocode(query).await {
            Ok(places) if places.is_empty() => {
                tracing::debug!(pass, query, outcome = "empty", "geocoder lookup");
                places
            }
            Ok(places) => {
                tracing::debug!(pass, query, outcome = "ok", candidates = places.len(), "geocoder lookup");
                places
            }
            Err(e) => {
                tracing::warn!(pass, query, outcome = "failed", error = %e, "geocoder lookup");
                Vec::new()
            }
        }
    }

    /// Appends the history entry off the request path. Failures are logged only.
    fn record_history(
        &self,
        user_id: Uuid,
        request: &SearchRequest,
        leads: &[Lead],
    ) -> JoinHandle<()> {
        let store = Arc::clone(&self.history);
        let entry = NewHistoryEntry::from_search(user_id, request, leads, Utc::now());
        let window = self.options.history_window;
        tokio::spawn(async move {
            match store.append_unless_recent(&entry, window).await {
                Ok(true) => tracing::debug!(user_id = %entry.user_id, query = %entry.query, "history recorded"),
                Ok(false) => tracing::debug!(
                    user_id = %entry.user_id,
                    query = %entry.query,
                    "identical query recorded recently; history unchanged"
                ),
                Err(e) => tracing::warn!(error = %e, "failed to record search history"),
            }
        })
    }
}

/// Appends `secondary` to `primary`, dropping any record whose source id was
/// already seen. Discovery order is kept.
#[must_use]
pub fn fuse_candidates(primary: Vec<RawFeature>, secondary: Vec<RawFeature>) -> Vec<RawFeature> {
    let mut seen: HashSet<_> = primary.iter().map(|f| f.source_id.clone()).collect();
    let mut merged = primary;
    merged.extend(
        secondary
            .into_iter()
            .filter(|f| seen.insert(f.source_id.clone())),
    );
    merged
}

#[cfg(test)]
#[path = "engine_test.rs"]
mod tests;
