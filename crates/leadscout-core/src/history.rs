use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::leads::Lead;
use crate::search::SearchRequest;

/// Minimal per-lead summary kept in history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryResult {
    pub business_name: String,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewHistoryEntry {
    pub user_id: Uuid,
    /// Composed `"{term} in {location}"` string; the dedup key.
    pub query: String,
    pub service: String,
    pub location: String,
    pub criteria: String,
    pub results: Vec<HistoryResult>,
    pub result_count: u32,
    pub recorded_at: DateTime<Utc>,
}

impl NewHistoryEntry {
    #[must_use]
    pub fn from_search(
        user_id: Uuid,
        request: &SearchRequest,
        leads: &[Lead],
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            user_id,
            query: request.composed_query(),
            service: request.service.clone(),
            location: request.location.clone(),
            criteria: request.criteria.clone(),
            results: leads
                .iter()
                .map(|l| HistoryResult {
                    business_name: l.business_name.clone(),
                    location: l.location.clone(),
                })
                .collect(),
            result_count: u32::try_from(leads.len()).unwrap_or(u32::MAX),
            recorded_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    #[serde(flatten)]
    pub entry: NewHistoryEntry,
}
