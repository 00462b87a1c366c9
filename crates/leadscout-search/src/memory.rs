//! In-process quota ledger and history store.
//!
//! Used by tests and by offline runs of the engine. Each operation takes the
//! lock once, so check-and-debit is atomic per call just like the Postgres
//! implementation's conditional update.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use leadscout_core::{
    HistoryEntry, HistoryStore, LedgerError, NewHistoryEntry, PlanConfig, QuotaLedger, QuotaState,
    Reservation, StoreError,
};
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryQuotaLedger {
    states: Mutex<HashMap<Uuid, QuotaState>>,
}

impl MemoryQuotaLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, user_id: Uuid, state: QuotaState) {
        self.states.lock().await.insert(user_id, state);
    }
}

#[async_trait]
impl QuotaLedger for MemoryQuotaLedger {
    async fn quota_state(&self, user_id: Uuid) -> Result<QuotaState, LedgerError> {
        self.states
            .lock()
            .await
            .get(&user_id)
            .cloned()
            .ok_or(LedgerError::UserNotFound(user_id))
    }

    async fn check_and_reserve(
        &self,
        user_id: Uuid,
        requested: u32,
    ) -> Result<Reservation, LedgerError> {
        let states = self.states.lock().await;
        let state = states
            .get(&user_id)
            .ok_or(LedgerError::UserNotFound(user_id))?;
        Ok(state.check(requested, Utc::now())?)
    }

    async fn debit(&self, user_id: Uuid, actual: u32) -> Result<QuotaState, LedgerError> {
        let mut states = self.states.lock().await;
        let state = states
            .get_mut(&user_id)
            .ok_or(LedgerError::UserNotFound(user_id))?;
        state.check(actual, Utc::now())?;
        *state = state.debited(actual);
        Ok(state.clone())
    }

    async fn reset_on_plan_change(
        &self,
        user_id: Uuid,
        plan: &PlanConfig,
    ) -> Result<QuotaState, LedgerError> {
        let mut states = self.states.lock().await;
        let state = states
            .get_mut(&user_id)
            .ok_or(LedgerError::UserNotFound(user_id))?;
        *state = QuotaState::for_plan(plan, Utc::now());
        Ok(state.clone())
    }
}

#[derive(Default)]
pub struct MemoryHistoryStore {
    entries: Mutex<Vec<HistoryEntry>>,
}

impl MemoryHistoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

fn within_window(
    previous: DateTime<Utc>,
    recorded_at: DateTime<Utc>,
    window: Duration,
) -> bool {
    recorded_at - previous < window
}

#[async_trait]
impl HistoryStore for MemoryHistoryStore {
    async fn append_unless_recent(
        &self,
        entry: &NewHistoryEntry,
        window: Duration,
    ) -> Result<bool, StoreError> {
        let mut entries = self.entries.lock().await;
        let duplicate = entries.iter().any(|e| {
            e.entry.user_id == entry.user_id
                && e.entry.query == entry.query
                && within_window(e.entry.recorded_at, entry.recorded_at, window)
        });
        if duplicate {
            return Ok(false);
        }
        entries.push(HistoryEntry {
            id: Uuid::new_v4(),
            entry: entry.clone(),
        });
        Ok(true)
    }

    async fn recent(&self, user_id: Uuid, limit: usize) -> Result<Vec<HistoryEntry>, StoreError> {
        let entries = self.entries.lock().await;
        let mut mine: Vec<HistoryEntry> = entries
            .iter()
            .filter(|e| e.entry.user_id == user_id)
            .cloned()
            .collect();
        mine.sort_by(|a, b| b.entry.recorded_at.cmp(&a.entry.recorded_at));
        mine.truncate(limit);
        Ok(mine)
    }
}

#[cfg(test)]
mod tests {
    use leadscout_core::{SearchRequest, CYCLE_DAYS};
    use rust_decimal::Decimal;

    use super::*;

    fn plan(id: &str, limit: u32) -> PlanConfig {
        PlanConfig {
            id: id.to_string(),
            name: id.to_string(),
            price: Decimal::ZERO,
            limit,
            features: Vec::new(),
            default: false,
            popular: false,
        }
    }

    fn entry(user_id: Uuid, query_location: &str, at: DateTime<Utc>) -> NewHistoryEntry {
        let request = SearchRequest {
            service: "seo".to_string(),
            location: query_location.to_string(),
            criteria: "cafes".to_string(),
            requested_count: 5,
        };
        NewHistoryEntry::from_search(user_id, &request, &[], at)
    }

    #[tokio::test]
    async fn debit_cannot_overspend() {
        let ledger = MemoryQuotaLedger::new();
        let user = Uuid::new_v4();
        ledger
            .insert(user, QuotaState::for_plan(&plan("free", 10), Utc::now()))
            .await;

        let state = ledger.debit(user, 8).await.expect("first debit fits");
        assert_eq!(state.used_count, 8);

        let err = ledger.debit(user, 3).await.unwrap_err();
        assert!(matches!(err, LedgerError::Quota(ref q) if q.is_quota_exceeded()));
        assert_eq!(ledger.quota_state(user).await.unwrap().used_count, 8);
    }

    #[tokio::test]
    async fn plan_change_resets_usage_and_cycle() {
        let ledger = MemoryQuotaLedger::new();
        let user = Uuid::new_v4();
        let stale = QuotaState {
            used_count: 10,
            cycle_start: Utc::now() - Duration::days(CYCLE_DAYS + 5),
            ..QuotaState::for_plan(&plan("free", 10), Utc::now())
        };
        ledger.insert(user, stale).await;
        assert!(ledger.check_and_reserve(user, 1).await.is_err());

        let state = ledger
            .reset_on_plan_change(user, &plan("pro", 50))
            .await
            .expect("reset");
        assert_eq!(state.plan_id, "pro");
        assert_eq!(state.used_count, 0);
        assert_eq!(state.limit_count, 50);
        let reservation = ledger.check_and_reserve(user, 50).await.expect("fresh cycle");
        assert_eq!(reservation.remaining, 50);
    }

    #[tokio::test]
    async fn unknown_user_is_reported() {
        let ledger = MemoryQuotaLedger::new();
        let user = Uuid::new_v4();
        assert!(matches!(
            ledger.check_and_reserve(user, 1).await,
            Err(LedgerError::UserNotFound(id)) if id == user
        ));
    }

    #[tokio::test]
    async fn identical_query_within_window_is_stored_once() {
        let store = MemoryHistoryStore::new();
        let user = Uuid::new_v4();
        let now = Utc::now();
        let window = Duration::minutes(5);

        assert!(store.append_unless_recent(&entry(user, "Pune", now), window).await.unwrap());
        assert!(!store
            .append_unless_recent(&entry(user, "Pune", now + Duration::minutes(4)), window)
            .await
            .unwrap());
        assert_eq!(store.len().await, 1);

        // a different user, a different query, or a later time all append
        assert!(store
            .append_unless_recent(&entry(Uuid::new_v4(), "Pune", now), window)
            .await
            .unwrap());
        assert!(store
            .append_unless_recent(&entry(user, "Goa", now), window)
            .await
            .unwrap());
        assert!(store
            .append_unless_recent(&entry(user, "Pune", now + Duration::minutes(6)), window)
            .await
            .unwrap());
        assert_eq!(store.len().await, 4);
    }

    #[tokio::test]
    async fn recent_is_newest_first_and_limited() {
        let store = MemoryHistoryStore::new();
        let user = Uuid::new_v4();
        let now = Utc::now();
        for (i, city) in ["Pune", "Goa", "Delhi"].iter().enumerate() {
            let at = now + Duration::minutes(i64::try_from(i).unwrap());
            store
                .append_unless_recent(&entry(user, city, at), Duration::minutes(5))
                .await
                .unwrap();
        }
        let recent = store.recent(user, 2).await.unwrap();
        let locations: Vec<&str> = recent.iter().map(|e| e.entry.location.as_str()).collect();
        assert_eq!(locations, vec!["Delhi", "Goa"]);
    }
}
