//! Postgres-backed implementations of the quota ledger and history store ports.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use leadscout_core::{
    HistoryEntry, HistoryStore, LedgerError, NewHistoryEntry, PlanConfig, QuotaLedger,
    QuotaState, Reservation, StoreError,
};
use sqlx::PgPool;
use uuid::Uuid;

use crate::search_history::{insert_history_unless_recent, list_recent_history};
use crate::users::{debit_user_leads, get_user_by_id, reset_user_plan};
use crate::DbError;

fn storage(err: DbError) -> LedgerError {
    LedgerError::Storage(err.to_string())
}

#[derive(Clone)]
pub struct PgQuotaLedger {
    pool: PgPool,
}

impl PgQuotaLedger {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuotaLedger for PgQuotaLedger {
    async fn quota_state(&self, user_id: Uuid) -> Result<QuotaState, LedgerError> {
        get_user_by_id(&self.pool, user_id)
            .await
            .map_err(storage)?
            .map(|row| row.quota_state())
            .ok_or(LedgerError::UserNotFound(user_id))
    }

    async fn check_and_reserve(
        &self,
        user_id: Uuid,
        requested: u32,
    ) -> Result<Reservation, LedgerError> {
        let state = self.quota_state(user_id).await?;
        Ok(state.check(requested, Utc::now())?)
    }

    async fn debit(&self, user_id: Uuid, actual: u32) -> Result<QuotaState, LedgerError> {
        if let Some(row) = debit_user_leads(&self.pool, user_id, actual)
            .await
            .map_err(storage)?
        {
            return Ok(row.quota_state());
        }

        // The guarded update matched nothing: report why.
        let state = self.quota_state(user_id).await?;
        state.check(actual, Utc::now())?;
        tracing::warn!(%user_id, actual, "debit rejected although current state allows it");
        Err(LedgerError::Storage(
            "quota debit conflicted with a concurrent update".to_string(),
        ))
    }

    async fn reset_on_plan_change(
        &self,
        user_id: Uuid,
        plan: &PlanConfig,
    ) -> Result<QuotaState, LedgerError> {
        match reset_user_plan(&self.pool, user_id, plan).await {
            Ok(row) => Ok(row.quota_state()),
            Err(DbError::NotFound) => Err(LedgerError::UserNotFound(user_id)),
            Err(e) => Err(storage(e)),
        }
    }
}

#[derive(Clone)]
pub struct PgHistoryStore {
    pool: PgPool,
}

impl PgHistoryStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HistoryStore for PgHistoryStore {
    async fn append_unless_recent(
        &self,
        entry: &NewHistoryEntry,
        window: Duration,
    ) -> Result<bool, StoreError> {
        insert_history_unless_recent(&self.pool, entry, window)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))
    }

    async fn recent(&self, user_id: Uuid, limit: usize) -> Result<Vec<HistoryEntry>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = list_recent_history(&self.pool, user_id, limit)
            .await
            .map_err(|e| StoreError::Backend(e.to_string()))?;
        Ok(rows.into_iter().map(|r| r.into_entry()).collect())
    }
}
