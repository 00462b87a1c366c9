//! Database operations for `search_history`.

use chrono::{DateTime, Duration, Utc};
use leadscout_core::{HistoryEntry, HistoryResult, NewHistoryEntry};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `search_history` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SearchHistoryRow {
    pub id: i64,
    pub public_id: Uuid,
    pub user_id: Uuid,
    pub query: String,
    pub service: String,
    pub location: String,
    pub criteria: String,
    pub results: Json<Vec<HistoryResult>>,
    pub result_count: i32,
    pub created_at: DateTime<Utc>,
}

impl SearchHistoryRow {
    #[must_use]
    pub fn into_entry(self) -> HistoryEntry {
        HistoryEntry {
            id: self.public_id,
            entry: NewHistoryEntry {
                user_id: self.user_id,
                query: self.query,
                service: self.service,
                location: self.location,
                criteria: self.criteria,
                results: self.results.0,
                result_count: u32::try_from(self.result_count).unwrap_or(0),
                recorded_at: self.created_at,
            },
        }
    }
}

/// Inserts `entry` unless the same user recorded the same composed query
/// within `window` before `entry.recorded_at`. Check and insert are one
/// statement. Returns whether a row was written.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the statement fails.
pub async fn insert_history_unless_recent(
    pool: &PgPool,
    entry: &NewHistoryEntry,
    window: Duration,
) -> Result<bool, DbError> {
    #[allow(clippy::cast_precision_loss)]
    let window_secs = window.num_milliseconds() as f64 / 1000.0;
    let result_count = i32::try_from(entry.result_count).map_err(|_| DbError::OutOfRange {
        column: "result_count",
        value: entry.result_count.to_string(),
    })?;

    let result = sqlx::query(
        "INSERT INTO search_history \
             (public_id, user_id, query, service, location, criteria, results, result_count, created_at) \
         SELECT $1, $2, $3, $4, $5, $6, $7, $8, $9 \
         WHERE NOT EXISTS ( \
             SELECT 1 FROM search_history \
             WHERE user_id = $2 \
               AND query = $3 \
               AND created_at > $9 - make_interval(secs => $10) \
         )",
    )
    .bind(Uuid::new_v4())
    .bind(entry.user_id)
    .bind(&entry.query)
    .bind(&entry.service)
    .bind(&entry.location)
    .bind(&entry.criteria)
    .bind(Json(&entry.results))
    .bind(result_count)
    .bind(entry.recorded_at)
    .bind(window_secs)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// The user's most recent entries, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_recent_history(
    pool: &PgPool,
    user_id: Uuid,
    limit: i64,
) -> Result<Vec<SearchHistoryRow>, DbError> {
    let rows = sqlx::query_as::<_, SearchHistoryRow>(
        "SELECT id, public_id, user_id, query, service, location, criteria, \
                results, result_count, created_at \
         FROM search_history \
         WHERE user_id = $1 \
         ORDER BY created_at DESC, id DESC \
         LIMIT $2",
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
