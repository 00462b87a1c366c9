//! Database operations for `users`: identity plus the per-user quota record.

use chrono::{DateTime, Utc};
use leadscout_core::{PlanConfig, QuotaState, CYCLE_DAYS};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

const USER_COLUMNS: &str =
    "id, email, name, plan_id, leads_used, leads_limit, cycle_start, created_at, updated_at";

/// A row from the `users` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub plan_id: String,
    /// The schema constrains this to `0..=leads_limit`.
    pub leads_used: i32,
    pub leads_limit: i32,
    pub cycle_start: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRow {
    #[must_use]
    pub fn quota_state(&self) -> QuotaState {
        QuotaState {
            plan_id: self.plan_id.clone(),
            used_count: u32::try_from(self.leads_used).unwrap_or(0),
            limit_count: u32::try_from(self.leads_limit).unwrap_or(0),
            cycle_start: self.cycle_start,
        }
    }
}

fn to_i32(column: &'static str, value: u32) -> Result<i32, DbError> {
    i32::try_from(value).map_err(|_| DbError::OutOfRange {
        column,
        value: value.to_string(),
    })
}

/// Creates a user on `plan` with a fresh cycle starting now.
///
/// # Errors
///
/// Returns [`DbError::DuplicateEmail`] if the email is taken (case-insensitive),
/// or [`DbError::Sqlx`] if the insert fails.
pub async fn create_user(
    pool: &PgPool,
    email: &str,
    name: &str,
    plan: &PlanConfig,
) -> Result<UserRow, DbError> {
    let email = email.trim();
    let sql = format!(
        "INSERT INTO users (id, email, name, plan_id, leads_used, leads_limit, cycle_start) \
         VALUES ($1, $2, $3, $4, 0, $5, NOW()) \
         RETURNING {USER_COLUMNS}"
    );
    let result = sqlx::query_as::<_, UserRow>(&sql)
        .bind(Uuid::new_v4())
        .bind(email)
        .bind(name.trim())
        .bind(&plan.id)
        .bind(to_i32("leads_limit", plan.limit)?)
        .fetch_one(pool)
        .await;

    match result {
        Ok(row) => Ok(row),
        Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
            Err(DbError::DuplicateEmail(email.to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Looks up a user by email, ignoring case.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_user_by_email(pool: &PgPool, email: &str) -> Result<Option<UserRow>, DbError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)");
    let row = sqlx::query_as::<_, UserRow>(&sql)
        .bind(email.trim())
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn get_user_by_id(pool: &PgPool, id: Uuid) -> Result<Option<UserRow>, DbError> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
    let row = sqlx::query_as::<_, UserRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Adds `count` to `leads_used` in one conditional statement.
///
/// The update only applies while the cycle is unexpired and the new total stays
/// within `leads_limit`, so concurrent searches cannot overspend. Returns
/// `None` when the condition failed or the user does not exist.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the update fails.
pub async fn debit_user_leads(
    pool: &PgPool,
    id: Uuid,
    count: u32,
) -> Result<Option<UserRow>, DbError> {
    let sql = format!(
        "UPDATE users \
         SET leads_used = leads_used + $2, updated_at = NOW() \
         WHERE id = $1 \
           AND leads_used + $2 <= leads_limit \
           AND cycle_start >= NOW() - make_interval(days => $3) \
         RETURNING {USER_COLUMNS}"
    );
    let cycle_days = i32::try_from(CYCLE_DAYS).unwrap_or(i32::MAX);
    let row = sqlx::query_as::<_, UserRow>(&sql)
        .bind(id)
        .bind(to_i32("leads_used", count)?)
        .bind(cycle_days)
        .fetch_optional(pool)
        .await?;
    Ok(row)
}

/// Moves a user to `plan`: usage zeroed, new limit, cycle restarted now.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no user has `id`, or [`DbError::Sqlx`] if
/// the update fails.
pub async fn reset_user_plan(
    pool: &PgPool,
    id: Uuid,
    plan: &PlanConfig,
) -> Result<UserRow, DbError> {
    let sql = format!(
        "UPDATE users \
         SET plan_id = $2, leads_used = 0, leads_limit = $3, \
             cycle_start = NOW(), updated_at = NOW() \
         WHERE id = $1 \
         RETURNING {USER_COLUMNS}"
    );
    sqlx::query_as::<_, UserRow>(&sql)
        .bind(id)
        .bind(&plan.id)
        .bind(to_i32("leads_limit", plan.limit)?)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)
}
