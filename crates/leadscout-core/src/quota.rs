//! Per-user monthly lead quota rules.
//!
//! A cycle is valid for exactly [`CYCLE_DAYS`] days from `cycle_start`. After
//! that every search is rejected until a plan change resets the cycle; there is
//! no automatic rollover.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::plans::PlanConfig;

pub const CYCLE_DAYS: i64 = 30;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QuotaError {
    #[error("subscription expired (cycle started {cycle_start}); please renew")]
    SubscriptionExpired { cycle_start: DateTime<Utc> },

    #[error("monthly limit reached ({limit} leads); upgrade your plan")]
    LimitReached { limit: u32 },

    #[error("only {remaining} credits left, {requested} requested")]
    InsufficientCredits { remaining: u32, requested: u32 },
}

impl QuotaError {
    /// `true` for both over-limit variants; `false` for an expired cycle.
    #[must_use]
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(
            self,
            QuotaError::LimitReached { .. } | QuotaError::InsufficientCredits { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaState {
    pub plan_id: String,
    pub used_count: u32,
    pub limit_count: u32,
    pub cycle_start: DateTime<Utc>,
}

/// Result of a successful pre-check: the state it was taken from and the
/// credits left before this search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reservation {
    pub state: QuotaState,
    pub remaining: u32,
}

impl QuotaState {
    /// Fresh cycle for `plan` starting at `now`. Also the state a plan change
    /// resets to: usage zeroed, new limit, cycle restarted.
    #[must_use]
    pub fn for_plan(plan: &PlanConfig, now: DateTime<Utc>) -> Self {
        Self {
            plan_id: plan.id.clone(),
            used_count: 0,
            limit_count: plan.limit,
            cycle_start: now,
        }
    }

    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.limit_count.saturating_sub(self.used_count)
    }

    #[must_use]
    pub fn cycle_ends_at(&self) -> DateTime<Utc> {
        self.cycle_start + Duration::days(CYCLE_DAYS)
    }

    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now - self.cycle_start > Duration::days(CYCLE_DAYS)
    }

    /// Gate a search for `requested` leads.
    ///
    /// # Errors
    ///
    /// - [`QuotaError::SubscriptionExpired`] when the cycle is older than 30 days,
    ///   regardless of usage.
    /// - [`QuotaError::LimitReached`] when no credits remain.
    /// - [`QuotaError::InsufficientCredits`] when `requested` exceeds what remains.
    pub fn check(&self, requested: u32, now: DateTime<Utc>) -> Result<Reservation, QuotaError> {
        if self.is_expired(now) {
            return Err(QuotaError::SubscriptionExpired {
                cycle_start: self.cycle_start,
            });
        }
        if self.used_count >= self.limit_count {
            return Err(QuotaError::LimitReached {
                limit: self.limit_count,
            });
        }
        let remaining = self.remaining();
        if requested > remaining {
            return Err(QuotaError::InsufficientCredits {
                remaining,
                requested,
            });
        }
        Ok(Reservation {
            state: self.clone(),
            remaining,
        })
    }

    /// State after charging `count` leads. Usage only ever grows here.
    #[must_use]
    pub fn debited(&self, count: u32) -> Self {
        Self {
            used_count: self.used_count.saturating_add(count),
            ..self.clone()
        }
    }
}
