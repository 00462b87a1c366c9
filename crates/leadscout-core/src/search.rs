use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_REQUESTED_COUNT: u32 = 10;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    #[error("location is required")]
    MissingLocation,
    #[error("either service or criteria is required")]
    MissingSearchTerm,
    #[error("limit must be at least 1")]
    ZeroLimit,
}

/// One lead search, as submitted by a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// What the user sells (e.g. "web design"); used when `criteria` is blank.
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub location: String,
    /// Free-text description of the target businesses.
    #[serde(default)]
    pub criteria: String,
    #[serde(default = "default_requested_count", alias = "limit")]
    pub requested_count: u32,
}

fn default_requested_count() -> u32 {
    DEFAULT_REQUESTED_COUNT
}

impl SearchRequest {
    /// Rejects requests the engine cannot act on.
    ///
    /// # Errors
    ///
    /// Returns a [`RequestError`] naming the first missing or invalid field.
    pub fn validate(&self) -> Result<(), RequestError> {
        if self.location.trim().is_empty() {
            return Err(RequestError::MissingLocation);
        }
        if self.search_term().is_empty() {
            return Err(RequestError::MissingSearchTerm);
        }
        if self.requested_count == 0 {
            return Err(RequestError::ZeroLimit);
        }
        Ok(())
    }

    /// The target description: `criteria` when present, otherwise `service`.
    #[must_use]
    pub fn search_term(&self) -> &str {
        let criteria = self.criteria.trim();
        if criteria.is_empty() {
            self.service.trim()
        } else {
            criteria
        }
    }

    /// `"{term} in {location}"`: the primary geocoder query and the history key.
    #[must_use]
    pub fn composed_query(&self) -> String {
        format!("{} in {}", self.search_term(), self.location.trim())
    }
}

/// A tag filter in the map feature service's query language,
/// e.g. `["shop"="clothes"]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagPredicate(String);

impl TagPredicate {
    #[must_use]
    pub fn new(expr: impl Into<String>) -> Self {
        Self(expr.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TagPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One clause of the criteria text and the predicates it resolved to.
/// `predicates` is never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassifiedTerm {
    pub raw_term: String,
    pub predicates: Vec<TagPredicate>,
}
