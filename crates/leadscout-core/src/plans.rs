use std::collections::HashSet;
use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// One subscription tier: how many leads a user may pull per 30-day cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanConfig {
    pub id: String,
    pub name: String,
    /// Monthly price in USD.
    pub price: Decimal,
    pub limit: u32,
    #[serde(default)]
    pub features: Vec<String>,
    /// Plan assigned to newly created users. Exactly one plan must set this.
    #[serde(default)]
    pub default: bool,
    #[serde(default)]
    pub popular: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlanCatalog {
    pub plans: Vec<PlanConfig>,
}

impl PlanCatalog {
    /// Looks up a plan by id.
    #[must_use]
    pub fn find(&self, plan_id: &str) -> Option<&PlanConfig> {
        self.plans.iter().find(|p| p.id == plan_id)
    }

    /// The plan new users start on. Validation guarantees exactly one exists.
    #[must_use]
    pub fn default_plan(&self) -> Option<&PlanConfig> {
        self.plans.iter().find(|p| p.default)
    }
}

/// Load and validate the plan catalog from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_plans(path: &Path) -> Result<PlanCatalog, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::PlansFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_plans(&content)
}

/// Parse and validate a plan catalog from YAML text.
///
/// # Errors
///
/// Returns `ConfigError` if the text is not valid YAML or fails validation.
pub fn parse_plans(content: &str) -> Result<PlanCatalog, ConfigError> {
    let catalog: PlanCatalog = serde_yaml::from_str(content).map_err(ConfigError::PlansFileParse)?;
    validate_plans(&catalog)?;
    Ok(catalog)
}

fn validate_plans(catalog: &PlanCatalog) -> Result<(), ConfigError> {
    if catalog.plans.is_empty() {
        return Err(ConfigError::Validation(
            "at least one plan must be configured".to_string(),
        ));
    }

    let mut seen_ids = HashSet::new();
    for plan in &catalog.plans {
        if plan.id.trim().is_empty() {
            return Err(ConfigError::Validation(
                "plan id must be non-empty".to_string(),
            ));
        }
        if !seen_ids.insert(plan.id.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate plan id: '{}'",
                plan.id
            )));
        }
        if plan.limit == 0 {
            return Err(ConfigError::Validation(format!(
                "plan '{}' must allow at least one lead",
                plan.id
            )));
        }
        if plan.price.is_sign_negative() {
            return Err(ConfigError::Validation(format!(
                "plan '{}' has a negative price",
                plan.id
            )));
        }
    }

    let defaults = catalog.plans.iter().filter(|p| p.default).count();
    if defaults != 1 {
        return Err(ConfigError::Validation(format!(
            "exactly one plan must be marked default, found {defaults}"
        )));
    }

    Ok(())
}

#[cfg(test)]
#[path = "plans_test.rs"]
mod tests;
