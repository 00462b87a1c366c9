use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebsiteStatus {
    Missing,
    Outdated,
    Good,
}

impl std::fmt::Display for WebsiteStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WebsiteStatus::Missing => write!(f, "missing"),
            WebsiteStatus::Outdated => write!(f, "outdated"),
            WebsiteStatus::Good => write!(f, "good"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocialPresence {
    pub maps: bool,
    pub facebook: bool,
    pub instagram: bool,
}

/// Where a lead's website/rating/social fields came from.
///
/// `Synthetic` marks placeholder values that were generated, not looked up.
/// Consumers must not present them as verified facts. A lookup-backed enricher
/// adds its own variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnrichmentProvenance {
    Synthetic,
}

/// An enriched candidate business returned to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    /// Rendered [`crate::SourceId`] of the originating record.
    pub id: String,
    pub business_name: String,
    pub location: String,
    pub website: Option<String>,
    pub website_status: WebsiteStatus,
    pub rating: f64,
    pub rating_count: u32,
    pub social_presence: SocialPresence,
    pub match_reason: String,
    /// Always within `[0, 1]`.
    pub confidence: f64,
    pub enrichment: EnrichmentProvenance,
}
