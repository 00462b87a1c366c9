pub mod app_config;
pub mod config;
pub mod features;
pub mod geo;
pub mod history;
pub mod leads;
pub mod plans;
pub mod ports;
pub mod quota;
pub mod search;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use features::{FeatureOrigin, GeocodedPlace, RawFeature, SourceId};
pub use geo::{BoundingBox, Coordinates};
pub use history::{HistoryEntry, HistoryResult, NewHistoryEntry};
pub use leads::{EnrichmentProvenance, Lead, SocialPresence, WebsiteStatus};
pub use plans::{load_plans, PlanCatalog, PlanConfig};
pub use ports::{FeatureSource, Geocoder, HistoryStore, LedgerError, QuotaLedger, StoreError, UpstreamError};
pub use quota::{QuotaError, QuotaState, Reservation, CYCLE_DAYS};
pub use search::{ClassifiedTerm, RequestError, SearchRequest, TagPredicate, DEFAULT_REQUESTED_COUNT};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read plans file {path}: {source}")]
    PlansFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse plans file: {0}")]
    PlansFileParse(#[source] serde_yaml::Error),

    #[error("invalid plan configuration: {0}")]
    Validation(String),
}
