//! Clients for the two public map data services a lead search draws on: a
//! Nominatim-compatible geocoder and an Overpass-compatible feature database.

pub mod error;
pub mod features;
pub mod geocoder;
mod http;
mod retry;
pub mod types;

pub use error::OsmError;
pub use features::{build_feature_query, element_to_feature, FeatureClient, FeatureQueryOptions};
pub use geocoder::GeocoderClient;
pub use http::HttpSettings;
