//! Raw point-of-interest records produced by the geocoder and map feature clients.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geo::{BoundingBox, Coordinates};

/// Which upstream produced a record. The two id spaces never overlap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureOrigin {
    Geocoder,
    MapFeature,
}

/// Source-qualified identifier of a raw record.
///
/// Rendered as `geocoder:<place_id>` or `osm:<element_type>/<id>`; the rendered
/// form doubles as the lead id so it stays stable across re-renders.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceId {
    pub origin: FeatureOrigin,
    pub key: String,
}

impl SourceId {
    #[must_use]
    pub fn geocoder(place_id: u64) -> Self {
        Self {
            origin: FeatureOrigin::Geocoder,
            key: place_id.to_string(),
        }
    }

    #[must_use]
    pub fn map_feature(element_type: &str, id: u64) -> Self {
        Self {
            origin: FeatureOrigin::MapFeature,
            key: format!("{element_type}/{id}"),
        }
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.origin {
            FeatureOrigin::Geocoder => write!(f, "geocoder:{}", self.key),
            FeatureOrigin::MapFeature => write!(f, "osm:{}", self.key),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFeature {
    pub source_id: SourceId,
    pub display_name: String,
    pub coordinates: Option<Coordinates>,
    pub category: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
}

/// A geocoder hit: the raw record plus the extent the service reported for it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodedPlace {
    pub feature: RawFeature,
    pub bounding_box: Option<BoundingBox>,
}
