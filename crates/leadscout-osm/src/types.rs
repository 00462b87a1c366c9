//! Wire types for the geocoder and feature services.
//!
//! Both services are third-party and loosely specified, so nearly every field
//! is optional and unknown fields are ignored.

use std::collections::BTreeMap;

use serde::Deserialize;

/// One hit from the geocoder's `/search?format=json` endpoint.
///
/// Coordinates and the bounding box arrive as decimal strings, the box in
/// `[minLat, maxLat, minLon, maxLon]` order.
#[derive(Debug, Clone, Deserialize)]
pub struct GeocoderPlace {
    pub place_id: u64,
    #[serde(default)]
    pub boundingbox: Vec<String>,
    #[serde(default)]
    pub lat: Option<String>,
    #[serde(default)]
    pub lon: Option<String>,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub osm_type: Option<String>,
    #[serde(default)]
    pub osm_id: Option<u64>,
}

/// Envelope of a feature query answer (`[out:json]`).
#[derive(Debug, Deserialize)]
pub struct FeatureResponse {
    #[serde(default)]
    pub elements: Vec<FeatureElement>,
    /// Present when the server hit its own time or memory budget.
    #[serde(default)]
    pub remark: Option<String>,
}

/// A node, way, or relation. Ways and relations carry a `center` instead of
/// their own `lat`/`lon` when queried with `out center`.
#[derive(Debug, Clone, Deserialize)]
pub struct FeatureElement {
    #[serde(rename = "type")]
    pub element_type: String,
    pub id: u64,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub center: Option<FeatureCenter>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct FeatureCenter {
    pub lat: f64,
    pub lon: f64,
}
