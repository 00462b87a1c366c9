//! HTTP client for an Overpass-compatible map feature database.
//!
//! One search issues one request: every predicate is unioned over nodes, way
//! centroids, and relation centroids inside the (normalised) bounding box.

use std::fmt::Write as _;

use async_trait::async_trait;
use leadscout_core::{
    BoundingBox, Coordinates, FeatureSource, RawFeature, SourceId, TagPredicate, UpstreamError,
};
use reqwest::{Client, Url};

use crate::error::OsmError;
use crate::http::{get_json, parse_base_url, HttpSettings};
use crate::types::{FeatureElement, FeatureResponse};

const SERVICE: &str = "map features";

/// Geometry kinds each predicate is applied to.
const GEOMETRY_KINDS: [&str; 3] = ["node", "way", "relation"];

/// Tag keys tried, in order, for a feature's display name.
const NAME_KEYS: [&str; 2] = ["name", "brand"];
/// Display name used when no name key is present. Such features are dropped.
pub const UNKNOWN_NAME: &str = "Unknown Business";

/// Tag keys tried, in order, for a feature's category label.
const CATEGORY_KEYS: [&str; 3] = ["amenity", "office", "shop"];
pub const DEFAULT_CATEGORY: &str = "business";

#[derive(Debug, Clone, Copy)]
pub struct FeatureQueryOptions {
    /// Processing budget sent to the server as `[timeout:N]`.
    pub server_timeout_secs: u32,
    /// Maximum elements returned (`out center N`).
    pub result_cap: u32,
}

impl Default for FeatureQueryOptions {
    fn default() -> Self {
        Self {
            server_timeout_secs: 25,
            result_cap: 100,
        }
    }
}

impl FeatureQueryOptions {
    #[must_use]
    pub fn from_app_config(config: &leadscout_core::AppConfig) -> Self {
        Self {
            server_timeout_secs: config.features_server_timeout_secs,
            result_cap: config.features_result_cap,
        }
    }
}

pub struct FeatureClient {
    client: Client,
    settings: HttpSettings,
    endpoint: Url,
    options: FeatureQueryOptions,
}

impl FeatureClient {
    /// # Errors
    ///
    /// Returns [`OsmError::Http`] if the `reqwest::Client` cannot be built, or
    /// [`OsmError::InvalidBaseUrl`] if `endpoint` does not parse.
    pub fn new(
        endpoint: &str,
        settings: HttpSettings,
        options: FeatureQueryOptions,
    ) -> Result<Self, OsmError> {
        let client = settings.build_client()?;
        let endpoint = parse_base_url(endpoint, false)?;
        Ok(Self {
            client,
            settings,
            endpoint,
            options,
        })
    }

    /// Runs the union query and returns every named feature found.
    ///
    /// An empty predicate list short-circuits to an empty result without a
    /// network call.
    ///
    /// # Errors
    ///
    /// - [`OsmError::Http`] on network failure or timeout after retries.
    /// - [`OsmError::UnexpectedStatus`] on a non-2xx response.
    /// - [`OsmError::Deserialize`] if the body is not the expected JSON.
    pub async fn fetch(
        &self,
        bbox: BoundingBox,
        predicates: &[TagPredicate],
    ) -> Result<Vec<RawFeature>, OsmError> {
        if predicates.is_empty() {
            return Ok(Vec::new());
        }

        let query = build_feature_query(&bbox.normalized(), predicates, self.options);
        let mut url = self.endpoint.clone();
        url.query_pairs_mut().append_pair("data", &query);
        tracing::debug!(predicates = predicates.len(), "feature query request");

        let response: FeatureResponse = get_json(&self.client, &self.settings, &url).await?;
        if let Some(remark) = &response.remark {
            tracing::warn!(remark = %remark, "feature service returned a partial answer");
        }

        Ok(response
            .elements
            .into_iter()
            .filter_map(element_to_feature)
            .collect())
    }
}

#[async_trait]
impl FeatureSource for FeatureClient {
    async fn query_features(
        &self,
        bbox: BoundingBox,
        predicates: &[TagPredicate],
    ) -> Result<Vec<RawFeature>, UpstreamError> {
        self.fetch(bbox, predicates)
            .await
            .map_err(|e| e.into_upstream(SERVICE))
    }
}

/// Builds the query text. `bbox` is used as given; callers normalise first.
#[must_use]
pub fn build_feature_query(
    bbox: &BoundingBox,
    predicates: &[TagPredicate],
    options: FeatureQueryOptions,
) -> String {
    let area = bbox.to_query_area();
    let mut query = format!("[out:json][timeout:{}];\n(\n", options.server_timeout_secs);
    for predicate in predicates {
        for kind in GEOMETRY_KINDS {
            let _ = writeln!(query, "  {kind}{predicate}({area});");
        }
    }
    let _ = write!(query, ");\nout center {};", options.result_cap);
    query
}

/// Maps one element to a raw record, or `None` if it has no usable name.
#[must_use]
pub fn element_to_feature(element: FeatureElement) -> Option<RawFeature> {
    let display_name = first_tag(&element, &NAME_KEYS).unwrap_or(UNKNOWN_NAME);
    if display_name == UNKNOWN_NAME {
        return None;
    }
    let display_name = display_name.to_string();
    let category = first_tag(&element, &CATEGORY_KEYS)
        .unwrap_or(DEFAULT_CATEGORY)
        .to_string();

    let coordinates = match (element.lat, element.lon, element.center) {
        (Some(lat), Some(lon), _) => Some(Coordinates { lat, lon }),
        (_, _, Some(center)) => Some(Coordinates {
            lat: center.lat,
            lon: center.lon,
        }),
        _ => None,
    };

    Some(RawFeature {
        source_id: SourceId::map_feature(&element.element_type, element.id),
        display_name,
        coordinates,
        category,
        attributes: element.tags,
    })
}

/// First non-blank value among `keys`, tried in order.
fn first_tag<'a>(element: &'a FeatureElement, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| element.tags.get(*k))
        .map(String::as_str)
        .find(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::types::FeatureCenter;

    fn element(kind: &str, id: u64, tags: &[(&str, &str)]) -> FeatureElement {
        FeatureElement {
            element_type: kind.to_string(),
            id,
            lat: Some(13.0),
            lon: Some(80.2),
            center: None,
            tags: tags
                .iter()
                .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
                .collect::<BTreeMap<_, _>>(),
        }
    }

    #[test]
    fn query_unions_every_predicate_over_three_geometries() {
        let bbox = BoundingBox {
            min_lat: 1.0,
            max_lat: 2.0,
            min_lon: 3.0,
            max_lon: 4.0,
        };
        let predicates = vec![
            TagPredicate::new(r#"["amenity"="cafe"]"#),
            TagPredicate::new(r#"["shop"="bakery"]"#),
        ];
        let query = build_feature_query(&bbox, &predicates, FeatureQueryOptions::default());

        assert!(query.starts_with("[out:json][timeout:25];"));
        assert!(query.ends_with("out center 100;"));
        assert!(query.contains(r#"node["amenity"="cafe"](1,3,2,4);"#));
        assert!(query.contains(r#"way["amenity"="cafe"](1,3,2,4);"#));
        assert!(query.contains(r#"relation["shop"="bakery"](1,3,2,4);"#));
        assert_eq!(query.matches("(1,3,2,4);").count(), 6);
    }

    #[test]
    fn name_falls_back_to_brand() {
        let feature = element_to_feature(element("node", 1, &[("brand", "Cafe Coffee Day")]))
            .expect("brand is a usable name");
        assert_eq!(feature.display_name, "Cafe Coffee Day");
    }

    #[test]
    fn unnamed_elements_are_dropped() {
        assert!(element_to_feature(element("node", 1, &[("amenity", "cafe")])).is_none());
        assert!(element_to_feature(element("node", 2, &[("name", "  ")])).is_none());
    }

    #[test]
    fn element_literally_named_unknown_sentinel_is_dropped() {
        assert!(element_to_feature(element("node", 3, &[("name", UNKNOWN_NAME)])).is_none());
    }

    #[test]
    fn category_priority_is_amenity_office_shop_then_default() {
        let both = element_to_feature(element(
            "node",
            1,
            &[("name", "X"), ("shop", "clothes"), ("office", "it")],
        ))
        .unwrap();
        assert_eq!(both.category, "it");

        let none = element_to_feature(element("node", 2, &[("name", "Y"), ("craft", "plumber")]))
            .unwrap();
        assert_eq!(none.category, DEFAULT_CATEGORY);
    }

    #[test]
    fn way_uses_center_coordinates_and_qualified_id() {
        let mut way = element("way", 77, &[("name", "Express Avenue"), ("shop", "mall")]);
        way.lat = None;
        way.lon = None;
        way.center = Some(FeatureCenter {
            lat: 13.05,
            lon: 80.26,
        });
        let feature = element_to_feature(way).unwrap();
        assert_eq!(feature.source_id.to_string(), "osm:way/77");
        assert_eq!(
            feature.coordinates,
            Some(Coordinates {
                lat: 13.05,
                lon: 80.26
            })
        );
        assert_eq!(feature.attributes.get("shop").map(String::as_str), Some("mall"));
    }
}
