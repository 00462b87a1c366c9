//! HTTP client for a Nominatim-compatible free-text geocoder.

use std::collections::BTreeMap;

use async_trait::async_trait;
use leadscout_core::{
    BoundingBox, Coordinates, GeocodedPlace, Geocoder, RawFeature, SourceId, UpstreamError,
};
use reqwest::{Client, Url};

use crate::error::OsmError;
use crate::http::{get_json, parse_base_url, HttpSettings};
use crate::types::GeocoderPlace;

const SERVICE: &str = "geocoder";

/// Client for the geocoder's `search` endpoint.
///
/// Use [`GeocoderClient::new`] with the production base URL or a mock
/// server's URI in tests.
pub struct GeocoderClient {
    client: Client,
    settings: HttpSettings,
    base_url: Url,
    result_limit: u32,
}

impl GeocoderClient {
    /// # Errors
    ///
    /// Returns [`OsmError::Http`] if the `reqwest::Client` cannot be built, or
    /// [`OsmError::InvalidBaseUrl`] if `base_url` does not parse.
    pub fn new(
        base_url: &str,
        settings: HttpSettings,
        result_limit: u32,
    ) -> Result<Self, OsmError> {
        let client = settings.build_client()?;
        let base_url = parse_base_url(base_url, true)?;
        Ok(Self {
            client,
            settings,
            base_url,
            result_limit,
        })
    }

    /// Looks up `query` and converts every hit into a [`GeocodedPlace`].
    ///
    /// An empty list is a normal answer, not an error.
    ///
    /// # Errors
    ///
    /// - [`OsmError::Http`] on network failure or timeout after retries.
    /// - [`OsmError::UnexpectedStatus`] on a non-2xx response.
    /// - [`OsmError::Deserialize`] if the body is not the expected JSON array.
    pub async fn search(&self, query: &str) -> Result<Vec<GeocodedPlace>, OsmError> {
        let url = self.build_url(query)?;
        tracing::debug!(%url, "geocoder request");
        let places: Vec<GeocoderPlace> = get_json(&self.client, &self.settings, &url).await?;
        Ok(places.into_iter().map(place_to_geocoded).collect())
    }

    fn build_url(&self, query: &str) -> Result<Url, OsmError> {
        let mut url = self
            .base_url
            .join("search")
            .map_err(|e| OsmError::InvalidBaseUrl {
                url: self.base_url.to_string(),
                reason: e.to_string(),
            })?;
        url.query_pairs_mut()
            .append_pair("q", query)
            .append_pair("format", "json")
            .append_pair("addressdetails", "1")
            .append_pair("limit", &self.result_limit.to_string());
        Ok(url)
    }
}

#[async_trait]
impl Geocoder for GeocoderClient {
    async fn geocode(&self, query: &str) -> Result<Vec<GeocodedPlace>, UpstreamError> {
        self.search(query).await.map_err(|e| e.into_upstream(SERVICE))
    }
}

/// Maps a geocoder hit onto the shared raw record.
///
/// Category falls back from the hit's `type` to its `class`, then `"place"`.
fn place_to_geocoded(place: GeocoderPlace) -> GeocodedPlace {
    let coordinates = match (place.lat.as_deref(), place.lon.as_deref()) {
        (Some(lat), Some(lon)) => match (lat.parse::<f64>(), lon.parse::<f64>()) {
            (Ok(lat), Ok(lon)) => Some(Coordinates { lat, lon }),
            _ => None,
        },
        _ => None,
    };

    let mut attributes = BTreeMap::new();
    if let Some(class) = &place.class {
        attributes.insert("class".to_string(), class.clone());
    }
    if let Some(kind) = &place.kind {
        attributes.insert("type".to_string(), kind.clone());
    }
    if let (Some(osm_type), Some(osm_id)) = (&place.osm_type, place.osm_id) {
        attributes.insert("osm_ref".to_string(), format!("{osm_type}/{osm_id}"));
    }

    let category = place
        .kind
        .clone()
        .or_else(|| place.class.clone())
        .unwrap_or_else(|| "place".to_string());

    GeocodedPlace {
        bounding_box: BoundingBox::from_geocoder_strings(&place.boundingbox),
        feature: RawFeature {
            source_id: SourceId::geocoder(place.place_id),
            display_name: place.display_name,
            coordinates,
            category,
            attributes,
        },
    }
}
