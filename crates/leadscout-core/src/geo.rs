//! Geographic primitives shared by the geocoder and map feature clients.

use serde::{Deserialize, Serialize};

/// Smallest extent, in degrees, a bounding box may span on either axis.
pub const MIN_BOX_SPAN_DEG: f64 = 0.02;

/// How far a deficient axis is pushed out on each side when expanding.
const EXPAND_DEG: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// Rectangular geographic extent used to scope a feature query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// Parses the geocoder's `[minLat, maxLat, minLon, maxLon]` string array.
    ///
    /// Returns `None` when the array is short or any value is not a finite number.
    #[must_use]
    pub fn from_geocoder_strings(raw: &[String]) -> Option<Self> {
        let [min_lat, max_lat, min_lon, max_lon] = raw else {
            return None;
        };
        let parse = |s: &String| s.trim().parse::<f64>().ok().filter(|v| v.is_finite());
        Some(Self {
            min_lat: parse(min_lat)?,
            max_lat: parse(max_lat)?,
            min_lon: parse(min_lon)?,
            max_lon: parse(max_lon)?,
        })
    }

    /// Expands each axis narrower than [`MIN_BOX_SPAN_DEG`] by 0.01° on both
    /// sides, so a point box becomes a 0.02° square centered on that point.
    #[must_use]
    pub fn normalized(self) -> Self {
        let mut out = self;
        if out.max_lat - out.min_lat < MIN_BOX_SPAN_DEG {
            out.min_lat -= EXPAND_DEG;
            out.max_lat += EXPAND_DEG;
        }
        if out.max_lon - out.min_lon < MIN_BOX_SPAN_DEG {
            out.min_lon -= EXPAND_DEG;
            out.max_lon += EXPAND_DEG;
        }
        out
    }

    /// Renders the box in the feature service's `(south,west,north,east)` order.
    #[must_use]
    pub fn to_query_area(&self) -> String {
        format!(
            "{},{},{},{}",
            self.min_lat, self.min_lon, self.max_lat, self.max_lon
        )
    }

    #[must_use]
    pub fn center(&self) -> Coordinates {
        Coordinates {
            lat: (self.min_lat + self.max_lat) / 2.0,
            lon: (self.min_lon + self.max_lon) / 2.0,
        }
    }
}
