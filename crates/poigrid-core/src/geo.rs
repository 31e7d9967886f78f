//! Geographic primitives shared by the grid generator and the crawler.

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Decimal places kept on every generated coordinate (~0.11 m at the equator).
pub const COORDINATE_DECIMALS: i32 = 6;

/// Axis-aligned latitude/longitude box in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    /// Checks that both axes are finite, in range and strictly ordered.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBoundingBox`] describing the first
    /// violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let values = [self.min_lat, self.max_lat, self.min_lng, self.max_lng];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ConfigError::InvalidBoundingBox(
                "all bounds must be finite numbers".to_string(),
            ));
        }
        if !(-90.0..=90.0).contains(&self.min_lat) || !(-90.0..=90.0).contains(&self.max_lat) {
            return Err(ConfigError::InvalidBoundingBox(format!(
                "latitudes must lie within [-90, 90], got {}..{}",
                self.min_lat, self.max_lat
            )));
        }
        if !(-180.0..=180.0).contains(&self.min_lng) || !(-180.0..=180.0).contains(&self.max_lng)
        {
            return Err(ConfigError::InvalidBoundingBox(format!(
                "longitudes must lie within [-180, 180], got {}..{}",
                self.min_lng, self.max_lng
            )));
        }
        if self.min_lat >= self.max_lat {
            return Err(ConfigError::InvalidBoundingBox(format!(
                "min_lat {} must be below max_lat {}",
                self.min_lat, self.max_lat
            )));
        }
        if self.min_lng >= self.max_lng {
            return Err(ConfigError::InvalidBoundingBox(format!(
                "min_lng {} must be below max_lng {}",
                self.min_lng, self.max_lng
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn mid_lat(&self) -> f64 {
        (self.min_lat + self.max_lat) / 2.0
    }

    /// The four corners, south-west first, counter-clockwise.
    #[must_use]
    pub fn corners(&self) -> [TileCoordinate; 4] {
        [
            TileCoordinate::new(self.min_lat, self.min_lng),
            TileCoordinate::new(self.min_lat, self.max_lng),
            TileCoordinate::new(self.max_lat, self.max_lng),
            TileCoordinate::new(self.max_lat, self.min_lng),
        ]
    }
}

/// One sample point for a search request.
///
/// Coordinates are rounded to [`COORDINATE_DECIMALS`] on construction so the
/// same grid always yields bit-identical points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TileCoordinate {
    lat: f64,
    lng: f64,
}

impl TileCoordinate {
    #[must_use]
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat: round_coordinate(lat),
            lng: round_coordinate(lng),
        }
    }

    #[must_use]
    pub fn lat(&self) -> f64 {
        self.lat
    }

    #[must_use]
    pub fn lng(&self) -> f64 {
        self.lng
    }

    /// Identity key: the rounded pair scaled to integers.
    #[allow(clippy::cast_possible_truncation)]
    #[must_use]
    pub fn key(&self) -> (i64, i64) {
        let scale = 10f64.powi(COORDINATE_DECIMALS);
        ((self.lat * scale).round() as i64, (self.lng * scale).round() as i64)
    }

    /// `lat,lng` as expected by the search service's `location` parameter.
    #[must_use]
    pub fn as_query_param(&self) -> String {
        format!("{},{}", self.lat, self.lng)
    }
}

impl Eq for TileCoordinate {}

impl std::hash::Hash for TileCoordinate {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl std::fmt::Display for TileCoordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lng)
    }
}

fn round_coordinate(value: f64) -> f64 {
    let scale = 10f64.powi(COORDINATE_DECIMALS);
    (value * scale).round() / scale
}
