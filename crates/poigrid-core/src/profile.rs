//! Crawl profile: the region, radius, step and keyword list for one crawl.
//!
//! Loaded from YAML (default `config/crawl.yaml`):
//!
//! ```yaml
//! location_label: "Rotterdam, Netherlands"
//! bbox: { min_lat: 51.87, max_lat: 52.02, min_lng: 4.35, max_lng: 4.60 }
//! radius_m: 2000
//! step_m: 1600
//! search_mode: nearby
//! keywords: [bakery, butcher]
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::geo::BoundingBox;
use crate::ConfigError;

/// Step as a fraction of the search radius when `step_m` is omitted.
///
/// A step below the radius makes neighbouring search circles overlap; a
/// larger step leaves gaps between tiles, a smaller one multiplies cost.
pub const DEFAULT_STEP_RATIO: f64 = 0.8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    /// Keyword search around each tile within `radius_m`.
    #[default]
    Nearby,
    /// Free-text `"{keyword} in {location_label}"` biased to each tile.
    Text,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlProfile {
    pub location_label: String,
    pub bbox: BoundingBox,
    pub radius_m: u32,
    #[serde(default)]
    pub step_m: Option<f64>,
    #[serde(default)]
    pub search_mode: SearchMode,
    pub keywords: Vec<String>,
}

impl CrawlProfile {
    /// Grid spacing in meters; falls back to [`DEFAULT_STEP_RATIO`] × radius.
    #[must_use]
    pub fn step_meters(&self) -> f64 {
        self.step_m
            .unwrap_or_else(|| f64::from(self.radius_m) * DEFAULT_STEP_RATIO)
    }
}

/// Load and validate a crawl profile from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_crawl_profile(path: &Path) -> Result<CrawlProfile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ProfileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    parse_crawl_profile(&content)
}

/// Parse and validate a crawl profile from YAML text.
///
/// # Errors
///
/// Returns `ConfigError` if the YAML is malformed or fails validation.
pub fn parse_crawl_profile(content: &str) -> Result<CrawlProfile, ConfigError> {
    let profile: CrawlProfile =
        serde_yaml::from_str(content).map_err(ConfigError::ProfileParse)?;
    validate_profile(&profile)?;
    Ok(profile)
}

fn validate_profile(profile: &CrawlProfile) -> Result<(), ConfigError> {
    if profile.location_label.trim().is_empty() {
        return Err(ConfigError::InvalidProfile(
            "location_label must be non-empty".to_string(),
        ));
    }

    profile.bbox.validate()?;

    if profile.radius_m == 0 {
        return Err(ConfigError::InvalidProfile(
            "radius_m must be greater than zero".to_string(),
        ));
    }

    let step = profile.step_meters();
    if !step.is_finite() || step <= 0.0 {
        return Err(ConfigError::InvalidStep(step));
    }

    if profile.keywords.is_empty() {
        return Err(ConfigError::InvalidProfile(
            "at least one keyword is required".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    for keyword in &profile.keywords {
        if keyword.trim().is_empty() {
            return Err(ConfigError::InvalidProfile(
                "keywords must be non-empty".to_string(),
            ));
        }
        if !seen.insert(keyword.trim().to_lowercase()) {
            return Err(ConfigError::InvalidProfile(format!(
                "duplicate keyword: '{keyword}'"
            )));
        }
    }

    Ok(())
}
