//! Search service request/response shapes.
//!
//! Only the status, result list and continuation token are load-bearing;
//! individual results are kept as raw JSON so nothing the service sends is
//! lost before normalization.
//!
//! ## Observed response shape (Places web service, legacy)
//!
//! ```json
//! { "status": "OK", "results": [ { "place_id": "...", ... } ],
//!   "next_page_token": "..." }
//! ```
//!
//! `status` is one of `OK`, `ZERO_RESULTS`, `OVER_QUERY_LIMIT`,
//! `REQUEST_DENIED`, `INVALID_REQUEST`, `UNKNOWN_ERROR`. A throttled request
//! still answers HTTP 200; the throttle shows only in `status`.

use poigrid_core::{SearchMode, TileCoordinate};
use serde::Deserialize;

/// One outbound call to the search service.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchRequest {
    /// Keyword search around a tile.
    Nearby {
        location: TileCoordinate,
        radius_m: u32,
        keyword: String,
    },
    /// Free-text search biased towards a tile.
    Text {
        query: String,
        location: TileCoordinate,
        radius_m: u32,
    },
    /// Follow-up page; the token carries the original query.
    NextPage { mode: SearchMode, token: String },
}

impl SearchRequest {
    /// First-page request for a `(tile, keyword)` pair.
    #[must_use]
    pub fn first_page(
        mode: SearchMode,
        location: TileCoordinate,
        radius_m: u32,
        keyword: &str,
        location_label: &str,
    ) -> Self {
        match mode {
            SearchMode::Nearby => SearchRequest::Nearby {
                location,
                radius_m,
                keyword: keyword.to_owned(),
            },
            SearchMode::Text => SearchRequest::Text {
                query: format!("{keyword} in {location_label}"),
                location,
                radius_m,
            },
        }
    }

    #[must_use]
    pub fn mode(&self) -> SearchMode {
        match self {
            SearchRequest::Nearby { .. } => SearchMode::Nearby,
            SearchRequest::Text { .. } => SearchMode::Text,
            SearchRequest::NextPage { mode, .. } => *mode,
        }
    }
}

/// Service-level outcome carried in the response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageStatus {
    Ok,
    ZeroResults,
    OverQueryLimit,
    Other(String),
}

impl PageStatus {
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw {
            "OK" => PageStatus::Ok,
            "ZERO_RESULTS" => PageStatus::ZeroResults,
            "OVER_QUERY_LIMIT" => PageStatus::OverQueryLimit,
            other => PageStatus::Other(other.to_owned()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlacesResponse {
    #[serde(default)]
    pub status: String,

    #[serde(default)]
    pub results: Vec<serde_json::Value>,

    /// Absent on the last page. Becomes valid a short while after issue.
    #[serde(default)]
    pub next_page_token: Option<String>,

    /// Human-readable detail the service attaches to non-OK statuses.
    #[serde(default)]
    pub error_message: Option<String>,
}

impl PlacesResponse {
    #[must_use]
    pub fn page_status(&self) -> PageStatus {
        PageStatus::parse(&self.status)
    }

    /// Continuation token, treating an empty string as absent.
    #[must_use]
    pub fn continuation(&self) -> Option<&str> {
        self.next_page_token.as_deref().filter(|t| !t.is_empty())
    }

    /// Results as [`RawPlace`]s, in service order.
    #[must_use]
    pub fn into_places(self) -> Vec<RawPlace> {
        self.results.into_iter().map(RawPlace::from_payload).collect()
    }
}

/// One untouched result object for one entity from one tile/keyword query.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPlace {
    payload: serde_json::Value,
}

impl RawPlace {
    #[must_use]
    pub fn from_payload(payload: serde_json::Value) -> Self {
        Self { payload }
    }

    /// The place identifier, if present as a non-blank string.
    #[must_use]
    pub fn entity_id(&self) -> Option<&str> {
        self.str_field("place_id")
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }

    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.str_field("name")
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&serde_json::Value> {
        self.payload.get(name).filter(|v| !v.is_null())
    }

    #[must_use]
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(serde_json::Value::as_str)
    }

    /// `geometry.location`; either coordinate may be missing or null.
    #[must_use]
    pub fn location(&self) -> Option<&serde_json::Value> {
        self.payload
            .get("geometry")
            .and_then(|g| g.get("location"))
            .filter(|l| l.is_object())
    }

    #[must_use]
    pub fn payload(&self) -> &serde_json::Value {
        &self.payload
    }
}
