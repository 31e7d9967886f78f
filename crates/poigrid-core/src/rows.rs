use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A place normalized into the sink's column schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRow {
    pub fetched_at: DateTime<Utc>,
    /// Human label of the crawled region, e.g. `"Rotterdam, Netherlands"`.
    pub location_label: String,
    pub keyword: String,
    /// SHA-256 hex of `(location_label, keyword, entity_id)`. Stable across runs.
    pub row_id: String,
    /// The search service's place identifier.
    pub entity_id: String,
    pub display_name: Option<String>,
    /// `formatted_address` when present, otherwise `vicinity`.
    pub address: Option<String>,
    /// Business status as reported by the service, e.g. `"OPERATIONAL"`.
    pub status: Option<String>,
    pub categories: Vec<String>,
    pub rating: Option<f64>,
    pub rating_count: Option<i64>,
    pub price_tier: Option<i64>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    /// The complete original result object, kept verbatim.
    pub raw_payload: serde_json::Value,
}

/// Terminal state of a crawl run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Completed,
    BudgetExhausted,
    DeadlineReached,
}

impl RunStatus {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Completed => "completed",
            RunStatus::BudgetExhausted => "budget_exhausted",
            RunStatus::DeadlineReached => "deadline_reached",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Run-level progress counters. Every field only ever grows during a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounters {
    /// Logical `(keyword, tile)` fetches started.
    pub tile_calls: u64,
    /// Outbound HTTP requests charged against the budget.
    pub requests_sent: u64,
    /// Results returned by the service before deduplication.
    pub rows_found_raw: u64,
    /// Results admitted by the deduplicator and normalized.
    pub rows_found_unique: u64,
    pub rows_inserted: u64,
    pub rows_failed: u64,
    /// Fetches that stopped early (retries exhausted, cooldown failed,
    /// unrecognized status or budget cut).
    pub partial_fetches: u64,
}
