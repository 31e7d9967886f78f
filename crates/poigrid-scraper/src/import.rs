//! Rows from a previously exported place list.
//!
//! The export is a JSON array of flat objects (`place_id`, `name`,
//! `address`, `lat`, `lng`, `types`, `rating`, `user_ratings_total`,
//! `search_keyword`, `fetched_at`, ...). Fields are coerced the same lenient
//! way as live results, and each object is kept verbatim as the raw payload.

use chrono::{DateTime, NaiveDateTime, Utc};
use poigrid_core::NormalizedRow;
use serde_json::Value;

use crate::error::ScraperError;
use crate::normalize::{coerce_f64, coerce_i64, stable_row_id};

/// Naive layouts accepted for `fetched_at`; all are read as UTC.
const NAIVE_TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// Result of converting one export file.
#[derive(Debug, Clone, Default)]
pub struct ImportBatch {
    pub rows: Vec<NormalizedRow>,
    /// `"#index: reason"` for every entry that produced no row.
    pub skipped: Vec<String>,
}

/// Converts an export file's content into rows.
///
/// `default_keyword` is used for records without a `search_keyword`;
/// `imported_at` for records without a `fetched_at`.
///
/// # Errors
///
/// Returns [`ScraperError::Deserialize`] if `content` is not JSON and
/// [`ScraperError::InvalidExport`] if its top level is not an array.
pub fn import_export(
    location_label: &str,
    default_keyword: &str,
    content: &str,
    imported_at: DateTime<Utc>,
) -> Result<ImportBatch, ScraperError> {
    let payload: Value =
        serde_json::from_str(content).map_err(|source| ScraperError::Deserialize {
            context: "place export".to_string(),
            source,
        })?;
    let Value::Array(records) = payload else {
        return Err(ScraperError::InvalidExport(
            "expected a top-level JSON array of place objects".to_string(),
        ));
    };

    let mut batch = ImportBatch::default();
    for (index, record) in records.iter().enumerate() {
        match import_record(location_label, default_keyword, record, imported_at) {
            Ok(row) => batch.rows.push(row),
            Err(reason) => {
                tracing::warn!(index, reason = %reason, "skipping export entry");
                batch.skipped.push(format!("#{index}: {reason}"));
            }
        }
    }
    Ok(batch)
}

/// Converts one exported object into a row.
///
/// # Errors
///
/// Returns a description of why the entry cannot become a row: not an
/// object, no `place_id`, or an unreadable `fetched_at`.
pub fn import_record(
    location_label: &str,
    default_keyword: &str,
    record: &Value,
    imported_at: DateTime<Utc>,
) -> Result<NormalizedRow, String> {
    let Value::Object(fields) = record else {
        return Err("entry is not an object".to_string());
    };
    let text = |key: &str| {
        fields
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty() && !s.eq_ignore_ascii_case("none"))
    };

    let entity_id = text("place_id").ok_or("missing place_id")?.to_owned();
    let keyword = text("search_keyword").unwrap_or(default_keyword).to_owned();
    let fetched_at = match fields.get("fetched_at") {
        None | Some(Value::Null) => imported_at,
        Some(value) => parse_timestamp(value)
            .ok_or_else(|| format!("unreadable fetched_at {value}"))?,
    };

    Ok(NormalizedRow {
        fetched_at,
        location_label: location_label.to_owned(),
        row_id: stable_row_id(location_label, &keyword, &entity_id),
        keyword,
        entity_id,
        display_name: text("name").map(str::to_owned),
        address: text("address")
            .or_else(|| text("formatted_address"))
            .or_else(|| text("vicinity"))
            .map(str::to_owned),
        status: text("business_status").map(str::to_owned),
        categories: fields.get("types").map(categories).unwrap_or_default(),
        rating: fields.get("rating").and_then(coerce_f64),
        rating_count: fields.get("user_ratings_total").and_then(coerce_i64),
        price_tier: fields.get("price_level").and_then(coerce_i64),
        lat: fields.get("lat").and_then(coerce_f64),
        lng: fields.get("lng").and_then(coerce_f64),
        raw_payload: record.clone(),
    })
}

/// `types` is either a list or a single comma-separated string.
fn categories(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_owned)
            .collect(),
        Value::String(joined) => joined
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect(),
        _ => Vec::new(),
    }
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    let raw = value.as_str()?.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    let naive = raw
        .strip_suffix("UTC")
        .or_else(|| raw.strip_suffix('Z'))
        .unwrap_or(raw)
        .trim_end();
    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(naive, fmt).ok())
        .map(|dt| dt.and_utc())
}
