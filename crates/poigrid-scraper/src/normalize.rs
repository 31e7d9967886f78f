//! Normalization from raw search results to [`poigrid_core::NormalizedRow`].
//!
//! Numeric fields are coerced leniently: the service occasionally sends
//! counts as strings, and a malformed number becomes `None` rather than
//! dropping the whole place.

use chrono::{DateTime, Utc};
use poigrid_core::NormalizedRow;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::types::RawPlace;

/// SHA-256 hex of `location||keyword||entity_id`.
///
/// Identical for the same logical fact no matter when it is rediscovered, so
/// downstream consumers can collapse re-deliveries.
#[must_use]
pub fn stable_row_id(location_label: &str, keyword: &str, entity_id: &str) -> String {
    let input = format!("{location_label}||{keyword}||{entity_id}");
    format!("{:x}", Sha256::digest(input.as_bytes()))
}

/// Maps one raw result into a row, or `None` when it has no usable
/// identifier. `fetched_at` is the only input not covered by `row_id`.
#[must_use]
pub fn normalize_place(
    location_label: &str,
    keyword: &str,
    place: &RawPlace,
    fetched_at: DateTime<Utc>,
) -> Option<NormalizedRow> {
    let entity_id = place.entity_id()?.to_owned();
    let location = place.location();

    let address = place
        .str_field("formatted_address")
        .or_else(|| place.str_field("vicinity"))
        .map(str::to_owned);

    let categories = place
        .field("types")
        .and_then(Value::as_array)
        .map(|types| {
            types
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_owned)
                .collect()
        })
        .unwrap_or_default();

    Some(NormalizedRow {
        fetched_at,
        location_label: location_label.to_owned(),
        keyword: keyword.to_owned(),
        row_id: stable_row_id(location_label, keyword, &entity_id),
        entity_id,
        display_name: place.display_name().map(str::to_owned),
        address,
        status: place.str_field("business_status").map(str::to_owned),
        categories,
        rating: place.field("rating").and_then(coerce_f64),
        rating_count: place.field("user_ratings_total").and_then(coerce_i64),
        price_tier: place.field("price_level").and_then(coerce_i64),
        lat: location.and_then(|l| l.get("lat")).and_then(coerce_f64),
        lng: location.and_then(|l| l.get("lng")).and_then(coerce_f64),
        raw_payload: place.payload().clone(),
    })
}

pub(crate) fn coerce_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

/// Integers pass through, floats truncate toward zero, numeric strings parse.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn coerce_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|v| v.is_finite()).map(|v| v.trunc() as i64)),
        Value::Bool(b) => Some(i64::from(*b)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|v| v.is_finite())
                    .map(|v| v.trunc() as i64)
            })
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    const LABEL: &str = "Rotterdam, Netherlands";

    fn fetched_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
    }

    fn full_place() -> RawPlace {
        RawPlace::from_payload(json!({
            "place_id": "ChIJ-bakery-1",
            "name": "De Bakkerij",
            "formatted_address": "Witte de Withstraat 1, Rotterdam",
            "vicinity": "Witte de Withstraat 1",
            "business_status": "OPERATIONAL",
            "types": ["bakery", "food", "store"],
            "rating": 4.6,
            "user_ratings_total": 213,
            "price_level": 2,
            "geometry": { "location": { "lat": 51.9166, "lng": 4.4735 } },
            "opening_hours": { "open_now": true }
        }))
    }

    #[test]
    fn row_id_is_stable_sha256_hex() {
        let id = stable_row_id(LABEL, "bakery", "ChIJ-bakery-1");
        assert_eq!(id.len(), 64);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(id, stable_row_id(LABEL, "bakery", "ChIJ-bakery-1"));
        assert_ne!(id, stable_row_id(LABEL, "butcher", "ChIJ-bakery-1"));
    }

    #[test]
    fn row_id_matches_known_digest() {
        // sha256("a||b||c")
        assert_eq!(
            stable_row_id("a", "b", "c"),
            "07a2e7eb00ca1a51adffb89162eef0c98e257a471fe0fb2247cd8a366bdffb97"
        );
    }

    #[test]
    fn maps_every_field() {
        let row = normalize_place(LABEL, "bakery", &full_place(), fetched_at()).unwrap();
        assert_eq!(row.entity_id, "ChIJ-bakery-1");
        assert_eq!(row.display_name.as_deref(), Some("De Bakkerij"));
        assert_eq!(
            row.address.as_deref(),
            Some("Witte de Withstraat 1, Rotterdam")
        );
        assert_eq!(row.status.as_deref(), Some("OPERATIONAL"));
        assert_eq!(row.categories, vec!["bakery", "food", "store"]);
        assert_eq!(row.rating, Some(4.6));
        assert_eq!(row.rating_count, Some(213));
        assert_eq!(row.price_tier, Some(2));
        assert_eq!(row.lat, Some(51.9166));
        assert_eq!(row.lng, Some(4.4735));
        assert_eq!(row.location_label, LABEL);
        assert_eq!(row.keyword, "bakery");
        assert_eq!(row.fetched_at, fetched_at());
    }

    #[test]
    fn raw_payload_is_kept_verbatim() {
        let place = full_place();
        let row = normalize_place(LABEL, "bakery", &place, fetched_at()).unwrap();
        assert_eq!(&row.raw_payload, place.payload());
        assert_eq!(row.raw_payload["opening_hours"]["open_now"], json!(true));
    }

    #[test]
    fn normalization_is_idempotent() {
        let place = full_place();
        let first = normalize_place(LABEL, "bakery", &place, fetched_at()).unwrap();
        let second = normalize_place(LABEL, "bakery", &place, fetched_at()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn fetch_time_does_not_affect_row_id() {
        let place = full_place();
        let later = fetched_at() + chrono::Duration::days(30);
        let first = normalize_place(LABEL, "bakery", &place, fetched_at()).unwrap();
        let second = normalize_place(LABEL, "bakery", &place, later).unwrap();
        assert_eq!(first.row_id, second.row_id);
    }

    #[test]
    fn missing_identifier_drops_the_place() {
        let place = RawPlace::from_payload(json!({ "name": "Anonymous" }));
        assert!(normalize_place(LABEL, "bakery", &place, fetched_at()).is_none());
    }

    #[test]
    fn falls_back_to_vicinity() {
        let place = RawPlace::from_payload(json!({
            "place_id": "p1",
            "vicinity": "Coolsingel 40"
        }));
        let row = normalize_place(LABEL, "bakery", &place, fetched_at()).unwrap();
        assert_eq!(row.address.as_deref(), Some("Coolsingel 40"));
    }

    #[test]
    fn geometry_fields_are_independently_optional() {
        let place = RawPlace::from_payload(json!({
            "place_id": "p1",
            "geometry": { "location": { "lat": 51.9, "lng": null } }
        }));
        let row = normalize_place(LABEL, "bakery", &place, fetched_at()).unwrap();
        assert_eq!(row.lat, Some(51.9));
        assert_eq!(row.lng, None);

        let bare = RawPlace::from_payload(json!({ "place_id": "p2" }));
        let row = normalize_place(LABEL, "bakery", &bare, fetched_at()).unwrap();
        assert_eq!((row.lat, row.lng), (None, None));
        assert!(row.categories.is_empty());
    }

    #[test]
    fn numeric_fields_are_coerced_leniently() {
        let place = RawPlace::from_payload(json!({
            "place_id": "p1",
            "rating": "4.2",
            "user_ratings_total": "87",
            "price_level": 1.9
        }));
        let row = normalize_place(LABEL, "bakery", &place, fetched_at()).unwrap();
        assert_eq!(row.rating, Some(4.2));
        assert_eq!(row.rating_count, Some(87));
        assert_eq!(row.price_tier, Some(1));
    }

    #[test]
    fn malformed_numbers_become_none() {
        let place = RawPlace::from_payload(json!({
            "place_id": "p1",
            "rating": "n/a",
            "user_ratings_total": { "count": 3 },
            "price_level": ""
        }));
        let row = normalize_place(LABEL, "bakery", &place, fetched_at()).unwrap();
        assert_eq!(row.rating, None);
        assert_eq!(row.rating_count, None);
        assert_eq!(row.price_tier, None);
    }

    #[test]
    fn non_string_categories_are_skipped() {
        let place = RawPlace::from_payload(json!({
            "place_id": "p1",
            "types": ["cafe", 7, null, "food"]
        }));
        let row = normalize_place(LABEL, "bakery", &place, fetched_at()).unwrap();
        assert_eq!(row.categories, vec!["cafe", "food"]);
    }
}
