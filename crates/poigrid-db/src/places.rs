//! Append-only writes to the `poi_places` table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use poigrid_core::{NormalizedRow, RowError, RowSink, SinkError};
use sqlx::PgPool;

/// Checks `row` against the table's column constraints.
///
/// Rows that fail here would make the single bulk statement fail for the
/// whole batch, so they are reported individually and left out instead.
///
/// # Errors
///
/// Returns a human-readable description of the first violated constraint.
pub fn validate_row(row: &NormalizedRow) -> Result<(), String> {
    if row.entity_id.trim().is_empty() {
        return Err("empty place_id".to_string());
    }
    if row.row_id.len() != 64 || !row.row_id.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(format!("row_id '{}' is not a sha256 hex digest", row.row_id));
    }

    let texts = [
        Some(row.location_label.as_str()),
        Some(row.keyword.as_str()),
        Some(row.entity_id.as_str()),
        row.display_name.as_deref(),
        row.address.as_deref(),
        row.status.as_deref(),
    ];
    if texts.into_iter().flatten().any(|t| t.contains('\0'))
        || row.categories.iter().any(|c| c.contains('\0'))
    {
        return Err("text field contains a NUL byte".to_string());
    }
    // jsonb rejects the \u0000 escape anywhere in a document.
    if row.raw_payload.to_string().contains("\\u0000") {
        return Err("raw payload contains a NUL escape".to_string());
    }

    if let Some(lat) = row.lat {
        if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
            return Err(format!("latitude {lat} out of range"));
        }
    }
    if let Some(lng) = row.lng {
        if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
            return Err(format!("longitude {lng} out of range"));
        }
    }
    if row.rating.is_some_and(|r| !r.is_finite()) {
        return Err("rating is not a finite number".to_string());
    }

    Ok(())
}

/// Append `rows` in a single round-trip.
///
/// Uses `INSERT … SELECT … FROM UNNEST(…)` with one array per column.
/// Categories travel as `jsonb` and are unpacked into `TEXT[]` in SQL, since
/// `UNNEST` would flatten a two-dimensional text array.
///
/// Returns the number of rows inserted.
///
/// # Errors
///
/// Returns [`sqlx::Error`] if the statement fails; no row of the batch is
/// stored in that case.
pub async fn insert_places(pool: &PgPool, rows: &[NormalizedRow]) -> Result<u64, sqlx::Error> {
    if rows.is_empty() {
        return Ok(0);
    }

    let mut fetched_ats: Vec<DateTime<Utc>> = Vec::with_capacity(rows.len());
    let mut location_labels: Vec<String> = Vec::with_capacity(rows.len());
    let mut keywords: Vec<String> = Vec::with_capacity(rows.len());
    let mut row_ids: Vec<String> = Vec::with_capacity(rows.len());
    let mut place_ids: Vec<String> = Vec::with_capacity(rows.len());
    let mut names: Vec<Option<String>> = Vec::with_capacity(rows.len());
    let mut addresses: Vec<Option<String>> = Vec::with_capacity(rows.len());
    let mut statuses: Vec<Option<String>> = Vec::with_capacity(rows.len());
    let mut categories: Vec<serde_json::Value> = Vec::with_capacity(rows.len());
    let mut ratings: Vec<Option<f64>> = Vec::with_capacity(rows.len());
    let mut rating_counts: Vec<Option<i64>> = Vec::with_capacity(rows.len());
    let mut price_levels: Vec<Option<i64>> = Vec::with_capacity(rows.len());
    let mut lats: Vec<Option<f64>> = Vec::with_capacity(rows.len());
    let mut lngs: Vec<Option<f64>> = Vec::with_capacity(rows.len());
    let mut raws: Vec<serde_json::Value> = Vec::with_capacity(rows.len());

    for row in rows {
        fetched_ats.push(row.fetched_at);
        location_labels.push(row.location_label.clone());
        keywords.push(row.keyword.clone());
        row_ids.push(row.row_id.clone());
        place_ids.push(row.entity_id.clone());
        names.push(row.display_name.clone());
        addresses.push(row.address.clone());
        statuses.push(row.status.clone());
        categories.push(serde_json::Value::from(row.categories.clone()));
        ratings.push(row.rating);
        rating_counts.push(row.rating_count);
        price_levels.push(row.price_tier);
        lats.push(row.lat);
        lngs.push(row.lng);
        raws.push(row.raw_payload.clone());
    }

    let result = sqlx::query(
        "INSERT INTO poi_places \
             (fetched_at, location_label, keyword, row_id, place_id, name, address, \
              business_status, categories, rating, user_ratings_total, price_level, \
              lat, lng, raw) \
         SELECT t.fetched_at, t.location_label, t.keyword, t.row_id, t.place_id, t.name, \
                t.address, t.business_status, \
                ARRAY(SELECT jsonb_array_elements_text(t.categories)), \
                t.rating, t.user_ratings_total, t.price_level, t.lat, t.lng, t.raw \
         FROM UNNEST(\
              $1::timestamptz[], $2::text[], $3::text[], $4::text[], $5::text[], \
              $6::text[], $7::text[], $8::text[], $9::jsonb[], $10::float8[], \
              $11::int8[], $12::int8[], $13::float8[], $14::float8[], $15::jsonb[]) \
           AS t(fetched_at, location_label, keyword, row_id, place_id, name, address, \
                business_status, categories, rating, user_ratings_total, price_level, \
                lat, lng, raw)",
    )
    .bind(&fetched_ats)
    .bind(&location_labels)
    .bind(&keywords)
    .bind(&row_ids)
    .bind(&place_ids)
    .bind(&names)
    .bind(&addresses)
    .bind(&statuses)
    .bind(&categories)
    .bind(&ratings)
    .bind(&rating_counts)
    .bind(&price_levels)
    .bind(&lats)
    .bind(&lngs)
    .bind(&raws)
    .execute(pool)
    .await?;

    Ok(result.rows_affected())
}

/// [`RowSink`] over the `poi_places` table.
#[derive(Debug, Clone)]
pub struct PgRowSink {
    pool: PgPool,
}

impl PgRowSink {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RowSink for PgRowSink {
    async fn insert_rows(&self, rows: &[NormalizedRow]) -> Result<Vec<RowError>, SinkError> {
        let mut errors = Vec::new();
        let mut valid = Vec::with_capacity(rows.len());
        for (index, row) in rows.iter().enumerate() {
            match validate_row(row) {
                Ok(()) => valid.push(row.clone()),
                Err(message) => errors.push(RowError { index, message }),
            }
        }

        let inserted = insert_places(&self.pool, &valid)
            .await
            .map_err(sink_error)?;
        tracing::debug!(
            inserted,
            rejected = errors.len(),
            "appended rows to poi_places"
        );

        Ok(errors)
    }
}

fn sink_error(e: sqlx::Error) -> SinkError {
    match e {
        sqlx::Error::Database(db) => SinkError::Rejected(db.to_string()),
        other => SinkError::Unavailable(other.to_string()),
    }
}
