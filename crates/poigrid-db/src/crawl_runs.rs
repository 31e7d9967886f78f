//! Database operations for `crawl_runs`.

use chrono::{DateTime, Utc};
use poigrid_core::{RunCounters, RunStatus};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

/// A row from the `crawl_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CrawlRunRow {
    pub id: i64,
    pub public_id: Uuid,
    pub location_label: String,
    pub trigger_source: String,
    pub status: String,
    pub request_budget: i64,
    pub tile_calls: i64,
    pub requests_sent: i64,
    pub rows_found_raw: i64,
    pub rows_found_unique: i64,
    pub rows_inserted: i64,
    pub rows_failed: i64,
    pub partial_fetches: i64,
    pub error_message: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

const RUN_COLUMNS: &str = "id, public_id, location_label, trigger_source, status, request_budget, \
     tile_calls, requests_sent, rows_found_raw, rows_found_unique, rows_inserted, rows_failed, \
     partial_fetches, error_message, started_at, completed_at, created_at";

fn to_db(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Creates a new crawl run in `running` status with `started_at = NOW()`.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails.
pub async fn create_crawl_run(
    pool: &PgPool,
    location_label: &str,
    trigger_source: &str,
    request_budget: u64,
) -> Result<CrawlRunRow, DbError> {
    let row = sqlx::query_as::<_, CrawlRunRow>(&format!(
        "INSERT INTO crawl_runs (public_id, location_label, trigger_source, request_budget) \
         VALUES ($1, $2, $3, $4) \
         RETURNING {RUN_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(location_label)
    .bind(trigger_source)
    .bind(to_db(request_budget))
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Stores the terminal status and final counters of a running crawl.
///
/// # Errors
///
/// Returns [`DbError::InvalidCrawlRunTransition`] if the run is not
/// `running`, or [`DbError::Sqlx`] if the update fails.
pub async fn complete_crawl_run(
    pool: &PgPool,
    id: i64,
    status: RunStatus,
    counters: &RunCounters,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE crawl_runs \
         SET status = $1, completed_at = NOW(), \
             tile_calls = $2, requests_sent = $3, rows_found_raw = $4, \
             rows_found_unique = $5, rows_inserted = $6, rows_failed = $7, \
             partial_fetches = $8 \
         WHERE id = $9 AND status = 'running'",
    )
    .bind(status.as_str())
    .bind(to_db(counters.tile_calls))
    .bind(to_db(counters.requests_sent))
    .bind(to_db(counters.rows_found_raw))
    .bind(to_db(counters.rows_found_unique))
    .bind(to_db(counters.rows_inserted))
    .bind(to_db(counters.rows_failed))
    .bind(to_db(counters.partial_fetches))
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidCrawlRunTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Marks a run as `failed`, sets `completed_at = NOW()` and `error_message`.
///
/// # Errors
///
/// Returns [`DbError::InvalidCrawlRunTransition`] if the run is not
/// `running`, or [`DbError::Sqlx`] if the update fails.
pub async fn fail_crawl_run(pool: &PgPool, id: i64, error_message: &str) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE crawl_runs \
         SET status = 'failed', completed_at = NOW(), error_message = $1 \
         WHERE id = $2 AND status = 'running'",
    )
    .bind(error_message)
    .bind(id)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidCrawlRunTransition {
            id,
            expected_status: "running",
        });
    }

    Ok(())
}

/// Fetches a single run by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no run has that id, or [`DbError::Sqlx`]
/// if the query fails.
pub async fn get_crawl_run(pool: &PgPool, id: i64) -> Result<CrawlRunRow, DbError> {
    sqlx::query_as::<_, CrawlRunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM crawl_runs WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound)
}

/// Most recent runs first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_crawl_runs(pool: &PgPool, limit: i64) -> Result<Vec<CrawlRunRow>, DbError> {
    let rows = sqlx::query_as::<_, CrawlRunRow>(&format!(
        "SELECT {RUN_COLUMNS} FROM crawl_runs ORDER BY started_at DESC, id DESC LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
