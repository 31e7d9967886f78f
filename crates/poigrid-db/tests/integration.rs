//! Offline unit tests for poigrid-db pool configuration and row types.
//! These tests do not require a live database connection.

use std::path::PathBuf;

use poigrid_core::{AppConfig, Environment, NormalizedRow};
use poigrid_db::{validate_row, CrawlRunRow, PoolConfig};

fn app_config() -> AppConfig {
    AppConfig {
        database_url: "postgres://example".to_string(),
        env: Environment::Test,
        log_level: "info".to_string(),
        crawl_path: PathBuf::from("./config/crawl.yaml"),
        places_api_key: "key".to_string(),
        places_base_url: "https://maps.googleapis.com".to_string(),
        db_max_connections: 42,
        db_min_connections: 7,
        db_acquire_timeout_secs: 9,
        request_timeout_secs: 30,
        user_agent: "ua".to_string(),
        request_budget: 1000,
        max_pages_per_tile: 3,
        max_retries: 3,
        retry_backoff_base_ms: 1000,
        retry_backoff_cap_ms: 10_000,
        rate_limit_cooldown_ms: 10_000,
        page_token_delay_ms: 2000,
        inter_request_delay_ms: 300,
        batch_size: 500,
        max_concurrent_tiles: 1,
        max_runtime_secs: None,
    }
}

#[test]
fn pool_config_from_app_config_uses_core_values() {
    let pool_config = PoolConfig::from_app_config(&app_config());
    assert_eq!(pool_config.max_connections, 42);
    assert_eq!(pool_config.min_connections, 7);
    assert_eq!(pool_config.acquire_timeout_secs, 9);
}

/// Compile-time smoke test: confirm that [`CrawlRunRow`] has all expected
/// fields with the correct types. No database required.
#[test]
fn crawl_run_row_has_expected_fields() {
    use chrono::Utc;
    use uuid::Uuid;

    let row = CrawlRunRow {
        id: 1_i64,
        public_id: Uuid::new_v4(),
        location_label: "Rotterdam, Netherlands".to_string(),
        trigger_source: "cli".to_string(),
        status: "running".to_string(),
        request_budget: 1000,
        tile_calls: 0,
        requests_sent: 0,
        rows_found_raw: 0,
        rows_found_unique: 0,
        rows_inserted: 0,
        rows_failed: 0,
        partial_fetches: 0,
        error_message: None,
        started_at: Utc::now(),
        completed_at: None,
        created_at: Utc::now(),
    };

    assert_eq!(row.status, "running");
    assert_eq!(row.request_budget, 1000);
    assert!(row.completed_at.is_none());
}

#[test]
fn row_with_unicode_text_passes_validation() {
    let row = NormalizedRow {
        fetched_at: chrono::Utc::now(),
        location_label: "Rotterdam, Netherlands".to_string(),
        keyword: "café".to_string(),
        row_id: "0".repeat(64),
        entity_id: "ChIJ-ü".to_string(),
        display_name: Some("Koffiehuis Ümit".to_string()),
        address: Some("Nieuwe Binnenweg 1".to_string()),
        status: None,
        categories: vec!["cafe".to_string(), "food".to_string()],
        rating: None,
        rating_count: None,
        price_tier: None,
        lat: None,
        lng: None,
        raw_payload: serde_json::json!({ "name": "Koffiehuis Ümit" }),
    };
    assert!(validate_row(&row).is_ok());
}
