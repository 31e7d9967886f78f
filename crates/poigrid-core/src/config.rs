use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// The settings needed to plan a crawl without contacting anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanConfig {
    pub log_level: String,
    pub crawl_path: std::path::PathBuf,
    pub max_pages_per_tile: u32,
}

/// Load the planning subset of the configuration from the process env.
///
/// Needs no credentials, so a dry run works on a machine without them.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` if `POIGRID_MAX_PAGES_PER_TILE` is
/// not a positive integer.
pub fn load_plan_config_from_env() -> Result<PlanConfig, ConfigError> {
    build_plan_config(|key| std::env::var(key))
}

fn build_plan_config<F>(lookup: F) -> Result<PlanConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let max_pages_per_tile = or_default("POIGRID_MAX_PAGES_PER_TILE", "3")
        .parse::<u32>()
        .map_err(|e| ConfigError::InvalidEnvVar {
            var: "POIGRID_MAX_PAGES_PER_TILE".to_string(),
            reason: e.to_string(),
        })?;
    if max_pages_per_tile == 0 {
        return Err(ConfigError::InvalidEnvVar {
            var: "POIGRID_MAX_PAGES_PER_TILE".to_string(),
            reason: "must be greater than zero".to_string(),
        });
    }

    Ok(PlanConfig {
        log_level: or_default("POIGRID_LOG_LEVEL", "info"),
        crawl_path: std::path::PathBuf::from(or_default(
            "POIGRID_CRAWL_PATH",
            "./config/crawl.yaml",
        )),
        max_pages_per_tile,
    })
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so tests can drive it with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u32>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<usize>()
            .map_err(|e| ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: e.to_string(),
            })
    };

    let positive = |var: &str, value: usize| -> Result<usize, ConfigError> {
        if value == 0 {
            return Err(ConfigError::InvalidEnvVar {
                var: var.to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(value)
    };

    let database_url = require("DATABASE_URL")?;
    let places_api_key = require("GOOGLE_MAPS_API_KEY")?;

    let PlanConfig {
        log_level,
        crawl_path,
        max_pages_per_tile,
    } = build_plan_config(&lookup)?;
    let env = parse_environment(&or_default("POIGRID_ENV", "development"));
    let places_base_url = or_default("POIGRID_PLACES_BASE_URL", "https://maps.googleapis.com");

    let db_max_connections = parse_u32("POIGRID_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("POIGRID_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("POIGRID_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let request_timeout_secs = parse_u64("POIGRID_REQUEST_TIMEOUT_SECS", "30")?;
    let user_agent = or_default("POIGRID_USER_AGENT", "poigrid/0.1 (poi-crawler)");
    let request_budget = parse_u64("POIGRID_REQUEST_BUDGET", "1000")?;
    let max_retries = parse_u32("POIGRID_MAX_RETRIES", "3")?;
    let retry_backoff_base_ms = parse_u64("POIGRID_RETRY_BACKOFF_BASE_MS", "1000")?;
    let retry_backoff_cap_ms = parse_u64("POIGRID_RETRY_BACKOFF_CAP_MS", "10000")?;
    let rate_limit_cooldown_ms = parse_u64("POIGRID_RATE_LIMIT_COOLDOWN_MS", "10000")?;
    let page_token_delay_ms = parse_u64("POIGRID_PAGE_TOKEN_DELAY_MS", "2000")?;
    let inter_request_delay_ms = parse_u64("POIGRID_INTER_REQUEST_DELAY_MS", "300")?;
    let batch_size = positive(
        "POIGRID_BATCH_SIZE",
        parse_usize("POIGRID_BATCH_SIZE", "500")?,
    )?;
    let max_concurrent_tiles = positive(
        "POIGRID_MAX_CONCURRENT_TILES",
        parse_usize("POIGRID_MAX_CONCURRENT_TILES", "1")?,
    )?;
    let max_runtime_secs = match lookup("POIGRID_MAX_RUNTIME_SECS") {
        Ok(raw) if !raw.trim().is_empty() => {
            Some(
                raw.trim()
                    .parse::<u64>()
                    .map_err(|e| ConfigError::InvalidEnvVar {
                        var: "POIGRID_MAX_RUNTIME_SECS".to_string(),
                        reason: e.to_string(),
                    })?,
            )
        }
        _ => None,
    };

    Ok(AppConfig {
        database_url,
        env,
        log_level,
        crawl_path,
        places_api_key,
        places_base_url,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        request_timeout_secs,
        user_agent,
        request_budget,
        max_pages_per_tile,
        max_retries,
        retry_backoff_base_ms,
        retry_backoff_cap_ms,
        rate_limit_cooldown_ms,
        page_token_delay_ms,
        inter_request_delay_ms,
        batch_size,
        max_concurrent_tiles,
        max_runtime_secs,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
