use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub log_level: String,
    pub crawl_path: PathBuf,
    pub places_api_key: String,
    pub places_base_url: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub user_agent: String,
    /// Hard ceiling on outbound search requests for one run.
    pub request_budget: u64,
    pub max_pages_per_tile: u32,
    pub max_retries: u32,
    pub retry_backoff_base_ms: u64,
    pub retry_backoff_cap_ms: u64,
    pub rate_limit_cooldown_ms: u64,
    /// Wait before a continuation token is accepted by the service.
    pub page_token_delay_ms: u64,
    pub inter_request_delay_ms: u64,
    pub batch_size: usize,
    pub max_concurrent_tiles: usize,
    /// Wall-clock limit for a run; `None` means no deadline.
    pub max_runtime_secs: Option<u64>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("log_level", &self.log_level)
            .field("crawl_path", &self.crawl_path)
            .field("database_url", &"[redacted]")
            .field("places_api_key", &"[redacted]")
            .field("places_base_url", &self.places_base_url)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .field("request_budget", &self.request_budget)
            .field("max_pages_per_tile", &self.max_pages_per_tile)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_base_ms", &self.retry_backoff_base_ms)
            .field("retry_backoff_cap_ms", &self.retry_backoff_cap_ms)
            .field("rate_limit_cooldown_ms", &self.rate_limit_cooldown_ms)
            .field("page_token_delay_ms", &self.page_token_delay_ms)
            .field("inter_request_delay_ms", &self.inter_request_delay_ms)
            .field("batch_size", &self.batch_size)
            .field("max_concurrent_tiles", &self.max_concurrent_tiles)
            .field("max_runtime_secs", &self.max_runtime_secs)
            .finish()
    }
}
