use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("rate limited by search service (HTTP 429, retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("unexpected HTTP status {status} from {endpoint}")]
    UnexpectedStatus { status: u16, endpoint: String },

    #[error("invalid search service base URL \"{base_url}\": {reason}")]
    InvalidBaseUrl { base_url: String, reason: String },

    #[error("invalid place export: {0}")]
    InvalidExport(String),

    #[error(transparent)]
    Config(#[from] poigrid_core::ConfigError),
}

impl ScraperError {
    /// Returns `true` if the same request is worth sending again after a
    /// backoff delay.
    ///
    /// Transient:
    /// - network timeouts, connection failures and send errors,
    /// - HTTP 5xx,
    /// - HTTP 429.
    ///
    /// Everything else (other 4xx, malformed bodies, configuration) fails the
    /// page immediately.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            ScraperError::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.is_request()
                    || e.status().is_some_and(|s| s.is_server_error())
            }
            ScraperError::RateLimited { .. } => true,
            ScraperError::UnexpectedStatus { status, .. } => (500..600).contains(status),
            ScraperError::Deserialize { .. }
            | ScraperError::InvalidBaseUrl { .. }
            | ScraperError::InvalidExport(_)
            | ScraperError::Config(_) => false,
        }
    }

    /// The wait the service asked for before the next attempt, if any.
    #[must_use]
    pub fn retry_after(&self) -> Option<std::time::Duration> {
        match self {
            ScraperError::RateLimited { retry_after_secs } => {
                Some(std::time::Duration::from_secs(*retry_after_secs))
            }
            _ => None,
        }
    }
}
