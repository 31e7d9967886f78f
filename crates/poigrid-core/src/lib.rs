pub mod app_config;
pub mod config;
pub mod geo;
pub mod profile;
pub mod rows;
pub mod sink;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env, load_plan_config_from_env, PlanConfig};
pub use geo::{BoundingBox, TileCoordinate, COORDINATE_DECIMALS};
pub use profile::{load_crawl_profile, parse_crawl_profile, CrawlProfile, SearchMode};
pub use rows::{NormalizedRow, RunCounters, RunStatus};
pub use sink::{RowError, RowSink, SinkError};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read crawl profile at {path}: {source}")]
    ProfileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse crawl profile: {0}")]
    ProfileParse(#[source] serde_yaml::Error),

    #[error("invalid crawl profile: {0}")]
    InvalidProfile(String),

    #[error("invalid bounding box: {0}")]
    InvalidBoundingBox(String),

    #[error("grid step must be a positive number of meters, got {0}")]
    InvalidStep(f64),

    #[error("grid of {rows} x {cols} tiles exceeds the limit of {max_tiles} tiles; raise the step")]
    GridTooLarge {
        rows: usize,
        cols: usize,
        max_tiles: usize,
    },
}
