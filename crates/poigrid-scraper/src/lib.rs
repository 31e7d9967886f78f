pub mod budget;
pub mod client;
pub mod crawl;
pub mod dedup;
pub mod error;
pub mod fetcher;
pub mod grid;
pub mod import;
pub mod normalize;
pub mod retry;
pub mod types;
pub mod writer;

#[cfg(test)]
pub(crate) mod test_support;

pub use budget::RequestBudget;
pub use client::{PlacesClient, SearchService};
pub use crawl::{CrawlReport, CrawlSettings, Crawler};
pub use dedup::SeenSet;
pub use error::ScraperError;
pub use fetcher::{FetchOutcome, FetchSettings, ResilientFetcher, StopReason};
pub use grid::{generate_grid, grid_dimensions, MAX_TILES};
pub use import::{import_export, import_record, ImportBatch};
pub use normalize::{normalize_place, stable_row_id};
pub use retry::{RetryMachine, RetryPolicy, RetryState, Sleeper, TokioSleeper};
pub use types::{PageStatus, PlacesResponse, RawPlace, SearchRequest};
pub use writer::{BatchWriter, InsertOutcome};
