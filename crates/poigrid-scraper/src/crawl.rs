//! Crawl orchestration: keywords × tiles → fetch → dedup → normalize → write.
//!
//! ```text
//! INIT (grid once) → RUNNING → COMPLETED | BUDGET_EXHAUSTED | DEADLINE_REACHED
//! ```
//!
//! Pairs are visited keyword-major in declared order, tiles in grid order.
//! With `max_concurrent = 1` (the default) one pair finishes, retries and
//! waits included, before the next one starts. Larger values overlap pairs;
//! results are then processed in completion order.

use std::time::{Duration, Instant};

use chrono::Utc;
use futures::stream::{self, StreamExt};
use poigrid_core::{
    AppConfig, ConfigError, CrawlProfile, NormalizedRow, RowSink, RunCounters, RunStatus,
    TileCoordinate,
};

use crate::client::SearchService;
use crate::dedup::SeenSet;
use crate::fetcher::{FetchOutcome, ResilientFetcher, StopReason};
use crate::grid::generate_grid;
use crate::normalize::normalize_place;
use crate::retry::Sleeper;
use crate::writer::{BatchWriter, InsertOutcome};

#[derive(Debug, Clone)]
pub struct CrawlSettings {
    /// Pairs in flight at once. Zero is treated as one.
    pub max_concurrent: usize,
    /// Wall-clock limit measured from the start of [`Crawler::run`].
    pub deadline: Option<Duration>,
}

impl CrawlSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            max_concurrent: config.max_concurrent_tiles,
            deadline: config.max_runtime_secs.map(Duration::from_secs),
        }
    }
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            max_concurrent: 1,
            deadline: None,
        }
    }
}

/// Terminal summary of a run. Same shape whatever the status.
#[derive(Debug, Clone)]
pub struct CrawlReport {
    pub status: RunStatus,
    pub counters: RunCounters,
    pub tiles: usize,
    pub keywords: usize,
    pub elapsed: Duration,
    pub failed_samples: Vec<String>,
}

enum Skip {
    Budget,
    Deadline,
}

enum PairResult<'a> {
    Fetched {
        keyword: &'a str,
        tile: &'a TileCoordinate,
        outcome: FetchOutcome,
    },
    Skipped(Skip),
}

pub struct Crawler<S, Z, K> {
    fetcher: ResilientFetcher<S, Z>,
    writer: BatchWriter<K>,
    settings: CrawlSettings,
}

impl<S, Z, K> Crawler<S, Z, K>
where
    S: SearchService,
    Z: Sleeper,
    K: RowSink,
{
    pub fn new(fetcher: ResilientFetcher<S, Z>, writer: BatchWriter<K>, settings: CrawlSettings) -> Self {
        Self {
            fetcher,
            writer,
            settings,
        }
    }

    /// Runs one crawl of `profile` to a terminal state.
    ///
    /// Budget exhaustion and the deadline are normal terminations reported in
    /// [`CrawlReport::status`]. Fetch and sink failures are absorbed into the
    /// counters.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the profile's grid cannot be generated.
    pub async fn run(&self, profile: &CrawlProfile) -> Result<CrawlReport, ConfigError> {
        let started = Instant::now();
        let deadline = self.settings.deadline.map(|limit| started + limit);

        let tiles = generate_grid(&profile.bbox, profile.step_meters())?;
        let budget = self.fetcher.budget();
        tracing::info!(
            location = %profile.location_label,
            tiles = tiles.len(),
            keywords = profile.keywords.len(),
            budget = budget.limit(),
            "starting crawl"
        );

        let pairs = profile
            .keywords
            .iter()
            .flat_map(|keyword| tiles.iter().map(move |tile| (keyword.as_str(), tile)))
            .enumerate();

        let mut results = stream::iter(pairs)
            .map(|(index, (keyword, tile))| async move {
                if deadline.is_some_and(|d| Instant::now() >= d) {
                    return PairResult::Skipped(Skip::Deadline);
                }
                if self.fetcher.budget().exhausted() {
                    return PairResult::Skipped(Skip::Budget);
                }
                if index > 0 {
                    self.fetcher.pause_between_fetches().await;
                }
                let outcome = self.fetcher.fetch_all_pages(tile, keyword).await;
                PairResult::Fetched {
                    keyword,
                    tile,
                    outcome,
                }
            })
            .buffer_unordered(self.settings.max_concurrent.max(1));

        let seen = SeenSet::new();
        let mut counters = RunCounters::default();
        let mut written = InsertOutcome::default();
        let mut pending: Vec<NormalizedRow> = Vec::with_capacity(self.writer.batch_size());
        let mut budget_hit = false;
        let mut deadline_hit = false;

        while let Some(result) = results.next().await {
            let (keyword, tile, outcome) = match result {
                PairResult::Fetched {
                    keyword,
                    tile,
                    outcome,
                } => (keyword, tile, outcome),
                PairResult::Skipped(Skip::Budget) => {
                    budget_hit = true;
                    continue;
                }
                PairResult::Skipped(Skip::Deadline) => {
                    deadline_hit = true;
                    continue;
                }
            };

            if outcome.requests == 0 {
                // Lost the race for the last budget unit after the pre-check.
                budget_hit |= outcome.stop == StopReason::BudgetExhausted;
                continue;
            }

            counters.tile_calls += 1;
            counters.requests_sent += outcome.requests;
            counters.rows_found_raw += outcome.results.len() as u64;
            if outcome.stop.is_partial() {
                counters.partial_fetches += 1;
            }
            if outcome.stop == StopReason::BudgetExhausted {
                budget_hit = true;
            }

            let fetched_at = Utc::now();
            let mut admitted = 0u64;
            for place in &outcome.results {
                let Some(entity_id) = place.entity_id() else {
                    tracing::debug!(keyword, "result without place_id skipped");
                    continue;
                };
                if !seen.admit(entity_id) {
                    continue;
                }
                if let Some(row) =
                    normalize_place(&profile.location_label, keyword, place, fetched_at)
                {
                    pending.push(row);
                    admitted += 1;
                }
            }
            counters.rows_found_unique += admitted;

            tracing::debug!(
                keyword,
                lat = tile.lat(),
                lng = tile.lng(),
                results = outcome.results.len(),
                new = admitted,
                requests_used = budget.used(),
                "pair done"
            );

            if pending.len() >= self.writer.batch_size() {
                self.flush(&mut pending, &mut counters, &mut written).await;
            }
        }

        if !pending.is_empty() {
            self.flush(&mut pending, &mut counters, &mut written).await;
        }

        let status = if budget_hit {
            RunStatus::BudgetExhausted
        } else if deadline_hit {
            RunStatus::DeadlineReached
        } else {
            RunStatus::Completed
        };

        let report = CrawlReport {
            status,
            counters,
            tiles: tiles.len(),
            keywords: profile.keywords.len(),
            elapsed: started.elapsed(),
            failed_samples: written.failed_samples,
        };

        tracing::info!(
            status = %report.status,
            tile_calls = counters.tile_calls,
            requests_sent = counters.requests_sent,
            rows_found_raw = counters.rows_found_raw,
            rows_found_unique = counters.rows_found_unique,
            rows_inserted = counters.rows_inserted,
            rows_failed = counters.rows_failed,
            partial_fetches = counters.partial_fetches,
            elapsed_ms = u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
            "crawl finished"
        );

        Ok(report)
    }

    async fn flush(
        &self,
        pending: &mut Vec<NormalizedRow>,
        counters: &mut RunCounters,
        written: &mut InsertOutcome,
    ) {
        let outcome = self.writer.write(pending).await;
        pending.clear();
        counters.rows_inserted += outcome.inserted;
        counters.rows_failed += outcome.failed;
        tracing::info!(
            inserted = outcome.inserted,
            failed = outcome.failed,
            total_inserted = counters.rows_inserted,
            "rows written"
        );
        written.merge(outcome);
    }
}

#[cfg(test)]
#[path = "crawl_test.rs"]
mod tests;
