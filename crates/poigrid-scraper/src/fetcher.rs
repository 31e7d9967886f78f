//! Budget-aware, retrying, paginated fetch for one `(tile, keyword)` pair.
//!
//! Partial results are never discarded: whatever pages completed before a
//! stop condition are returned alongside the reason pagination ended.

use std::sync::Arc;
use std::time::Duration;

use poigrid_core::{AppConfig, CrawlProfile, SearchMode, TileCoordinate};

use crate::budget::RequestBudget;
use crate::client::SearchService;
use crate::retry::{RetryMachine, RetryPolicy, RetryState, Sleeper};
use crate::types::{PageStatus, PlacesResponse, RawPlace, SearchRequest};

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub mode: SearchMode,
    pub radius_m: u32,
    /// Label used to build free-text queries in [`SearchMode::Text`].
    pub location_label: String,
    pub max_pages: u32,
    pub retry: RetryPolicy,
    /// Wait after an `OVER_QUERY_LIMIT` before the single extra attempt.
    pub rate_limit_cooldown: Duration,
    /// Wait before a continuation token is used.
    pub page_token_delay: Duration,
    /// Pause between consecutive logical fetches.
    pub inter_request_delay: Duration,
}

impl FetchSettings {
    /// Process-level limits from `config`, query shape from `profile`.
    #[must_use]
    pub fn from_config(config: &AppConfig, profile: &CrawlProfile) -> Self {
        Self {
            mode: profile.search_mode,
            radius_m: profile.radius_m,
            location_label: profile.location_label.clone(),
            max_pages: config.max_pages_per_tile,
            retry: RetryPolicy {
                max_retries: config.max_retries,
                backoff_base: Duration::from_millis(config.retry_backoff_base_ms),
                backoff_cap: Duration::from_millis(config.retry_backoff_cap_ms),
            },
            rate_limit_cooldown: Duration::from_millis(config.rate_limit_cooldown_ms),
            page_token_delay: Duration::from_millis(config.page_token_delay_ms),
            inter_request_delay: Duration::from_millis(config.inter_request_delay_ms),
        }
    }
}

/// Why pagination for a pair ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// The service returned no continuation token.
    Finished,
    /// `max_pages` pages were fetched and a token was still pending.
    PageLimit,
    /// The run-wide request budget ran out before the next request.
    BudgetExhausted,
    /// Transient failures outlasted every retry.
    RetriesExhausted,
    /// `OVER_QUERY_LIMIT` persisted after the cooldown retry.
    RateLimited,
    /// A non-transient HTTP or decoding failure.
    Rejected(String),
    /// A service status other than `OK`/`ZERO_RESULTS`/`OVER_QUERY_LIMIT`.
    UnrecognizedStatus(String),
}

impl StopReason {
    /// `true` when pages that the service would have served were not fetched.
    #[must_use]
    pub fn is_partial(&self) -> bool {
        !matches!(self, StopReason::Finished | StopReason::PageLimit)
    }
}

#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub results: Vec<RawPlace>,
    /// Requests actually sent (each charged to the budget).
    pub requests: u64,
    pub pages: u32,
    pub stop: StopReason,
}

enum PageResult {
    Page(PlacesResponse),
    Stopped(StopReason),
}

/// Issues the paginated search for one pair against a shared budget.
pub struct ResilientFetcher<S, Z> {
    service: S,
    sleeper: Z,
    budget: Arc<RequestBudget>,
    settings: FetchSettings,
}

impl<S, Z> ResilientFetcher<S, Z>
where
    S: SearchService,
    Z: Sleeper,
{
    pub fn new(service: S, sleeper: Z, budget: Arc<RequestBudget>, settings: FetchSettings) -> Self {
        Self {
            service,
            sleeper,
            budget,
            settings,
        }
    }

    #[must_use]
    pub fn budget(&self) -> &RequestBudget {
        &self.budget
    }

    #[must_use]
    pub fn settings(&self) -> &FetchSettings {
        &self.settings
    }

    /// Throttle between logical fetches.
    pub async fn pause_between_fetches(&self) {
        self.sleeper.sleep(self.settings.inter_request_delay).await;
    }

    /// Fetches up to `max_pages` pages for `(tile, keyword)`.
    ///
    /// Never fails: every failure mode ends pagination and is reported in
    /// [`FetchOutcome::stop`] with the results gathered so far.
    pub async fn fetch_all_pages(&self, tile: &TileCoordinate, keyword: &str) -> FetchOutcome {
        let mut results = Vec::new();
        let mut requests = 0u64;
        let mut pages = 0u32;
        let mut token: Option<String> = None;

        let stop = loop {
            if pages >= self.settings.max_pages {
                break if token.is_some() {
                    StopReason::PageLimit
                } else {
                    StopReason::Finished
                };
            }

            let request = match token.take() {
                None => SearchRequest::first_page(
                    self.settings.mode,
                    *tile,
                    self.settings.radius_m,
                    keyword,
                    &self.settings.location_label,
                ),
                Some(token) => {
                    if self.budget.exhausted() {
                        break StopReason::BudgetExhausted;
                    }
                    self.sleeper.sleep(self.settings.page_token_delay).await;
                    SearchRequest::NextPage {
                        mode: self.settings.mode,
                        token,
                    }
                }
            };

            match self.fetch_page(&request, tile, keyword, &mut requests).await {
                PageResult::Page(response) => {
                    pages += 1;
                    token = response.continuation().map(str::to_owned);
                    results.extend(response.into_places());
                    if token.is_none() {
                        break StopReason::Finished;
                    }
                }
                PageResult::Stopped(reason) => break reason,
            }
        };

        if stop.is_partial() {
            tracing::warn!(
                keyword,
                lat = tile.lat(),
                lng = tile.lng(),
                pages,
                results = results.len(),
                stop = ?stop,
                "pagination stopped early; keeping partial results"
            );
        } else {
            tracing::debug!(
                keyword,
                lat = tile.lat(),
                lng = tile.lng(),
                pages,
                results = results.len(),
                "pagination finished"
            );
        }

        FetchOutcome {
            results,
            requests,
            pages,
            stop,
        }
    }

    /// One logical page: retries transient failures with backoff and a
    /// service throttle once after the cooldown.
    async fn fetch_page(
        &self,
        request: &SearchRequest,
        tile: &TileCoordinate,
        keyword: &str,
        requests: &mut u64,
    ) -> PageResult {
        let mut machine = RetryMachine::new(self.settings.retry);
        let mut cooled_down = false;
        let mut page: Option<PlacesResponse> = None;

        loop {
            match machine.state() {
                RetryState::Attempting { attempt } => {
                    if !self.budget.try_consume() {
                        return PageResult::Stopped(StopReason::BudgetExhausted);
                    }
                    *requests += 1;

                    match self.service.search(request).await {
                        Ok(response) => match response.page_status() {
                            PageStatus::Ok | PageStatus::ZeroResults => {
                                page = Some(response);
                                machine.succeed();
                            }
                            PageStatus::OverQueryLimit if !cooled_down => {
                                cooled_down = true;
                                tracing::warn!(
                                    keyword,
                                    lat = tile.lat(),
                                    lng = tile.lng(),
                                    cooldown_ms = duration_ms(self.settings.rate_limit_cooldown),
                                    "search service throttled request; cooling down before one more try"
                                );
                                self.sleeper.sleep(self.settings.rate_limit_cooldown).await;
                            }
                            PageStatus::OverQueryLimit => {
                                tracing::warn!(
                                    keyword,
                                    lat = tile.lat(),
                                    lng = tile.lng(),
                                    attempt,
                                    "search service still throttling after cooldown; giving up on page"
                                );
                                return PageResult::Stopped(StopReason::RateLimited);
                            }
                            PageStatus::Other(status) => {
                                tracing::warn!(
                                    keyword,
                                    lat = tile.lat(),
                                    lng = tile.lng(),
                                    status = %status,
                                    detail = response.error_message.as_deref().unwrap_or(""),
                                    "unrecognized search status; aborting pagination for pair"
                                );
                                return PageResult::Stopped(StopReason::UnrecognizedStatus(status));
                            }
                        },
                        Err(err) => {
                            let transient = err.is_transient();
                            if let RetryState::GivenUp { attempts } =
                                machine.fail_after(transient, err.retry_after())
                            {
                                tracing::warn!(
                                    keyword,
                                    lat = tile.lat(),
                                    lng = tile.lng(),
                                    attempts,
                                    error = %err,
                                    "search request failed; giving up on page"
                                );
                                return PageResult::Stopped(if transient {
                                    StopReason::RetriesExhausted
                                } else {
                                    StopReason::Rejected(err.to_string())
                                });
                            }
                            tracing::warn!(
                                keyword,
                                attempt,
                                error = %err,
                                "transient search error; retrying after backoff"
                            );
                        }
                    }
                }
                RetryState::BackingOff { attempt, delay } => {
                    tracing::debug!(attempt, delay_ms = duration_ms(delay), "backing off");
                    self.sleeper.sleep(delay).await;
                    machine.resume();
                }
                RetryState::GivenUp { .. } => {
                    return PageResult::Stopped(StopReason::RetriesExhausted);
                }
                RetryState::Succeeded { .. } => {
                    return page.map_or(
                        PageResult::Stopped(StopReason::RetriesExhausted),
                        PageResult::Page,
                    );
                }
            }
        }
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

#[cfg(test)]
#[path = "fetcher_test.rs"]
mod tests;
