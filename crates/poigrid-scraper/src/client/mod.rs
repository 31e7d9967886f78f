//! HTTP client for the Places search web service.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};

use crate::error::ScraperError;
use crate::types::{PlacesResponse, SearchRequest};
use poigrid_core::SearchMode;

const NEARBY_SEARCH_PATH: &str = "/maps/api/place/nearbysearch/json";
const TEXT_SEARCH_PATH: &str = "/maps/api/place/textsearch/json";

/// A black-box search endpoint: one call is one outbound request.
#[async_trait]
pub trait SearchService: Send + Sync {
    /// Sends exactly one request and returns the decoded body.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError`] for network failures, non-2xx HTTP statuses
    /// and undecodable bodies. Service-level statuses (`ZERO_RESULTS`,
    /// `OVER_QUERY_LIMIT`, ...) are NOT errors; they come back in the response.
    async fn search(&self, request: &SearchRequest) -> Result<PlacesResponse, ScraperError>;
}

#[async_trait]
impl<T: SearchService + ?Sized> SearchService for Arc<T> {
    async fn search(&self, request: &SearchRequest) -> Result<PlacesResponse, ScraperError> {
        (**self).search(request).await
    }
}

/// Places web service client.
///
/// Does not retry; retry, cooldown and budget accounting belong to
/// [`crate::fetcher::ResilientFetcher`] so every sent request is counted.
pub struct PlacesClient {
    client: Client,
    base_url: Url,
    api_key: String,
}

impl std::fmt::Debug for PlacesClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlacesClient")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"[redacted]")
            .finish_non_exhaustive()
    }
}

impl PlacesClient {
    /// Creates a `PlacesClient` with configured timeout and `User-Agent`.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidBaseUrl`] if `base_url` does not parse,
    /// or [`ScraperError::Http`] if the underlying `reqwest::Client` cannot be
    /// constructed.
    pub fn new(
        base_url: &str,
        api_key: &str,
        timeout_secs: u64,
        user_agent: &str,
    ) -> Result<Self, ScraperError> {
        let base_url = Url::parse(base_url).map_err(|e| ScraperError::InvalidBaseUrl {
            base_url: base_url.to_owned(),
            reason: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ScraperError::InvalidBaseUrl {
                base_url: base_url.to_string(),
                reason: "URL cannot be used as a base".to_owned(),
            });
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_key: api_key.to_owned(),
        })
    }

    /// Builds the full request URL, credential included.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidBaseUrl`] if the endpoint path cannot be
    /// joined onto the base URL.
    fn request_url(&self, request: &SearchRequest) -> Result<Url, ScraperError> {
        let path = endpoint_path(request.mode());
        let mut url = self
            .base_url
            .join(path)
            .map_err(|e| ScraperError::InvalidBaseUrl {
                base_url: self.base_url.to_string(),
                reason: e.to_string(),
            })?;

        {
            let mut query = url.query_pairs_mut();
            match request {
                SearchRequest::Nearby {
                    location,
                    radius_m,
                    keyword,
                } => {
                    query
                        .append_pair("location", &location.as_query_param())
                        .append_pair("radius", &radius_m.to_string())
                        .append_pair("keyword", keyword);
                }
                SearchRequest::Text {
                    query: text,
                    location,
                    radius_m,
                } => {
                    query
                        .append_pair("query", text)
                        .append_pair("location", &location.as_query_param())
                        .append_pair("radius", &radius_m.to_string());
                }
                SearchRequest::NextPage { token, .. } => {
                    query.append_pair("pagetoken", token);
                }
            }
            query.append_pair("key", &self.api_key);
        }

        Ok(url)
    }
}

fn endpoint_path(mode: SearchMode) -> &'static str {
    match mode {
        SearchMode::Nearby => NEARBY_SEARCH_PATH,
        SearchMode::Text => TEXT_SEARCH_PATH,
    }
}

#[async_trait]
impl SearchService for PlacesClient {
    async fn search(&self, request: &SearchRequest) -> Result<PlacesResponse, ScraperError> {
        let url = self.request_url(request)?;
        let endpoint = endpoint_path(request.mode());

        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            // reqwest embeds the URL in its errors; it carries the key.
            .map_err(reqwest::Error::without_url)?;
        let status = response.status();

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(0);
            return Err(ScraperError::RateLimited { retry_after_secs });
        }

        if !status.is_success() {
            return Err(ScraperError::UnexpectedStatus {
                status: status.as_u16(),
                endpoint: endpoint.to_owned(),
            });
        }

        let body = response.text().await.map_err(reqwest::Error::without_url)?;
        let parsed =
            serde_json::from_str::<PlacesResponse>(&body).map_err(|e| ScraperError::Deserialize {
                context: format!("search page from {endpoint}"),
                source: e,
            })?;

        tracing::debug!(
            endpoint,
            status = %parsed.status,
            results = parsed.results.len(),
            has_next = parsed.continuation().is_some(),
            "search page received"
        );

        Ok(parsed)
    }
}

#[cfg(test)]
#[path = "../client_test.rs"]
mod tests;
