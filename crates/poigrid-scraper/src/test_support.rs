//! In-memory doubles for the search service, the clock and the sink.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use poigrid_core::{NormalizedRow, RowError, RowSink, SinkError, TileCoordinate};
use serde_json::{json, Value};

use crate::client::SearchService;
use crate::error::ScraperError;
use crate::retry::Sleeper;
use crate::types::{PlacesResponse, SearchRequest};

/// Script key for a first-page request: `"{keyword}@{lat},{lng}"`.
pub(crate) fn pair_key(keyword: &str, tile: &TileCoordinate) -> String {
    format!("{keyword}@{}", tile.as_query_param())
}

/// Script key for a continuation request.
pub(crate) fn token_key(token: &str) -> String {
    format!("token:{token}")
}

fn request_key(request: &SearchRequest) -> String {
    match request {
        SearchRequest::Nearby {
            location, keyword, ..
        } => pair_key(keyword, location),
        SearchRequest::Text {
            query, location, ..
        } => pair_key(query, location),
        SearchRequest::NextPage { token, .. } => token_key(token),
    }
}

pub(crate) fn place(id: &str) -> Value {
    json!({
        "place_id": id,
        "name": format!("Place {id}"),
        "vicinity": "Coolsingel 1, Rotterdam",
        "types": ["store", "point_of_interest"],
        "geometry": { "location": { "lat": 51.92, "lng": 4.48 } }
    })
}

pub(crate) fn page(ids: &[&str], next: Option<&str>) -> PlacesResponse {
    PlacesResponse {
        status: if ids.is_empty() { "ZERO_RESULTS" } else { "OK" }.to_owned(),
        results: ids.iter().map(|id| place(id)).collect(),
        next_page_token: next.map(str::to_owned),
        error_message: None,
    }
}

pub(crate) fn status_page(status: &str) -> PlacesResponse {
    PlacesResponse {
        status: status.to_owned(),
        results: Vec::new(),
        next_page_token: None,
        error_message: Some(format!("scripted {status}")),
    }
}

pub(crate) fn transient_error() -> ScraperError {
    ScraperError::UnexpectedStatus {
        status: 503,
        endpoint: "/scripted".to_owned(),
    }
}

pub(crate) fn permanent_error() -> ScraperError {
    ScraperError::UnexpectedStatus {
        status: 403,
        endpoint: "/scripted".to_owned(),
    }
}

/// Replies from per-request queues; an unscripted request gets `ZERO_RESULTS`.
#[derive(Default)]
pub(crate) struct ScriptedService {
    scripts: Mutex<HashMap<String, VecDeque<Result<PlacesResponse, ScraperError>>>>,
    sent: Mutex<Vec<String>>,
}

impl ScriptedService {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&self, key: String, reply: Result<PlacesResponse, ScraperError>) {
        self.scripts
            .lock()
            .unwrap()
            .entry(key)
            .or_default()
            .push_back(reply);
    }

    pub(crate) fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl SearchService for ScriptedService {
    async fn search(&self, request: &SearchRequest) -> Result<PlacesResponse, ScraperError> {
        let key = request_key(request);
        self.sent.lock().unwrap().push(key.clone());
        self.scripts
            .lock()
            .unwrap()
            .get_mut(&key)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Ok(page(&[], None)))
    }
}

/// Records requested waits and returns immediately, or after one yield to
/// the executor when built with [`RecordingSleeper::yielding`].
#[derive(Default)]
pub(crate) struct RecordingSleeper {
    waits: Mutex<Vec<Duration>>,
    yields: bool,
}

impl RecordingSleeper {
    /// Every wait yields once, so concurrent pairs interleave at their pauses.
    pub(crate) fn yielding() -> Self {
        Self {
            waits: Mutex::default(),
            yields: true,
        }
    }

    pub(crate) fn waits(&self) -> Vec<Duration> {
        self.waits.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.waits.lock().unwrap().push(duration);
        if self.yields {
            tokio::task::yield_now().await;
        }
    }
}

/// Scripted reply for one `insert_rows` call.
pub(crate) enum SinkReply {
    RejectIndices(Vec<usize>),
    Fail,
}

/// Stores every batch it is handed; replies are consumed one per call and
/// default to accepting everything.
#[derive(Default)]
pub(crate) struct FakeSink {
    replies: Mutex<VecDeque<SinkReply>>,
    batches: Mutex<Vec<Vec<NormalizedRow>>>,
}

impl FakeSink {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_replies(replies: impl IntoIterator<Item = SinkReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            batches: Mutex::default(),
        }
    }

    pub(crate) fn batches(&self) -> Vec<Vec<NormalizedRow>> {
        self.batches.lock().unwrap().clone()
    }

    pub(crate) fn rows(&self) -> Vec<NormalizedRow> {
        self.batches().into_iter().flatten().collect()
    }
}

#[async_trait]
impl RowSink for FakeSink {
    async fn insert_rows(&self, rows: &[NormalizedRow]) -> Result<Vec<RowError>, SinkError> {
        self.batches.lock().unwrap().push(rows.to_vec());
        match self.replies.lock().unwrap().pop_front() {
            None => Ok(Vec::new()),
            Some(SinkReply::RejectIndices(indices)) => Ok(indices
                .into_iter()
                .map(|index| RowError {
                    index,
                    message: format!("row {index} rejected"),
                })
                .collect()),
            Some(SinkReply::Fail) => Err(SinkError::Unavailable("scripted outage".to_owned())),
        }
    }
}
