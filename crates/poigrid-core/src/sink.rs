//! The analytical sink seam: anything that can append a bounded batch of
//! [`NormalizedRow`]s and report which of them it rejected.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::rows::NormalizedRow;

/// A single row the sink refused, identified by its index in the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    pub index: usize,
    pub message: String,
}

/// The whole batch failed; no row of it can be assumed stored.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink unavailable: {0}")]
    Unavailable(String),

    #[error("batch rejected by sink: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait RowSink: Send + Sync {
    /// Best-effort append of `rows`.
    ///
    /// `Ok` carries the rows that were refused; every other row is stored.
    /// The sink does not promise atomicity across the batch.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] when the batch as a whole could not be written.
    async fn insert_rows(&self, rows: &[NormalizedRow]) -> Result<Vec<RowError>, SinkError>;
}

#[async_trait]
impl<T: RowSink + ?Sized> RowSink for Arc<T> {
    async fn insert_rows(&self, rows: &[NormalizedRow]) -> Result<Vec<RowError>, SinkError> {
        (**self).insert_rows(rows).await
    }
}
