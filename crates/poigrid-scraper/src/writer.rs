//! Bounded-batch delivery of normalized rows to a [`RowSink`].
//!
//! A rejected row or a failed batch is counted and sampled, never fatal: the
//! crawl keeps going and the run summary carries the damage.

use poigrid_core::{NormalizedRow, RowSink};

/// Failure messages kept per run for the summary.
pub const MAX_FAILED_SAMPLES: usize = 5;

/// Rows written by one or more `write` calls.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InsertOutcome {
    pub attempted: u64,
    pub inserted: u64,
    pub failed: u64,
    pub batches: u64,
    /// First few failure messages, at most [`MAX_FAILED_SAMPLES`].
    pub failed_samples: Vec<String>,
}

impl InsertOutcome {
    /// Folds `other` into `self`, keeping the sample cap.
    pub fn merge(&mut self, other: InsertOutcome) {
        self.attempted += other.attempted;
        self.inserted += other.inserted;
        self.failed += other.failed;
        self.batches += other.batches;
        for sample in other.failed_samples {
            self.push_sample(sample);
        }
    }

    fn push_sample(&mut self, sample: String) {
        if self.failed_samples.len() < MAX_FAILED_SAMPLES {
            self.failed_samples.push(sample);
        }
    }
}

pub struct BatchWriter<K> {
    sink: K,
    batch_size: usize,
}

impl<K: RowSink> BatchWriter<K> {
    /// A `batch_size` of zero is treated as one.
    pub fn new(sink: K, batch_size: usize) -> Self {
        Self {
            sink,
            batch_size: batch_size.max(1),
        }
    }

    #[must_use]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Sends `rows` in chunks of at most `batch_size`.
    pub async fn write(&self, rows: &[NormalizedRow]) -> InsertOutcome {
        let mut outcome = InsertOutcome::default();

        for batch in rows.chunks(self.batch_size) {
            let size = batch.len() as u64;
            outcome.attempted += size;
            outcome.batches += 1;

            match self.sink.insert_rows(batch).await {
                Ok(errors) if errors.is_empty() => {
                    outcome.inserted += size;
                }
                Ok(errors) => {
                    let rejected = (errors.len() as u64).min(size);
                    outcome.inserted += size - rejected;
                    outcome.failed += rejected;
                    tracing::warn!(
                        batch_rows = size,
                        rejected,
                        "sink rejected rows in batch"
                    );
                    for error in errors {
                        let row_id = batch.get(error.index).map_or("?", |r| r.row_id.as_str());
                        outcome.push_sample(format!(
                            "row {} ({row_id}): {}",
                            error.index, error.message
                        ));
                    }
                }
                Err(e) => {
                    outcome.failed += size;
                    tracing::warn!(batch_rows = size, error = %e, "sink batch failed");
                    outcome.push_sample(format!("batch of {size} rows: {e}"));
                }
            }
        }

        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use serde_json::json;

    use super::*;
    use crate::normalize::normalize_place;
    use crate::test_support::{FakeSink, SinkReply};
    use crate::types::RawPlace;

    fn rows(n: usize) -> Vec<NormalizedRow> {
        (0..n)
            .map(|i| {
                let place = RawPlace::from_payload(json!({ "place_id": format!("p{i}") }));
                normalize_place("Rotterdam", "bakery", &place, Utc::now()).unwrap()
            })
            .collect()
    }

    #[tokio::test]
    async fn splits_rows_into_bounded_batches() {
        let sink = Arc::new(FakeSink::new());
        let writer = BatchWriter::new(Arc::clone(&sink), 2);

        let outcome = writer.write(&rows(5)).await;

        let sizes: Vec<usize> = sink.batches().iter().map(Vec::len).collect();
        assert_eq!(sizes, vec![2, 2, 1]);
        assert_eq!(outcome.attempted, 5);
        assert_eq!(outcome.inserted, 5);
        assert_eq!(outcome.failed, 0);
        assert_eq!(outcome.batches, 3);
        assert!(outcome.failed_samples.is_empty());
    }

    #[tokio::test]
    async fn row_errors_reduce_inserted_count() {
        let sink = Arc::new(FakeSink::with_replies([SinkReply::RejectIndices(vec![3, 417])]));
        let writer = BatchWriter::new(Arc::clone(&sink), 500);

        let outcome = writer.write(&rows(500)).await;

        assert_eq!(outcome.inserted, 498);
        assert_eq!(outcome.failed, 2);
        assert_eq!(outcome.failed_samples.len(), 2);
        assert!(outcome.failed_samples[0].starts_with("row 3 "));
    }

    #[tokio::test]
    async fn failed_batch_does_not_stop_later_batches() {
        let sink = Arc::new(FakeSink::with_replies([SinkReply::Fail]));
        let writer = BatchWriter::new(Arc::clone(&sink), 3);

        let outcome = writer.write(&rows(6)).await;

        assert_eq!(outcome.failed, 3);
        assert_eq!(outcome.inserted, 3);
        assert_eq!(sink.batches().len(), 2);
        assert_eq!(outcome.failed_samples.len(), 1);
    }

    #[tokio::test]
    async fn samples_are_capped() {
        let sink = Arc::new(FakeSink::with_replies([SinkReply::RejectIndices((0..8).collect())]));
        let writer = BatchWriter::new(Arc::clone(&sink), 10);

        let outcome = writer.write(&rows(10)).await;

        assert_eq!(outcome.failed, 8);
        assert_eq!(outcome.failed_samples.len(), MAX_FAILED_SAMPLES);
    }

    #[tokio::test]
    async fn empty_input_sends_nothing() {
        let sink = Arc::new(FakeSink::new());
        let outcome = BatchWriter::new(Arc::clone(&sink), 10).write(&[]).await;
        assert_eq!(outcome, InsertOutcome::default());
        assert!(sink.batches().is_empty());
    }

    #[test]
    fn merge_keeps_sample_cap() {
        let mut total = InsertOutcome {
            failed_samples: vec!["a".into(), "b".into(), "c".into()],
            ..InsertOutcome::default()
        };
        total.merge(InsertOutcome {
            attempted: 4,
            inserted: 1,
            failed: 3,
            batches: 1,
            failed_samples: vec!["d".into(), "e".into(), "f".into()],
        });
        assert_eq!(total.attempted, 4);
        assert_eq!(total.failed_samples, vec!["a", "b", "c", "d", "e"]);
    }
}
