//! Run-wide ceiling on outbound search requests.

use std::sync::atomic::{AtomicU64, Ordering};

/// Hard cap on search requests for one run.
///
/// `used` never exceeds `limit`. Consumption is a single compare-and-swap so
/// concurrent fetchers can share one budget through an `Arc`.
#[derive(Debug)]
pub struct RequestBudget {
    used: AtomicU64,
    limit: u64,
}

impl RequestBudget {
    #[must_use]
    pub fn new(limit: u64) -> Self {
        Self {
            used: AtomicU64::new(0),
            limit,
        }
    }

    /// Claims one request slot. Returns `false`, changing nothing, once the
    /// limit has been reached.
    pub fn try_consume(&self) -> bool {
        self.used
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |used| {
                (used < self.limit).then_some(used + 1)
            })
            .is_ok()
    }

    #[must_use]
    pub fn used(&self) -> u64 {
        self.used.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn limit(&self) -> u64 {
        self.limit
    }

    #[must_use]
    pub fn remaining(&self) -> u64 {
        self.limit.saturating_sub(self.used())
    }

    #[must_use]
    pub fn exhausted(&self) -> bool {
        self.remaining() == 0
    }
}
