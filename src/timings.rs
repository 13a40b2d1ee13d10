//! Run statistics and optional timing logs.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Outcome of a successful run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Records decoded and handed to a transform unit.
    pub read: u64,
    /// Records written to the sink.
    pub written: u64,
    /// Records dropped because cancellation arrived before their unit started.
    pub skipped: u64,
    /// Highest number of transform units that were in flight at once.
    pub peak_in_flight: usize,
    pub elapsed: Duration,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    read: AtomicU64,
    written: AtomicU64,
    skipped: AtomicU64,
}

impl Counters {
    pub(crate) fn record_read(&self) {
        self.read.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_written(&self) {
        self.written.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_skipped(&self) {
        self.skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn summary(&self, peak_in_flight: usize, elapsed: Duration) -> RunSummary {
        RunSummary {
            read: self.read.load(Ordering::Relaxed),
            written: self.written.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            peak_in_flight,
            elapsed,
        }
    }
}

/// Emits timing lines only when enabled.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Timings {
    enabled: bool,
}

impl Timings {
    pub(crate) fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub(crate) fn waited(&self, record: &str, since: Instant) {
        if self.enabled {
            tracing::info!(record, elapsed = ?since.elapsed(), "Time to wait to process");
        }
    }

    pub(crate) fn processed(&self, record: &str, since: Instant) {
        if self.enabled {
            tracing::info!(record, elapsed = ?since.elapsed(), "Time to complete processing");
        }
    }

    pub(crate) fn finished(&self, summary: &RunSummary) {
        if self.enabled {
            tracing::info!(
                records = summary.written,
                elapsed = ?summary.elapsed,
                "Time to process records"
            );
        }
    }
}
