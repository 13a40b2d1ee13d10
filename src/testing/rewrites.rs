//! Instrumented rewrites for exercising the pipeline's concurrency and
//! failure handling.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use anyhow::{Result, bail};
use serde_json::Value;

use crate::record::Rewrite;

/// Tracks how many rewrites run at the same time.
#[derive(Clone, Debug, Default)]
pub struct ConcurrencyGauge {
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
    calls: Arc<AtomicUsize>,
}

impl ConcurrencyGauge {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn enter(&self) {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }

    /// Highest number of rewrites observed in flight together.
    #[must_use]
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

/// Sleeps for a fixed time inside every rewrite and reports to a gauge.
///
/// Records are otherwise left untouched.
#[derive(Clone, Debug)]
pub struct SlowRewrite {
    delay: Duration,
    gauge: ConcurrencyGauge,
}

impl SlowRewrite {
    #[must_use]
    pub fn new(delay: Duration, gauge: ConcurrencyGauge) -> Self {
        Self { delay, gauge }
    }
}

impl<R> Rewrite<R> for SlowRewrite {
    fn rewrite(&self, _record: &mut R) -> Result<()> {
        self.gauge.enter();
        std::thread::sleep(self.delay);
        self.gauge.exit();
        Ok(())
    }
}

/// Fails on any JSON record whose `field` equals `value`.
#[derive(Clone, Debug)]
pub struct FailingRewrite {
    field: String,
    value: Value,
}

impl FailingRewrite {
    #[must_use]
    pub fn when(field: &str, value: Value) -> Self {
        Self {
            field: field.to_string(),
            value,
        }
    }
}

impl Rewrite<Value> for FailingRewrite {
    fn rewrite(&self, record: &mut Value) -> Result<()> {
        if record.get(&self.field) == Some(&self.value) {
            bail!("refusing {}={}", self.field, self.value);
        }
        Ok(())
    }
}

/// Panics on any JSON record whose `field` equals `value`.
#[derive(Clone, Debug)]
pub struct PanickingRewrite {
    field: String,
    value: Value,
}

impl PanickingRewrite {
    #[must_use]
    pub fn when(field: &str, value: Value) -> Self {
        Self {
            field: field.to_string(),
            value,
        }
    }
}

impl Rewrite<Value> for PanickingRewrite {
    fn rewrite(&self, record: &mut Value) -> Result<()> {
        assert!(
            record.get(&self.field) != Some(&self.value),
            "rewrite exploded on {}={}",
            self.field,
            self.value
        );
        Ok(())
    }
}
