//! The per-record transform unit.
//!
//! A unit owns one decoded record, one admission [`Permit`] and one barrier
//! [`Registration`]. Both guards are dropped when the unit returns, whether it
//! wrote its record, skipped it, failed or panicked.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use crate::barrier::Registration;
use crate::cancel::CancelToken;
use crate::error::{Error, FatalSlot, Result};
use crate::framing::Framing;
use crate::pretty;
use crate::record::{Codec, Record, Rewrite};
use crate::sink::Sink;
use crate::throttle::Permit;
use crate::timings::{Counters, Timings};

/// State shared by the dispatcher and every unit of one run.
pub(crate) struct RunContext<C, W> {
    pub(crate) codec: Arc<C>,
    pub(crate) rewrite: Arc<W>,
    pub(crate) sink: Arc<Sink>,
    pub(crate) framing: Framing,
    pub(crate) cancel: CancelToken,
    pub(crate) fatal: FatalSlot,
    pub(crate) counters: Counters,
    pub(crate) timings: Timings,
    pub(crate) pretty_print: bool,
}

pub(crate) fn run<C, W>(
    ctx: Arc<RunContext<C, W>>,
    record: C::Record,
    line: u64,
    permit: Permit,
    registration: Registration,
) where
    C: Codec,
    W: Rewrite<C::Record>,
{
    process(&ctx, record, line);

    // The sink must be released before the dispatcher is told this unit is done.
    drop(ctx);
    drop(permit);
    drop(registration);
}

enum Handled {
    Written,
    Skipped,
}

fn process<C, W>(ctx: &RunContext<C, W>, record: C::Record, line: u64)
where
    C: Codec,
    W: Rewrite<C::Record>,
{
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| handle(ctx, record, line)));
    match outcome {
        Ok(Ok(Handled::Written)) => ctx.counters.record_written(),
        Ok(Ok(Handled::Skipped)) => ctx.counters.record_skipped(),
        Ok(Err(err)) => ctx.fatal.raise(err),
        Err(payload) => ctx.fatal.raise(Error::Panicked {
            record: describe(line, ""),
            reason: panic_message(payload.as_ref()),
        }),
    }
}

fn handle<C, W>(ctx: &RunContext<C, W>, record: C::Record, line: u64) -> Result<Handled>
where
    C: Codec,
    W: Rewrite<C::Record>,
{
    let started = Instant::now();
    let what = describe(line, &record.label());

    if ctx.cancel.is_cancelled() {
        tracing::debug!(record = %what, "skipping record, run cancelled");
        return Ok(Handled::Skipped);
    }

    let result = transform(ctx, record, &what);
    ctx.timings.processed(&what, started);
    result.map(|()| Handled::Written)
}

fn transform<C, W>(ctx: &RunContext<C, W>, mut record: C::Record, what: &str) -> Result<()>
where
    C: Codec,
    W: Rewrite<C::Record>,
{
    ctx.rewrite
        .rewrite(&mut record)
        .map_err(|e| Error::Rewrite {
            record: what.to_string(),
            reason: format!("{e:#}"),
        })?;

    let mut body = ctx.codec.encode(&record).map_err(|e| Error::Encode {
        record: what.to_string(),
        reason: format!("{e:#}"),
    })?;

    if ctx.pretty_print {
        body = pretty::reformat(&body).map_err(|e| Error::Encode {
            record: what.to_string(),
            reason: format!("{e:#}"),
        })?;
    }

    ctx.sink.write_record(&ctx.framing, &body)?;
    Ok(())
}

fn describe(line: u64, label: &str) -> String {
    if label.is_empty() {
        format!("line {line}")
    } else {
        format!("line {line} ({label})")
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
