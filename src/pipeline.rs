//! The dispatcher: reads records and fans them out to transform units.
//!
//! ```no_run
//! use rewrite_stream::oembed::{ObjectUriRewrite, PhotoCodec};
//! use rewrite_stream::{CancelToken, Config, Pipeline, Sink};
//! use std::sync::Arc;
//! # fn main() -> anyhow::Result<()> {
//!
//! let config = Config::default().with_workers(4).with_emit_array(true);
//! let sink = Arc::new(Sink::open(&config.outputs)?);
//! let pipeline = Pipeline::new(config, PhotoCodec::new(), ObjectUriRewrite::default())?;
//!
//! let input = std::io::stdin().lock();
//! let summary = pipeline.run(input, sink, &CancelToken::new())?;
//! eprintln!("{} records", summary.written);
//! # Ok(())
//! # }
//! ```

use std::io::BufRead;
use std::sync::Arc;
use std::time::Instant;

use crate::barrier::WaitGroup;
use crate::cancel::CancelToken;
use crate::config::Config;
use crate::error::{Error, FatalSlot, Result};
use crate::framing::Framing;
use crate::record::{Codec, Record, Rewrite};
use crate::sink::Sink;
use crate::throttle::Throttle;
use crate::timings::{Counters, RunSummary, Timings};
use crate::unit::{self, RunContext};

pub struct Pipeline<C, W> {
    config: Config,
    codec: Arc<C>,
    rewrite: Arc<W>,
    pool: rayon::ThreadPool,
}

impl<C, W> Pipeline<C, W>
where
    C: Codec,
    W: Rewrite<C::Record>,
{
    /// Validate `config` and start a pool of `config.workers` threads.
    ///
    /// # Errors
    /// [`Error::Config`] for an invalid configuration or when the pool
    /// cannot be built.
    pub fn new(config: Config, codec: C, rewrite: W) -> Result<Self> {
        config.validate()?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .thread_name(|i| format!("transform-{i}"))
            .panic_handler(|payload| {
                tracing::error!(
                    reason = %unit::panic_message(payload.as_ref()),
                    "transform worker panicked outside a unit"
                );
            })
            .build()
            .map_err(|e| Error::Config(format!("build worker pool: {e}")))?;
        Ok(Self {
            config,
            codec: Arc::new(codec),
            rewrite: Arc::new(rewrite),
            pool,
        })
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Transform every record of `input` into `sink`.
    ///
    /// Returns once every dispatched unit has finished. On success the sink is
    /// [finished](Sink::finish) and takes no further writes. Cancelling `cancel`
    /// stops new records from being read or started; records already being
    /// transformed still complete and the array framing is still closed.
    ///
    /// # Errors
    /// The first fatal error raised by the dispatcher or any unit. No more
    /// records are dispatched after it and the closing bracket is not
    /// written; records already written stay in the sink.
    pub fn run<R: BufRead>(
        &self,
        mut input: R,
        sink: Arc<Sink>,
        cancel: &CancelToken,
    ) -> Result<RunSummary> {
        let started = Instant::now();
        let cancel = cancel.child();
        let ctx = Arc::new(RunContext {
            codec: Arc::clone(&self.codec),
            rewrite: Arc::clone(&self.rewrite),
            sink,
            framing: Framing::new(self.config.framing_mode()),
            cancel: cancel.clone(),
            fatal: FatalSlot::new(cancel.clone()),
            counters: Counters::default(),
            timings: Timings::new(self.config.emit_timings),
            pretty_print: self.config.pretty_print,
        });
        let throttle = Throttle::new(self.config.workers, &cancel);
        let group = WaitGroup::new();

        ctx.framing.open(&ctx.sink)?;

        if let Err(err) = self.dispatch(&mut input, &ctx, &throttle, &group) {
            ctx.fatal.raise(err);
        }

        group.wait();

        if let Some(err) = ctx.fatal.take() {
            return Err(err);
        }

        ctx.framing.close(&ctx.sink)?;
        ctx.sink.finish()?;

        let summary = ctx.counters.summary(throttle.peak(), started.elapsed());
        ctx.timings.finished(&summary);
        Ok(summary)
    }

    fn dispatch<R: BufRead>(
        &self,
        input: &mut R,
        ctx: &Arc<RunContext<C, W>>,
        throttle: &Arc<Throttle>,
        group: &Arc<WaitGroup>,
    ) -> Result<()> {
        let mut buf = Vec::new();
        let mut line: u64 = 0;

        loop {
            if ctx.cancel.is_cancelled() {
                tracing::debug!(line, "dispatch cancelled");
                return Ok(());
            }

            buf.clear();
            let n = input
                .read_until(b'\n', &mut buf)
                .map_err(|e| Error::Read(e.to_string()))?;
            if n == 0 {
                return Ok(());
            }
            line += 1;

            let body = buf.trim_ascii();
            if body.is_empty() {
                continue;
            }

            let record = self.codec.decode(body).map_err(|e| Error::Decode {
                line,
                reason: format!("{e:#}"),
            })?;

            let waiting = Instant::now();
            let Some(permit) = throttle.acquire(&ctx.cancel) else {
                tracing::debug!(line, "admission cancelled");
                return Ok(());
            };
            ctx.timings.waited(&record.label(), waiting);
            ctx.counters.record_read();

            let registration = group.register();
            let unit_ctx = Arc::clone(ctx);
            self.pool
                .spawn(move || unit::run(unit_ctx, record, line, permit, registration));
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;
    use crate::record::{Identity, JsonCodec};
    use crate::testing::{InputBuilder, SharedBuffer};

    #[test]
    fn repeated_runs_leave_no_hooks_on_the_callers_token() -> anyhow::Result<()> {
        let pipeline = Pipeline::new(
            Config::default().with_workers(2).with_emit_array(true),
            JsonCodec::<Value>::new(),
            Identity,
        )?;
        let shutdown = CancelToken::new();
        let input = InputBuilder::new()
            .add_json(&json!({ "n": 1 }))
            .add_json(&json!({ "n": 2 }))
            .build();

        for _ in 0..200 {
            let sink = Arc::new(Sink::from_writers(vec![Box::new(SharedBuffer::new())])?);
            pipeline.run(&input[..], sink, &shutdown)?;
        }
        assert_eq!(shutdown.registered_wakers(), 0);

        let failing = InputBuilder::new().add_raw("nope").build();
        for _ in 0..10 {
            let sink = Arc::new(Sink::from_writers(vec![Box::new(SharedBuffer::new())])?);
            assert!(pipeline.run(&failing[..], sink, &shutdown).is_err());
        }
        assert_eq!(shutdown.registered_wakers(), 0);
        assert!(!shutdown.is_cancelled());
        Ok(())
    }
}
