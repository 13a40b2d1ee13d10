//! # rewrite-stream
//!
//! A **bounded-concurrency line-stream transformer**. Newline-delimited records
//! are read from an input stream, transformed concurrently by at most `N`
//! workers, and written to one or more outputs as they complete.
//!
//! ## Key Features
//!
//! - **Backpressure** - a fixed-capacity [`Throttle`] bounds in-flight records,
//!   so memory stays flat regardless of input size
//! - **Contiguous output** - the [`Sink`] writes each record as one block,
//!   fanned out to every configured destination
//! - **JSON-array framing** - output stays a valid array even though records
//!   complete out of order
//! - **Pluggable records** - decoding, rewriting and encoding are traits
//!   ([`Codec`], [`Rewrite`]); [`oembed`] ships the object URI rewrite
//! - **Fatal errors without exits** - the first failure cancels the run and is
//!   returned from [`Pipeline::run`]
//! - **Compressed I/O** - gzip, zstd, bzip2 and xz input and file output
//!
//! ## Quick Start
//!
//! ```
//! use rewrite_stream::oembed::{ObjectUriRewrite, PhotoCodec};
//! use rewrite_stream::testing::SharedBuffer;
//! use rewrite_stream::{CancelToken, Config, Pipeline, Sink};
//! use std::sync::Arc;
//! # fn main() -> anyhow::Result<()> {
//!
//! let out = SharedBuffer::new();
//! let sink = Arc::new(Sink::from_writers(vec![Box::new(out.clone())])?);
//! let pipeline = Pipeline::new(
//!     Config::default().with_workers(1),
//!     PhotoCodec::new(),
//!     ObjectUriRewrite::default(),
//! )?;
//!
//! let input = br#"{"url":"https://example.org/a.jpg","object_uri":"https://example.org/objects/42"}"#;
//! let summary = pipeline.run(&input[..], sink, &CancelToken::new())?;
//!
//! assert_eq!(summary.written, 1);
//! assert!(out.contents_string().contains(r#""object_uri":"sfom://id/42""#));
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! 1. The dispatcher in [`pipeline`] reads one line at a time, decodes it and
//!    waits for an admission [`Permit`]
//! 2. It registers the unit with the completion [`WaitGroup`] and spawns it on
//!    the worker pool without waiting for it
//! 3. Each unit rewrites, encodes and writes its record through the [`Sink`]
//! 4. After end of input the dispatcher waits for every unit, then closes the
//!    framing
//!
//! ## Module Overview
//!
//! - [`pipeline`] - dispatcher and run lifecycle
//! - [`throttle`] - admission control
//! - [`barrier`] - completion tracking
//! - [`sink`] / [`framing`] - synchronized output and array framing
//! - [`cancel`] - cooperative cancellation
//! - [`record`] - collaborator traits and the JSON codec
//! - [`oembed`] / [`template`] - the object URI rewrite
//! - [`io`] - input opening and compression
//! - [`testing`] - helpers for testing pipelines

pub mod barrier;
pub mod cancel;
pub mod config;
pub mod error;
pub mod framing;
pub mod io;
pub mod oembed;
pub mod pipeline;
pub mod pretty;
pub mod record;
pub mod sink;
pub mod template;
pub mod testing;
pub mod throttle;
pub mod timings;
mod unit;

pub use barrier::{Registration, WaitGroup};
pub use cancel::CancelToken;
pub use config::Config;
pub use error::{Error, Result};
pub use framing::{Framing, FramingMode};
pub use pipeline::Pipeline;
pub use record::{Codec, Identity, JsonCodec, Record, Rewrite};
pub use sink::{Output, Sink};
pub use throttle::{Permit, Throttle};
pub use timings::RunSummary;
