//! Testing utilities for rewrite pipelines.
//!
//! - **Assertions**: check line and JSON-array framing of captured output
//! - **Input builders**: assemble JSONL input fluently
//! - **Fixtures**: ready-made oEmbed photo records
//! - **Mock I/O**: in-memory and failing writers, temporary files
//! - **Instrumented rewrites**: observe concurrency, inject failures and panics
//!
//! # Quick Start
//!
//! ```
//! use rewrite_stream::oembed::{ObjectUriRewrite, PhotoCodec};
//! use rewrite_stream::testing::*;
//! use rewrite_stream::{CancelToken, Config, Pipeline, Sink};
//! use std::sync::Arc;
//! # fn main() -> anyhow::Result<()> {
//!
//! let input = InputBuilder::new().add_all(&sample_photos()).build();
//! let out = SharedBuffer::new();
//! let sink = Arc::new(Sink::from_writers(vec![Box::new(out.clone())])?);
//!
//! let pipeline = Pipeline::new(
//!     Config::default().with_workers(3).with_emit_array(true),
//!     PhotoCodec::new(),
//!     ObjectUriRewrite::default(),
//! )?;
//! pipeline.run(&input[..], sink, &CancelToken::new())?;
//!
//! let records = assert_json_array(&out.contents_string(), sample_photos().len());
//! assert_eq!(records.len(), 3);
//! # Ok(())
//! # }
//! ```

pub mod assertions;
pub mod builders;
pub mod fixtures;
pub mod mock_io;
pub mod rewrites;

pub use assertions::*;
pub use builders::*;
pub use fixtures::*;
pub use mock_io::*;
pub use rewrites::*;
