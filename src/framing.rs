//! Output framing and the completion counter.
//!
//! In [`FramingMode::JsonArray`] the output is a single JSON array: `[` is
//! written before dispatch starts, every element after the first completed one
//! is prefixed with `,`, and exactly one `]` is written after all units have
//! finished. Separator placement follows completion order, not read order.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::Result;
use crate::sink::Sink;

pub const ARRAY_OPEN: &[u8] = b"[";
pub const ARRAY_SEPARATOR: &[u8] = b",";
pub const ARRAY_CLOSE: &[u8] = b"]";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FramingMode {
    /// One record per line, no surrounding syntax.
    #[default]
    Lines,
    /// Records framed as the elements of one JSON array.
    JsonArray,
}

#[derive(Debug, Default)]
pub struct Framing {
    mode: FramingMode,
    completed: AtomicU64,
}

impl Framing {
    #[must_use]
    pub fn new(mode: FramingMode) -> Self {
        Self {
            mode,
            completed: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn mode(&self) -> FramingMode {
        self.mode
    }

    /// Count one more finished record and return the new total.
    pub fn complete(&self) -> u64 {
        self.completed.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Records counted so far.
    #[must_use]
    pub fn completed(&self) -> u64 {
        self.completed.load(Ordering::SeqCst)
    }

    /// Separator to write before the record that was completed as number `count`.
    #[must_use]
    pub fn separator(&self, count: u64) -> Option<&'static [u8]> {
        match self.mode {
            FramingMode::JsonArray if count > 1 => Some(ARRAY_SEPARATOR),
            _ => None,
        }
    }

    pub fn open(&self, sink: &Sink) -> Result<()> {
        if self.mode == FramingMode::JsonArray {
            sink.write_raw(ARRAY_OPEN)?;
        }
        Ok(())
    }

    pub fn close(&self, sink: &Sink) -> Result<()> {
        if self.mode == FramingMode::JsonArray {
            sink.write_raw(ARRAY_CLOSE)?;
        }
        Ok(())
    }
}
