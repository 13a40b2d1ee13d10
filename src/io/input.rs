//! Opening the record input stream.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::BufRead;
use std::path::Path;

use crate::io::compression::auto_detect_reader;

/// Open the input: stdin for `None` or `-`, otherwise the named file.
///
/// Compressed input is detected and decompressed in both cases.
///
/// # Errors
/// Returns an error if the file cannot be opened or its codec fails to start.
pub fn open_input(path: Option<&Path>) -> Result<Box<dyn BufRead>> {
    match path {
        None => auto_detect_reader(std::io::stdin(), None).context("open stdin"),
        Some(p) if p.as_os_str() == "-" => {
            auto_detect_reader(std::io::stdin(), None).context("open stdin")
        }
        Some(p) => {
            let f = File::open(p).with_context(|| format!("open {}", p.display()))?;
            auto_detect_reader(f, Some(p))
                .with_context(|| format!("setup decompression for {}", p.display()))
        }
    }
}
