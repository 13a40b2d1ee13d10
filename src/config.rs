//! Run configuration.

use crate::error::{Error, Result};
use crate::framing::FramingMode;
use crate::sink::Output;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Maximum number of transform units in flight.
    pub workers: usize,
    /// Frame the output as one JSON array.
    pub emit_array: bool,
    /// Re-indent every encoded record.
    pub pretty_print: bool,
    /// Log per-record wait and processing times plus a final summary.
    pub emit_timings: bool,
    /// Destinations every record is written to.
    pub outputs: Vec<Output>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workers: num_cpus::get().max(1),
            emit_array: false,
            pretty_print: false,
            emit_timings: false,
            outputs: vec![Output::Stdout],
        }
    }
}

impl Config {
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    #[must_use]
    pub fn with_emit_array(mut self, emit_array: bool) -> Self {
        self.emit_array = emit_array;
        self
    }

    #[must_use]
    pub fn with_pretty_print(mut self, pretty_print: bool) -> Self {
        self.pretty_print = pretty_print;
        self
    }

    #[must_use]
    pub fn with_emit_timings(mut self, emit_timings: bool) -> Self {
        self.emit_timings = emit_timings;
        self
    }

    #[must_use]
    pub fn with_outputs(mut self, outputs: Vec<Output>) -> Self {
        self.outputs = outputs;
        self
    }

    #[must_use]
    pub fn framing_mode(&self) -> FramingMode {
        if self.emit_array {
            FramingMode::JsonArray
        } else {
            FramingMode::Lines
        }
    }

    /// # Errors
    /// [`Error::Config`] for zero workers or when no output is configured.
    pub fn validate(&self) -> Result<()> {
        if self.workers == 0 {
            return Err(Error::Config("workers must be at least 1".into()));
        }
        if self.outputs.is_empty() {
            return Err(Error::Config("Nothing to write to.".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_use_every_cpu_and_stdout() {
        let config = Config::default();
        assert!(config.workers >= 1);
        assert_eq!(config.outputs, vec![Output::Stdout]);
        assert_eq!(config.framing_mode(), FramingMode::Lines);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_workers_is_invalid() {
        let err = Config::default().with_workers(0).validate().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn emit_array_selects_array_framing() {
        let config = Config::default().with_emit_array(true);
        assert_eq!(config.framing_mode(), FramingMode::JsonArray);
    }
}
