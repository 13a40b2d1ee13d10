//! Fatal error taxonomy for a pipeline run.
//!
//! Every variant ends the run: there is no per-record recovery tier. Workers
//! never terminate the process themselves; they raise the error through
//! [`FatalSlot`] and the caller of [`Pipeline::run`](crate::Pipeline::run)
//! decides what to do with it.

use parking_lot::Mutex;
use thiserror::Error;

use crate::cancel::CancelToken;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Config Error - {0}")]
    Config(String),

    #[error("Failed to read bytes, {0}")]
    Read(String),

    #[error("Failed to decode record on line {line}, {reason}")]
    Decode { line: u64, reason: String },

    #[error("Failed to rewrite record {record}, {reason}")]
    Rewrite { record: String, reason: String },

    #[error("Failed to encode record {record}, {reason}")]
    Encode { record: String, reason: String },

    #[error("Failed to write output, {0}")]
    Write(String),

    #[error("Worker panicked while processing {record}, {reason}")]
    Panicked { record: String, reason: String },
}

impl From<std::io::Error> for Error {
    fn from(value: std::io::Error) -> Self {
        Error::Write(value.to_string())
    }
}

/// Holds the first fatal error raised by any worker or the dispatcher.
///
/// Raising an error also cancels the run so no new work starts.
pub(crate) struct FatalSlot {
    first: Mutex<Option<Error>>,
    cancel: CancelToken,
}

impl FatalSlot {
    pub(crate) fn new(cancel: CancelToken) -> Self {
        Self {
            first: Mutex::new(None),
            cancel,
        }
    }

    pub(crate) fn raise(&self, err: Error) {
        {
            let mut first = self.first.lock();
            if first.is_none() {
                tracing::debug!(error = %err, "fatal error raised");
                *first = Some(err);
            }
        }
        self.cancel.cancel();
    }

    pub(crate) fn take(&self) -> Option<Error> {
        self.first.lock().take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_error_wins_and_cancels() {
        let cancel = CancelToken::new();
        let slot = FatalSlot::new(cancel.clone());

        slot.raise(Error::Read("boom".into()));
        slot.raise(Error::Write("later".into()));

        assert!(cancel.is_cancelled());
        assert_eq!(slot.take(), Some(Error::Read("boom".into())));
        assert_eq!(slot.take(), None);
    }

    #[test]
    fn decode_error_names_the_line() {
        let err = Error::Decode {
            line: 7,
            reason: "expected value".into(),
        };
        assert_eq!(
            err.to_string(),
            "Failed to decode record on line 7, expected value"
        );
    }
}
