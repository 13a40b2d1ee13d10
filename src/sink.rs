//! The synchronized output sink.
//!
//! A [`Sink`] is one logical byte stream that may fan out to several
//! destinations (stdout, a discard sink, files). Every write goes to all of
//! them while the sink's mutex is held, so the bytes of one record are never
//! interleaved with another unit's.
//!
//! [`Sink::finish`] ends every destination once the run is over, writing the
//! trailers of compressed files. A sink dropped unfinished is finished then,
//! with failures only logged.

use std::fmt;
use std::fs::{File, create_dir_all};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::framing::Framing;
use crate::io::compression::{OutputStream, PlainOutput, auto_detect_writer};

/// A configured output destination.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Output {
    Stdout,
    Discard,
    /// A file, compressed according to its extension (`.gz`, `.zst`, ...).
    File(PathBuf),
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Output::Stdout => f.write_str("stdout"),
            Output::Discard => f.write_str("discard"),
            Output::File(path) => write!(f, "{}", path.display()),
        }
    }
}

pub struct Sink {
    inner: Mutex<FanOut>,
}

struct FanOut {
    writers: Vec<Box<dyn OutputStream>>,
    finished: bool,
}

impl FanOut {
    /// Finish every destination, even after one fails; the first failure wins.
    fn finish(&mut self) -> io::Result<()> {
        self.finished = true;
        let mut first = Ok(());
        for w in &mut self.writers {
            if let Err(e) = w.finish()
                && first.is_ok()
            {
                first = Err(e);
            }
        }
        first
    }
}

impl Drop for FanOut {
    fn drop(&mut self) {
        if !self.finished
            && let Err(e) = self.finish()
        {
            tracing::warn!(error = %e, "failed to finish output on drop");
        }
    }
}

impl Write for FanOut {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_all(buf)?;
        Ok(buf.len())
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        for w in &mut self.writers {
            w.write_all(buf)?;
        }
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        for w in &mut self.writers {
            w.flush()?;
        }
        Ok(())
    }
}

impl Sink {
    /// Open every configured destination.
    ///
    /// # Errors
    /// [`Error::Config`] when `outputs` is empty, [`Error::Write`] when a file
    /// cannot be created.
    pub fn open(outputs: &[Output]) -> Result<Self> {
        let writers = outputs
            .iter()
            .map(open_output)
            .collect::<Result<Vec<_>>>()?;
        Self::from_streams(writers)
    }

    /// Build a sink over caller-provided writers.
    ///
    /// # Errors
    /// [`Error::Config`] when `writers` is empty.
    pub fn from_writers(writers: Vec<Box<dyn Write + Send>>) -> Result<Self> {
        Self::from_streams(
            writers
                .into_iter()
                .map(|w| Box::new(PlainOutput::new(w)) as Box<dyn OutputStream>)
                .collect(),
        )
    }

    fn from_streams(writers: Vec<Box<dyn OutputStream>>) -> Result<Self> {
        if writers.is_empty() {
            return Err(Error::Config("Nothing to write to.".into()));
        }
        Ok(Self {
            inner: Mutex::new(FanOut {
                writers,
                finished: false,
            }),
        })
    }

    /// Write one record as a contiguous `separator?`, `body`, `\n` block.
    ///
    /// The completion count is taken while the sink is held, so the record
    /// that lands first is also the one counted first and never gets a
    /// separator. Returns the captured count.
    pub fn write_record(&self, framing: &Framing, body: &[u8]) -> Result<u64> {
        let mut out = self.inner.lock();
        let count = framing.complete();
        if let Some(separator) = framing.separator(count) {
            out.write_all(separator)?;
        }
        out.write_all(body)?;
        out.write_all(b"\n")?;
        Ok(count)
    }

    pub fn write_raw(&self, bytes: &[u8]) -> Result<()> {
        self.inner.lock().write_all(bytes)?;
        Ok(())
    }

    pub fn flush(&self) -> Result<()> {
        self.inner.lock().flush()?;
        Ok(())
    }

    /// End every destination: compressed files get their trailer, buffers are
    /// flushed. Nothing may be written afterwards.
    ///
    /// A sink that is dropped unfinished is finished then, but errors at that
    /// point can only be logged.
    ///
    /// # Errors
    /// [`Error::Write`] with the first destination that failed to finish.
    pub fn finish(&self) -> Result<()> {
        self.inner.lock().finish()?;
        Ok(())
    }

    #[must_use]
    pub fn destinations(&self) -> usize {
        self.inner.lock().writers.len()
    }
}

impl fmt::Debug for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sink")
            .field("destinations", &self.destinations())
            .finish()
    }
}

fn open_output(output: &Output) -> Result<Box<dyn OutputStream>> {
    match output {
        Output::Stdout => Ok(Box::new(PlainOutput::new(BufWriter::new(io::stdout())))),
        Output::Discard => Ok(Box::new(PlainOutput::new(io::sink()))),
        Output::File(path) => {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                create_dir_all(parent)
                    .map_err(|e| Error::Write(format!("mkdir -p {}: {e}", parent.display())))?;
            }
            let f = File::create(path)
                .map_err(|e| Error::Write(format!("create {}: {e}", path.display())))?;
            auto_detect_writer(f, path).map_err(|e| Error::Write(format!("{e:#}")))
        }
    }
}
