//! Seams for the per-record collaborators.
//!
//! The pipeline only moves records around. Turning a line into a record
//! ([`Codec::decode`]), changing it ([`Rewrite::rewrite`]) and turning it back
//! into bytes ([`Codec::encode`]) are plugged in through these traits. Any
//! error they return is fatal for the whole run.

use std::borrow::Cow;
use std::marker::PhantomData;

use anyhow::Result;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// A decoded record, owned by exactly one transform unit at a time.
pub trait Record: Send + 'static {
    /// Short human-readable identifier used in timing logs.
    fn label(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }
}

impl Record for serde_json::Value {}

pub trait Codec: Send + Sync + 'static {
    type Record: Record;

    /// Decode one trimmed, non-empty input line.
    fn decode(&self, line: &[u8]) -> Result<Self::Record>;

    fn encode(&self, record: &Self::Record) -> Result<Vec<u8>>;
}

/// In-place, per-record rewrite step.
pub trait Rewrite<R>: Send + Sync + 'static {
    fn rewrite(&self, record: &mut R) -> Result<()>;
}

/// Rewrite that leaves records untouched.
#[derive(Clone, Copy, Debug, Default)]
pub struct Identity;

impl<R> Rewrite<R> for Identity {
    fn rewrite(&self, _record: &mut R) -> Result<()> {
        Ok(())
    }
}

impl<R, F> Rewrite<R> for F
where
    F: Fn(&mut R) -> Result<()> + Send + Sync + 'static,
{
    fn rewrite(&self, record: &mut R) -> Result<()> {
        self(record)
    }
}

/// Compact JSON codec for any Serde type.
pub struct JsonCodec<T> {
    _marker: PhantomData<fn() -> T>,
}

impl<T> JsonCodec<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for JsonCodec<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for JsonCodec<T> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<T> Codec for JsonCodec<T>
where
    T: Record + Serialize + DeserializeOwned,
{
    type Record = T;

    fn decode(&self, line: &[u8]) -> Result<T> {
        Ok(serde_json::from_slice(line)?)
    }

    fn encode(&self, record: &T) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(record)?)
    }
}
