//! Traits for the collaborators the poll loop consumes but does not own.
//!
//! All three are synchronous: every call either completes or fails within a
//! caller-supplied bound (poll duration, store busy timeout, HTTP timeout).
//! Async callers run cycles on a blocking thread.

use std::collections::HashMap;
use std::time::Duration;

use thiserror::Error;

use crate::checkpoint::{CheckpointPosition, Scope};
use crate::event::EventBatch;
use crate::record::EmittedRecord;

/// Errors raised by a [`CheckpointStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not be reached (pool exhausted, connection refused).
    #[error("state store unavailable: {0}")]
    Unavailable(String),

    /// The store was reached but the operation failed.
    #[error("state store operation failed: {0}")]
    Backend(String),
}

/// Errors raised by an [`EventSource`].
#[derive(Debug, Error)]
pub enum SourceError {
    /// A transient I/O failure. Polls that fail this way may be retried.
    #[error("transient source failure: {0}")]
    Transient(String),

    /// The history at the requested resume position has been pruned and
    /// cannot be replayed.
    #[error("notification history gap: {0}")]
    Gap(String),

    /// The source delivered an event of a kind outside the known set.
    #[error("unsupported event type from source: {0}")]
    UnsupportedEvent(String),

    /// The source answered with something that does not follow its protocol.
    #[error("source protocol error: {0}")]
    Protocol(String),
}

impl SourceError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

/// Errors raised by a [`RecordSink`].
#[derive(Debug, Error)]
pub enum SinkError {
    /// Writing to the underlying stream failed.
    #[error("sink write failed: {0}")]
    Io(#[from] std::io::Error),

    /// The sink's backing service rejected the record.
    #[error("sink backend failed: {0}")]
    Backend(String),
}

/// Durable string-keyed state, shared by every instance in a cluster.
///
/// `set` replaces the whole mapping for the scope; callers that only want to
/// change one key must read, modify, and write the full map back. This is
/// not a compare-and-swap: a single active writer is assumed.
pub trait CheckpointStore {
    /// Returns the full state map for `scope`. An empty map means nothing
    /// has been stored yet.
    fn get(&self, scope: Scope) -> Result<HashMap<String, String>, StoreError>;

    /// Replaces the full state map for `scope`.
    fn set(&self, state: &HashMap<String, String>, scope: Scope) -> Result<(), StoreError>;
}

/// An ordered change-notification log.
pub trait EventSource {
    /// Handle for a stream opened at a position.
    type Stream;

    /// Opens a stream. [`CheckpointPosition::Tip`] opens at the current tip;
    /// otherwise the stream yields events strictly after the position.
    fn open_stream(&mut self, position: CheckpointPosition) -> Result<Self::Stream, SourceError>;

    /// Blocks for at most `timeout` waiting for the next batch. `Ok(None)`
    /// means the wait elapsed with nothing ready.
    fn poll(
        &mut self,
        stream: &mut Self::Stream,
        timeout: Duration,
    ) -> Result<Option<EventBatch>, SourceError>;
}

/// Downstream destination for accepted events.
pub trait RecordSink {
    fn emit(&mut self, record: &EmittedRecord) -> Result<(), SinkError>;
}

impl<T: RecordSink + ?Sized> RecordSink for Box<T> {
    fn emit(&mut self, record: &EmittedRecord) -> Result<(), SinkError> {
        (**self).emit(record)
    }
}
