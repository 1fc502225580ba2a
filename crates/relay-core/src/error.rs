//! Error types for the poll loop.

use relay_types::{CheckpointPosition, EventKind, ParsePositionError, SinkError, SourceError, StoreError};
use thiserror::Error;

/// Failure to turn an event into its JSON body.
#[derive(Debug, Error)]
#[error("failed to serialise {kind} event: {source}")]
pub struct SerializeError {
    pub kind: EventKind,
    #[source]
    pub source: serde_json::Error,
}

/// Errors reading or writing the checkpoint field.
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// The state store call failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The stored value is not a transaction id.
    #[error(transparent)]
    Corrupt(#[from] ParsePositionError),
}

/// Errors that end a cycle without advancing the checkpoint.
///
/// Every variant leaves the persisted position untouched; the next trigger
/// retries from the same place.
#[derive(Debug, Error)]
pub enum CycleError {
    /// The checkpoint could not be read. Processing never starts without a
    /// trustworthy position.
    #[error("unable to retrieve last transaction id: {0}")]
    LoadCheckpoint(#[source] CheckpointError),

    /// The stream could not be opened.
    #[error("unable to open notification stream at {position}: {source}")]
    OpenStream {
        position: CheckpointPosition,
        #[source]
        source: SourceError,
    },

    /// Every poll attempt failed with a transient error.
    #[error("unable to get notification information after {attempts} attempts: {source}")]
    PollExhausted {
        attempts: u32,
        #[source]
        source: SourceError,
    },

    /// The source delivered an event outside the known kinds.
    #[error("unsupported event type: {0}")]
    UnsupportedEvent(String),

    /// The source broke its protocol.
    #[error("notification source failed: {0}")]
    Source(#[source] SourceError),

    #[error(transparent)]
    Serialize(#[from] SerializeError),

    /// The sink rejected a record.
    #[error("unable to emit record: {0}")]
    Sink(#[from] SinkError),
}

impl CycleError {
    /// Maps a non-retryable, non-gap source error onto the cycle error that
    /// reports it.
    pub(crate) fn from_source(source: SourceError) -> Self {
        match source {
            SourceError::UnsupportedEvent(kind) => Self::UnsupportedEvent(kind),
            other => Self::Source(other),
        }
    }
}
