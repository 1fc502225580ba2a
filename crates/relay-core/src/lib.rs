//! Core poll loop for inotify-relay.
//!
//! Consumes an ordered change-notification log through an
//! [`relay_types::EventSource`], keeps the events that pass a
//! [`FilterConfig`], hands each one to a [`relay_types::RecordSink`] as an
//! [`relay_types::EmittedRecord`], and checkpoints the log position in a
//! [`relay_types::CheckpointStore`].
//!
//! # Delivery
//!
//! At-least-once. A record can be emitted twice when the checkpoint write
//! after a successful emit fails (or the process dies before it). A history
//! gap upstream is recovered by resetting to the current tip, which drops
//! the events in the gap.
//!
//! # Deployment precondition
//!
//! The checkpoint write is a read-modify-write of the whole state map, not a
//! compare-and-swap. Only one instance may run cycles against a given store
//! at a time; that has to be enforced outside this crate.

mod checkpoint;
mod error;
mod filter;
mod poll_loop;
mod retry;
mod serializer;
mod sink;

pub use checkpoint::{load_position, persist_position};
pub use error::{CheckpointError, CycleError, SerializeError};
pub use filter::{allow_list, validate_event_types, FilterConfig, DEFAULT_EVENT_TYPES};
pub use poll_loop::{Advance, CycleReport, LoopSettings, PollLoop, StepOutcome};
pub use retry::{poll_with_retry, PollResult, DEFAULT_POLL_ATTEMPTS};
pub use serializer::{serialize_event, to_record};
pub use sink::JsonLinesSink;
