//! Shared types, boundary traits, and error definitions for inotify-relay.
//!
//! This crate holds the vocabulary every other crate in the workspace speaks:
//! the closed [`Event`] model for filesystem change notifications, the
//! [`EventBatch`] a poll returns, the durable [`CheckpointPosition`], the
//! [`EmittedRecord`] handed downstream, and the three boundary traits
//! ([`CheckpointStore`], [`EventSource`], [`RecordSink`]) the poll loop is
//! written against.
//!
//! No crate in the workspace depends on anything *except* `relay-types` for
//! cross-cutting type definitions. Concrete adapters (SQLite, HTTP) live in
//! their own crates and implement the traits defined here.

mod boundary;
mod checkpoint;
mod event;
mod record;

pub use boundary::{CheckpointStore, EventSource, RecordSink, SinkError, SourceError, StoreError};
pub use checkpoint::{CheckpointPosition, ParsePositionError, Scope, LAST_TX_ID_KEY};
pub use event::{
    AclEntry, AppendEvent, CloseEvent, CreateEvent, Event, EventBatch, EventKind, INodeType,
    MetadataType, MetadataUpdateEvent, ParseEventKindError, RenameEvent, UnlinkEvent, XAttr,
};
pub use record::{
    EmittedRecord, ATTR_CONTENT_TYPE, ATTR_EVENT_PATH, ATTR_EVENT_TYPE, CONTENT_TYPE_JSON,
};
