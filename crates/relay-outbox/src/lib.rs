//! Outbox for records emitted by the poll loop.
//!
//! Every accepted event becomes a row in the `emitted_records` table, in
//! emission order. Downstream consumers read the outbox with
//! [`query_records`], paging by the monotonically increasing `seq` cursor.
//!
//! The outbox is the reference [`relay_types::RecordSink`]: the loop writes
//! through [`OutboxSink`], which appends one row per record.
//!
//! # Usage
//!
//! ```rust,ignore
//! use relay_outbox::{query_records, RecordFilter};
//!
//! let page = query_records(&conn, &RecordFilter {
//!     after_seq: Some(last_seen),
//!     ..RecordFilter::default()
//! })?;
//! ```

mod error;
mod record;
mod sink;
mod store;

pub use error::OutboxError;
pub use record::OutboxRecord;
pub use sink::OutboxSink;
pub use store::{append_record, query_records, RecordFilter};
