//! [`RecordSink`] that appends to the outbox table.

use relay_db::DbPool;
use relay_types::{EmittedRecord, RecordSink, SinkError};

use crate::error::OutboxError;
use crate::store::append_record;

/// Writes each emitted record as one outbox row.
#[derive(Clone)]
pub struct OutboxSink {
    pool: DbPool,
}

impl OutboxSink {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl RecordSink for OutboxSink {
    fn emit(&mut self, record: &EmittedRecord) -> Result<(), SinkError> {
        let row = self
            .pool
            .get()
            .map_err(OutboxError::from)
            .and_then(|conn| append_record(&conn, record))
            .map_err(|e| SinkError::Backend(e.to_string()))?;
        tracing::trace!(seq = row.seq, event_type = %row.event_type, "record appended to outbox");
        Ok(())
    }
}
