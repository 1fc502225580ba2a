//! Row type for the `emitted_records` table.

use serde::{Deserialize, Serialize};

/// A single row from the `emitted_records` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboxRecord {
    /// Emission order cursor; strictly increasing.
    pub seq: i64,
    /// The event kind name (e.g., `CREATE`).
    pub event_type: String,
    /// The resolved event path.
    pub event_path: String,
    /// Media type of `body_json`; always `application/json`.
    pub content_type: String,
    /// The serialised event.
    pub body_json: String,
    /// ISO 8601 timestamp of when the record was written.
    pub emitted_at: String,
}

impl OutboxRecord {
    /// Parses the stored body back into a JSON value.
    pub fn body(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::from_str(&self.body_json)
    }
}
