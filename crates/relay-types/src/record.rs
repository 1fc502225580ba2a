//! The self-contained record handed to a [`crate::RecordSink`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::event::EventKind;

/// Attribute carrying the body's media type.
pub const ATTR_CONTENT_TYPE: &str = "content-type";
/// Attribute carrying the event kind name (`APPEND`, `CLOSE`, ...).
pub const ATTR_EVENT_TYPE: &str = "event-type";
/// Attribute carrying the resolved event path.
pub const ATTR_EVENT_PATH: &str = "event-path";
/// Bodies are always JSON.
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// One accepted event, ready for downstream delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmittedRecord {
    pub event_type: EventKind,
    /// Resolved path (source path for renames).
    pub event_path: String,
    /// The serialised event.
    pub body: String,
}

impl EmittedRecord {
    pub fn content_type(&self) -> &'static str {
        CONTENT_TYPE_JSON
    }

    /// Returns the record's attributes keyed by their wire names.
    pub fn attributes(&self) -> BTreeMap<&'static str, String> {
        BTreeMap::from([
            (ATTR_CONTENT_TYPE, CONTENT_TYPE_JSON.to_string()),
            (ATTR_EVENT_TYPE, self.event_type.as_str().to_string()),
            (ATTR_EVENT_PATH, self.event_path.clone()),
        ])
    }
}
