//! Event to record serialisation.

use relay_types::{EmittedRecord, Event};

use crate::error::SerializeError;

/// Serialises an event to its canonical JSON form.
///
/// The output mirrors the event's native field set with an `eventType` tag;
/// nothing is dropped, added, or renamed.
///
/// # Errors
///
/// Returns `SerializeError` if JSON encoding fails.
pub fn serialize_event(event: &Event) -> Result<String, SerializeError> {
    serde_json::to_string(event).map_err(|source| SerializeError {
        kind: event.kind(),
        source,
    })
}

/// Builds the downstream record for an accepted event.
pub fn to_record(event: &Event) -> Result<EmittedRecord, SerializeError> {
    Ok(EmittedRecord {
        event_type: event.kind(),
        event_path: event.path().to_string(),
        body: serialize_event(event)?,
    })
}
