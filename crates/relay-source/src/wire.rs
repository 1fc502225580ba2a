//! Gateway response bodies.

use relay_types::{Event, EventBatch, EventKind, SourceError};
use serde::Deserialize;

/// Body of `GET /v1/inotify/tip`.
#[derive(Debug, Deserialize)]
pub(crate) struct TipResponse {
    pub txid: i64,
}

/// Body of a `200` from `GET /v1/inotify/events`. Events stay raw until
/// their tag has been checked.
#[derive(Debug, Deserialize)]
struct BatchResponse {
    txid: i64,
    #[serde(default)]
    events: Vec<serde_json::Value>,
}

pub(crate) fn decode_tip(body: &[u8]) -> Result<i64, SourceError> {
    serde_json::from_slice::<TipResponse>(body)
        .map(|tip| tip.txid)
        .map_err(|e| SourceError::Protocol(format!("malformed tip response: {e}")))
}

/// Decodes a batch body.
///
/// An event whose `eventType` names none of the six kinds is reported as
/// [`SourceError::UnsupportedEvent`] so the caller can fail the cycle on
/// the contract violation instead of treating it as a garbled response.
pub(crate) fn decode_batch(body: &[u8]) -> Result<EventBatch, SourceError> {
    let raw: BatchResponse = serde_json::from_slice(body)
        .map_err(|e| SourceError::Protocol(format!("malformed batch response: {e}")))?;

    let mut events = Vec::with_capacity(raw.events.len());
    for value in raw.events {
        let tag = value
            .get("eventType")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| SourceError::Protocol("event without an eventType tag".to_string()))?;
        if !EventKind::ALL.iter().any(|kind| kind.as_str() == tag) {
            return Err(SourceError::UnsupportedEvent(tag));
        }
        let event: Event = serde_json::from_value(value)
            .map_err(|e| SourceError::Protocol(format!("malformed {tag} event: {e}")))?;
        events.push(event);
    }

    Ok(EventBatch::new(raw.txid, events))
}
