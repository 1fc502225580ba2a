//! Status and outbox API handlers.
//!
//! Provides:
//! - `GET /api/status`: the poll loop's latest cycle status
//! - `GET /api/records`: paginated outbox retrieval with filtering

use std::sync::Arc;

use axum::{
    extract::{Extension, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use relay_outbox::{query_records, OutboxRecord, RecordFilter};
use relay_types::EventKind;
use serde::{Deserialize, Serialize};

use crate::status::CycleStatus;
use crate::AppState;

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

/// Handler for `GET /api/status`.
pub async fn get_status_handler(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<CycleStatus>, Response> {
    let status = state
        .status
        .read()
        .map_err(|_| {
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "cycle status lock poisoned".to_string(),
            )
        })?
        .clone();
    Ok(Json(status))
}

/// Query parameters for `GET /api/records`.
#[derive(Debug, Deserialize)]
pub struct RecordsQuery {
    /// Filter by event kind (e.g., `CREATE`, case-insensitive).
    pub event_type: Option<String>,
    /// Only records whose path starts with this string.
    pub path_prefix: Option<String>,
    /// Return records after this cursor.
    pub after_seq: Option<i64>,
    /// Maximum number of records to return (default: 100, max: 1000).
    pub limit: Option<i64>,
}

/// One outbox row with its body decoded.
#[derive(Debug, Serialize)]
pub struct RecordView {
    pub seq: i64,
    pub event_type: String,
    pub event_path: String,
    pub content_type: String,
    pub emitted_at: String,
    pub body: serde_json::Value,
}

impl From<OutboxRecord> for RecordView {
    fn from(record: OutboxRecord) -> Self {
        let body = record
            .body()
            .unwrap_or_else(|_| serde_json::Value::String(record.body_json.clone()));
        Self {
            seq: record.seq,
            event_type: record.event_type,
            event_path: record.event_path,
            content_type: record.content_type,
            emitted_at: record.emitted_at,
            body,
        }
    }
}

/// Response wrapper for paginated outbox retrieval.
#[derive(Debug, Serialize)]
pub struct RecordsResponse {
    /// The matching records in emission order.
    pub records: Vec<RecordView>,
    /// The number of records returned.
    pub count: usize,
    /// Cursor for the next page, if any records were returned.
    pub next_after_seq: Option<i64>,
}

/// Handler for `GET /api/records`.
pub async fn get_records_handler(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<RecordsQuery>,
) -> Result<Json<RecordsResponse>, Response> {
    let pool = state.pool.clone();

    let event_type = match &params.event_type {
        Some(t) => {
            let parsed: EventKind = t.parse().map_err(|e: relay_types::ParseEventKindError| {
                error_response(StatusCode::BAD_REQUEST, e.to_string())
            })?;
            Some(parsed)
        }
        None => None,
    };

    let limit = params.limit.unwrap_or(100).clamp(1, 1000);

    let filter = RecordFilter {
        event_type,
        path_prefix: params.path_prefix,
        after_seq: params.after_seq,
        limit: Some(limit),
    };

    let records = tokio::task::spawn_blocking(move || {
        let conn = pool.get().map_err(|e| e.to_string())?;
        query_records(&conn, &filter).map_err(|e| e.to_string())
    })
    .await
    .map_err(|e| {
        error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("task join error: {e}"),
        )
    })?
    .map_err(|e| error_response(StatusCode::INTERNAL_SERVER_ERROR, e))?;

    let next_after_seq = records.last().map(|r| r.seq);
    let records: Vec<RecordView> = records.into_iter().map(RecordView::from).collect();
    let count = records.len();
    Ok(Json(RecordsResponse {
        records,
        count,
        next_after_seq,
    }))
}
