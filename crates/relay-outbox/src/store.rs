//! Persistence operations for the outbox.
//!
//! All writes go through [`append_record`], which inserts one row and
//! returns it with its assigned `seq`.
//!
//! Reads go through [`query_records`], which supports filtering by event
//! type and path prefix with cursor-based pagination on `seq`.

use relay_types::{EmittedRecord, EventKind};
use rusqlite::{params, Connection};

use crate::error::OutboxError;
use crate::record::OutboxRecord;

/// Appends a single emitted record to the outbox.
///
/// # Errors
///
/// Returns `OutboxError::Database` on SQL failure.
pub fn append_record(conn: &Connection, record: &EmittedRecord) -> Result<OutboxRecord, OutboxError> {
    let event_type = record.event_type.as_str();
    let content_type = record.content_type();

    let (seq, emitted_at) = conn.query_row(
        "INSERT INTO emitted_records (event_type, event_path, content_type, body_json, emitted_at)
         VALUES (?1, ?2, ?3, ?4, datetime('now'))
         RETURNING seq, emitted_at",
        params![event_type, record.event_path, content_type, record.body],
        |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
    )?;

    Ok(OutboxRecord {
        seq,
        event_type: event_type.to_string(),
        event_path: record.event_path.clone(),
        content_type: content_type.to_string(),
        body_json: record.body.clone(),
        emitted_at,
    })
}

/// Filter criteria for querying the outbox.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    /// Filter by event kind.
    pub event_type: Option<EventKind>,
    /// Only records whose path starts with this string.
    pub path_prefix: Option<String>,
    /// Only records with `seq` strictly greater than this cursor.
    pub after_seq: Option<i64>,
    /// Maximum number of records to return (default: 100).
    pub limit: Option<i64>,
}

/// Queries the outbox with optional filters.
///
/// Results are returned in emission order (lowest `seq` first), bounded by
/// `filter.limit` (default 100). Pass the last `seq` seen as
/// `filter.after_seq` to fetch the next page.
///
/// # Errors
///
/// Returns `OutboxError::Database` on SQL failure.
pub fn query_records(
    conn: &Connection,
    filter: &RecordFilter,
) -> Result<Vec<OutboxRecord>, OutboxError> {
    // Collect WHERE clauses and bind parameters separately so nothing is
    // interpolated into the SQL text.
    let mut clauses: Vec<String> = Vec::new();
    let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();
    let mut idx = 1u32;

    if let Some(kind) = filter.event_type {
        clauses.push(format!("event_type = ?{idx}"));
        param_values.push(Box::new(kind.as_str().to_string()));
        idx += 1;
    }

    if let Some(ref prefix) = filter.path_prefix {
        // substr comparison instead of LIKE: paths may contain `%` or `_`.
        clauses.push(format!("substr(event_path, 1, length(?{idx})) = ?{idx}"));
        param_values.push(Box::new(prefix.clone()));
        idx += 1;
    }

    if let Some(after) = filter.after_seq {
        clauses.push(format!("seq > ?{idx}"));
        param_values.push(Box::new(after));
        idx += 1;
    }

    let where_clause = if clauses.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", clauses.join(" AND "))
    };
    let limit = filter.limit.unwrap_or(100);
    let sql = format!(
        "SELECT seq, event_type, event_path, content_type, body_json, emitted_at
         FROM emitted_records
         {where_clause}
         ORDER BY seq ASC
         LIMIT ?{idx}"
    );

    param_values.push(Box::new(limit));

    let params_refs: Vec<&dyn rusqlite::types::ToSql> = param_values.iter().map(|p| &**p).collect();

    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_refs.as_slice(), |row| {
        Ok(OutboxRecord {
            seq: row.get(0)?,
            event_type: row.get(1)?,
            event_path: row.get(2)?,
            content_type: row.get(3)?,
            body_json: row.get(4)?,
            emitted_at: row.get(5)?,
        })
    })?;

    let mut records = Vec::new();
    for row in rows {
        records.push(row?);
    }

    Ok(records)
}
