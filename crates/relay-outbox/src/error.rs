//! Error types for the outbox.

/// Errors that can occur during outbox operations.
#[derive(Debug, thiserror::Error)]
pub enum OutboxError {
    /// A database operation failed.
    #[error("outbox database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// No pooled connection became available in time.
    #[error("outbox connection unavailable: {0}")]
    Pool(#[from] r2d2::Error),
}
