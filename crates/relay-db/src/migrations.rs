//! Schema migrations for the relay database.
//!
//! Applied names are recorded in `_relay_migrations`; startup applies
//! whatever is missing, in list order, each in its own transaction.

use std::collections::HashSet;

use rusqlite::Connection;
use thiserror::Error;

struct Migration {
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        name: "000_init",
        sql: include_str!("migrations/000_init.sql"),
    },
    Migration {
        name: "001_component_state",
        sql: include_str!("migrations/001_component_state.sql"),
    },
    Migration {
        name: "002_emitted_records",
        sql: include_str!("migrations/002_emitted_records.sql"),
    },
];

const TRACKING_TABLE: &str = "CREATE TABLE IF NOT EXISTS _relay_migrations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);";

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("migration '{name}' failed: {source}")]
    ExecutionFailed {
        name: String,
        source: rusqlite::Error,
    },

    #[error("failed to read applied migrations: {0}")]
    StateQuery(rusqlite::Error),
}

/// Brings the schema up to date. Returns the number of migrations applied.
///
/// # Errors
///
/// Returns `MigrationError` if the tracking table cannot be read or a
/// migration fails. A failed migration leaves no partial schema behind.
pub fn run_migrations(conn: &Connection) -> Result<usize, MigrationError> {
    apply(conn, MIGRATIONS)
}

fn applied_names(conn: &Connection) -> Result<HashSet<String>, MigrationError> {
    conn.execute_batch(TRACKING_TABLE)
        .map_err(MigrationError::StateQuery)?;
    let mut stmt = conn
        .prepare("SELECT name FROM _relay_migrations")
        .map_err(MigrationError::StateQuery)?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(MigrationError::StateQuery)?
        .collect::<Result<HashSet<_>, _>>()
        .map_err(MigrationError::StateQuery)?;
    Ok(names)
}

fn apply(conn: &Connection, migrations: &[Migration]) -> Result<usize, MigrationError> {
    let done = applied_names(conn)?;
    let pending: Vec<&Migration> = migrations
        .iter()
        .filter(|m| !done.contains(m.name))
        .collect();

    for migration in &pending {
        tracing::info!(migration = migration.name, "applying migration");
        let failed = |source| MigrationError::ExecutionFailed {
            name: migration.name.to_string(),
            source,
        };

        let tx = conn.unchecked_transaction().map_err(failed)?;
        tx.execute_batch(migration.sql).map_err(failed)?;
        tx.execute(
            "INSERT INTO _relay_migrations (name) VALUES (?1)",
            [migration.name],
        )
        .map_err(failed)?;
        tx.commit().map_err(failed)?;
    }

    if pending.is_empty() {
        tracing::debug!("relay schema is current");
    }
    Ok(pending.len())
}
