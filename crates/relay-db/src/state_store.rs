//! SQLite-backed [`CheckpointStore`].
//!
//! Each scope owns a set of rows in `component_state`. [`SqliteStateStore::set`]
//! replaces the scope's rows inside one transaction, so readers always see
//! either the old map or the new one.

use std::collections::HashMap;

use relay_types::{CheckpointStore, Scope, StoreError};
use rusqlite::{params, Connection};

use crate::pool::DbPool;

/// Durable state store on top of the relay database.
#[derive(Clone)]
pub struct SqliteStateStore {
    pool: DbPool,
}

impl SqliteStateStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn with_conn<T>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T, StoreError> {
        let conn = self
            .pool
            .get()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        f(&conn).map_err(|e| StoreError::Backend(e.to_string()))
    }
}

impl std::fmt::Debug for SqliteStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStateStore")
            .field("pool_max_size", &self.pool.max_size())
            .finish()
    }
}

impl CheckpointStore for SqliteStateStore {
    fn get(&self, scope: Scope) -> Result<HashMap<String, String>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT state_key, state_value FROM component_state WHERE scope = ?1",
            )?;
            let rows = stmt.query_map([scope.as_str()], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?;
            let state = rows.collect::<rusqlite::Result<HashMap<_, _>>>()?;
            Ok(state)
        })
    }

    fn set(&self, state: &HashMap<String, String>, scope: Scope) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            tx.execute(
                "DELETE FROM component_state WHERE scope = ?1",
                [scope.as_str()],
            )?;
            {
                let mut insert = tx.prepare(
                    "INSERT INTO component_state (scope, state_key, state_value)
                     VALUES (?1, ?2, ?3)",
                )?;
                for (key, value) in state {
                    insert.execute(params![scope.as_str(), key, value])?;
                }
            }
            tx.commit()
        })?;

        tracing::debug!(scope = scope.as_str(), keys = state.len(), "state map replaced");
        Ok(())
    }
}
