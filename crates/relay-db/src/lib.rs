//! Database layer for inotify-relay.
//!
//! Provides SQLite connection pooling (via `r2d2`), WAL-mode initialization,
//! embedded SQL migrations, and [`SqliteStateStore`], the reference
//! [`relay_types::CheckpointStore`] implementation.
//!
//! # Design decisions
//!
//! - **SQLite with WAL mode**: a single relay instance is the only writer,
//!   and WAL lets the status API read while a cycle writes.
//! - **`r2d2` connection pool**: bounded connection reuse with a checkout
//!   timeout, so no store call blocks indefinitely.
//! - **Embedded migrations**: SQL files are compiled into the binary via
//!   `include_str!` and cannot drift from the code that depends on them.

mod migrations;
mod pool;
mod state_store;

pub use migrations::{run_migrations, MigrationError};
pub use pool::{create_pool, DbPool, DbRuntimeSettings, PoolError};
pub use state_store::SqliteStateStore;
