use std::collections::HashMap;

use relay_db::{create_pool, run_migrations, DbRuntimeSettings, SqliteStateStore};
use relay_types::{CheckpointStore, Scope};

#[test]
fn db_initialization_works() {
    let pool = create_pool(
        ":memory:",
        DbRuntimeSettings {
            pool_max_size: 1,
            ..DbRuntimeSettings::default()
        },
    )
    .expect("failed to create pool");
    let conn = pool.get().expect("failed to get connection");
    let applied = run_migrations(&conn).expect("failed to run migrations");
    assert_eq!(applied, 3);

    let mut stmt = conn
        .prepare(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .expect("failed to prepare table query");
    let tables: Vec<String> = stmt
        .query_map([], |row| row.get(0))
        .expect("failed to execute table query")
        .map(|r| r.expect("failed to read table name"))
        .collect();

    assert_eq!(
        tables,
        vec!["_relay_migrations", "component_state", "emitted_records"]
    );
}

#[test]
fn state_survives_reopening_the_database() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let path = dir.path().join("relay.db");
    let path = path.to_str().expect("temp path should be utf-8");

    {
        let pool = create_pool(path, DbRuntimeSettings::default()).expect("first pool");
        run_migrations(&pool.get().expect("conn")).expect("migrations");
        let store = SqliteStateStore::new(pool);
        let state = HashMap::from([("last.tx.id".to_string(), "512".to_string())]);
        store.set(&state, Scope::Cluster).expect("set should succeed");
    }

    let pool = create_pool(path, DbRuntimeSettings::default()).expect("second pool");
    let applied = run_migrations(&pool.get().expect("conn")).expect("migrations");
    assert_eq!(applied, 0, "schema already present");

    let store = SqliteStateStore::new(pool);
    let state = store.get(Scope::Cluster).expect("get should succeed");
    assert_eq!(state.get("last.tx.id").map(String::as_str), Some("512"));
}
