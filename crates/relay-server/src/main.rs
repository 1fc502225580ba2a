//! inotify-relay binary.
//!
//! Loads configuration, prepares the database, starts the poll task and the
//! status API, and shuts down gracefully on SIGTERM/SIGINT.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use relay_core::{JsonLinesSink, PollLoop};
use relay_db::SqliteStateStore;
use relay_outbox::OutboxSink;
use relay_server::config::{self, SinkKind};
use relay_server::scheduler::{start_poll_task, Schedule};
use relay_server::{app, AppState};
use relay_source::HttpEventSource;
use relay_types::RecordSink;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("RELAY_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

#[tokio::main]
async fn main() {
    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().or(Some("config.toml"));

    // Load configuration
    let config = config::load_config(selected_config_path)
        .expect("failed to load configuration; the relay cannot start without valid config");

    // Initialize tracing
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        "resolved startup configuration path"
    );

    config
        .validate()
        .expect("invalid configuration; fix the reported setting and restart");

    // Initialize database
    let pool = relay_db::create_pool(&config.database.path, config.db_settings())
        .expect("failed to create database pool; check database.path in config");

    {
        let conn = pool
            .get()
            .expect("failed to get database connection for migrations");
        let applied = relay_db::run_migrations(&conn).expect("failed to run database migrations");
        if applied > 0 {
            tracing::info!(count = applied, "applied database migrations");
        }
    }

    // Build the poll loop. The blocking HTTP client is created off the
    // async workers.
    let source_settings = config.source_settings();
    let source = tokio::task::spawn_blocking(move || HttpEventSource::new(source_settings))
        .await
        .expect("source construction task panicked")
        .expect("failed to build notification source; check source.base_url in config");

    let sink: Box<dyn RecordSink + Send> = match config.sink.kind {
        SinkKind::Outbox => Box::new(OutboxSink::new(pool.clone())),
        SinkKind::Stdout => Box::new(JsonLinesSink::stdout()),
    };

    let relay = PollLoop::new(
        source,
        sink,
        SqliteStateStore::new(pool.clone()),
        config.loop_settings(),
    );

    let state = Arc::new(AppState::new(pool));
    let schedule = Schedule {
        interval: Duration::from_millis(config.poll.interval_ms),
        yield_after_failure: Duration::from_millis(config.poll.yield_ms),
    };

    tracing::info!(
        source = %config.source.base_url,
        watch_path = %config.watch.path,
        recursive = config.watch.recursive,
        event_types = %config.watch.event_types,
        sink = ?config.sink.kind,
        "starting poll loop"
    );
    let poll_task = tokio::spawn(start_poll_task(state.clone(), relay, schedule));

    // Build application
    let app = app(state);
    let addr = SocketAddr::new(config.server.host, config.server.port);

    tracing::info!(%addr, "starting status server");

    let listener = TcpListener::bind(addr)
        .await
        .expect("failed to bind to address; is another process using this port?");

    // Serve with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    // No further cycles are triggered; the last persisted checkpoint is the
    // resume point.
    poll_task.abort();
    tracing::info!("inotify-relay shut down");
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
    }
}
