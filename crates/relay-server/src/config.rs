//! Relay configuration loading from file and environment variables.

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use relay_core::{validate_event_types, FilterConfig, LoopSettings, DEFAULT_EVENT_TYPES};
use relay_db::DbRuntimeSettings;
use relay_source::SourceSettings;
use serde::Deserialize;
use thiserror::Error;

/// Top-level relay configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Status API network settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Notification gateway settings.
    #[serde(default)]
    pub source: SourceConfig,

    /// Which events to relay.
    #[serde(default)]
    pub watch: WatchConfig,

    /// Cycle timing.
    #[serde(default)]
    pub poll: PollConfig,

    /// Where accepted events go.
    #[serde(default)]
    pub sink: SinkConfig,
}

/// Network configuration for the status API.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file holding the checkpoint and outbox.
    #[serde(default = "default_db_path")]
    pub path: String,

    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    #[serde(default = "default_pool_max_size")]
    pub pool_max_size: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "relay_core=debug,info").
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Whether to output logs in JSON format.
    #[serde(default)]
    pub json: bool,
}

/// Notification gateway configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// Gateway root URL.
    #[serde(default = "default_source_url")]
    pub base_url: String,

    /// Slack added to the poll duration for the HTTP timeout, in milliseconds.
    #[serde(default = "default_grace_ms")]
    pub grace_ms: u64,
}

/// Event filter configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchConfig {
    /// Root of the subtree to relay events for. Required.
    #[serde(default)]
    pub path: String,

    /// Prefix match when true, exact match when false.
    #[serde(default = "default_true")]
    pub recursive: bool,

    /// Comma-separated allow-list of event kinds.
    #[serde(default = "default_event_types")]
    pub event_types: String,
}

/// Cycle timing configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PollConfig {
    /// Upper bound on each poll of the gateway, in milliseconds.
    #[serde(default = "default_poll_duration_ms")]
    pub duration_ms: u64,

    /// Pause between successful cycles, in milliseconds.
    #[serde(default)]
    pub interval_ms: u64,

    /// Pause after a failed cycle before the next trigger, in milliseconds.
    #[serde(default = "default_yield_ms")]
    pub yield_ms: u64,
}

/// Record sink selection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SinkConfig {
    #[serde(default)]
    pub kind: SinkKind,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// Append to the `emitted_records` table.
    #[default]
    Outbox,
    /// Write JSON lines to standard output.
    Stdout,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1))
}

fn default_port() -> u16 {
    3100
}

fn default_db_path() -> String {
    "relay.db".to_string()
}

fn default_busy_timeout_ms() -> u64 {
    DbRuntimeSettings::default().busy_timeout_ms
}

fn default_pool_max_size() -> u32 {
    DbRuntimeSettings::default().pool_max_size
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_source_url() -> String {
    "http://127.0.0.1:8081".to_string()
}

fn default_grace_ms() -> u64 {
    2_000
}

fn default_true() -> bool {
    true
}

fn default_event_types() -> String {
    DEFAULT_EVENT_TYPES.to_string()
}

fn default_poll_duration_ms() -> u64 {
    1_000
}

fn default_yield_ms() -> u64 {
    1_000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            pool_max_size: default_pool_max_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_source_url(),
            grace_ms: default_grace_ms(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            path: String::new(),
            recursive: true,
            event_types: default_event_types(),
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            duration_ms: default_poll_duration_ms(),
            interval_ms: 0,
            yield_ms: default_yield_ms(),
        }
    }
}

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    /// Failed to parse the configuration file.
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// The configuration parsed but cannot be run.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl Config {
    /// Checks the settings a relay cannot start without.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` naming the first offending setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.watch.path.trim().is_empty() {
            return Err(ConfigError::Invalid("watch.path must be set".to_string()));
        }
        validate_event_types(&self.watch.event_types)
            .map_err(|e| ConfigError::Invalid(format!("watch.event_types: {e}")))?;
        if self.poll.duration_ms == 0 {
            return Err(ConfigError::Invalid(
                "poll.duration_ms must be greater than zero".to_string(),
            ));
        }
        if self.source.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("source.base_url must be set".to_string()));
        }
        Ok(())
    }

    pub fn filter_config(&self) -> FilterConfig {
        FilterConfig::new(self.watch.path.clone())
            .recursive(self.watch.recursive)
            .event_types(self.watch.event_types.clone())
    }

    pub fn loop_settings(&self) -> LoopSettings {
        LoopSettings::new(self.filter_config())
            .poll_duration(Duration::from_millis(self.poll.duration_ms))
    }

    pub fn source_settings(&self) -> SourceSettings {
        SourceSettings::new(self.source.base_url.clone())
            .grace(Duration::from_millis(self.source.grace_ms))
    }

    pub fn db_settings(&self) -> DbRuntimeSettings {
        DbRuntimeSettings {
            busy_timeout_ms: self.database.busy_timeout_ms,
            pool_max_size: self.database.pool_max_size,
            ..DbRuntimeSettings::default()
        }
    }
}

/// Loads configuration from a TOML file, falling back to defaults, then
/// applies environment overrides (see [`apply_env_overrides`]).
///
/// # Errors
///
/// Returns `ConfigError` if the file exists but cannot be read or parsed.
pub fn load_config(path: Option<&str>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(contents) => toml::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = p, "config file not found, using defaults");
                Config::default()
            }
            Err(e) => return Err(ConfigError::FileRead(e)),
        },
        None => Config::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    Ok(config)
}

/// Overrides config values from `lookup`:
/// - `RELAY_HOST` overrides `server.host`
/// - `RELAY_PORT` overrides `server.port`
/// - `RELAY_DB_PATH` overrides `database.path`
/// - `RELAY_LOG_LEVEL` overrides `logging.level`
/// - `RELAY_LOG_JSON` overrides `logging.json` (set to "true" to enable)
/// - `RELAY_SOURCE_URL` overrides `source.base_url`
/// - `RELAY_WATCH_PATH` overrides `watch.path`
/// - `RELAY_WATCH_RECURSIVE` overrides `watch.recursive`
/// - `RELAY_EVENT_TYPES` overrides `watch.event_types`
/// - `RELAY_POLL_DURATION_MS` overrides `poll.duration_ms`
///
/// Unparsable numeric or address values are ignored.
pub fn apply_env_overrides(config: &mut Config, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(host) = lookup("RELAY_HOST") {
        if let Ok(parsed) = host.parse() {
            config.server.host = parsed;
        }
    }
    if let Some(port) = lookup("RELAY_PORT") {
        if let Ok(parsed) = port.parse() {
            config.server.port = parsed;
        }
    }
    if let Some(db_path) = lookup("RELAY_DB_PATH") {
        config.database.path = db_path;
    }
    if let Some(level) = lookup("RELAY_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(json) = lookup("RELAY_LOG_JSON") {
        config.logging.json = is_truthy(&json);
    }
    if let Some(url) = lookup("RELAY_SOURCE_URL") {
        config.source.base_url = url;
    }
    if let Some(path) = lookup("RELAY_WATCH_PATH") {
        config.watch.path = path;
    }
    if let Some(recursive) = lookup("RELAY_WATCH_RECURSIVE") {
        config.watch.recursive = is_truthy(&recursive);
    }
    if let Some(types) = lookup("RELAY_EVENT_TYPES") {
        config.watch.event_types = types;
    }
    if let Some(duration) = lookup("RELAY_POLL_DURATION_MS") {
        if let Ok(parsed) = duration.parse() {
            config.poll.duration_ms = parsed;
        }
    }
}

fn is_truthy(value: &str) -> bool {
    value == "true" || value == "1"
}
