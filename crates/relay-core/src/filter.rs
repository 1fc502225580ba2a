//! Event selection by kind and path.
//!
//! [`FilterConfig::accepts`] is a pure function of the event and the
//! configuration. The allow-list is kept as the raw configured string and
//! re-parsed on every evaluation, so there is no derived state to go stale.

use relay_types::{Event, EventKind, ParseEventKindError};

/// Allow-list used when none is configured: every kind.
pub const DEFAULT_EVENT_TYPES: &str = "append, close, create, metadata, rename, unlink";

/// Which events the loop forwards downstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterConfig {
    /// Root of the watched subtree.
    pub watch_path: String,
    /// Prefix match under `watch_path` when true, exact match when false.
    pub recursive: bool,
    /// Comma-separated, case-insensitive kind names.
    pub event_types: String,
}

impl FilterConfig {
    pub fn new(watch_path: impl Into<String>) -> Self {
        Self {
            watch_path: watch_path.into(),
            recursive: true,
            event_types: DEFAULT_EVENT_TYPES.to_string(),
        }
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    pub fn event_types(mut self, event_types: impl Into<String>) -> Self {
        self.event_types = event_types.into();
        self
    }

    /// Returns true when the event's kind is allowed and its path is under
    /// (or, non-recursively, equal to) the watch path.
    pub fn accepts(&self, event: &Event) -> bool {
        self.accepts_kind(event.kind()) && self.accepts_path(event.path())
    }

    /// Kind membership: the kind name must equal one of the trimmed list
    /// entries, ignoring case.
    pub fn accepts_kind(&self, kind: EventKind) -> bool {
        allow_list(&self.event_types).any(|name| name.eq_ignore_ascii_case(kind.as_str()))
    }

    /// Path membership after stripping one trailing separator on each side.
    ///
    /// Recursive matching is a plain string prefix test, not segment aware:
    /// a watch path of `/a/b` also accepts `/a/bc`. Downstream filtering
    /// relies on this, so it is kept as is.
    pub fn accepts_path(&self, path: &str) -> bool {
        if self.watch_path.is_empty() {
            return false;
        }
        let path = strip_trailing_separator(path);
        if path.is_empty() {
            return false;
        }
        let watch = strip_trailing_separator(&self.watch_path);
        if self.recursive {
            path.starts_with(watch)
        } else {
            path == watch
        }
    }
}

/// Splits an allow-list into its trimmed, non-empty entries.
pub fn allow_list(event_types: &str) -> impl Iterator<Item = &str> {
    event_types
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
}

/// Checks that every entry of an allow-list names a known kind.
///
/// Blank entries are rejected, so an empty list (or `"append,,close"`)
/// fails instead of silently matching nothing.
///
/// # Errors
///
/// Returns the first entry that is blank or not one of the six kinds.
pub fn validate_event_types(event_types: &str) -> Result<Vec<EventKind>, ParseEventKindError> {
    event_types
        .split(',')
        .map(str::trim)
        .map(|name| name.parse::<EventKind>())
        .collect()
}

fn strip_trailing_separator(path: &str) -> &str {
    path.strip_suffix('/').unwrap_or(path)
}
