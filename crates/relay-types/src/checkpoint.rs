//! Durable resume position and state-store scopes.

/// Name of the state-map field holding the last checkpointed transaction id.
pub const LAST_TX_ID_KEY: &str = "last.tx.id";

/// Persisted value of [`CheckpointPosition::Tip`].
const SENTINEL: i64 = -1;

/// Where the next cycle resumes reading the notification log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckpointPosition {
    /// No reliable position: open the stream at the current tip, so only
    /// events generated from now on are visible.
    Tip,
    /// Resume strictly after this transaction id.
    After(i64),
}

impl CheckpointPosition {
    /// Builds a position from a raw transaction id, mapping the reserved
    /// sentinel back to [`CheckpointPosition::Tip`].
    pub fn from_txid(txid: i64) -> Self {
        if txid == SENTINEL {
            Self::Tip
        } else {
            Self::After(txid)
        }
    }

    /// Returns the transaction id, or `None` for the tip sentinel.
    pub fn txid(self) -> Option<i64> {
        match self {
            Self::Tip => None,
            Self::After(txid) => Some(txid),
        }
    }

    pub fn is_tip(self) -> bool {
        matches!(self, Self::Tip)
    }

    /// Returns the string written to the state map.
    pub fn to_state_value(self) -> String {
        self.txid().unwrap_or(SENTINEL).to_string()
    }

    /// Decodes the state-map field. A missing or empty value is the sentinel.
    ///
    /// # Errors
    ///
    /// Returns `ParsePositionError` when the value is present but is not a
    /// signed 64-bit integer.
    pub fn from_state_value(value: Option<&str>) -> Result<Self, ParsePositionError> {
        match value {
            None | Some("") => Ok(Self::Tip),
            Some(raw) => raw
                .parse::<i64>()
                .map(Self::from_txid)
                .map_err(|_| ParsePositionError(raw.to_string())),
        }
    }
}

impl std::fmt::Display for CheckpointPosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Tip => f.write_str("tip"),
            Self::After(txid) => write!(f, "txid {txid}"),
        }
    }
}

/// Error returned when a persisted checkpoint is not a valid transaction id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePositionError(pub String);

impl std::fmt::Display for ParsePositionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid checkpoint value: {:?}", self.0)
    }
}

impl std::error::Error for ParsePositionError {}

/// Visibility of a state map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Private to one instance.
    Local,
    /// Shared by every instance pointed at the same store.
    Cluster,
}

impl Scope {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Local => "LOCAL",
            Self::Cluster => "CLUSTER",
        }
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
