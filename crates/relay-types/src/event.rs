//! Filesystem change notification model.
//!
//! Each [`Event`] variant mirrors the native field set of one notification
//! kind. Field names are a contract with downstream consumers, so every
//! struct serialises with stable camelCase names and the enum carries an
//! `eventType` tag.

use serde::{Deserialize, Serialize};

/// The six notification kinds the upstream service produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventKind {
    /// Data was appended to an existing file.
    Append,
    /// A file was closed after writing.
    Close,
    /// A file, directory, or symlink was created.
    Create,
    /// Metadata (times, owner, permissions, ACLs, xattrs) changed.
    Metadata,
    /// A path was renamed.
    Rename,
    /// A path was deleted.
    Unlink,
}

impl EventKind {
    /// Every kind, in the order they are documented.
    pub const ALL: [EventKind; 6] = [
        Self::Append,
        Self::Close,
        Self::Create,
        Self::Metadata,
        Self::Rename,
        Self::Unlink,
    ];

    /// Returns the canonical upper-case name used in record attributes.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Append => "APPEND",
            Self::Close => "CLOSE",
            Self::Create => "CREATE",
            Self::Metadata => "METADATA",
            Self::Rename => "RENAME",
            Self::Unlink => "UNLINK",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EventKind {
    type Err = ParseEventKindError;

    /// Parses a kind name. Case does not matter and surrounding whitespace
    /// is ignored, matching how the event-type allow-list is written.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| ParseEventKindError(s.to_string()))
    }
}

/// Error returned when parsing an unknown event kind string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEventKindError(pub String);

impl std::fmt::Display for ParseEventKindError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "unknown event type: {:?} (expected one of append, close, create, metadata, rename, unlink)",
            self.0
        )
    }
}

impl std::error::Error for ParseEventKindError {}

/// One filesystem change notification.
///
/// Events are immutable once produced by the source. Every variant has a
/// canonical path; for [`Event::Rename`] it is the source path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "eventType")]
pub enum Event {
    #[serde(rename = "APPEND")]
    Append(AppendEvent),
    #[serde(rename = "CLOSE")]
    Close(CloseEvent),
    #[serde(rename = "CREATE")]
    Create(CreateEvent),
    #[serde(rename = "METADATA")]
    MetadataUpdate(MetadataUpdateEvent),
    #[serde(rename = "RENAME")]
    Rename(RenameEvent),
    #[serde(rename = "UNLINK")]
    Unlink(UnlinkEvent),
}

impl Event {
    /// Returns the kind of this event.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Append(_) => EventKind::Append,
            Self::Close(_) => EventKind::Close,
            Self::Create(_) => EventKind::Create,
            Self::MetadataUpdate(_) => EventKind::Metadata,
            Self::Rename(_) => EventKind::Rename,
            Self::Unlink(_) => EventKind::Unlink,
        }
    }

    /// Returns the path this event is attributed to.
    ///
    /// Renames resolve to their source path; the destination never takes
    /// part in filtering or attribution.
    pub fn path(&self) -> &str {
        match self {
            Self::Append(e) => &e.path,
            Self::Close(e) => &e.path,
            Self::Create(e) => &e.path,
            Self::MetadataUpdate(e) => &e.path,
            Self::Rename(e) => &e.src_path,
            Self::Unlink(e) => &e.path,
        }
    }
}

/// Kind of inode a create event produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum INodeType {
    File,
    Directory,
    Symlink,
}

/// Which metadata a metadata-update event touched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MetadataType {
    Times,
    Replication,
    Owner,
    Perms,
    Acls,
    Xattrs,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppendEvent {
    pub path: String,
    /// Whether the append started a new block rather than extending the last one.
    pub new_block: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseEvent {
    pub path: String,
    /// File size in bytes at close time.
    pub file_size: i64,
    /// Close time in milliseconds since the epoch.
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEvent {
    pub i_node_type: INodeType,
    pub path: String,
    /// Creation time in milliseconds since the epoch.
    pub ctime: i64,
    pub replication: i32,
    pub owner_name: String,
    pub group_name: String,
    /// Symbolic permission string, e.g. `rw-r--r--`.
    pub perms: String,
    /// Only set for symlinks.
    pub symlink_target: Option<String>,
    pub overwrite: bool,
    pub default_block_size: i64,
    #[serde(default)]
    pub erasure_coded: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameEvent {
    pub src_path: String,
    pub dst_path: String,
    pub timestamp: i64,
}

/// An ACL entry attached to a metadata update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AclEntry {
    /// `ACCESS` or `DEFAULT`.
    pub scope: String,
    /// `USER`, `GROUP`, `MASK`, or `OTHER`.
    #[serde(rename = "type")]
    pub entry_type: String,
    pub name: Option<String>,
    /// Symbolic permission, e.g. `r-x`.
    pub permission: String,
}

/// An extended attribute attached to a metadata update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct XAttr {
    /// `USER`, `TRUSTED`, `SECURITY`, `SYSTEM`, or `RAW`.
    pub name_space: String,
    pub name: String,
    /// Encoded attribute value as delivered by the source.
    pub value: Option<String>,
}

/// A metadata change. Only the fields relevant to `metadata_type` are
/// meaningful; the rest are carried through as delivered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataUpdateEvent {
    pub path: String,
    pub metadata_type: MetadataType,
    pub mtime: i64,
    pub atime: i64,
    pub replication: i32,
    pub owner_name: Option<String>,
    pub group_name: Option<String>,
    pub perms: Option<String>,
    pub acls: Option<Vec<AclEntry>>,
    pub x_attrs: Option<Vec<XAttr>>,
    pub x_attrs_removed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnlinkEvent {
    pub path: String,
    pub timestamp: i64,
}

/// The events returned by one successful poll.
///
/// `txid` is the terminal transaction id: every event up to and including
/// it has been observed once this batch is processed. `events` may be empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventBatch {
    pub txid: i64,
    pub events: Vec<Event>,
}

impl EventBatch {
    pub fn new(txid: i64, events: Vec<Event>) -> Self {
        Self { txid, events }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
