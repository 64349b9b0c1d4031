use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::config::{CURRENT_DIR, PARENT_DIR, PATH_SEPARATOR};
use crate::error::{FsError, FsResult};

// =============================================================================
// Node Identity
// =============================================================================

/// Unique, monotonically assigned node identifier.
///
/// Hard links share one `NodeId`; every other creation gets a fresh one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u64);

impl NodeId {
    /// Wrap a raw id (used when restoring snapshots).
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw numeric id.
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Process-wide counter shared by every filesystem using `IdGenerator::Global`
static NEXT_NODE_ID: AtomicU64 = AtomicU64::new(1);

/// Source of fresh node ids.
///
/// `Global` keeps ids unique across every filesystem instance in the
/// process. `Local` is an injected counter so tests can start from a
/// known value.
#[derive(Clone, Debug, Default)]
pub enum IdGenerator {
    #[default]
    Global,
    Local(Arc<AtomicU64>),
}

impl IdGenerator {
    /// A private counter whose first id is `start`.
    pub fn seeded(start: u64) -> Self {
        Self::Local(Arc::new(AtomicU64::new(start)))
    }

    /// Allocate the next id.
    pub fn next_id(&self) -> NodeId {
        NodeId(self.counter().fetch_add(1, Ordering::Relaxed))
    }

    /// Make sure later ids are strictly greater than `id`.
    pub fn observe(&self, id: NodeId) {
        self.counter()
            .fetch_max(id.0.saturating_add(1), Ordering::Relaxed);
    }

    fn counter(&self) -> &AtomicU64 {
        match self {
            Self::Global => &NEXT_NODE_ID,
            Self::Local(counter) => counter.as_ref(),
        }
    }
}

// =============================================================================
// Timestamps
// =============================================================================

/// Change, modification and access times of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timestamps {
    pub ctime: DateTime<Utc>,
    pub mtime: DateTime<Utc>,
    pub atime: DateTime<Utc>,
}

impl Timestamps {
    /// All three times set to now.
    pub fn now() -> Self {
        let now = Utc::now();
        Self {
            ctime: now,
            mtime: now,
            atime: now,
        }
    }

    /// Content or entry change: refresh `ctime` and `mtime`.
    pub fn touch(&mut self) {
        let now = Utc::now();
        self.ctime = now;
        self.mtime = now;
    }

    /// Metadata-only change: refresh `ctime`.
    pub fn changed(&mut self) {
        self.ctime = Utc::now();
    }
}

// =============================================================================
// Directory
// =============================================================================

/// Check that `name` can be stored as a directory entry.
pub fn validate_name(name: &str) -> FsResult<()> {
    if name.is_empty() {
        return Err(FsError::invalid_path(name, "empty name"));
    }
    if name.contains(PATH_SEPARATOR) {
        return Err(FsError::invalid_path(name, "name contains a path separator"));
    }
    if name == CURRENT_DIR || name == PARENT_DIR {
        return Err(FsError::invalid_path(name, "reserved name"));
    }
    Ok(())
}

/// Insertion-ordered mapping of entry names to child ids.
///
/// Order is what `ls` shows; an overwrite keeps the original slot and a
/// removal shifts later entries down.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Directory {
    entries: IndexMap<String, NodeId>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or silently overwrite `name`. Returns the replaced id, if any.
    ///
    /// Callers check for existence first; this never fails.
    pub fn add(&mut self, name: impl Into<String>, id: NodeId) -> Option<NodeId> {
        self.entries.insert(name.into(), id)
    }

    /// Remove `name`, keeping the order of the remaining entries.
    pub fn remove(&mut self, name: &str) -> Option<NodeId> {
        self.entries.shift_remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<NodeId> {
        self.entries.get(name).copied()
    }

    /// Entry names in insertion order.
    pub fn list_names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Detached copy of the entries, safe to iterate while mutating the tree.
    pub fn snapshot(&self) -> Vec<(String, NodeId)> {
        self.entries
            .iter()
            .map(|(name, id)| (name.clone(), *id))
            .collect()
    }

    /// First name under which `id` appears.
    pub fn name_of(&self, id: NodeId) -> Option<&str> {
        self.entries
            .iter()
            .find(|(_, child)| **child == id)
            .map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.entries.iter().map(|(name, id)| (name.as_str(), *id))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// Node
// =============================================================================

/// Variant-specific payload of a node.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NodeKind {
    /// Metadata-only regular file
    File,
    Directory(Directory),
    /// Target path, stored verbatim and never validated
    Symlink { target: String },
}

/// A file, directory or symlink in the arena.
#[derive(Clone, Debug)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub link_count: u64,
    pub times: Timestamps,
    /// Containing directory. Lookup-only; `None` for the root and for
    /// detached nodes.
    pub parent: Option<NodeId>,
}

impl Node {
    /// New node with `link_count = 1` and all times set to now.
    pub fn new(id: NodeId, kind: NodeKind) -> Self {
        Self {
            id,
            kind,
            link_count: 1,
            times: Timestamps::now(),
            parent: None,
        }
    }

    pub fn file(id: NodeId) -> Self {
        Self::new(id, NodeKind::File)
    }

    pub fn directory(id: NodeId) -> Self {
        Self::new(id, NodeKind::Directory(Directory::new()))
    }

    /// Refresh `ctime` and `mtime`.
    pub fn touch(&mut self) {
        self.times.touch();
    }

    pub fn increment_link_count(&mut self) {
        self.link_count = self.link_count.saturating_add(1);
        self.times.changed();
    }

    /// Decrement, never going below zero.
    pub fn decrement_link_count(&mut self) {
        self.link_count = self.link_count.saturating_sub(1);
        self.times.changed();
    }

    pub fn is_directory(&self) -> bool {
        matches!(self.kind, NodeKind::Directory(_))
    }

    pub fn is_symlink(&self) -> bool {
        matches!(self.kind, NodeKind::Symlink { .. })
    }

    pub fn as_directory(&self) -> Option<&Directory> {
        match &self.kind {
            NodeKind::Directory(dir) => Some(dir),
            _ => None,
        }
    }

    pub fn as_directory_mut(&mut self) -> Option<&mut Directory> {
        match &mut self.kind {
            NodeKind::Directory(dir) => Some(dir),
            _ => None,
        }
    }

    pub fn symlink_target(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Symlink { target } => Some(target),
            _ => None,
        }
    }

    /// Point a symlink somewhere else, refreshing `ctime` and `mtime`.
    pub fn set_symlink_target(&mut self, target: impl Into<String>) -> FsResult<()> {
        match &mut self.kind {
            NodeKind::Symlink { target: current } => {
                *current = target.into();
                self.times.touch();
                Ok(())
            }
            _ => Err(FsError::invalid_path(
                format!("<node {}>", self.id),
                "not a symbolic link",
            )),
        }
    }

    /// Short kind label used in logs.
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            NodeKind::File => "file",
            NodeKind::Directory(_) => "directory",
            NodeKind::Symlink { .. } => "link",
        }
    }
}
