//! Serializable shape of a filesystem tree.
//!
//! Every node carries a `type` discriminator (`file`, `directory` or
//! `link`), its id, link count and timestamps. Directories carry their
//! children as a JSON object in listing order; links carry their target.
//! Parent back-references are not stored; they are rebuilt from
//! containment on restore.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::node::{NodeId, Timestamps};

/// One node of a persisted tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeSnapshot {
    File {
        id: NodeId,
        link_count: u64,
        ctime: DateTime<Utc>,
        mtime: DateTime<Utc>,
        atime: DateTime<Utc>,
    },
    Directory {
        id: NodeId,
        link_count: u64,
        ctime: DateTime<Utc>,
        mtime: DateTime<Utc>,
        atime: DateTime<Utc>,
        children: IndexMap<String, NodeSnapshot>,
    },
    Link {
        id: NodeId,
        link_count: u64,
        ctime: DateTime<Utc>,
        mtime: DateTime<Utc>,
        atime: DateTime<Utc>,
        target: String,
    },
}

impl NodeSnapshot {
    pub fn id(&self) -> NodeId {
        match self {
            Self::File { id, .. } | Self::Directory { id, .. } | Self::Link { id, .. } => *id,
        }
    }

    pub fn link_count(&self) -> u64 {
        match self {
            Self::File { link_count, .. }
            | Self::Directory { link_count, .. }
            | Self::Link { link_count, .. } => *link_count,
        }
    }

    pub fn times(&self) -> Timestamps {
        match self {
            Self::File {
                ctime,
                mtime,
                atime,
                ..
            }
            | Self::Directory {
                ctime,
                mtime,
                atime,
                ..
            }
            | Self::Link {
                ctime,
                mtime,
                atime,
                ..
            } => Timestamps {
                ctime: *ctime,
                mtime: *mtime,
                atime: *atime,
            },
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, Self::Directory { .. })
    }
}
