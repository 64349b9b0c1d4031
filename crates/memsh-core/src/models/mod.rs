//! Data models for the filesystem tree.
//!
//! Contains domain types for:
//! - [`Node`], [`NodeKind`], [`Directory`] - Tree nodes and directory containment
//! - [`NodeId`], [`IdGenerator`] - Node identity
//! - [`NodeSnapshot`] - Persisted tree shape

mod node;
mod snapshot;

pub use node::{Directory, IdGenerator, Node, NodeId, NodeKind, Timestamps, validate_name};
pub use snapshot::NodeSnapshot;
