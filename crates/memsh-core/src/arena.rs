//! Node storage for one filesystem instance.
//!
//! Nodes are owned by a flat map keyed by [`NodeId`]. Directories own their
//! children by id; each node keeps a lookup-only `parent` id used for `..`
//! and path reconstruction. The root has no parent, which makes "parent of
//! root" a fixed point without a reference cycle.

use std::collections::{HashMap, HashSet};

use indexmap::IndexMap;
use tracing::warn;

use crate::config::ROOT_PATH;
use crate::error::{FsError, FsResult};
use crate::models::{Directory, IdGenerator, Node, NodeId, NodeKind, NodeSnapshot, validate_name};

/// Arena of nodes rooted at a single directory.
#[derive(Clone, Debug)]
pub struct NodeArena {
    nodes: HashMap<NodeId, Node>,
    root: NodeId,
    ids: IdGenerator,
}

impl NodeArena {
    /// Create an arena holding only an empty root directory.
    pub fn new(ids: IdGenerator) -> Self {
        let root = Node::directory(ids.next_id());
        let root_id = root.id;
        let mut nodes = HashMap::new();
        nodes.insert(root_id, root);
        Self {
            nodes,
            root: root_id,
            ids,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn ids(&self) -> &IdGenerator {
        &self.ids
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    /// Number of live nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn node(&self, id: NodeId) -> FsResult<&Node> {
        self.nodes
            .get(&id)
            .ok_or_else(|| FsError::not_found(format!("<node {id}>")))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> FsResult<&mut Node> {
        self.nodes
            .get_mut(&id)
            .ok_or_else(|| FsError::not_found(format!("<node {id}>")))
    }

    /// The directory payload of `id`, if it is a directory.
    pub fn directory(&self, id: NodeId) -> Option<&Directory> {
        self.nodes.get(&id).and_then(Node::as_directory)
    }

    /// Allocate a detached node.
    pub fn create(&mut self, kind: NodeKind) -> NodeId {
        let node = Node::new(self.ids.next_id(), kind);
        let id = node.id;
        self.nodes.insert(id, node);
        id
    }

    /// Add `child` to directory `dir` under `name` and point its
    /// back-reference at `dir`.
    ///
    /// An existing entry with the same name is overwritten; callers check
    /// existence beforehand.
    pub fn attach(&mut self, dir: NodeId, name: &str, child: NodeId) -> FsResult<()> {
        validate_name(name)?;
        if !self.nodes.contains_key(&child) {
            return Err(FsError::not_found(format!("<node {child}>")));
        }

        let parent = self.node_mut(dir)?;
        let entries = parent
            .as_directory_mut()
            .ok_or_else(|| FsError::not_a_directory(name))?;
        entries.add(name, child);
        parent.touch();

        self.node_mut(child)?.parent = Some(dir);
        Ok(())
    }

    /// Remove entry `name` from `dir` and return the detached id.
    ///
    /// The child's back-reference is cleared unless the same node is still
    /// listed in `dir` under another name. Link counts are not changed.
    pub fn detach(&mut self, dir: NodeId, name: &str) -> FsResult<NodeId> {
        let parent = self.node_mut(dir)?;
        let entries = parent
            .as_directory_mut()
            .ok_or_else(|| FsError::not_a_directory(name))?;
        let child = entries.remove(name).ok_or_else(|| FsError::not_found(name))?;
        let still_listed = entries.name_of(child).is_some();
        parent.touch();

        if let Some(node) = self.nodes.get_mut(&child) {
            if node.parent == Some(dir) && !still_listed {
                node.parent = None;
            }
        }
        Ok(child)
    }

    /// Drop `id` from the arena once it has no links and no parent.
    ///
    /// Returns `true` if the node was dropped.
    pub fn release(&mut self, id: NodeId) -> bool {
        let unreferenced = self
            .nodes
            .get(&id)
            .is_some_and(|node| node.link_count == 0 && node.parent.is_none());
        if unreferenced && id != self.root {
            self.nodes.remove(&id);
            return true;
        }
        false
    }

    /// Whether `ancestor` is `id` or lies on its parent chain.
    pub fn is_ancestor(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        // A well-formed chain is never longer than the arena
        for _ in 0..=self.nodes.len() {
            match current {
                Some(node) if node == ancestor => return true,
                Some(node) => current = self.nodes.get(&node).and_then(|n| n.parent),
                None => return false,
            }
        }
        false
    }

    /// Absolute path of `id`, rebuilt by walking back-references.
    ///
    /// Each step looks up the node's name in its parent's entries; with
    /// hard links the first alias in listing order wins.
    pub fn absolute_path(&self, id: NodeId) -> FsResult<String> {
        let mut names = Vec::new();
        let mut current = id;

        while current != self.root {
            if names.len() > self.nodes.len() {
                return Err(FsError::invalid_path(
                    format!("<node {id}>"),
                    "parent chain does not reach the root",
                ));
            }
            let node = self.node(current)?;
            let parent = node.parent.ok_or_else(|| {
                FsError::invalid_path(format!("<node {id}>"), "node is detached")
            })?;
            let name = self
                .directory(parent)
                .and_then(|dir| dir.name_of(current))
                .ok_or_else(|| {
                    FsError::invalid_path(format!("<node {id}>"), "node missing from its parent")
                })?;
            names.push(name);
            current = parent;
        }

        if names.is_empty() {
            return Ok(ROOT_PATH.to_string());
        }
        names.reverse();
        Ok(format!("{ROOT_PATH}{}", names.join(ROOT_PATH)))
    }

    /// Build a detached copy of `source` with fresh ids.
    ///
    /// Files become new empty files and symlinks keep their target string.
    /// Directories are copied with their entries only when `recursive`.
    /// Entries are read before anything is attached, so copying a
    /// directory into its own subtree terminates.
    pub fn deep_copy(&mut self, source: NodeId, recursive: bool) -> FsResult<NodeId> {
        let kind = match &self.node(source)?.kind {
            NodeKind::File => NodeKind::File,
            NodeKind::Symlink { target } => NodeKind::Symlink {
                target: target.clone(),
            },
            NodeKind::Directory(_) => NodeKind::Directory(Directory::new()),
        };
        let entries = match self.directory(source) {
            Some(dir) if recursive => dir.snapshot(),
            _ => Vec::new(),
        };

        let copy = self.create(kind);
        for (name, child) in entries {
            let child_copy = self.deep_copy(child, true)?;
            self.attach(copy, &name, child_copy)?;
        }
        Ok(copy)
    }

    /// Serializable tree rooted at `id`.
    pub fn snapshot(&self, id: NodeId) -> FsResult<NodeSnapshot> {
        let node = self.node(id)?;
        let times = node.times;
        Ok(match &node.kind {
            NodeKind::File => NodeSnapshot::File {
                id: node.id,
                link_count: node.link_count,
                ctime: times.ctime,
                mtime: times.mtime,
                atime: times.atime,
            },
            NodeKind::Symlink { target } => NodeSnapshot::Link {
                id: node.id,
                link_count: node.link_count,
                ctime: times.ctime,
                mtime: times.mtime,
                atime: times.atime,
                target: target.clone(),
            },
            NodeKind::Directory(dir) => {
                let children = dir
                    .iter()
                    .map(|(name, child)| -> FsResult<(String, NodeSnapshot)> {
                        Ok((name.to_string(), self.snapshot(child)?))
                    })
                    .collect::<FsResult<IndexMap<_, _>>>()?;
                NodeSnapshot::Directory {
                    id: node.id,
                    link_count: node.link_count,
                    ctime: times.ctime,
                    mtime: times.mtime,
                    atime: times.atime,
                    children,
                }
            }
        })
    }

    /// Rebuild an arena from a snapshot, keeping the stored ids.
    ///
    /// A node id that appears more than once is a hard link: later
    /// occurrences attach the node created for the first one. A stored link
    /// count below the number of entries listing the node is raised to that
    /// number. `ids` is advanced past every restored id.
    pub fn from_snapshot(snapshot: &NodeSnapshot, ids: IdGenerator) -> FsResult<Self> {
        if !snapshot.is_directory() {
            return Err(FsError::invalid_path(ROOT_PATH, "snapshot root is not a directory"));
        }

        let mut listings = HashMap::new();
        count_listings(snapshot, &mut listings);

        let mut arena = Self {
            nodes: HashMap::new(),
            root: snapshot.id(),
            ids,
        };
        let mut seen = HashSet::new();
        arena.restore_node(snapshot, &listings, &mut seen)?;
        Ok(arena)
    }

    fn restore_node(
        &mut self,
        snapshot: &NodeSnapshot,
        listings: &HashMap<NodeId, u64>,
        seen: &mut HashSet<NodeId>,
    ) -> FsResult<NodeId> {
        let id = snapshot.id();
        if !seen.insert(id) {
            if snapshot.is_directory() || self.nodes.get(&id).is_some_and(Node::is_directory) {
                return Err(FsError::invalid_path(
                    format!("<node {id}>"),
                    "directory appears more than once",
                ));
            }
            return Ok(id);
        }
        self.ids.observe(id);

        let kind = match snapshot {
            NodeSnapshot::File { .. } => NodeKind::File,
            NodeSnapshot::Link { target, .. } => NodeKind::Symlink {
                target: target.clone(),
            },
            NodeSnapshot::Directory { .. } => NodeKind::Directory(Directory::new()),
        };
        let stored = snapshot.link_count();
        let listed = listings.get(&id).copied().unwrap_or(0);
        if stored < listed {
            warn!(id = %id, stored, listed, "link count below number of entries, raising it");
        }

        let mut node = Node::new(id, kind);
        node.link_count = stored.max(listed);
        node.times = snapshot.times();
        self.nodes.insert(id, node);

        if let NodeSnapshot::Directory { children, .. } = snapshot {
            for (name, child) in children {
                let child_id = self.restore_node(child, listings, seen)?;
                // Restoring must not disturb the stored times
                let times = self.node(id)?.times;
                self.attach(id, name, child_id)?;
                self.node_mut(id)?.times = times;
            }
        }
        Ok(id)
    }
}

/// Count how many directory entries name each node below `snapshot`.
fn count_listings(snapshot: &NodeSnapshot, listings: &mut HashMap<NodeId, u64>) {
    if let NodeSnapshot::Directory { children, .. } = snapshot {
        for child in children.values() {
            *listings.entry(child.id()).or_default() += 1;
            count_listings(child, listings);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Timestamps;

    fn arena() -> NodeArena {
        NodeArena::new(IdGenerator::seeded(1))
    }

    fn mkdir(arena: &mut NodeArena, parent: NodeId, name: &str) -> NodeId {
        let id = arena.create(NodeKind::Directory(Directory::new()));
        arena.attach(parent, name, id).unwrap();
        id
    }

    #[test]
    fn test_root_has_no_parent() {
        let arena = arena();
        let root = arena.get(arena.root()).unwrap();
        assert!(root.is_directory());
        assert!(root.parent.is_none());
        assert_eq!(arena.absolute_path(arena.root()).unwrap(), "/");
    }

    #[test]
    fn test_attach_sets_back_reference() {
        let mut arena = arena();
        let root = arena.root();
        let a = mkdir(&mut arena, root, "a");
        assert_eq!(arena.get(a).unwrap().parent, Some(root));
        assert_eq!(arena.directory(root).unwrap().get("a"), Some(a));
    }

    #[test]
    fn test_attach_rejects_bad_names() {
        let mut arena = arena();
        let root = arena.root();
        let f = arena.create(NodeKind::File);
        assert!(arena.attach(root, "", f).unwrap_err().is_invalid_path());
        assert!(arena.attach(root, "x/y", f).unwrap_err().is_invalid_path());
    }

    #[test]
    fn test_attach_to_file_fails() {
        let mut arena = arena();
        let root = arena.root();
        let f = arena.create(NodeKind::File);
        arena.attach(root, "f", f).unwrap();
        let g = arena.create(NodeKind::File);
        assert!(arena.attach(f, "g", g).unwrap_err().is_not_a_directory());
    }

    #[test]
    fn test_detach_clears_back_reference() {
        let mut arena = arena();
        let root = arena.root();
        let a = mkdir(&mut arena, root, "a");
        assert_eq!(arena.detach(root, "a").unwrap(), a);
        assert!(arena.get(a).unwrap().parent.is_none());
        assert!(arena.detach(root, "a").unwrap_err().is_not_found());
    }

    #[test]
    fn test_release_drops_unlinked_nodes() {
        let mut arena = arena();
        let root = arena.root();
        let f = arena.create(NodeKind::File);
        arena.attach(root, "f", f).unwrap();
        arena.detach(root, "f").unwrap();
        assert!(!arena.release(f));
        arena.get_mut(f).unwrap().decrement_link_count();
        assert!(arena.release(f));
        assert!(arena.get(f).is_none());
    }

    #[test]
    fn test_absolute_path_nested() {
        let mut arena = arena();
        let root = arena.root();
        let a = mkdir(&mut arena, root, "a");
        let b = mkdir(&mut arena, a, "b");
        assert_eq!(arena.absolute_path(b).unwrap(), "/a/b");
        assert!(arena.is_ancestor(a, b));
        assert!(!arena.is_ancestor(b, a));
    }

    #[test]
    fn test_deep_copy_into_own_subtree_terminates() {
        let mut arena = arena();
        let root = arena.root();
        let a = mkdir(&mut arena, root, "a");
        let b = mkdir(&mut arena, a, "b");
        let copy = arena.deep_copy(a, true).unwrap();
        arena.attach(b, "a", copy).unwrap();

        let copied = arena.directory(copy).unwrap();
        assert_eq!(copied.list_names(), vec!["b"]);
        let inner = copied.get("b").unwrap();
        assert!(arena.directory(inner).unwrap().is_empty());
        assert_ne!(inner, b);
    }

    #[test]
    fn test_snapshot_round_trip_keeps_hard_links() {
        let mut arena = arena();
        let root = arena.root();
        let a = mkdir(&mut arena, root, "a");
        let f = arena.create(NodeKind::File);
        arena.attach(a, "f", f).unwrap();
        arena.attach(root, "alias", f).unwrap();
        arena.get_mut(f).unwrap().increment_link_count();

        let snapshot = arena.snapshot(root).unwrap();
        let restored = NodeArena::from_snapshot(&snapshot, IdGenerator::seeded(1)).unwrap();

        assert_eq!(restored.len(), arena.len());
        let a2 = restored.directory(restored.root()).unwrap().get("a").unwrap();
        let via_a = restored.directory(a2).unwrap().get("f").unwrap();
        let via_alias = restored.directory(restored.root()).unwrap().get("alias").unwrap();
        assert_eq!(via_a, via_alias);
        assert_eq!(restored.get(via_a).unwrap().link_count, 2);
        assert_eq!(restored.get(a2).unwrap().parent, Some(restored.root()));
        assert!(restored.ids().next_id() > f);
    }

    #[test]
    fn test_snapshot_root_must_be_directory() {
        let mut arena = arena();
        let f = arena.create(NodeKind::File);
        let snapshot = arena.snapshot(f).unwrap();
        let err = NodeArena::from_snapshot(&snapshot, IdGenerator::seeded(1)).unwrap_err();
        assert!(err.is_invalid_path());
    }

    fn file_snapshot(id: u64, link_count: u64, t: Timestamps) -> NodeSnapshot {
        NodeSnapshot::File {
            id: NodeId::new(id),
            link_count,
            ctime: t.ctime,
            mtime: t.mtime,
            atime: t.atime,
        }
    }

    fn dir_snapshot(id: u64, t: Timestamps, children: IndexMap<String, NodeSnapshot>) -> NodeSnapshot {
        NodeSnapshot::Directory {
            id: NodeId::new(id),
            link_count: 1,
            ctime: t.ctime,
            mtime: t.mtime,
            atime: t.atime,
            children,
        }
    }

    #[test]
    fn test_restore_raises_link_count_to_listings() {
        let t = Timestamps::now();
        let tree = dir_snapshot(
            1,
            t,
            IndexMap::from([
                (
                    "d1".to_string(),
                    dir_snapshot(2, t, IndexMap::from([("x".to_string(), file_snapshot(5, 1, t))])),
                ),
                (
                    "d2".to_string(),
                    dir_snapshot(3, t, IndexMap::from([("x".to_string(), file_snapshot(5, 1, t))])),
                ),
            ]),
        );

        let mut restored = NodeArena::from_snapshot(&tree, IdGenerator::seeded(1)).unwrap();
        let x = NodeId::new(5);
        assert_eq!(restored.get(x).unwrap().link_count, 2);

        let d2 = NodeId::new(3);
        restored.detach(d2, "x").unwrap();
        restored.get_mut(x).unwrap().decrement_link_count();
        assert!(!restored.release(x));
        assert_eq!(restored.directory(NodeId::new(2)).unwrap().get("x"), Some(x));
        assert!(restored.snapshot(restored.root()).is_ok());
    }

    #[test]
    fn test_restore_keeps_higher_stored_link_count() {
        let t = Timestamps::now();
        let tree = dir_snapshot(
            1,
            t,
            IndexMap::from([("f".to_string(), file_snapshot(2, 3, t))]),
        );
        let restored = NodeArena::from_snapshot(&tree, IdGenerator::seeded(1)).unwrap();
        assert_eq!(restored.get(NodeId::new(2)).unwrap().link_count, 3);
    }
}
