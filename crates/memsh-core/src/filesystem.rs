//! The in-memory filesystem facade.
//!
//! [`InMemoryFileSystem`] owns the node arena, the root and the current
//! directory, and implements each verb as "check every precondition, then
//! mutate". There is no rollback, so nothing is changed until all checks
//! for an operation have passed.
//!
//! # Path Convention
//!
//! - Absolute paths start with `/`; everything else is relative to the cwd
//! - Existence checks never follow a final symlink, so a dangling link
//!   counts as present
//! - Unlinking works on the (parent, name) pair named by the path, not on
//!   the node's back-reference

use tracing::debug;

use crate::arena::NodeArena;
use crate::config::{
    CURRENT_DIR, DIRECTORY_SUFFIX, PARENT_DIR, PATH_SEPARATOR, ROOT_PATH, SYMLINK_ARROW,
};
use crate::error::{FsError, FsResult};
use crate::models::{Directory, IdGenerator, Node, NodeId, NodeKind, NodeSnapshot, validate_name};
use crate::resolver::PathResolver;

/// Split `path` into its parent path and final component.
///
/// Returns `None` for the root (or an empty path). A bare name has `.` as
/// its parent.
///
/// - `"/a/b"` → `("/a", "b")`
/// - `"/a"` → `("/", "a")`
/// - `"a/b/"` → `("a", "b")`
/// - `"b"` → `(".", "b")`
pub fn split_parent(path: &str) -> Option<(&str, &str)> {
    let trimmed = path.trim_end_matches(PATH_SEPARATOR);
    if trimmed.is_empty() {
        return None;
    }

    match trimmed.rfind(PATH_SEPARATOR) {
        Some(0) => Some((ROOT_PATH, &trimmed[1..])),
        Some(index) => Some((&trimmed[..index], &trimmed[index + 1..])),
        None => Some((CURRENT_DIR, trimmed)),
    }
}

/// A virtual filesystem with no backing storage.
#[derive(Clone, Debug)]
pub struct InMemoryFileSystem {
    arena: NodeArena,
    cwd: NodeId,
    resolver: PathResolver,
}

impl Default for InMemoryFileSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryFileSystem {
    /// Empty filesystem drawing ids from the process-wide counter.
    pub fn new() -> Self {
        Self::with_id_generator(IdGenerator::Global)
    }

    /// Empty filesystem drawing ids from `ids`.
    pub fn with_id_generator(ids: IdGenerator) -> Self {
        let arena = NodeArena::new(ids);
        let cwd = arena.root();
        Self {
            arena,
            cwd,
            resolver: PathResolver::new(),
        }
    }

    /// Replace the resolver (e.g. to change the symlink hop limit).
    #[must_use]
    pub fn with_resolver(mut self, resolver: PathResolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Filesystem restored from a snapshot, with cwd at the root.
    pub fn from_snapshot(snapshot: &NodeSnapshot) -> FsResult<Self> {
        let mut fs = Self::new();
        fs.restore(snapshot)?;
        Ok(fs)
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn root(&self) -> NodeId {
        self.arena.root()
    }

    pub fn cwd(&self) -> NodeId {
        self.cwd
    }

    pub fn arena(&self) -> &NodeArena {
        &self.arena
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.arena.get(id)
    }

    /// Resolve `path` from the cwd.
    pub fn resolve(&self, path: &str, follow_final_symlink: bool) -> FsResult<NodeId> {
        self.resolver
            .resolve(&self.arena, Some(self.cwd), path, follow_final_symlink)
    }

    /// Resolve `path` from the cwd, mapping "not found" to `None`.
    pub fn try_resolve(&self, path: &str, follow_final_symlink: bool) -> FsResult<Option<NodeId>> {
        self.resolver
            .try_resolve(&self.arena, Some(self.cwd), path, follow_final_symlink)
    }

    /// Whether `path` names an entry (a dangling symlink counts).
    pub fn exists(&self, path: &str) -> FsResult<bool> {
        Ok(self.try_resolve(path, false)?.is_some())
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Serializable copy of the whole tree.
    pub fn snapshot(&self) -> FsResult<NodeSnapshot> {
        self.arena.snapshot(self.arena.root())
    }

    /// Replace the whole tree with `snapshot` and move the cwd to its root.
    pub fn restore(&mut self, snapshot: &NodeSnapshot) -> FsResult<()> {
        let arena = NodeArena::from_snapshot(snapshot, self.arena.ids().clone())?;
        debug!(nodes = arena.len(), "restored filesystem snapshot");
        self.cwd = arena.root();
        self.arena = arena;
        Ok(())
    }

    // =========================================================================
    // Verbs
    // =========================================================================

    /// Create an empty directory at `path`.
    ///
    /// # Errors
    ///
    /// `AlreadyExists` if `path` is taken; `NotFound`/`NotADirectory` if its
    /// parent is missing or not a directory.
    pub fn mkdir(&mut self, path: &str) -> FsResult<NodeId> {
        self.ensure_absent(path)?;
        let (parent, name) = self.creation_target(path)?;

        let id = self.arena.create(NodeKind::Directory(Directory::new()));
        self.arena.attach(parent, name, id)?;
        debug!(path, id = %id, "created directory");
        Ok(id)
    }

    /// Remove the empty directory at `path`.
    ///
    /// Removing the current directory moves the cwd to its former parent.
    pub fn rmdir(&mut self, path: &str) -> FsResult<()> {
        let id = self.resolve(path, false)?;
        let node = self.arena.node(id)?;
        let Some(dir) = node.as_directory() else {
            return Err(FsError::not_a_directory(path));
        };
        if id == self.arena.root() {
            return Err(FsError::CannotRemoveRoot);
        }
        if !dir.is_empty() {
            return Err(FsError::DirectoryNotEmpty {
                path: path.to_string(),
            });
        }
        let (parent, name) = self.entry_location(path)?;

        self.unlink(parent, &name)?;
        if self.cwd == id {
            self.cwd = parent;
        }
        debug!(path, id = %id, "removed directory");
        Ok(())
    }

    /// Refresh the timestamps of `path`, or create an empty file there.
    pub fn touch(&mut self, path: &str) -> FsResult<NodeId> {
        if let Some(id) = self.try_resolve(path, false)? {
            self.arena.node_mut(id)?.touch();
            debug!(path, id = %id, "touched");
            return Ok(id);
        }

        let (parent, name) = self.creation_target(path)?;
        let id = self.arena.create(NodeKind::File);
        self.arena.attach(parent, name, id)?;
        debug!(path, id = %id, "created file");
        Ok(id)
    }

    /// Unlink the non-directory entry at `path`.
    pub fn rm(&mut self, path: &str) -> FsResult<()> {
        let id = self.resolve(path, false)?;
        if self.arena.node(id)?.is_directory() {
            return Err(FsError::IsADirectory {
                path: path.to_string(),
            });
        }
        let (parent, name) = self.entry_location(path)?;

        let kind = self.arena.node(id)?.kind_name();
        self.unlink(parent, &name)?;
        debug!(path, id = %id, kind, "removed");
        Ok(())
    }

    /// Move the entry at `src` to `dest`, keeping the same node.
    ///
    /// Id, link count and timestamps of the moved node are untouched.
    pub fn mv(&mut self, src: &str, dest: &str) -> FsResult<()> {
        let id = self.resolve(src, false)?;
        self.ensure_absent(dest)?;
        if id == self.arena.root() {
            return Err(FsError::invalid_path(src, "cannot move the root directory"));
        }
        let (src_parent, src_name) = self.entry_location(src)?;
        let (dest_parent, dest_name) = self.creation_target(dest)?;
        if self.arena.node(id)?.is_directory() && self.arena.is_ancestor(id, dest_parent) {
            return Err(FsError::invalid_path(
                dest,
                "cannot move a directory into itself",
            ));
        }

        let kind = self.arena.node(id)?.kind_name();
        self.arena.detach(src_parent, &src_name)?;
        self.arena.attach(dest_parent, dest_name, id)?;
        debug!(src, dest, id = %id, kind, "moved");
        Ok(())
    }

    /// Create a link at `link` to `target`.
    ///
    /// A symbolic link stores `target` verbatim without resolving it. A hard
    /// link attaches the node `target` resolves to (following symlinks)
    /// under a second name and bumps its link count.
    pub fn ln(&mut self, target: &str, link: &str, symbolic: bool) -> FsResult<NodeId> {
        self.ensure_absent(link)?;

        let linked = if symbolic {
            None
        } else {
            let id = self.resolve(target, true)?;
            if self.arena.node(id)?.is_directory() {
                return Err(FsError::invalid_path(
                    target,
                    "hard link not allowed for directory",
                ));
            }
            Some(id)
        };
        let (parent, name) = self.creation_target(link)?;

        let id = match linked {
            Some(id) => id,
            None => self.arena.create(NodeKind::Symlink {
                target: target.to_string(),
            }),
        };
        self.arena.attach(parent, name, id)?;
        if !symbolic {
            self.arena.node_mut(id)?.increment_link_count();
        }
        debug!(link_target = target, link, symbolic, id = %id, "linked");
        Ok(id)
    }

    /// List `path`, following symlinks.
    ///
    /// A directory yields one line per entry in insertion order: `name/` for
    /// directories, `name -> target` for symlinks, `name` otherwise. Any
    /// other node yields the operand itself. With `show_ids` each line is
    /// prefixed with the node id.
    pub fn ls(&self, path: &str, show_ids: bool) -> FsResult<Vec<String>> {
        let id = self.resolve(path, true)?;
        let node = self.arena.node(id)?;

        let Some(dir) = node.as_directory() else {
            return Ok(vec![Self::with_id(id, path.to_string(), show_ids)]);
        };

        dir.iter()
            .map(|(name, child)| -> FsResult<String> {
                let entry = match &self.arena.node(child)?.kind {
                    NodeKind::Directory(_) => format!("{name}{DIRECTORY_SUFFIX}"),
                    NodeKind::Symlink { target } => format!("{name}{SYMLINK_ARROW}{target}"),
                    NodeKind::File => name.to_string(),
                };
                Ok(Self::with_id(child, entry, show_ids))
            })
            .collect()
    }

    /// Change the current directory.
    pub fn cd(&mut self, path: &str) -> FsResult<()> {
        let id = self.resolve(path, true)?;
        if !self.arena.node(id)?.is_directory() {
            return Err(FsError::not_a_directory(path));
        }
        self.cwd = id;
        Ok(())
    }

    /// Absolute path of the current directory.
    ///
    /// Rebuilt from back-references; with hard links the first alias in
    /// listing order is reported.
    pub fn pwd(&self) -> FsResult<String> {
        self.arena.absolute_path(self.cwd)
    }

    /// Copy `src` (following symlinks) to the new path `dest`.
    ///
    /// Files become new empty files and symlinks inside a copied tree keep
    /// their target string. A directory is copied with its contents only
    /// when `recursive`; otherwise an empty directory is created.
    pub fn cp(&mut self, src: &str, dest: &str, recursive: bool) -> FsResult<NodeId> {
        self.ensure_absent(dest)?;
        let source = self.resolve(src, true)?;
        let (parent, name) = self.creation_target(dest)?;

        let copy = self.arena.deep_copy(source, recursive)?;
        self.arena.attach(parent, name, copy)?;
        debug!(src, dest, recursive, id = %copy, "copied");
        Ok(copy)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    fn with_id(id: NodeId, entry: String, show_ids: bool) -> String {
        if show_ids {
            format!("{id} {entry}")
        } else {
            entry
        }
    }

    fn ensure_absent(&self, path: &str) -> FsResult<()> {
        if self.exists(path)? {
            return Err(FsError::already_exists(path));
        }
        Ok(())
    }

    /// Parent directory and validated leaf name for a path about to be
    /// created.
    fn creation_target<'p>(&self, path: &'p str) -> FsResult<(NodeId, &'p str)> {
        let (parent_path, name) = split_parent(path).ok_or_else(|| FsError::not_found(path))?;
        validate_name(name).map_err(|_| FsError::invalid_path(path, "invalid file name"))?;
        let parent = self.resolve(parent_path, true)?;
        if !self.arena.node(parent)?.is_directory() {
            return Err(FsError::not_a_directory(parent_path));
        }
        Ok((parent, name))
    }

    /// Directory and entry name that `path` refers to, for unlinking.
    fn entry_location(&self, path: &str) -> FsResult<(NodeId, String)> {
        let (parent_path, name) = split_parent(path).ok_or(FsError::CannotRemoveRoot)?;
        if name == CURRENT_DIR || name == PARENT_DIR {
            return Err(FsError::invalid_path(
                path,
                "refusing to remove '.' or '..'",
            ));
        }
        let parent = self.resolve(parent_path, true)?;
        if !self.arena.directory(parent).is_some_and(|dir| dir.contains(name)) {
            return Err(FsError::not_found(path));
        }
        Ok((parent, name.to_string()))
    }

    /// Detach an entry, drop one link, and free the node if it is gone.
    fn unlink(&mut self, parent: NodeId, name: &str) -> FsResult<()> {
        let id = self.arena.detach(parent, name)?;
        self.arena.node_mut(id)?.decrement_link_count();
        self.arena.release(id);
        Ok(())
    }
}
