//! Path resolution over a [`NodeArena`].
//!
//! Handles:
//! - Absolute and relative paths, repeated and trailing slashes
//! - `.` and `..` components (`..` at the root stays at the root)
//! - Symlinks in intermediate components, and in the final component
//!   when asked to follow it
//!
//! The resolver is stateless; symlink loops are cut off by a hop counter
//! rather than a visited set.

use crate::arena::NodeArena;
use crate::config::{CURRENT_DIR, MAX_SYMLINK_DEPTH, PARENT_DIR, PATH_SEPARATOR};
use crate::error::{FsError, FsResult};
use crate::models::NodeId;

/// Resolves path strings to node ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PathResolver {
    max_symlink_depth: usize,
}

impl Default for PathResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl PathResolver {
    pub const fn new() -> Self {
        Self {
            max_symlink_depth: MAX_SYMLINK_DEPTH,
        }
    }

    /// Resolver that allows at most `depth` symlink hops per lookup.
    pub const fn with_max_depth(depth: usize) -> Self {
        Self {
            max_symlink_depth: depth,
        }
    }

    pub const fn max_symlink_depth(&self) -> usize {
        self.max_symlink_depth
    }

    /// Resolve `path` against `cwd`.
    ///
    /// # Errors
    ///
    /// - `NotFound` if `path` is empty, a component is missing, or a
    ///   component is looked up inside a non-directory
    /// - `InvalidPath` if `cwd` is `None` or the symlink hop limit is exceeded
    pub fn resolve(
        &self,
        arena: &NodeArena,
        cwd: Option<NodeId>,
        path: &str,
        follow_final_symlink: bool,
    ) -> FsResult<NodeId> {
        let cwd = cwd.ok_or_else(|| FsError::invalid_path(path, "no working directory"))?;
        self.resolve_from(arena, cwd, path, follow_final_symlink, 0)
    }

    /// Like [`resolve`](Self::resolve) but a missing path is `Ok(None)`.
    ///
    /// Other failures (symlink loops, missing cwd) still propagate.
    pub fn try_resolve(
        &self,
        arena: &NodeArena,
        cwd: Option<NodeId>,
        path: &str,
        follow_final_symlink: bool,
    ) -> FsResult<Option<NodeId>> {
        match self.resolve(arena, cwd, path, follow_final_symlink) {
            Ok(id) => Ok(Some(id)),
            Err(err) if err.is_not_found() => Ok(None),
            Err(err) => Err(err),
        }
    }

    fn resolve_from(
        &self,
        arena: &NodeArena,
        base: NodeId,
        path: &str,
        follow_final_symlink: bool,
        depth: usize,
    ) -> FsResult<NodeId> {
        if path.is_empty() {
            return Err(FsError::not_found(path));
        }

        let mut current = if path.starts_with(PATH_SEPARATOR) {
            arena.root()
        } else {
            base
        };
        let components: Vec<&str> = path
            .split(PATH_SEPARATOR)
            .filter(|c| !c.is_empty())
            .collect();

        for (index, component) in components.iter().enumerate() {
            let is_last = index + 1 == components.len();
            match *component {
                CURRENT_DIR => {}
                PARENT_DIR => {
                    current = arena.node(current)?.parent.unwrap_or(arena.root());
                }
                name => {
                    let child = arena
                        .directory(current)
                        .and_then(|dir| dir.get(name))
                        .ok_or_else(|| FsError::not_found(path))?;

                    match arena.node(child)?.symlink_target() {
                        Some(target) if follow_final_symlink || !is_last => {
                            let depth = depth + 1;
                            if depth > self.max_symlink_depth {
                                return Err(FsError::invalid_path(
                                    path,
                                    "Too many levels of symbolic links",
                                ));
                            }
                            // Relative targets continue from the directory holding the link
                            let rest = components[index + 1..].join("/");
                            let next = if rest.is_empty() {
                                target.to_string()
                            } else {
                                format!("{target}/{rest}")
                            };
                            return self.resolve_from(
                                arena,
                                current,
                                &next,
                                follow_final_symlink,
                                depth,
                            );
                        }
                        _ => current = child,
                    }
                }
            }
        }

        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Directory, IdGenerator, NodeKind};

    struct Tree {
        arena: NodeArena,
        a: NodeId,
        b: NodeId,
        file: NodeId,
    }

    /// `/a/b/c.txt`
    fn tree() -> Tree {
        let mut arena = NodeArena::new(IdGenerator::seeded(1));
        let root = arena.root();
        let a = arena.create(NodeKind::Directory(Directory::new()));
        arena.attach(root, "a", a).unwrap();
        let b = arena.create(NodeKind::Directory(Directory::new()));
        arena.attach(a, "b", b).unwrap();
        let file = arena.create(NodeKind::File);
        arena.attach(b, "c.txt", file).unwrap();
        Tree { arena, a, b, file }
    }

    fn link(arena: &mut NodeArena, dir: NodeId, name: &str, target: &str) -> NodeId {
        let id = arena.create(NodeKind::Symlink {
            target: target.to_string(),
        });
        arena.attach(dir, name, id).unwrap();
        id
    }

    #[test]
    fn test_absolute_and_relative() {
        let t = tree();
        let r = PathResolver::new();
        let root = Some(t.arena.root());
        assert_eq!(r.resolve(&t.arena, root, "/a/b/c.txt", true).unwrap(), t.file);
        assert_eq!(r.resolve(&t.arena, Some(t.a), "b/c.txt", true).unwrap(), t.file);
        assert_eq!(r.resolve(&t.arena, Some(t.b), "/", true).unwrap(), t.arena.root());
    }

    #[test]
    fn test_repeated_and_trailing_slashes() {
        let t = tree();
        let r = PathResolver::new();
        let root = Some(t.arena.root());
        assert_eq!(r.resolve(&t.arena, root, "//a///b/", true).unwrap(), t.b);
    }

    #[test]
    fn test_dot_segments() {
        let t = tree();
        let r = PathResolver::new();
        let root = Some(t.arena.root());
        assert_eq!(
            r.resolve(&t.arena, root, "./a/./b", true).unwrap(),
            r.resolve(&t.arena, root, "a/b", true).unwrap()
        );
        assert_eq!(r.resolve(&t.arena, Some(t.b), "../..", true).unwrap(), t.arena.root());
        assert_eq!(r.resolve(&t.arena, Some(t.b), "../b/./c.txt", true).unwrap(), t.file);
    }

    #[test]
    fn test_parent_of_root_is_root() {
        let t = tree();
        let r = PathResolver::new();
        let root = t.arena.root();
        assert_eq!(r.resolve(&t.arena, Some(root), "..", true).unwrap(), root);
        assert_eq!(r.resolve(&t.arena, Some(root), "/../../a", true).unwrap(), t.a);
    }

    #[test]
    fn test_missing_component() {
        let t = tree();
        let r = PathResolver::new();
        let root = Some(t.arena.root());
        assert!(r.resolve(&t.arena, root, "/a/zzz", true).unwrap_err().is_not_found());
        assert!(r.resolve(&t.arena, root, "", true).unwrap_err().is_not_found());
        // Lookup inside a file
        assert!(
            r.resolve(&t.arena, root, "/a/b/c.txt/x", true)
                .unwrap_err()
                .is_not_found()
        );
    }

    #[test]
    fn test_missing_cwd() {
        let t = tree();
        let err = PathResolver::new().resolve(&t.arena, None, "a", true).unwrap_err();
        assert!(err.is_invalid_path());
    }

    #[test]
    fn test_try_resolve() {
        let t = tree();
        let r = PathResolver::new();
        let root = Some(t.arena.root());
        assert_eq!(r.try_resolve(&t.arena, root, "/a", true).unwrap(), Some(t.a));
        assert_eq!(r.try_resolve(&t.arena, root, "/nope", true).unwrap(), None);
    }

    #[test]
    fn test_final_symlink_follow_flag() {
        let mut t = tree();
        let root = t.arena.root();
        let l = link(&mut t.arena, root, "link", "/a/b");
        let r = PathResolver::new();
        assert_eq!(r.resolve(&t.arena, Some(root), "/link", true).unwrap(), t.b);
        assert_eq!(r.resolve(&t.arena, Some(root), "/link", false).unwrap(), l);
        // Intermediate symlinks are always followed
        assert_eq!(r.resolve(&t.arena, Some(root), "/link/c.txt", false).unwrap(), t.file);
    }

    #[test]
    fn test_relative_target_uses_link_directory() {
        let mut t = tree();
        let a = t.a;
        link(&mut t.arena, a, "rel", "b/c.txt");
        let r = PathResolver::new();
        let root = Some(t.arena.root());
        assert_eq!(r.resolve(&t.arena, root, "/a/rel", true).unwrap(), t.file);

        link(&mut t.arena, a, "up", "../a/b");
        assert_eq!(r.resolve(&t.arena, root, "/a/up/c.txt", true).unwrap(), t.file);
    }

    #[test]
    fn test_dangling_symlink() {
        let mut t = tree();
        let root = t.arena.root();
        let l = link(&mut t.arena, root, "dangling", "/missing");
        let r = PathResolver::new();
        assert!(r.resolve(&t.arena, Some(root), "/dangling", true).unwrap_err().is_not_found());
        assert_eq!(r.resolve(&t.arena, Some(root), "/dangling", false).unwrap(), l);
    }

    fn chain(hops: usize) -> (NodeArena, NodeId) {
        let mut t = tree();
        let root = t.arena.root();
        for i in 1..=hops {
            let target = if i == hops {
                "/a/b/c.txt".to_string()
            } else {
                format!("l{}", i + 1)
            };
            link(&mut t.arena, root, &format!("l{i}"), &target);
        }
        (t.arena, t.file)
    }

    #[test]
    fn test_symlink_chain_depth_boundary() {
        let r = PathResolver::new();
        for hops in [31, 32] {
            let (arena, file) = chain(hops);
            let root = Some(arena.root());
            assert_eq!(r.resolve(&arena, root, "/l1", true).unwrap(), file, "{hops} hops");
        }

        let (arena, _) = chain(33);
        let err = r.resolve(&arena, Some(arena.root()), "/l1", true).unwrap_err();
        assert!(err.is_invalid_path());
    }

    #[test]
    fn test_symlink_cycle_is_invalid_path() {
        let mut t = tree();
        let root = t.arena.root();
        link(&mut t.arena, root, "x", "y");
        link(&mut t.arena, root, "y", "x");
        let err = PathResolver::new()
            .resolve(&t.arena, Some(root), "/x", true)
            .unwrap_err();
        assert!(err.is_invalid_path());
    }

    #[test]
    fn test_custom_depth() {
        let (arena, _) = chain(3);
        let r = PathResolver::with_max_depth(2);
        assert_eq!(r.max_symlink_depth(), 2);
        assert!(r.resolve(&arena, Some(arena.root()), "/l1", true).unwrap_err().is_invalid_path());
    }
}
