//! Filesystem and shell configuration.
//!
//! Centralizes the constants shared by the resolver, the parser and the
//! command layer.

// =============================================================================
// Path Configuration
// =============================================================================

/// Separator between path components.
pub const PATH_SEPARATOR: char = '/';

/// Absolute path of the root directory.
pub const ROOT_PATH: &str = "/";

/// Name of the "current directory" path component.
pub const CURRENT_DIR: &str = ".";

/// Name of the "parent directory" path component.
pub const PARENT_DIR: &str = "..";

/// Maximum number of symlink hops followed during a single resolution.
///
/// A chain of exactly this many links resolves; one more fails with
/// an invalid-path error. This is the only cycle guard.
pub const MAX_SYMLINK_DEPTH: usize = 32;

// =============================================================================
// Command Configuration
// =============================================================================

/// Pattern every command verb must match.
pub const COMMAND_NAME_PATTERN: &str = r"^[A-Za-z][A-Za-z0-9_-]*$";

/// Separator printed between an entry name and its symlink target in `ls`.
pub const SYMLINK_ARROW: &str = " -> ";

/// Suffix appended to directory names in `ls`.
pub const DIRECTORY_SUFFIX: char = '/';

// =============================================================================
// Shell Configuration
// =============================================================================

/// Prompt prefix shown before the working directory.
pub const PROMPT_PREFIX: &str = "memsh:";

/// Prompt suffix shown after the working directory.
pub const PROMPT_SUFFIX: &str = "$ ";
