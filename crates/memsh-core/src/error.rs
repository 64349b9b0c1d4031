//! Error types for the filesystem engine.
//!
//! Provides structured errors for each domain:
//!
//! - [`ParseError`] - Lexing and command-line parsing failures
//! - [`FsError`] - Path resolution, node model and per-verb failures
//!
//! The command dispatcher is the only place these are turned into a
//! [`CommandResult`](crate::commands::CommandResult); everything below it
//! propagates them with `?`.

use thiserror::Error;

/// Command-line parsing errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A `'` or `"` region was never closed.
    #[error("unclosed quote")]
    UnclosedQuote,
    /// The line ends with an unescaped backslash.
    #[error("trailing escape")]
    TrailingEscape,
    /// Empty or whitespace-only input.
    #[error("empty command")]
    EmptyCommand,
    /// The verb does not match the command name pattern.
    #[error("invalid command name: {name}")]
    InvalidCommandName {
        /// The rejected verb
        name: String,
    },
}

/// Filesystem domain errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FsError {
    /// A path component does not exist.
    #[error("{path}: No such file or directory")]
    NotFound {
        /// The path being resolved
        path: String,
    },

    /// The create, rename or link destination is already present.
    #[error("{path}: File exists")]
    AlreadyExists {
        /// The existing path
        path: String,
    },

    /// Malformed path, missing working directory, symlink loop or
    /// a hard link to a directory.
    #[error("{path}: {reason}")]
    InvalidPath {
        /// The offending path
        path: String,
        /// Why the path was rejected
        reason: String,
    },

    /// Expected a directory, found something else.
    #[error("{path}: Not a directory")]
    NotADirectory {
        /// The non-directory path
        path: String,
    },

    /// Expected a non-directory, found a directory.
    #[error("{path}: Is a directory")]
    IsADirectory {
        /// The directory path
        path: String,
    },

    /// Directory still has entries.
    #[error("{path}: Directory not empty")]
    DirectoryNotEmpty {
        /// The non-empty directory
        path: String,
    },

    /// Attempt to unlink the root directory.
    #[error("cannot remove root directory")]
    CannotRemoveRoot,

    /// Bad operands or options for a verb.
    #[error("{0}")]
    InvalidCommand(String),

    /// Lexing or parsing failed before dispatch.
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl FsError {
    pub(crate) fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    pub(crate) fn already_exists(path: impl Into<String>) -> Self {
        Self::AlreadyExists { path: path.into() }
    }

    pub(crate) fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn not_a_directory(path: impl Into<String>) -> Self {
        Self::NotADirectory { path: path.into() }
    }

    /// Returns `true` if a path component was missing.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if the destination already existed.
    #[must_use]
    pub const fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. })
    }

    /// Returns `true` for malformed paths and symlink loops.
    #[must_use]
    pub const fn is_invalid_path(&self) -> bool {
        matches!(self, Self::InvalidPath { .. })
    }

    /// Returns `true` if a directory was expected.
    #[must_use]
    pub const fn is_not_a_directory(&self) -> bool {
        matches!(self, Self::NotADirectory { .. })
    }

    /// Returns `true` for lexing, parsing and usage failures.
    #[must_use]
    pub const fn is_invalid_command(&self) -> bool {
        matches!(self, Self::InvalidCommand(_) | Self::Parse(_))
    }
}

/// Result alias for filesystem operations.
pub type FsResult<T> = Result<T, FsError>;
