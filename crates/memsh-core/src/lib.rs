//! memsh-core - an in-memory, POSIX-flavoured filesystem engine.
//!
//! The crate models a tree of files, directories and symlinks with no
//! backing storage, resolves paths over it, and runs shell-style command
//! lines against it.
//!
//! # Example
//!
//! ```
//! use memsh_core::{CommandDispatcher, InMemoryFileSystem};
//!
//! let dispatcher = CommandDispatcher::with_default_handlers();
//! let mut fs = InMemoryFileSystem::new();
//!
//! dispatcher.execute(&mut fs, "mkdir /projects");
//! dispatcher.execute(&mut fs, "touch '/projects/read me.txt'");
//!
//! let result = dispatcher.execute(&mut fs, "ls /projects");
//! assert!(result.success);
//! assert_eq!(result.output_lines, vec!["read me.txt"]);
//! ```

pub mod arena;
pub mod commands;
pub mod config;
pub mod error;
pub mod filesystem;
pub mod models;
pub mod parser;
pub mod persistence;
pub mod resolver;

pub use commands::{CommandDispatcher, CommandHandler, CommandResult};
pub use error::{FsError, FsResult, ParseError};
pub use filesystem::InMemoryFileSystem;
pub use models::{IdGenerator, Node, NodeId, NodeKind, NodeSnapshot};
pub use parser::{ParsedCommand, parse_line};
pub use resolver::PathResolver;
