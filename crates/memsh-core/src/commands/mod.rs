//! Command dispatch.
//!
//! This module provides:
//! - `CommandHandler`, the contract every verb implements
//! - `CommandDispatcher`, the verb registry
//! - `CommandResult`, the value every execution produces
//!
//! # Architecture
//!
//! A line is parsed into a verb and arguments, the verb is looked up in the
//! registry, and the handler runs against the filesystem. The dispatcher is
//! the only place where failures become results: parse errors, unknown
//! verbs, handler errors and handler panics all come back as a
//! `CommandResult` with `success == false`.

pub mod handlers;
mod result;

pub use result::CommandResult;

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};

use tracing::debug;

use crate::error::{FsError, FsResult};
use crate::filesystem::InMemoryFileSystem;
use crate::parser::{ParsedCommand, parse_line};

/// A single verb.
pub trait CommandHandler: Send + Sync {
    /// Verb the handler is registered under.
    fn name(&self) -> &'static str;

    /// One-line summary for help output.
    fn description(&self) -> &'static str;

    /// Synopsis, e.g. `cp [-r] <src> <dest>`.
    fn usage(&self) -> &'static str;

    /// Run the verb with its arguments (the verb itself excluded).
    fn execute(&self, fs: &mut InMemoryFileSystem, args: &[String]) -> FsResult<CommandResult>;
}

/// Registry of verb name to handler.
#[derive(Default)]
pub struct CommandDispatcher {
    handlers: HashMap<String, Box<dyn CommandHandler>>,
}

impl std::fmt::Debug for CommandDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandDispatcher")
            .field("verbs", &self.names())
            .finish()
    }
}

impl CommandDispatcher {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in verb.
    pub fn with_default_handlers() -> Self {
        let mut dispatcher = Self::new();
        dispatcher.register(handlers::Ls);
        dispatcher.register(handlers::Cd);
        dispatcher.register(handlers::Pwd);
        dispatcher.register(handlers::Mkdir);
        dispatcher.register(handlers::Rmdir);
        dispatcher.register(handlers::Touch);
        dispatcher.register(handlers::Rm);
        dispatcher.register(handlers::Mv);
        dispatcher.register(handlers::Cp);
        dispatcher.register(handlers::Ln);
        dispatcher
    }

    /// Register `handler` under its name, replacing any previous one.
    pub fn register<H: CommandHandler + 'static>(&mut self, handler: H) {
        self.handlers
            .insert(handler.name().to_string(), Box::new(handler));
    }

    pub fn get(&self, name: &str) -> Option<&dyn CommandHandler> {
        self.handlers.get(name).map(|handler| handler.as_ref())
    }

    /// Registered verbs, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// One line per verb: usage then description, sorted by verb.
    pub fn help_lines(&self) -> Vec<String> {
        let mut handlers: Vec<&dyn CommandHandler> =
            self.handlers.values().map(|handler| handler.as_ref()).collect();
        handlers.sort_by_key(|h| h.name());
        handlers
            .into_iter()
            .map(|h| format!("{:<26}{}", h.usage(), h.description()))
            .collect()
    }

    /// Parse and run `line` against `fs`.
    ///
    /// Never fails and never unwinds; every failure is reported in the
    /// returned result, prefixed with the verb when one was recognized.
    pub fn execute(&self, fs: &mut InMemoryFileSystem, line: &str) -> CommandResult {
        let (parsed, handler) = match self.lookup(line) {
            Ok(found) => found,
            Err(err) => {
                debug!(error = %err, invalid_command = err.is_invalid_command(), "rejected line");
                return CommandResult::error(err.to_string());
            }
        };

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler.execute(fs, &parsed.args)));
        let result = match outcome {
            Ok(Ok(result)) => result,
            Ok(Err(err)) => CommandResult::error(format!("{}: {err}", parsed.name)),
            Err(payload) => {
                let message = payload
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| payload.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                CommandResult::error(format!("{}: internal error: {message}", parsed.name))
            }
        };

        debug!(verb = %parsed.name, success = result.success, "dispatched");
        result
    }

    /// Parse `line` and find the handler for its verb.
    fn lookup(&self, line: &str) -> FsResult<(ParsedCommand, &dyn CommandHandler)> {
        let parsed = parse_line(line)?;
        let handler = self.get(&parsed.name).ok_or_else(|| {
            FsError::InvalidCommand(format!("Unknown command: {}", parsed.name))
        })?;
        Ok((parsed, handler))
    }
}
