//! Interactive shell and one-shot runner over an in-memory filesystem.
//!
//! The binary is a thin wrapper around [`Session`]: it parses [`Cli`],
//! loads the optional state file, runs either the `-c` lines or a prompt
//! loop, and saves the state back on exit.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use memsh_core::config::{PROMPT_PREFIX, PROMPT_SUFFIX};
use memsh_core::{CommandDispatcher, InMemoryFileSystem, persistence};
use tracing::{debug, warn};

/// Command-line options for `memsh`.
#[derive(Parser, Debug, Default)]
#[command(name = "memsh", version, about = "A shell over an in-memory filesystem")]
pub struct Cli {
    /// Snapshot file loaded at start and saved on exit
    #[arg(long, env = "MEMSH_STATE", value_name = "FILE")]
    pub state: Option<PathBuf>,

    /// Run this command line instead of the interactive prompt (repeatable)
    #[arg(short = 'c', long = "command", value_name = "LINE")]
    pub commands: Vec<String>,

    /// Do not write the state file back on exit
    #[arg(long)]
    pub no_save: bool,

    /// Enable debug logging on stderr
    #[arg(short, long)]
    pub verbose: bool,
}

/// What the caller should do after a line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LineOutcome {
    /// Keep reading; `success` is false if the command failed
    Continue { success: bool },
    /// The user asked to leave
    Exit,
}

/// A filesystem, its dispatcher and where to persist it.
#[derive(Debug)]
pub struct Session {
    fs: InMemoryFileSystem,
    dispatcher: CommandDispatcher,
    state: Option<PathBuf>,
    save_on_exit: bool,
}

impl Session {
    /// Session over a fresh filesystem that is never saved.
    pub fn new() -> Self {
        Self {
            fs: InMemoryFileSystem::new(),
            dispatcher: CommandDispatcher::with_default_handlers(),
            state: None,
            save_on_exit: false,
        }
    }

    /// Session backed by `state`, restored from it when it holds a valid
    /// snapshot. Unusable files are logged and replaced by a fresh tree.
    pub fn open(state: Option<PathBuf>, save_on_exit: bool) -> Self {
        let mut session = Self::new();
        if let Some(path) = &state {
            if let Some(snapshot) = persistence::read_snapshot(path) {
                if let Err(e) = session.fs.restore(&snapshot) {
                    warn!(path = %path.display(), error = %e, "ignoring unusable snapshot");
                }
            }
        }
        session.state = state;
        session.save_on_exit = save_on_exit;
        session
    }

    pub fn filesystem(&self) -> &InMemoryFileSystem {
        &self.fs
    }

    /// `memsh:<cwd>$ `
    pub fn prompt(&self) -> String {
        let cwd = self.fs.pwd().unwrap_or_else(|_| "?".to_string());
        format!("{PROMPT_PREFIX}{cwd}{PROMPT_SUFFIX}")
    }

    /// Run one line, writing output lines to `out` and errors to `err`.
    ///
    /// Blank lines are skipped; `help` and `exit` are handled here.
    pub fn run_line(
        &mut self,
        line: &str,
        out: &mut impl Write,
        err: &mut impl Write,
    ) -> io::Result<LineOutcome> {
        let trimmed = line.trim();
        match trimmed {
            "" => return Ok(LineOutcome::Continue { success: true }),
            "exit" => return Ok(LineOutcome::Exit),
            "help" => {
                for help in self.dispatcher.help_lines() {
                    writeln!(out, "{help}")?;
                }
                return Ok(LineOutcome::Continue { success: true });
            }
            _ => {}
        }

        let result = self.dispatcher.execute(&mut self.fs, trimmed);
        for output in &result.output_lines {
            writeln!(out, "{output}")?;
        }
        if let Some(message) = &result.error_message {
            writeln!(err, "{message}")?;
        }
        Ok(LineOutcome::Continue {
            success: result.success,
        })
    }

    /// Run `lines` in order. Returns `true` if none failed.
    pub fn run_script<S: AsRef<str>>(
        &mut self,
        lines: &[S],
        out: &mut impl Write,
        err: &mut impl Write,
    ) -> io::Result<bool> {
        let mut all_ok = true;
        for line in lines {
            match self.run_line(line.as_ref(), out, err)? {
                LineOutcome::Continue { success } => all_ok &= success,
                LineOutcome::Exit => break,
            }
        }
        Ok(all_ok)
    }

    /// Prompt loop until EOF or `exit`.
    pub fn run_interactive(
        &mut self,
        input: &mut impl BufRead,
        out: &mut impl Write,
        err: &mut impl Write,
    ) -> io::Result<()> {
        let mut line = String::new();
        loop {
            write!(out, "{}", self.prompt())?;
            out.flush()?;

            line.clear();
            if input.read_line(&mut line)? == 0 {
                writeln!(out)?;
                return Ok(());
            }
            if self.run_line(&line, out, err)? == LineOutcome::Exit {
                return Ok(());
            }
        }
    }

    /// Write the filesystem to the state file, if one is configured.
    pub fn save(&self) -> Result<()> {
        let Some(path) = self.state.as_ref().filter(|_| self.save_on_exit) else {
            return Ok(());
        };
        let snapshot = self.fs.snapshot().context("failed to snapshot filesystem")?;
        persistence::write_snapshot(path, &snapshot)
            .with_context(|| format!("failed to write state file {}", path.display()))?;
        debug!(path = %path.display(), "state saved");
        Ok(())
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Run the shell described by `cli` on the process's standard streams.
///
/// Returns `false` if any one-shot command failed.
pub fn run(cli: &Cli) -> Result<bool> {
    let mut session = Session::open(cli.state.clone(), !cli.no_save);
    let mut out = io::stdout().lock();
    let mut err = io::stderr().lock();

    let ok = if cli.commands.is_empty() {
        let mut input = io::stdin().lock();
        session
            .run_interactive(&mut input, &mut out, &mut err)
            .context("terminal I/O failed")?;
        true
    } else {
        session
            .run_script(&cli.commands, &mut out, &mut err)
            .context("terminal I/O failed")?
    };

    session.save()?;
    Ok(ok)
}
