//! Built-in verb handlers.
//!
//! Each handler validates its own arguments and then calls one facade
//! operation per operand. Argument errors are reported before any path is
//! resolved.

use super::{CommandHandler, CommandResult};
use crate::error::{FsError, FsResult};
use crate::filesystem::InMemoryFileSystem;

// =============================================================================
// Argument Parsing
// =============================================================================

/// Flags and operands of one invocation.
#[derive(Debug, Default)]
struct Invocation<'a> {
    flags: Vec<char>,
    operands: Vec<&'a str>,
}

impl<'a> Invocation<'a> {
    /// Split `args` into flags and operands.
    ///
    /// Any token starting with `-` (other than a lone `-`) is a flag
    /// cluster, wherever it appears; each letter must be in `allowed`.
    /// A `--` ends option parsing and every later token is an operand.
    fn parse(args: &'a [String], allowed: &str) -> FsResult<Self> {
        let mut invocation = Self::default();
        let mut options_done = false;
        for arg in args {
            if options_done {
                invocation.operands.push(arg);
                continue;
            }
            if arg == "--" {
                options_done = true;
                continue;
            }
            match arg.strip_prefix('-') {
                Some(letters) if !letters.is_empty() => {
                    for flag in letters.chars() {
                        if !allowed.contains(flag) {
                            return Err(FsError::InvalidCommand(format!(
                                "invalid option -- '{flag}'"
                            )));
                        }
                        invocation.flags.push(flag);
                    }
                }
                _ => invocation.operands.push(arg),
            }
        }
        Ok(invocation)
    }

    fn has(&self, flag: char) -> bool {
        self.flags.contains(&flag)
    }

    fn at_least_one(&self) -> FsResult<&[&'a str]> {
        if self.operands.is_empty() {
            return Err(missing_operand());
        }
        Ok(&self.operands)
    }

    fn at_most_one(&self) -> FsResult<Option<&'a str>> {
        match self.operands.as_slice() {
            [] => Ok(None),
            [operand] => Ok(Some(*operand)),
            _ => Err(too_many_arguments()),
        }
    }

    fn exactly_one(&self) -> FsResult<&'a str> {
        self.at_most_one()?.ok_or_else(missing_operand)
    }

    fn exactly_two(&self) -> FsResult<(&'a str, &'a str)> {
        match self.operands.as_slice() {
            [first, second] => Ok((*first, *second)),
            [] | [_] => Err(missing_operand()),
            _ => Err(too_many_arguments()),
        }
    }
}

fn missing_operand() -> FsError {
    FsError::InvalidCommand("missing operand".to_string())
}

fn too_many_arguments() -> FsError {
    FsError::InvalidCommand("too many arguments".to_string())
}

// =============================================================================
// Handlers
// =============================================================================

/// `ls [-i] [path]`
#[derive(Clone, Copy, Debug, Default)]
pub struct Ls;

impl CommandHandler for Ls {
    fn name(&self) -> &'static str {
        "ls"
    }

    fn description(&self) -> &'static str {
        "List directory contents"
    }

    fn usage(&self) -> &'static str {
        "ls [-i] [path]"
    }

    fn execute(&self, fs: &mut InMemoryFileSystem, args: &[String]) -> FsResult<CommandResult> {
        let invocation = Invocation::parse(args, "i")?;
        let path = invocation.at_most_one()?.unwrap_or(".");
        Ok(CommandResult::output(fs.ls(path, invocation.has('i'))?))
    }
}

/// `cd <dir>`
#[derive(Clone, Copy, Debug, Default)]
pub struct Cd;

impl CommandHandler for Cd {
    fn name(&self) -> &'static str {
        "cd"
    }

    fn description(&self) -> &'static str {
        "Change the current directory"
    }

    fn usage(&self) -> &'static str {
        "cd <dir>"
    }

    fn execute(&self, fs: &mut InMemoryFileSystem, args: &[String]) -> FsResult<CommandResult> {
        let path = Invocation::parse(args, "")?.exactly_one()?;
        fs.cd(path)?;
        Ok(CommandResult::empty())
    }
}

/// `pwd`
#[derive(Clone, Copy, Debug, Default)]
pub struct Pwd;

impl CommandHandler for Pwd {
    fn name(&self) -> &'static str {
        "pwd"
    }

    fn description(&self) -> &'static str {
        "Print the current directory"
    }

    fn usage(&self) -> &'static str {
        "pwd"
    }

    fn execute(&self, fs: &mut InMemoryFileSystem, args: &[String]) -> FsResult<CommandResult> {
        if Invocation::parse(args, "")?.at_most_one()?.is_some() {
            return Err(too_many_arguments());
        }
        Ok(CommandResult::output(vec![fs.pwd()?]))
    }
}

/// `mkdir <dir>...`
#[derive(Clone, Copy, Debug, Default)]
pub struct Mkdir;

impl CommandHandler for Mkdir {
    fn name(&self) -> &'static str {
        "mkdir"
    }

    fn description(&self) -> &'static str {
        "Create directories"
    }

    fn usage(&self) -> &'static str {
        "mkdir <dir>..."
    }

    fn execute(&self, fs: &mut InMemoryFileSystem, args: &[String]) -> FsResult<CommandResult> {
        let invocation = Invocation::parse(args, "")?;
        for path in invocation.at_least_one()? {
            fs.mkdir(path)?;
        }
        Ok(CommandResult::empty())
    }
}

/// `rmdir <dir>...`
#[derive(Clone, Copy, Debug, Default)]
pub struct Rmdir;

impl CommandHandler for Rmdir {
    fn name(&self) -> &'static str {
        "rmdir"
    }

    fn description(&self) -> &'static str {
        "Remove empty directories"
    }

    fn usage(&self) -> &'static str {
        "rmdir <dir>..."
    }

    fn execute(&self, fs: &mut InMemoryFileSystem, args: &[String]) -> FsResult<CommandResult> {
        let invocation = Invocation::parse(args, "")?;
        for path in invocation.at_least_one()? {
            fs.rmdir(path)?;
        }
        Ok(CommandResult::empty())
    }
}

/// `touch <file>...`
#[derive(Clone, Copy, Debug, Default)]
pub struct Touch;

impl CommandHandler for Touch {
    fn name(&self) -> &'static str {
        "touch"
    }

    fn description(&self) -> &'static str {
        "Create empty files or refresh timestamps"
    }

    fn usage(&self) -> &'static str {
        "touch <file>..."
    }

    fn execute(&self, fs: &mut InMemoryFileSystem, args: &[String]) -> FsResult<CommandResult> {
        let invocation = Invocation::parse(args, "")?;
        for path in invocation.at_least_one()? {
            fs.touch(path)?;
        }
        Ok(CommandResult::empty())
    }
}

/// `rm <file>...`
#[derive(Clone, Copy, Debug, Default)]
pub struct Rm;

impl CommandHandler for Rm {
    fn name(&self) -> &'static str {
        "rm"
    }

    fn description(&self) -> &'static str {
        "Remove files and links"
    }

    fn usage(&self) -> &'static str {
        "rm <file>..."
    }

    fn execute(&self, fs: &mut InMemoryFileSystem, args: &[String]) -> FsResult<CommandResult> {
        let invocation = Invocation::parse(args, "")?;
        for path in invocation.at_least_one()? {
            fs.rm(path)?;
        }
        Ok(CommandResult::empty())
    }
}

/// `mv <src> <dest>`
#[derive(Clone, Copy, Debug, Default)]
pub struct Mv;

impl CommandHandler for Mv {
    fn name(&self) -> &'static str {
        "mv"
    }

    fn description(&self) -> &'static str {
        "Move or rename an entry"
    }

    fn usage(&self) -> &'static str {
        "mv <src> <dest>"
    }

    fn execute(&self, fs: &mut InMemoryFileSystem, args: &[String]) -> FsResult<CommandResult> {
        let (src, dest) = Invocation::parse(args, "")?.exactly_two()?;
        fs.mv(src, dest)?;
        Ok(CommandResult::empty())
    }
}

/// `cp [-r] <src> <dest>`
#[derive(Clone, Copy, Debug, Default)]
pub struct Cp;

impl CommandHandler for Cp {
    fn name(&self) -> &'static str {
        "cp"
    }

    fn description(&self) -> &'static str {
        "Copy an entry (-r copies directory contents)"
    }

    fn usage(&self) -> &'static str {
        "cp [-r] <src> <dest>"
    }

    fn execute(&self, fs: &mut InMemoryFileSystem, args: &[String]) -> FsResult<CommandResult> {
        let invocation = Invocation::parse(args, "rR")?;
        let (src, dest) = invocation.exactly_two()?;
        fs.cp(src, dest, invocation.has('r') || invocation.has('R'))?;
        Ok(CommandResult::empty())
    }
}

/// `ln [-s] <target> <link>`
#[derive(Clone, Copy, Debug, Default)]
pub struct Ln;

impl CommandHandler for Ln {
    fn name(&self) -> &'static str {
        "ln"
    }

    fn description(&self) -> &'static str {
        "Create a hard link, or a symbolic link with -s"
    }

    fn usage(&self) -> &'static str {
        "ln [-s] <target> <link>"
    }

    fn execute(&self, fs: &mut InMemoryFileSystem, args: &[String]) -> FsResult<CommandResult> {
        let invocation = Invocation::parse(args, "s")?;
        let (target, link) = invocation.exactly_two()?;
        fs.ln(target, link, invocation.has('s'))?;
        Ok(CommandResult::empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::IdGenerator;

    fn args(strs: &[&str]) -> Vec<String> {
        strs.iter().map(|s| s.to_string()).collect()
    }

    fn fs() -> InMemoryFileSystem {
        InMemoryFileSystem::with_id_generator(IdGenerator::seeded(1))
    }

    #[test]
    fn test_invocation_flags_anywhere() {
        let raw = args(&["/a", "-r", "/b"]);
        let invocation = Invocation::parse(&raw, "rR").unwrap();
        assert!(invocation.has('r'));
        assert_eq!(invocation.operands, vec!["/a", "/b"]);
    }

    #[test]
    fn test_invocation_lone_dash_is_operand() {
        let raw = args(&["-"]);
        let invocation = Invocation::parse(&raw, "").unwrap();
        assert_eq!(invocation.operands, vec!["-"]);
    }

    #[test]
    fn test_invocation_double_dash_ends_options() {
        let raw = args(&["-r", "--", "-x", "--", "y"]);
        let invocation = Invocation::parse(&raw, "r").unwrap();
        assert!(invocation.has('r'));
        assert_eq!(invocation.operands, vec!["-x", "--", "y"]);
    }

    #[test]
    fn test_double_dash_operands_reach_filesystem() {
        let mut fs = fs();
        Touch.execute(&mut fs, &args(&["--", "-weird"])).unwrap();
        assert!(fs.exists("/-weird").unwrap());
        Rm.execute(&mut fs, &args(&["--", "-weird"])).unwrap();
        assert!(!fs.exists("/-weird").unwrap());
    }

    #[test]
    fn test_invalid_option() {
        let err = Ls.execute(&mut fs(), &args(&["-l"])).unwrap_err();
        assert_eq!(err.to_string(), "invalid option -- 'l'");
        assert!(err.is_invalid_command());
    }

    #[test]
    fn test_missing_operand_checked_before_resolution() {
        let mut fs = fs();
        let handlers: [&dyn CommandHandler; 8] = [&Cd, &Mkdir, &Rmdir, &Touch, &Rm, &Mv, &Cp, &Ln];
        for handler in handlers {
            let err = handler.execute(&mut fs, &[]).unwrap_err();
            assert_eq!(err.to_string(), "missing operand", "{}", handler.name());
        }
        let err = Mv.execute(&mut fs, &args(&["/nope"])).unwrap_err();
        assert_eq!(err.to_string(), "missing operand");
    }

    #[test]
    fn test_too_many_arguments() {
        let mut fs = fs();
        assert!(Cd.execute(&mut fs, &args(&["/", "/"])).unwrap_err().is_invalid_command());
        assert!(Ls.execute(&mut fs, &args(&["/", "/"])).unwrap_err().is_invalid_command());
        assert!(Pwd.execute(&mut fs, &args(&["x"])).unwrap_err().is_invalid_command());
        assert!(Cp.execute(&mut fs, &args(&["a", "b", "c"])).unwrap_err().is_invalid_command());
    }

    #[test]
    fn test_ls_defaults_to_cwd() {
        let mut fs = fs();
        Mkdir.execute(&mut fs, &args(&["/a", "/b"])).unwrap();
        let result = Ls.execute(&mut fs, &[]).unwrap();
        assert_eq!(result.output_lines, vec!["a/", "b/"]);
    }

    #[test]
    fn test_multi_operand_stops_at_first_failure() {
        let mut fs = fs();
        let err = Mkdir
            .execute(&mut fs, &args(&["/x", "/missing/y", "/z"]))
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(fs.exists("/x").unwrap());
        assert!(!fs.exists("/z").unwrap());
    }

    #[test]
    fn test_cp_uppercase_recursive() {
        let mut fs = fs();
        Mkdir.execute(&mut fs, &args(&["/src"])).unwrap();
        Touch.execute(&mut fs, &args(&["/src/f"])).unwrap();
        Cp.execute(&mut fs, &args(&["-R", "/src", "/dst"])).unwrap();
        assert_eq!(fs.ls("/dst", false).unwrap(), vec!["f"]);
    }

    #[test]
    fn test_ln_flag_selects_kind() {
        let mut fs = fs();
        let file = fs.touch("/f").unwrap();
        Ln.execute(&mut fs, &args(&["/f", "/hard"])).unwrap();
        Ln.execute(&mut fs, &args(&["-s", "/f", "/soft"])).unwrap();
        assert_eq!(fs.resolve("/hard", false).unwrap(), file);
        assert!(fs.node(fs.resolve("/soft", false).unwrap()).unwrap().is_symlink());
    }

    #[test]
    fn test_pwd_output() {
        let mut fs = fs();
        fs.mkdir("/a").unwrap();
        fs.cd("/a").unwrap();
        let result = Pwd.execute(&mut fs, &[]).unwrap();
        assert_eq!(result.output_lines, vec!["/a"]);
    }
}
