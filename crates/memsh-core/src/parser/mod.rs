//! Command-line parser.
//!
//! Turns a raw line into a verb and its ordered arguments. The parser knows
//! nothing about the tree; arguments are passed through uninterpreted.

mod lexer;

pub use lexer::{Lexer, tokenize};

use std::sync::LazyLock;

use regex::Regex;

use crate::config::COMMAND_NAME_PATTERN;
use crate::error::ParseError;

static COMMAND_NAME_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(COMMAND_NAME_PATTERN).expect("valid regex"));

/// A verb and its arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParsedCommand {
    pub name: String,
    pub args: Vec<String>,
}

/// Check a verb against `^[A-Za-z][A-Za-z0-9_-]*$`.
pub fn validate_command_name(name: &str) -> Result<(), ParseError> {
    if COMMAND_NAME_REGEX.is_match(name) {
        Ok(())
    } else {
        Err(ParseError::InvalidCommandName {
            name: name.to_string(),
        })
    }
}

/// Tokenize `line` and split it into verb and arguments.
pub fn parse_line(line: &str) -> Result<ParsedCommand, ParseError> {
    let mut tokens = tokenize(line)?.into_iter();
    let name = tokens.next().ok_or(ParseError::EmptyCommand)?;
    validate_command_name(&name)?;
    Ok(ParsedCommand {
        name,
        args: tokens.collect(),
    })
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line() {
        let parsed = parse_line("cp -r /a '/b c'").unwrap();
        assert_eq!(parsed.name, "cp");
        assert_eq!(parsed.args, vec!["-r", "/a", "/b c"]);
    }

    #[test]
    fn test_parse_no_args() {
        let parsed = parse_line("pwd").unwrap();
        assert_eq!(parsed.name, "pwd");
        assert!(parsed.args.is_empty());
    }

    #[test]
    fn test_validate_command_name() {
        assert!(validate_command_name("ls").is_ok());
        assert!(validate_command_name("my-cmd_2").is_ok());
        assert!(validate_command_name("2ls").is_err());
        assert!(validate_command_name("-ls").is_err());
        assert!(validate_command_name("l.s").is_err());
        assert!(validate_command_name("").is_err());
    }

    #[test]
    fn test_parse_rejects_bad_verb() {
        assert_eq!(
            parse_line("./run x"),
            Err(ParseError::InvalidCommandName {
                name: "./run".to_string()
            })
        );
    }

    #[test]
    fn test_parse_propagates_lexer_errors() {
        assert_eq!(parse_line("   "), Err(ParseError::EmptyCommand));
        assert_eq!(parse_line("ls 'x"), Err(ParseError::UnclosedQuote));
    }
}
