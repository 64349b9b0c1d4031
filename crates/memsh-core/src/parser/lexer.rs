//! Lexer for tokenizing command lines.
//!
//! Handles:
//! - Whitespace-delimited words
//! - Single and double quotes (whitespace inside is kept)
//! - Backslash escapes, inside or outside quotes
//!
//! There are no pipes, redirections or variables.

use crate::error::ParseError;

/// Which quote region the lexer is inside.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Quote {
    None,
    Single,
    Double,
}

impl Quote {
    fn opened_by(c: char) -> Option<Self> {
        match c {
            '\'' => Some(Self::Single),
            '"' => Some(Self::Double),
            _ => None,
        }
    }

    fn closed_by(self, c: char) -> bool {
        matches!((self, c), (Self::Single, '\'') | (Self::Double, '"'))
    }
}

/// Lexer for a single command line.
#[derive(Debug)]
pub struct Lexer<'a> {
    input: &'a str,
}

impl<'a> Lexer<'a> {
    /// Create a new lexer for the given input
    pub fn new(input: &'a str) -> Self {
        Self { input }
    }

    /// Split the input into words.
    ///
    /// A backslash makes the next character literal in every state.
    /// A quote character opens a region where whitespace does not split;
    /// the other quote character is ordinary text inside it.
    ///
    /// # Errors
    ///
    /// - [`ParseError::EmptyCommand`] for empty or whitespace-only input,
    ///   or when no words remain
    /// - [`ParseError::UnclosedQuote`] if a quote region is still open
    /// - [`ParseError::TrailingEscape`] if the input ends with a lone `\`
    pub fn tokenize(self) -> Result<Vec<String>, ParseError> {
        if self.input.trim().is_empty() {
            return Err(ParseError::EmptyCommand);
        }

        let mut tokens = Vec::new();
        let mut word = String::new();
        let mut quote = Quote::None;
        let mut escaped = false;

        for c in self.input.chars() {
            if escaped {
                word.push(c);
                escaped = false;
                continue;
            }

            if c == '\\' {
                escaped = true;
            } else if quote == Quote::None {
                if let Some(opened) = Quote::opened_by(c) {
                    quote = opened;
                } else if c.is_whitespace() {
                    if !word.is_empty() {
                        tokens.push(std::mem::take(&mut word));
                    }
                } else {
                    word.push(c);
                }
            } else if quote.closed_by(c) {
                quote = Quote::None;
            } else {
                word.push(c);
            }
        }

        if escaped {
            return Err(ParseError::TrailingEscape);
        }
        if quote != Quote::None {
            return Err(ParseError::UnclosedQuote);
        }
        if !word.is_empty() {
            tokens.push(word);
        }
        if tokens.is_empty() {
            return Err(ParseError::EmptyCommand);
        }

        Ok(tokens)
    }
}

/// Tokenize `input` into words.
pub fn tokenize(input: &str) -> Result<Vec<String>, ParseError> {
    Lexer::new(input).tokenize()
}

// =============================================================================
// Tests
// =============================================================================
