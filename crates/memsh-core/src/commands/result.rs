//! Command execution result type.

use serde::Serialize;

/// Result of executing a command line.
///
/// Every dispatch produces one of these; failures are carried in
/// `error_message` rather than returned as errors.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CommandResult {
    /// Whether the command completed
    pub success: bool,
    /// Output lines, in order
    pub output_lines: Vec<String>,
    /// Failure description when `success` is false
    pub error_message: Option<String>,
}

impl CommandResult {
    /// Create a successful result with output.
    pub fn output(lines: Vec<String>) -> Self {
        Self {
            success: true,
            output_lines: lines,
            error_message: None,
        }
    }

    /// Create a successful result with no output.
    pub fn empty() -> Self {
        Self::output(vec![])
    }

    /// Create a failed result.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            output_lines: vec![],
            error_message: Some(message.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }
}
