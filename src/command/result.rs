//! Captured result of an external command

use serde::{Deserialize, Serialize};

/// Text recorded when a command could not produce output
pub const UNKNOWN: &str = "unknown";

/// Output of a single external command invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandResult {
    /// Whether the process started and exited with status zero
    pub succeeded: bool,

    /// Trimmed standard output, or [`UNKNOWN`] on failure
    pub text: String,

    /// Logical ordering marker, increasing per runner invocation
    pub invoked_at: u64,

    /// Why the command was unavailable, if it was
    pub failure: Option<String>,
}

impl CommandResult {
    pub fn success(text: &str, invoked_at: u64) -> Self {
        Self {
            succeeded: true,
            text: text.trim().to_string(),
            invoked_at,
            failure: None,
        }
    }

    /// A sentinel result for a command that could not be run or exited non-zero
    pub fn unavailable(reason: impl Into<String>, invoked_at: u64) -> Self {
        Self {
            succeeded: false,
            text: UNKNOWN.to_string(),
            invoked_at,
            failure: Some(reason.into()),
        }
    }

    pub fn is_sentinel(&self) -> bool {
        !self.succeeded && self.text == UNKNOWN
    }
}
