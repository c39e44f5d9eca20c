//! Result of a one-shot run.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, SessionError};

/// Outcome of [`Bridge::run`](crate::Bridge::run).
///
/// A failed run still carries whatever output was captured before the
/// failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunResult {
    /// Whether the run completed without error.
    pub success: bool,

    /// Captured command output (normalized - command echo and trailing prompt removed).
    pub output: String,

    /// Human-readable completion or failure message.
    pub message: String,

    /// Time from run start to completion.
    #[serde(skip)]
    pub elapsed: Duration,

    /// The failure, for callers that want to match on it.
    #[serde(skip)]
    pub error: Option<SessionError>,
}

impl RunResult {
    /// Create a successful result.
    pub fn success(output: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            message: message.into(),
            elapsed: Duration::ZERO,
            error: None,
        }
    }

    /// Create a failed result.
    pub fn failed(output: impl Into<String>, error: SessionError) -> Self {
        Self {
            success: false,
            output: output.into(),
            message: error.to_string(),
            elapsed: Duration::ZERO,
            error: Some(error),
        }
    }

    /// A run that failed before any device output, e.g. on validation or
    /// connect.
    pub fn from_error(error: Error) -> Self {
        let message = error.to_string();
        let error = match error {
            Error::Session(e) => Some(e),
            Error::Transport(e) => Some(SessionError::Transport(e.to_string())),
            Error::Validation(_) => None,
        };
        Self {
            success: false,
            output: String::new(),
            message,
            elapsed: Duration::ZERO,
            error,
        }
    }

    /// Get the output lines as an iterator.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.output.lines()
    }
}
