//! Error types for termbridge.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Main error type for termbridge operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Request validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// SSH/Telnet transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Session lifecycle and automation errors
    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

/// Errors raised before any transport is attempted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required connect field was absent or empty
    #[error("Missing required field '{field}'")]
    MissingField { field: &'static str },
}

/// Transport layer errors (connection, authentication, I/O).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to connect to host
    #[error("Connection failed to {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// Host is not present in known_hosts (strict verification)
    #[error("Host key for {host}:{port} is unknown")]
    HostKeyUnknown { host: String, port: u16 },

    /// Host key does not match known_hosts
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// known_hosts could not be read or written
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Connection was closed unexpectedly
    #[error("Connection disconnected")]
    Disconnected,

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Session errors: registry lookups and automation failures.
///
/// The automation variants are what a failed run reports in its
/// [`RunResult`](crate::driver::RunResult) message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// No session registered under this id
    #[error("Session not found: {id}")]
    NotFound { id: String },

    /// The session is driven by a one-shot run and takes no input
    #[error("Session {id} is not interactive")]
    NotInteractive { id: String },

    /// A Unix-style `$` shell answered instead of a network device CLI
    #[error("Unsupported device: Unix-style shell detected at prompt '{prompt}'")]
    UnsupportedShell { prompt: String },

    /// A shell prompt the vendor profile does not accept at this stage
    #[error("Unsupported prompt '{prompt}' for vendor {vendor}")]
    UnsupportedPrompt { prompt: String, vendor: String },

    /// Credentials were asked for again after being supplied
    #[error("Authentication failed during {stage} stage")]
    AuthenticationFailed { stage: String },

    /// The device stayed unprivileged after `enable`
    #[error("Privilege elevation rejected, still at prompt '{prompt}'")]
    EnableRejected { prompt: String },

    /// The global deadline elapsed before completion
    #[error("Run timed out after {0:?}")]
    Timeout(Duration),

    /// The transport closed before the run completed
    #[error("Connection closed before the command completed")]
    Closed,

    /// The transport reported an error mid-run
    #[error("Transport failure: {0}")]
    Transport(String),

    /// The session was disconnected by the caller
    #[error("Run cancelled by disconnect")]
    Cancelled,
}

/// Result type alias using termbridge's Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_shell_message() {
        let err = SessionError::UnsupportedShell {
            prompt: "user@host:~$".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Unix-style shell"));
        assert!(msg.contains("user@host:~$"));
    }

    #[test]
    fn test_layered_conversion() {
        let err: Error = ValidationError::MissingField { field: "host" }.into();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(
            err.to_string(),
            "Validation error: Missing required field 'host'"
        );
    }
}
