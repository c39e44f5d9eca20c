//! Session registry and output streaming.
//!
//! Every session, persistent or one-shot, has an entry in a
//! [`SessionRegistry`]. The entry holds the append-only [`OutputLog`] that
//! [`OutputStream`] consumers poll, and the control channel into the task
//! that owns the transport. Only that task ever touches the transport.

mod output;
mod registry;
mod stream;

pub use output::{LogSlice, OutputLog};
pub use registry::SessionRegistry;
pub use stream::{OutputStream, StreamStart};

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::{Result, SessionError};
use crate::transport::TransportKind;

/// Opaque session identifier (UUID v4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Create a new random session ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for SessionId {
    type Err = SessionError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| SessionError::NotFound { id: s.to_string() })
    }
}

/// How a session is driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionMode {
    /// Opened by `connect`; clients send input.
    Interactive,
    /// Driven by a one-shot run; input is refused.
    Run,
}

/// Message to the task that owns a session's transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Control {
    /// Write text (line terminator already appended).
    Send(String),
    /// Close the transport and stop.
    Close,
}

/// A registered session.
#[derive(Debug)]
pub struct SessionEntry {
    id: SessionId,
    kind: TransportKind,
    mode: SessionMode,
    output: Arc<OutputLog>,
    control: mpsc::UnboundedSender<Control>,
}

impl SessionEntry {
    /// Session identifier.
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Transport kind.
    pub fn kind(&self) -> TransportKind {
        self.kind
    }

    /// Interactive or one-shot.
    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    /// The session's output log.
    pub fn output(&self) -> &Arc<OutputLog> {
        &self.output
    }

    /// Hand a message to the session task.
    pub fn control(&self, message: Control) -> Result<()> {
        self.control
            .send(message)
            .map_err(|_| SessionError::Closed)?;
        Ok(())
    }
}
