//! SSH and Telnet connection configuration.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::driver::Credentials;

/// Host key verification mode, analogous to OpenSSH's `StrictHostKeyChecking`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HostKeyVerification {
    /// Reject unknown and changed keys.
    Strict,

    /// Accept and auto-learn unknown keys, but reject changed keys.
    AcceptNew,

    /// Accept all keys without checking. Lab and console-server gear
    /// regenerates keys constantly, so this is the default.
    #[default]
    Disabled,
}

/// How the Telnet transport treats option negotiation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NegotiationMode {
    /// Answer every DO with WONT and every WILL with DONT.
    #[default]
    Refuse,

    /// Absorb negotiation without answering (raw TCP consoles).
    Passive,
}

/// SSH connection configuration.
#[derive(Debug, Clone)]
pub struct SshConfig {
    /// Target host (hostname or IP address).
    pub host: String,

    /// SSH port.
    pub port: u16,

    /// Login credentials; the password also answers keyboard-interactive
    /// challenges.
    pub credentials: Arc<Credentials>,

    /// Connection and authentication timeout.
    pub timeout: Duration,

    /// Terminal type requested for the PTY.
    pub terminal_type: String,

    /// Terminal width for PTY.
    pub terminal_width: u32,

    /// Terminal height for PTY.
    pub terminal_height: u32,

    /// Host key verification mode.
    pub host_key_verification: HostKeyVerification,

    /// Path to known_hosts file (OpenSSH default when `None`).
    pub known_hosts_path: Option<PathBuf>,

    /// SSH keepalive interval for long-lived sessions.
    pub keepalive_interval: Option<Duration>,
}

impl SshConfig {
    /// Get the socket address for connection.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Telnet connection configuration.
#[derive(Debug, Clone)]
pub struct TelnetConfig {
    /// Target host (hostname or IP address).
    pub host: String,

    /// Telnet port.
    pub port: u16,

    /// Connection timeout.
    pub timeout: Duration,

    /// Option negotiation behavior.
    pub negotiation: NegotiationMode,

    /// Send a bare line terminator after connecting to make silent
    /// devices print their banner.
    pub kickstart: Option<String>,
}

impl TelnetConfig {
    /// Get the socket address for connection.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
