//! Bridge configuration.

use std::path::PathBuf;
use std::time::Duration;

use crate::transport::{HostKeyVerification, NegotiationMode, TransportKind};

/// Tunables shared by every session a [`Bridge`](crate::Bridge) opens.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use termbridge::BridgeConfig;
///
/// let config = BridgeConfig::default()
///     .with_idle_timeout(Duration::from_secs(3))
///     .with_run_timeout(Duration::from_secs(60));
///
/// assert_eq!(config.idle_timeout, Duration::from_secs(3));
/// ```
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Silence after which a run completes successfully.
    pub idle_timeout: Duration,

    /// Global run deadline unless the request overrides it.
    pub run_timeout: Duration,

    /// How often output streams poll their log.
    pub poll_interval: Duration,

    /// TCP connect plus SSH handshake and authentication limit.
    pub connect_timeout: Duration,

    /// Pause before answering a username prompt.
    pub settle_delay: Duration,

    /// Password prompts answered before login is declared failed.
    pub max_login_attempts: u32,

    /// Line terminator for SSH sessions.
    pub ssh_line_ending: String,

    /// Line terminator for Telnet sessions.
    pub telnet_line_ending: String,

    /// PTY type requested over SSH.
    pub terminal_type: String,

    /// PTY width.
    pub terminal_width: u32,

    /// PTY height.
    pub terminal_height: u32,

    /// SSH host key policy.
    pub host_key_verification: HostKeyVerification,

    /// known_hosts file (OpenSSH default when `None`).
    pub known_hosts_path: Option<PathBuf>,

    /// SSH keepalive interval for persistent sessions.
    pub keepalive_interval: Option<Duration>,

    /// Telnet option negotiation behavior.
    pub telnet_negotiation: NegotiationMode,

    /// Sent right after a Telnet connect; `None` disables it.
    pub telnet_kickstart: Option<String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(5),
            run_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(500),
            connect_timeout: Duration::from_secs(10),
            settle_delay: Duration::from_millis(200),
            max_login_attempts: 3,
            ssh_line_ending: "\n".into(),
            telnet_line_ending: "\r\n".into(),
            terminal_type: "vt100".into(),
            terminal_width: 511,
            terminal_height: 24,
            host_key_verification: HostKeyVerification::Disabled,
            known_hosts_path: None,
            keepalive_interval: Some(Duration::from_secs(30)),
            telnet_negotiation: NegotiationMode::Refuse,
            telnet_kickstart: Some("\r\n".into()),
        }
    }
}

impl BridgeConfig {
    /// Line terminator for the given transport.
    pub fn line_ending(&self, kind: TransportKind) -> &str {
        match kind {
            TransportKind::Ssh => &self.ssh_line_ending,
            TransportKind::Telnet => &self.telnet_line_ending,
        }
    }

    /// Set the idle window.
    pub fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Set the default run deadline.
    pub fn with_run_timeout(mut self, timeout: Duration) -> Self {
        self.run_timeout = timeout;
        self
    }

    /// Set the stream poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set the connect timeout.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the username settle delay.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Set how many password prompts are answered during login.
    pub fn with_max_login_attempts(mut self, attempts: u32) -> Self {
        self.max_login_attempts = attempts;
        self
    }

    /// Set the line terminator for a transport.
    pub fn with_line_ending(mut self, kind: TransportKind, ending: impl Into<String>) -> Self {
        match kind {
            TransportKind::Ssh => self.ssh_line_ending = ending.into(),
            TransportKind::Telnet => self.telnet_line_ending = ending.into(),
        }
        self
    }

    /// Set the PTY type.
    pub fn with_terminal_type(mut self, terminal_type: impl Into<String>) -> Self {
        self.terminal_type = terminal_type.into();
        self
    }

    /// Set the PTY dimensions.
    pub fn with_terminal_size(mut self, width: u32, height: u32) -> Self {
        self.terminal_width = width;
        self.terminal_height = height;
        self
    }

    /// Set the SSH host key policy.
    pub fn with_host_key_verification(mut self, mode: HostKeyVerification) -> Self {
        self.host_key_verification = mode;
        self
    }

    /// Use a specific known_hosts file.
    pub fn with_known_hosts_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.known_hosts_path = Some(path.into());
        self
    }

    /// Set or disable the SSH keepalive.
    pub fn with_keepalive_interval(mut self, interval: Option<Duration>) -> Self {
        self.keepalive_interval = interval;
        self
    }

    /// Set the Telnet negotiation mode.
    pub fn with_telnet_negotiation(mut self, mode: NegotiationMode) -> Self {
        self.telnet_negotiation = mode;
        self
    }

    /// Set or disable the Telnet kickstart.
    pub fn with_telnet_kickstart(mut self, kickstart: Option<String>) -> Self {
        self.telnet_kickstart = kickstart;
        self
    }
}
