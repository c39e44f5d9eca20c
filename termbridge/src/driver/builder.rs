//! Connect and run requests.
//!
//! Requests arrive with every field optional (they usually come from a
//! client payload) and are validated into a [`Target`] before any transport
//! is attempted.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use crate::error::{Result, ValidationError};
use crate::transport::TransportKind;

/// Login credentials for a device.
pub struct Credentials {
    /// Login username.
    pub username: String,

    /// Login password, also used for keyboard-interactive challenges.
    pub password: SecretString,

    /// Privileged-mode password; the login password is used when absent.
    pub enable_password: Option<SecretString>,
}

impl Credentials {
    /// Create credentials without a separate enable password.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
            enable_password: None,
        }
    }

    /// Set a separate enable password.
    pub fn with_enable_password(mut self, password: impl Into<String>) -> Self {
        self.enable_password = Some(SecretString::from(password.into()));
        self
    }

    /// The password to answer an enable prompt with.
    pub fn enable_secret(&self) -> &str {
        self.enable_password
            .as_ref()
            .unwrap_or(&self.password)
            .expose_secret()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<hidden>")
            .field("enable_password", &self.enable_password.as_ref().map(|_| "<hidden>"))
            .finish()
    }
}

/// Request to open a session.
///
/// # Example
///
/// ```rust
/// use termbridge::{ConnectRequest, TransportKind};
///
/// let target = ConnectRequest::new()
///     .kind(TransportKind::Telnet)
///     .host("10.0.0.1")
///     .username("admin")
///     .password("secret")
///     .vendor(2)
///     .validate()
///     .unwrap();
///
/// assert_eq!(target.port, 23);
/// ```
#[derive(Default)]
pub struct ConnectRequest {
    kind: Option<TransportKind>,
    host: Option<String>,
    port: Option<u16>,
    username: Option<String>,
    password: Option<String>,
    enable_password: Option<String>,
    vendor: Option<u8>,
}

impl ConnectRequest {
    /// Create an empty request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the transport kind.
    pub fn kind(mut self, kind: TransportKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Set the target host.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set the port (default: 22 for SSH, 23 for Telnet).
    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the login username.
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Set the login password.
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the enable password.
    pub fn enable_password(mut self, password: impl Into<String>) -> Self {
        self.enable_password = Some(password.into());
        self
    }

    /// Set the vendor identifier (only used by one-shot runs).
    pub fn vendor(mut self, vendor: u8) -> Self {
        self.vendor = Some(vendor);
        self
    }

    /// Check required fields and fill in defaults.
    pub fn validate(self) -> Result<Target> {
        let kind = self.kind.ok_or(ValidationError::MissingField { field: "type" })?;
        let host = required(self.host, "host")?;
        let username = required(self.username, "username")?;
        let password = required(self.password, "password")?;

        let mut credentials = Credentials::new(username, password);
        if let Some(enable) = self.enable_password.filter(|p| !p.is_empty()) {
            credentials = credentials.with_enable_password(enable);
        }

        Ok(Target {
            kind,
            port: self.port.unwrap_or_else(|| kind.default_port()),
            host,
            credentials: Arc::new(credentials),
            vendor: self.vendor.unwrap_or_default(),
        })
    }
}

fn required(value: Option<String>, field: &'static str) -> Result<String> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ValidationError::MissingField { field }.into()),
    }
}

/// A validated connect request.
#[derive(Debug, Clone)]
pub struct Target {
    /// Transport to open.
    pub kind: TransportKind,

    /// Device host.
    pub host: String,

    /// Device port.
    pub port: u16,

    /// Login credentials.
    pub credentials: Arc<Credentials>,

    /// Vendor identifier; unknown ids use the fallback profile.
    pub vendor: u8,
}

/// Request for a one-shot configuration retrieval.
#[derive(Default)]
pub struct RunRequest {
    /// Where to connect and how to log in.
    pub connect: ConnectRequest,

    /// Overrides the configured run timeout.
    pub timeout: Option<Duration>,
}

impl RunRequest {
    /// Create a run request.
    pub fn new(connect: ConnectRequest) -> Self {
        Self {
            connect,
            timeout: None,
        }
    }

    /// Override the global deadline for this run.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
