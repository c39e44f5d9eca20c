//! Transport layer: raw byte streams to the device.
//!
//! Every transport exposes the same capability set through [`Transport`]:
//! send bytes, receive [`TransportEvent`]s, close. The automation engine is
//! generic over the trait and never names a concrete transport.
//!
//! Both implementations run their socket in a background I/O task, so
//! [`Transport::recv`] is cancel safe and can sit in a `tokio::select!`
//! next to timers.

pub mod config;
mod negotiation;
mod ssh;
mod telnet;
#[cfg(test)]
pub(crate) mod testing;

pub use config::{HostKeyVerification, NegotiationMode, SshConfig, TelnetConfig};
pub use negotiation::{Decoded, TelnetCodec};
pub use ssh::SshTransport;
pub use telnet::TelnetTransport;

use std::fmt;
use std::future::Future;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Which kind of transport backs a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    Ssh,
    Telnet,
}

impl TransportKind {
    /// Default port for this transport.
    pub fn default_port(self) -> u16 {
        match self {
            Self::Ssh => 22,
            Self::Telnet => 23,
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ssh => f.write_str("ssh"),
            Self::Telnet => f.write_str("telnet"),
        }
    }
}

/// Something that happened on a transport.
///
/// `Error` and `Closed` are terminal: a transport delivers at most one of
/// them, once, and then [`Transport::recv`] returns `None`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Bytes from the device, negotiation already removed.
    Data(Bytes),

    /// The connection failed.
    Error(String),

    /// The peer closed the connection.
    Closed,
}

/// Capability interface over a device byte stream.
pub trait Transport: Send {
    /// The kind of transport, used to pick the line terminator.
    fn kind(&self) -> TransportKind;

    /// Queue bytes for the device.
    fn send(&mut self, data: &[u8]) -> impl Future<Output = Result<()>> + Send;

    /// Wait for the next event. Cancel safe.
    fn recv(&mut self) -> impl Future<Output = Option<TransportEvent>> + Send;

    /// Close the connection.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;
}
