//! # Termbridge
//!
//! Async SSH/Telnet session automation for network devices.
//!
//! Termbridge opens interactive character-stream sessions to routers and
//! switches, drives them through login, privilege elevation and a
//! configuration dump without human interaction, and republishes the
//! device output to any number of pollers.
//!
//! ## Features
//!
//! - SSH via russh (password and keyboard-interactive) and raw Telnet with
//!   option negotiation handled in-crate
//! - Output sanitizing: ANSI sequences, pager banners, backspace erase runs
//! - Table-driven prompt detection across vendor dialects
//! - One-shot runs with idle and global timeouts, completing exactly once
//! - Persistent sessions with cursor-based output streaming
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use termbridge::{Bridge, BridgeConfig, ConnectRequest, RunRequest, TransportKind};
//!
//! #[tokio::main]
//! async fn main() {
//!     let bridge = Bridge::new(BridgeConfig::default());
//!
//!     let result = bridge
//!         .run(RunRequest::new(
//!             ConnectRequest::new()
//!                 .kind(TransportKind::Telnet)
//!                 .host("192.168.1.1")
//!                 .username("admin")
//!                 .password("secret")
//!                 .vendor(2),
//!         ))
//!         .await;
//!
//!     println!("{}", result.output);
//! }
//! ```

pub mod bridge;
pub mod channel;
pub mod config;
pub mod driver;
pub mod error;
pub mod platform;
pub mod session;
pub mod transport;

// Re-export main types for convenience
pub use bridge::Bridge;
pub use config::BridgeConfig;
pub use driver::{ConnectRequest, Credentials, RunRequest, RunResult, Stage, Target};
pub use error::{Error, Result};
pub use platform::{VendorProfile, VendorTable};
pub use session::{OutputStream, SessionId, SessionRegistry, StreamStart};
pub use transport::{HostKeyVerification, NegotiationMode, Transport, TransportEvent, TransportKind};
