//! SSH transport implementation using russh.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use log::{debug, warn};
use russh::client::{self, Handle, KeyboardInteractiveAuthResponse, Msg};
use russh::keys::PublicKey;
use russh::{Channel, ChannelMsg};
use secrecy::ExposeSecret;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::config::{HostKeyVerification, SshConfig};
use super::{Transport, TransportEvent, TransportKind};
use crate::error::{Result, TransportError};

/// Upper bound on keyboard-interactive rounds before giving up.
const MAX_KEYBOARD_INTERACTIVE_ROUNDS: usize = 5;

/// SSH transport wrapping a russh interactive shell channel.
pub struct SshTransport {
    /// The russh session handle.
    session: Handle<SshHandler>,

    writes: mpsc::UnboundedSender<Bytes>,
    events: mpsc::UnboundedReceiver<TransportEvent>,
    task: JoinHandle<()>,
}

impl SshTransport {
    /// Connect, authenticate and open a PTY shell channel.
    pub async fn connect(config: &SshConfig) -> Result<Self> {
        let ssh_config = Arc::new(client::Config {
            keepalive_interval: config.keepalive_interval,
            ..Default::default()
        });

        let host_key_error: Arc<Mutex<Option<TransportError>>> = Arc::new(Mutex::new(None));

        let handler = SshHandler {
            host: config.host.clone(),
            port: config.port,
            host_key_verification: config.host_key_verification.clone(),
            known_hosts_path: config.known_hosts_path.clone(),
            host_key_error: host_key_error.clone(),
        };

        let mut session = tokio::time::timeout(
            config.timeout,
            client::connect(ssh_config, (config.host.as_str(), config.port), handler),
        )
        .await
        .map_err(|_| TransportError::Timeout(config.timeout))?
        .map_err(|e| {
            // Prefer the detailed host key error over russh's generic UnknownKey
            match host_key_error.lock() {
                Ok(mut slot) => slot.take().unwrap_or(TransportError::Ssh(e)),
                Err(_) => TransportError::Ssh(e),
            }
        })?;

        tokio::time::timeout(config.timeout, Self::authenticate(&mut session, config))
            .await
            .map_err(|_| TransportError::Timeout(config.timeout))??;

        let channel = Self::open_shell(&session, config).await?;
        debug!("ssh shell open on {}", config.socket_addr());

        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(io_loop(channel, write_rx, event_tx));

        Ok(Self {
            session,
            writes: write_tx,
            events: event_rx,
            task,
        })
    }

    /// Request a PTY and an interactive shell.
    async fn open_shell(session: &Handle<SshHandler>, config: &SshConfig) -> Result<Channel<Msg>> {
        let channel = session
            .channel_open_session()
            .await
            .map_err(TransportError::Ssh)?;

        channel
            .request_pty(
                true,
                &config.terminal_type,
                config.terminal_width,
                config.terminal_height,
                0,
                0,
                &[],
            )
            .await
            .map_err(TransportError::Ssh)?;

        channel
            .request_shell(true)
            .await
            .map_err(TransportError::Ssh)?;

        Ok(channel)
    }

    /// Authenticate with the password, falling back to keyboard-interactive.
    ///
    /// Many network devices only offer keyboard-interactive; every challenge
    /// they send is answered with the same password.
    async fn authenticate(session: &mut Handle<SshHandler>, config: &SshConfig) -> Result<()> {
        let username = config.credentials.username.as_str();
        let password = config.credentials.password.expose_secret();

        let accepted = session
            .authenticate_password(username, password)
            .await
            .map_err(TransportError::Ssh)?
            .success();

        if accepted {
            return Ok(());
        }

        debug!("password auth rejected for '{}', trying keyboard-interactive", username);

        let mut response = session
            .authenticate_keyboard_interactive_start(username, None::<String>)
            .await
            .map_err(TransportError::Ssh)?;

        for _ in 0..MAX_KEYBOARD_INTERACTIVE_ROUNDS {
            let prompts = match response {
                KeyboardInteractiveAuthResponse::Success => return Ok(()),
                KeyboardInteractiveAuthResponse::Failure { .. } => break,
                KeyboardInteractiveAuthResponse::InfoRequest { prompts, .. } => prompts,
            };

            let answers = prompts.iter().map(|_| password.to_string()).collect();
            response = session
                .authenticate_keyboard_interactive_respond(answers)
                .await
                .map_err(TransportError::Ssh)?;
        }

        Err(TransportError::AuthenticationFailed {
            user: username.to_string(),
        }
        .into())
    }
}

async fn io_loop(
    mut channel: Channel<Msg>,
    mut writes: mpsc::UnboundedReceiver<Bytes>,
    events: mpsc::UnboundedSender<TransportEvent>,
) {
    loop {
        tokio::select! {
            msg = channel.wait() => match msg {
                Some(ChannelMsg::Data { ref data }) | Some(ChannelMsg::ExtendedData { ref data, .. }) => {
                    if events.send(TransportEvent::Data(Bytes::copy_from_slice(data))).is_err() {
                        return;
                    }
                }
                Some(ChannelMsg::Eof) | Some(ChannelMsg::Close) | None => {
                    debug!("ssh channel closed by peer");
                    let _ = events.send(TransportEvent::Closed);
                    return;
                }
                Some(_) => {}
            },
            outgoing = writes.recv() => match outgoing {
                Some(data) => {
                    if let Err(e) = channel.data(&data[..]).await {
                        warn!("ssh write failed: {}", e);
                        let _ = events.send(TransportEvent::Error(e.to_string()));
                        return;
                    }
                }
                None => {
                    let _ = channel.close().await;
                    return;
                }
            },
        }
    }
}

impl Transport for SshTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Ssh
    }

    async fn send(&mut self, data: &[u8]) -> Result<()> {
        self.writes
            .send(Bytes::copy_from_slice(data))
            .map_err(|_| TransportError::Disconnected)?;
        Ok(())
    }

    async fn recv(&mut self) -> Option<TransportEvent> {
        self.events.recv().await
    }

    async fn close(&mut self) -> Result<()> {
        let (closed, _) = mpsc::unbounded_channel();
        drop(std::mem::replace(&mut self.writes, closed));

        let disconnected = self
            .session
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await;
        self.task.abort();
        disconnected.map_err(TransportError::Ssh)?;
        Ok(())
    }
}

impl Drop for SshTransport {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// SSH client handler for russh.
struct SshHandler {
    host: String,
    port: u16,
    host_key_verification: HostKeyVerification,
    known_hosts_path: Option<PathBuf>,
    /// Detailed host key failure, surfaced by connect() instead of the
    /// generic russh::Error::UnknownKey.
    host_key_error: Arc<Mutex<Option<TransportError>>>,
}

impl SshHandler {
    /// Returns `Ok(true)` if matched, `Ok(false)` if the host is not listed.
    fn check_known_hosts(&self, pubkey: &PublicKey) -> std::result::Result<bool, TransportError> {
        let result = match self.known_hosts_path {
            Some(ref path) => {
                russh::keys::check_known_hosts_path(&self.host, self.port, pubkey, path)
            }
            None => russh::keys::check_known_hosts(&self.host, self.port, pubkey),
        };

        match result {
            Ok(matched) => Ok(matched),
            Err(russh::keys::Error::KeyChanged { line }) => Err(TransportError::HostKeyChanged {
                host: self.host.clone(),
                port: self.port,
                line,
            }),
            Err(e) => Err(TransportError::KnownHosts(e.to_string())),
        }
    }

    fn learn_host_key(&self, pubkey: &PublicKey) -> std::result::Result<(), TransportError> {
        let result = match self.known_hosts_path {
            Some(ref path) => {
                russh::keys::known_hosts::learn_known_hosts_path(&self.host, self.port, pubkey, path)
            }
            None => russh::keys::known_hosts::learn_known_hosts(&self.host, self.port, pubkey),
        };

        result.map_err(|e| TransportError::KnownHosts(e.to_string()))
    }

    fn reject(&self, error: TransportError) -> bool {
        if let Ok(mut slot) = self.host_key_error.lock() {
            *slot = Some(error);
        }
        false
    }
}

impl client::Handler for SshHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        server_public_key: &PublicKey,
    ) -> std::result::Result<bool, Self::Error> {
        let accepted = match self.host_key_verification {
            HostKeyVerification::Disabled => true,

            HostKeyVerification::AcceptNew => match self.check_known_hosts(server_public_key) {
                Ok(true) => true,
                Ok(false) => {
                    if let Err(e) = self.learn_host_key(server_public_key) {
                        warn!("Failed to save host key: {}", e);
                    }
                    true
                }
                Err(e) => self.reject(e),
            },

            HostKeyVerification::Strict => match self.check_known_hosts(server_public_key) {
                Ok(true) => true,
                Ok(false) => self.reject(TransportError::HostKeyUnknown {
                    host: self.host.clone(),
                    port: self.port,
                }),
                Err(e) => self.reject(e),
            },
        };

        Ok(accepted)
    }
}
