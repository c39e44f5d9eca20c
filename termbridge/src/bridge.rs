//! The bridge: opens sessions, drives runs and republishes output.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::channel::{EscapeJoiner, Utf8Decoder, sanitize};
use crate::config::BridgeConfig;
use crate::driver::{
    ConnectRequest, LoginReply, LoginResponder, RunRequest, RunResult, RunSettings, Runner,
    SessionMachine, Target,
};
use crate::error::{Result, SessionError};
use crate::platform::VendorTable;
use crate::session::{
    Control, OutputStream, SessionEntry, SessionId, SessionMode, SessionRegistry, StreamStart,
};
use crate::transport::{
    SshConfig, SshTransport, TelnetConfig, TelnetTransport, Transport, TransportEvent,
    TransportKind,
};

/// Entry point for clients.
///
/// Cheap to clone; clones share the registry, vendor table and config.
///
/// # Example
///
/// ```rust,no_run
/// use termbridge::{Bridge, BridgeConfig, ConnectRequest, RunRequest, TransportKind};
///
/// # async fn example() {
/// let bridge = Bridge::new(BridgeConfig::default());
/// let result = bridge
///     .run(RunRequest::new(
///         ConnectRequest::new()
///             .kind(TransportKind::Ssh)
///             .host("192.0.2.1")
///             .username("admin")
///             .password("secret")
///             .vendor(2),
///     ))
///     .await;
///
/// if result.success {
///     println!("{}", result.output);
/// }
/// # }
/// ```
#[derive(Clone)]
pub struct Bridge {
    config: Arc<BridgeConfig>,
    registry: Arc<SessionRegistry>,
    vendors: Arc<VendorTable>,
}

impl Bridge {
    /// Create a bridge on the process-wide registry with the built-in vendors.
    pub fn new(config: BridgeConfig) -> Self {
        Self::with_registry(config, SessionRegistry::global())
    }

    /// Create a bridge on a private registry.
    pub fn with_registry(config: BridgeConfig, registry: Arc<SessionRegistry>) -> Self {
        Self {
            config: Arc::new(config),
            registry,
            vendors: Arc::new(VendorTable::default()),
        }
    }

    /// Replace the vendor table.
    pub fn with_vendors(mut self, vendors: VendorTable) -> Self {
        self.vendors = Arc::new(vendors);
        self
    }

    /// The bridge configuration.
    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// The registry sessions are recorded in.
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Open a persistent session.
    ///
    /// Credential prompts are answered automatically until the first shell
    /// prompt; after that input only comes from [`send`](Self::send).
    pub async fn connect(&self, request: ConnectRequest) -> Result<SessionId> {
        let target = request.validate()?;
        let id = match target.kind {
            TransportKind::Ssh => {
                let transport = SshTransport::connect(&self.ssh_config(&target)).await?;
                self.attach(transport, &target)
            }
            TransportKind::Telnet => {
                let transport = TelnetTransport::connect(&self.telnet_config(&target)).await?;
                self.attach(transport, &target)
            }
        };
        Ok(id)
    }

    /// Register a persistent session over an already-open transport.
    pub fn attach<T>(&self, transport: T, target: &Target) -> SessionId
    where
        T: Transport + 'static,
    {
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let entry = self
            .registry
            .create(transport.kind(), SessionMode::Interactive, control_tx);

        entry.output().append(format!(
            "[{}] connected to {}:{}\n",
            transport.kind(),
            target.host,
            target.port
        ));
        info!("session {} connected to {}:{}", entry.id(), target.host, target.port);

        let pump = Pump {
            entry: Arc::clone(&entry),
            registry: Arc::clone(&self.registry),
            control: control_rx,
            login: LoginResponder::new(
                Arc::clone(&target.credentials),
                self.config.max_login_attempts,
            ),
            line_ending: self.config.line_ending(transport.kind()).to_string(),
            settle: self.config.settle_delay,
        };
        tokio::spawn(pump.run(transport));

        entry.id()
    }

    /// Write a line to a persistent session.
    pub fn send(&self, id: &SessionId, text: &str) -> Result<()> {
        let entry = self.registry.get(id)?;
        if entry.mode() != SessionMode::Interactive {
            return Err(SessionError::NotInteractive { id: id.to_string() }.into());
        }

        let mut line = String::with_capacity(text.len() + 2);
        line.push_str(text);
        line.push_str(self.config.line_ending(entry.kind()));
        entry.control(Control::Send(line))
    }

    /// Close a session and remove it from the registry.
    ///
    /// A running one-shot run completes with a cancellation failure.
    pub fn disconnect(&self, id: &SessionId) -> Result<()> {
        let entry = self.registry.get(id)?;
        entry
            .output()
            .append(format!("[{}] disconnected\n", entry.kind()));
        if entry.control(Control::Close).is_err() {
            debug!("session {} task already stopped", id);
        }
        self.registry.destroy(id);
        Ok(())
    }

    /// Follow a session's output.
    pub fn subscribe(&self, id: &SessionId, start: StreamStart) -> Result<OutputStream> {
        let entry = self.registry.get(id)?;
        Ok(OutputStream::new(
            Arc::clone(entry.output()),
            start,
            self.config.poll_interval,
        ))
    }

    /// Connect, retrieve the configuration and disconnect.
    ///
    /// Never returns an error: validation and connect failures become a
    /// failed [`RunResult`].
    pub async fn run(&self, request: RunRequest) -> RunResult {
        let started = Instant::now();
        let target = match request.connect.validate() {
            Ok(target) => target,
            Err(e) => return RunResult::from_error(e),
        };

        let mut result = match target.kind {
            TransportKind::Ssh => match SshTransport::connect(&self.ssh_config(&target)).await {
                Ok(transport) => self.run_on(transport, &target, request.timeout).await,
                Err(e) => RunResult::from_error(e),
            },
            TransportKind::Telnet => {
                match TelnetTransport::connect(&self.telnet_config(&target)).await {
                    Ok(transport) => self.run_on(transport, &target, request.timeout).await,
                    Err(e) => RunResult::from_error(e),
                }
            }
        };

        if !result.success {
            warn!("run against {}:{} failed: {}", target.host, target.port, result.message);
        }
        result.elapsed = started.elapsed();
        result
    }

    /// Drive a one-shot run over an already-open transport.
    ///
    /// The session is registered for the duration of the run, so it can be
    /// streamed and disconnected, and removed afterwards.
    pub async fn run_on<T: Transport>(
        &self,
        mut transport: T,
        target: &Target,
        timeout: Option<Duration>,
    ) -> RunResult {
        let deadline = timeout.unwrap_or(self.config.run_timeout);
        let profile = self.vendors.lookup(target.vendor).clone();
        debug!(
            "run on {}:{} with vendor {} ({})",
            target.host, target.port, profile.id, profile.name
        );

        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let entry = self
            .registry
            .create(transport.kind(), SessionMode::Run, control_tx);

        let machine = SessionMachine::new(profile, Arc::clone(&target.credentials), deadline)
            .with_max_login_attempts(self.config.max_login_attempts);
        let settings = RunSettings {
            idle: self.config.idle_timeout,
            deadline,
            settle: self.config.settle_delay,
            line_ending: self.config.line_ending(transport.kind()).to_string(),
        };

        let result = Runner::new(settings)
            .with_log(Arc::clone(entry.output()))
            .with_control(control_rx)
            .run(&mut transport, machine)
            .await;

        self.registry.destroy(&entry.id());
        result
    }

    fn ssh_config(&self, target: &Target) -> SshConfig {
        SshConfig {
            host: target.host.clone(),
            port: target.port,
            credentials: Arc::clone(&target.credentials),
            timeout: self.config.connect_timeout,
            terminal_type: self.config.terminal_type.clone(),
            terminal_width: self.config.terminal_width,
            terminal_height: self.config.terminal_height,
            host_key_verification: self.config.host_key_verification.clone(),
            known_hosts_path: self.config.known_hosts_path.clone(),
            keepalive_interval: self.config.keepalive_interval,
        }
    }

    fn telnet_config(&self, target: &Target) -> TelnetConfig {
        TelnetConfig {
            host: target.host.clone(),
            port: target.port,
            timeout: self.config.connect_timeout,
            negotiation: self.config.telnet_negotiation,
            kickstart: self.config.telnet_kickstart.clone(),
        }
    }
}

/// Task state of a persistent session.
struct Pump {
    entry: Arc<SessionEntry>,
    registry: Arc<SessionRegistry>,
    control: mpsc::UnboundedReceiver<Control>,
    login: LoginResponder,
    line_ending: String,
    settle: Duration,
}

impl Pump {
    /// Pass input and output through until either side closes.
    async fn run<T: Transport>(mut self, mut transport: T) {
        let kind = transport.kind();
        let log = Arc::clone(self.entry.output());
        let mut decoder = Utf8Decoder::new();
        let mut escapes = EscapeJoiner::new();

        loop {
            tokio::select! {
                message = self.control.recv() => match message {
                    Some(Control::Send(text)) => {
                        if let Err(e) = transport.send(text.as_bytes()).await {
                            log.append(format!("[{}] error: {}\n", kind, e));
                            break;
                        }
                    }
                    Some(Control::Close) | None => {
                        if let Err(e) = transport.close().await {
                            debug!("session {} close failed: {}", self.entry.id(), e);
                        }
                        break;
                    }
                },
                event = transport.recv() => match event {
                    Some(TransportEvent::Data(bytes)) => {
                        let text = escapes.join(&decoder.decode(&bytes));
                        log.append(sanitize::clean(&text));
                        if self.login.is_finished() {
                            continue;
                        }

                        if let Some(reply) = self.login.observe(&text) {
                            if reply == LoginReply::Username && !self.settle.is_zero() {
                                tokio::time::sleep(self.settle).await;
                            }
                            let mut answer = self.login.answer(reply).to_string();
                            answer.push_str(&self.line_ending);
                            if let Err(e) = transport.send(answer.as_bytes()).await {
                                log.append(format!("[{}] error: {}\n", kind, e));
                                break;
                            }
                        }
                    }
                    Some(TransportEvent::Error(message)) => {
                        warn!("session {} transport error: {}", self.entry.id(), message);
                        log.append(format!("[{}] error: {}\n", kind, message));
                        break;
                    }
                    Some(TransportEvent::Closed) | None => {
                        log.append(format!("[{}] connection closed\n", kind));
                        break;
                    }
                },
            }
        }

        debug!("session {} task finished", self.entry.id());
        self.registry.destroy(&self.entry.id());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::transport::testing::ScriptedTransport;

    fn bridge() -> Bridge {
        let config = BridgeConfig::default().with_settle_delay(Duration::from_millis(50));
        Bridge::with_registry(config, Arc::new(SessionRegistry::new()))
    }

    fn target(kind: TransportKind, vendor: u8) -> Target {
        ConnectRequest::new()
            .kind(kind)
            .host("192.0.2.7")
            .username("admin")
            .password("secret")
            .enable_password("en-secret")
            .vendor(vendor)
            .validate()
            .unwrap()
    }

    async fn wait_for_session(bridge: &Bridge) -> SessionId {
        loop {
            if let Some(id) = bridge.registry().ids().first() {
                return *id;
            }
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_over_telnet() {
        let bridge = bridge();
        let (transport, mut device) = ScriptedTransport::pair(TransportKind::Telnet);

        let runner = bridge.clone();
        let run = tokio::spawn(async move {
            runner
                .run_on(transport, &target(TransportKind::Telnet, 2), None)
                .await
        });

        device.emit("\r\nUser Access Verification\r\n\r\nUsername: ");
        assert_eq!(device.next_write().await.as_deref(), Some("admin\r\n"));
        device.emit("admin\r\nPassword: ");
        assert_eq!(device.next_write().await.as_deref(), Some("secret\r\n"));
        device.emit("\r\nswitch>");
        assert_eq!(device.next_write().await.as_deref(), Some("enable\r\n"));
        device.emit("enable\r\nPassword: ");
        assert_eq!(device.next_write().await.as_deref(), Some("en-secret\r\n"));
        device.emit("\r\nswitch#");
        assert_eq!(
            device.next_write().await.as_deref(),
            Some("show running-config\r\n")
        );
        device.emit("show running-config\r\nBuilding configuration...\r\n");
        device.emit("hostname switch\r\n --More-- ");
        assert_eq!(device.next_write().await.as_deref(), Some(" "));
        device.emit("\x08\x08\x08\x08\x08\x08\x08\x08\x08\x08        \x08\x08\x08\x08\x08\x08\x08\x08\x08\x08end\r\nswitch#");

        let result = run.await.unwrap();
        assert!(result.success, "{}", result.message);
        assert_eq!(result.output, "Building configuration...\nhostname switch\nend");
        assert!(bridge.registry().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_bracket_vendor() {
        let bridge = bridge();
        let (transport, mut device) = ScriptedTransport::pair(TransportKind::Ssh);

        let runner = bridge.clone();
        let run = tokio::spawn(async move {
            runner.run_on(transport, &target(TransportKind::Ssh, 3), None).await
        });

        device.emit("Info: The max number of VTY users is 5\r\n[~HUAWEI]");
        assert_eq!(
            device.next_write().await.as_deref(),
            Some("display current-configuration\n")
        );
        device.emit("display current-configuration\r\n#\r\nsysname HUAWEI\r\n#\r\nreturn\r\n[~HUAWEI]");

        let result = run.await.unwrap();
        assert!(result.success);
        assert_eq!(result.output, "#\nsysname HUAWEI\n#\nreturn");
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_timeout_override() {
        let bridge = bridge();
        let (transport, _device) = ScriptedTransport::pair(TransportKind::Ssh);

        let started = Instant::now();
        let result = bridge
            .run_on(
                transport,
                &target(TransportKind::Ssh, 2),
                Some(Duration::from_secs(2)),
            )
            .await;

        // The deadline beats the 5s idle window.
        assert_eq!(result.error, Some(SessionError::Timeout(Duration::from_secs(2))));
        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_session_refuses_input_and_cancels() {
        let bridge = bridge();
        let (transport, _device) = ScriptedTransport::pair(TransportKind::Ssh);

        let runner = bridge.clone();
        let run = tokio::spawn(async move {
            runner.run_on(transport, &target(TransportKind::Ssh, 2), None).await
        });

        let id = wait_for_session(&bridge).await;
        match bridge.send(&id, "show version") {
            Err(Error::Session(SessionError::NotInteractive { .. })) => {}
            other => panic!("expected NotInteractive, got {:?}", other),
        }

        bridge.disconnect(&id).unwrap();
        let result = run.await.unwrap();
        assert_eq!(result.error, Some(SessionError::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_session_publishes_transport_failure() {
        let bridge = bridge();
        let (transport, mut device) = ScriptedTransport::pair(TransportKind::Ssh);

        let runner = bridge.clone();
        let run = tokio::spawn(async move {
            runner.run_on(transport, &target(TransportKind::Ssh, 2), None).await
        });

        let id = wait_for_session(&bridge).await;
        let mut stream = bridge.subscribe(&id, StreamStart::Beginning).unwrap();

        device.emit("Username: ");
        assert_eq!(device.next_write().await.as_deref(), Some("admin\n"));
        device.event(TransportEvent::Error("connection reset".into()));

        let result = run.await.unwrap();
        assert_eq!(result.message, "Transport failure: connection reset");

        let mut seen = String::new();
        while let Some(chunk) = stream.next_chunk().await {
            seen.push_str(&chunk);
        }
        assert_eq!(seen, "Username: [ssh] error: connection reset\n");
    }

    #[tokio::test]
    async fn test_run_rejects_invalid_request() {
        let bridge = bridge();
        let result = bridge
            .run(RunRequest::new(
                ConnectRequest::new()
                    .kind(TransportKind::Ssh)
                    .username("admin")
                    .password("secret"),
            ))
            .await;
        assert!(!result.success);
        assert!(result.message.contains("'host'"));
        assert!(bridge.registry().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_persistent_session() {
        let bridge = bridge();
        let (transport, mut device) = ScriptedTransport::pair(TransportKind::Telnet);
        let id = bridge.attach(transport, &target(TransportKind::Telnet, 0));
        let mut stream = bridge.subscribe(&id, StreamStart::Beginning).unwrap();

        device.emit("\x1b[2J\r\nrouter login: ");
        assert_eq!(device.next_write().await.as_deref(), Some("admin\r\n"));
        device.emit("Password: ");
        assert_eq!(device.next_write().await.as_deref(), Some("secret\r\n"));
        device.emit("\r\nrouter#");

        bridge.send(&id, "show clock").unwrap();
        assert_eq!(device.next_write().await.as_deref(), Some("show clock\r\n"));
        device.emit("show clock\r\n12:00:00.000 UTC\r\nrouter#");

        device.event(TransportEvent::Closed);

        let mut seen = String::new();
        while let Some(chunk) = stream.next_chunk().await {
            seen.push_str(&chunk);
        }
        assert_eq!(
            seen,
            "[telnet] connected to 192.0.2.7:23\n\nrouter login: Password: \nrouter#\
             show clock\n12:00:00.000 UTC\nrouter#[telnet] connection closed\n"
        );
        assert!(matches!(
            bridge.send(&id, "show clock"),
            Err(Error::Session(SessionError::NotFound { .. }))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_persistent_session() {
        let bridge = bridge();
        let (transport, mut device) = ScriptedTransport::pair(TransportKind::Ssh);
        let id = bridge.attach(transport, &target(TransportKind::Ssh, 0));

        bridge.disconnect(&id).unwrap();
        assert!(bridge.registry().is_empty());
        assert!(bridge.subscribe(&id, StreamStart::Tail).is_err());
        assert!(bridge.disconnect(&id).is_err());

        // The task drops the transport once it sees the close.
        assert_eq!(device.next_write().await, None);
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let bridge = bridge();
        let id = SessionId::new();
        assert!(matches!(
            bridge.send(&id, "x"),
            Err(Error::Session(SessionError::NotFound { .. }))
        ));
        assert!(bridge.subscribe(&id, StreamStart::Beginning).is_err());
    }
}
