//! Drives a [`SessionMachine`] against a live transport.
//!
//! The runner owns the idle timer, the global deadline and the session's
//! control channel. Every source is turned into a [`SessionEvent`] and fed
//! to the machine; the run ends the first time the machine emits
//! [`Action::Complete`].

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, trace, warn};
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep};

use super::machine::{Action, Input, SessionEvent, SessionMachine};
use super::response::RunResult;
use crate::channel::{EscapeJoiner, Utf8Decoder, sanitize};
use crate::session::{Control, OutputLog};
use crate::transport::{Transport, TransportEvent};

/// Timing and framing for one run.
#[derive(Debug, Clone)]
pub struct RunSettings {
    /// Silence after which the run completes successfully.
    pub idle: Duration,

    /// Hard limit for the whole run.
    pub deadline: Duration,

    /// Pause before writes the device may not be ready for (usernames).
    pub settle: Duration,

    /// Appended to every terminated input.
    pub line_ending: String,
}

/// Runs one automation script to completion.
pub struct Runner {
    settings: RunSettings,
    log: Option<Arc<OutputLog>>,
    control: Option<mpsc::UnboundedReceiver<Control>>,
}

impl Runner {
    /// Create a runner.
    pub fn new(settings: RunSettings) -> Self {
        Self {
            settings,
            log: None,
            control: None,
        }
    }

    /// Mirror sanitized device output and transport status lines into a
    /// session log.
    pub fn with_log(mut self, log: Arc<OutputLog>) -> Self {
        self.log = Some(log);
        self
    }

    /// Listen for disconnect requests.
    pub fn with_control(mut self, control: mpsc::UnboundedReceiver<Control>) -> Self {
        self.control = Some(control);
        self
    }

    /// Drive the machine until it completes, then close the transport.
    ///
    /// Resolves exactly once. Timers and the control receiver are dropped
    /// with the runner.
    pub async fn run<T: Transport>(mut self, transport: &mut T, mut machine: SessionMachine) -> RunResult {
        let started = Instant::now();
        debug!(
            "running '{}' for {} within {:?}",
            machine.profile().show_command,
            machine.profile().name,
            self.settings.deadline
        );
        let deadline = sleep(self.settings.deadline);
        let idle = sleep(self.settings.idle);
        tokio::pin!(deadline, idle);

        let kind = transport.kind();
        let mut decoder = Utf8Decoder::new();
        let mut escapes = EscapeJoiner::new();
        let mut queued: VecDeque<SessionEvent> = VecDeque::new();

        loop {
            let event = match queued.pop_front() {
                Some(event) => event,
                None => tokio::select! {
                    biased;

                    control = next_control(&mut self.control) => match control {
                        Some(Control::Send(_)) => {
                            debug!("dropping input for a one-shot run");
                            continue;
                        }
                        Some(Control::Close) | None => SessionEvent::Cancelled,
                    },
                    _ = &mut deadline => SessionEvent::DeadlineElapsed,
                    event = transport.recv() => match event {
                        Some(TransportEvent::Data(bytes)) => {
                            idle.as_mut().reset(Instant::now() + self.settings.idle);
                            let text = escapes.join(&decoder.decode(&bytes));
                            trace!("received {} bytes", bytes.len());
                            if let Some(ref log) = self.log {
                                log.append(sanitize::clean(&text));
                            }
                            SessionEvent::Data(text)
                        }
                        Some(TransportEvent::Error(message)) => SessionEvent::Error(message),
                        Some(TransportEvent::Closed) | None => {
                            let incomplete = decoder.pending_len() + escapes.held_len();
                            if incomplete > 0 {
                                debug!("dropping {} byte(s) of unfinished output", incomplete);
                            }
                            SessionEvent::Closed
                        }
                    },
                    _ = &mut idle => SessionEvent::IdleElapsed,
                },
            };

            if let Some(ref log) = self.log {
                match &event {
                    SessionEvent::Error(message) => {
                        log.append(format!("[{}] error: {}\n", kind, message));
                    }
                    SessionEvent::Closed => {
                        log.append(format!("[{}] connection closed\n", kind));
                    }
                    _ => {}
                }
            }

            for action in machine.handle(event) {
                match action {
                    Action::Send(input) => {
                        if let Err(e) = self.write(transport, &input).await {
                            warn!("write failed: {}", e);
                            queued.push_back(SessionEvent::Error(e.to_string()));
                        }
                    }
                    Action::Complete(mut result) => {
                        debug_assert!(machine.is_finished());
                        result.elapsed = started.elapsed();
                        debug!(
                            "run finished at stage {} in {:?}: success={} ({})",
                            machine.stage(),
                            result.elapsed,
                            result.success,
                            result.message
                        );
                        if let Err(e) = transport.close().await {
                            debug!("close after run failed: {}", e);
                        }
                        return result;
                    }
                }
            }
        }
    }

    async fn write<T: Transport>(&self, transport: &mut T, input: &Input) -> crate::error::Result<()> {
        if input.settle && !self.settings.settle.is_zero() {
            sleep(self.settings.settle).await;
        }

        debug!("send: {:?}", input.display_text());
        let mut data = input.text.clone();
        if input.terminate {
            data.push_str(&self.settings.line_ending);
        }
        transport.send(data.as_bytes()).await
    }
}

async fn next_control(control: &mut Option<mpsc::UnboundedReceiver<Control>>) -> Option<Control> {
    match control {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::Credentials;
    use crate::error::SessionError;
    use crate::platform::VendorTable;
    use crate::transport::TransportKind;
    use crate::transport::testing::ScriptedTransport;

    fn settings() -> RunSettings {
        RunSettings {
            idle: Duration::from_secs(5),
            deadline: Duration::from_secs(30),
            settle: Duration::from_millis(100),
            line_ending: "\n".into(),
        }
    }

    fn machine(vendor: u8) -> SessionMachine {
        SessionMachine::new(
            VendorTable::builtin().lookup(vendor).clone(),
            Arc::new(Credentials::new("admin", "secret").with_enable_password("en-secret")),
            Duration::from_secs(30),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_to_end_enable_flow() {
        let (mut transport, mut device) = ScriptedTransport::pair(TransportKind::Ssh);
        let run = tokio::spawn(async move {
            Runner::new(settings()).run(&mut transport, machine(2)).await
        });

        device.emit("Password: ");
        assert_eq!(device.next_write().await.as_deref(), Some("secret\n"));
        device.emit("\r\nswitch>");
        assert_eq!(device.next_write().await.as_deref(), Some("enable\n"));
        device.emit("enable\r\nPassword: ");
        assert_eq!(device.next_write().await.as_deref(), Some("en-secret\n"));
        device.emit("\r\nswitch#");
        assert_eq!(device.next_write().await.as_deref(), Some("show running-config\n"));
        device.emit("show running-config\r\nhostname switch\r\n!\r\nend\r\nswitch#");

        let result = run.await.unwrap();
        assert!(result.success, "{}", result.message);
        assert_eq!(result.output, "hostname switch\n!\nend");
        assert!(device.try_write().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_completion_after_silence() {
        let (mut transport, mut device) = ScriptedTransport::pair(TransportKind::Telnet);
        let mut settings = settings();
        settings.line_ending = "\r\n".into();

        let started = Instant::now();
        let run = tokio::spawn(async move {
            Runner::new(settings).run(&mut transport, machine(1)).await
        });

        device.emit("mx>");
        assert_eq!(
            device.next_write().await.as_deref(),
            Some("show configuration | no-more\r\n")
        );
        tokio::time::sleep(Duration::from_secs(1)).await;
        device.emit("show configuration | no-more\r\nsystem {\r\n    host-name mx;\r\n}\r\n");

        let result = run.await.unwrap();
        assert!(result.success);
        assert_eq!(result.output, "system {\n    host-name mx;\n}");

        // Completed one idle window after the last chunk.
        let waited = started.elapsed();
        assert!(waited >= Duration::from_secs(6), "{:?}", waited);
        assert!(waited < Duration::from_secs(7), "{:?}", waited);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_fails_with_output() {
        let (mut transport, mut device) = ScriptedTransport::pair(TransportKind::Ssh);
        let mut settings = settings();
        settings.deadline = Duration::from_secs(8);

        let run = tokio::spawn(async move {
            Runner::new(settings).run(&mut transport, machine(2)).await
        });

        device.emit("r1#");
        device.next_write().await;
        // Keep the idle timer from firing.
        for i in 0..4 {
            device.emit(&format!("line {}\r\n", i));
            tokio::time::sleep(Duration::from_secs(3)).await;
        }

        let result = run.await.unwrap();
        assert!(!result.success);
        assert!(matches!(result.error, Some(SessionError::Timeout(_))));
        assert!(result.output.starts_with("line 0\nline 1"));
        assert!(result.elapsed >= Duration::from_secs(8));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unix_shell_fails() {
        let (mut transport, device) = ScriptedTransport::pair(TransportKind::Ssh);
        let run = tokio::spawn(async move {
            Runner::new(settings()).run(&mut transport, machine(2)).await
        });

        device.emit("Welcome to Ubuntu\r\nuser@host:~$ ");
        let result = run.await.unwrap();
        assert!(!result.success);
        assert!(result.message.contains("Unix-style shell"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_username_waits_for_settle() {
        let (mut transport, mut device) = ScriptedTransport::pair(TransportKind::Telnet);
        let _run = tokio::spawn(async move {
            Runner::new(settings()).run(&mut transport, machine(2)).await
        });

        let started = Instant::now();
        device.emit("Username: ");
        assert_eq!(device.next_write().await.as_deref(), Some("admin\n"));
        assert!(started.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_disconnect_cancels() {
        let (mut transport, _device) = ScriptedTransport::pair(TransportKind::Ssh);
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let log = Arc::new(OutputLog::new());

        let run_log = log.clone();
        let run = tokio::spawn(async move {
            Runner::new(settings())
                .with_log(run_log)
                .with_control(control_rx)
                .run(&mut transport, machine(2))
                .await
        });

        control_tx.send(Control::Close).unwrap();
        let result = run.await.unwrap();
        assert_eq!(result.error, Some(SessionError::Cancelled));
    }

    #[tokio::test(start_paused = true)]
    async fn test_output_mirrored_to_log() {
        let (mut transport, mut device) = ScriptedTransport::pair(TransportKind::Ssh);
        let log = Arc::new(OutputLog::new());

        let run_log = log.clone();
        let run = tokio::spawn(async move {
            Runner::new(settings())
                .with_log(run_log)
                .run(&mut transport, machine(2))
                .await
        });

        device.emit("\x1b[1mr1#\x1b[0m");
        device.next_write().await;
        device.emit("show running-config\r\nhostname r1\r\nr1#");
        run.await.unwrap();

        assert_eq!(log.snapshot().concat(), "r1#show running-config\nhostname r1\nr1#");
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_before_done_fails() {
        let (mut transport, device) = ScriptedTransport::pair(TransportKind::Telnet);
        let run = tokio::spawn(async move {
            Runner::new(settings()).run(&mut transport, machine(2)).await
        });

        device.emit("Username: ");
        device.event(TransportEvent::Closed);
        let result = run.await.unwrap();
        assert_eq!(result.error, Some(SessionError::Closed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_failure_logged() {
        let (mut transport, device) = ScriptedTransport::pair(TransportKind::Ssh);
        let log = Arc::new(OutputLog::new());

        let run_log = log.clone();
        let run = tokio::spawn(async move {
            Runner::new(settings())
                .with_log(run_log)
                .run(&mut transport, machine(2))
                .await
        });

        device.emit("Username: ");
        device.event(TransportEvent::Error("connection reset".into()));
        let result = run.await.unwrap();

        assert_eq!(result.error, Some(SessionError::Transport("connection reset".into())));
        assert_eq!(log.snapshot().concat(), "Username: [ssh] error: connection reset\n");
    }

    #[tokio::test(start_paused = true)]
    async fn test_split_escape_not_logged() {
        let (mut transport, mut device) = ScriptedTransport::pair(TransportKind::Telnet);
        let log = Arc::new(OutputLog::new());

        let run_log = log.clone();
        let run = tokio::spawn(async move {
            Runner::new(settings())
                .with_log(run_log)
                .run(&mut transport, machine(2))
                .await
        });

        device.emit("r1#");
        device.next_write().await;
        device.emit("show running-config\r\n\x1b[3");
        device.emit("2mhostname r1\x1b[0m\r\nr1#");
        let result = run.await.unwrap();

        assert_eq!(result.output, "hostname r1");
        assert_eq!(log.snapshot().concat(), "r1#show running-config\nhostname r1\nr1#");
    }
}
