//! Session automation state machine.
//!
//! The machine is pure: it is fed [`SessionEvent`]s and answers with
//! [`Action`]s. It never touches a socket or a timer, so the runner owns all
//! I/O and the transition table can be exercised with plain strings.
//!
//! ```text
//! login ──#──────────────────────────────▶ done
//!   │ ──> (vendor elevates)──▶ enable ─#──▶ done
//!   │                            │ ─Password:─▶ command ─prompt─▶ done
//!   │ ──> / ] (vendor runs directly)──────▶ done
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, trace};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};

use super::builder::Credentials;
use super::response::RunResult;
use crate::channel::{
    Credential, EscapeJoiner, Prompt, PromptBuffer, PromptDetector, Terminator, sanitize,
};
use crate::error::SessionError;
use crate::platform::VendorProfile;

/// Keystroke that advances a pager.
pub const PAGER_CONTINUE: &str = " ";

/// Where a run is in its script. Only ever advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Answering credential prompts.
    Login,
    /// `enable` written, waiting for the enable password prompt.
    Enable,
    /// Elevated, waiting for a prompt to write the vendor command at.
    Command,
    /// Vendor command written, capturing output.
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Login => f.write_str("login"),
            Self::Enable => f.write_str("enable"),
            Self::Command => f.write_str("command"),
            Self::Done => f.write_str("done"),
        }
    }
}

/// Everything that can happen to a running session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Decoded (not yet sanitized) device output.
    Data(String),
    /// No output arrived for the idle window.
    IdleElapsed,
    /// The global deadline passed.
    DeadlineElapsed,
    /// The transport closed.
    Closed,
    /// The transport failed.
    Error(String),
    /// The session was disconnected by the caller.
    Cancelled,
}

/// A write to the device.
#[derive(Clone, PartialEq, Eq)]
pub struct Input {
    /// Text to write.
    pub text: String,
    /// Append the transport's line terminator.
    pub terminate: bool,
    /// Never log the text.
    pub hidden: bool,
    /// Wait for the settle delay before writing.
    pub settle: bool,
}

impl Input {
    fn line(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            terminate: true,
            hidden: false,
            settle: false,
        }
    }

    fn secret(text: &str) -> Self {
        Self {
            hidden: true,
            ..Self::line(text)
        }
    }

    fn keystroke(text: &str) -> Self {
        Self {
            terminate: false,
            ..Self::line(text)
        }
    }

    fn settled(mut self) -> Self {
        self.settle = true;
        self
    }

    /// Text safe to put in a log line.
    pub fn display_text(&self) -> &str {
        if self.hidden { "<hidden>" } else { &self.text }
    }
}

impl fmt::Debug for Input {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Input")
            .field("text", &self.display_text())
            .field("terminate", &self.terminate)
            .field("settle", &self.settle)
            .finish()
    }
}

/// What the runner must do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Write to the device.
    Send(Input),
    /// The run is over. Emitted exactly once.
    Complete(RunResult),
}

/// Per-run automation state.
#[derive(Debug)]
pub struct SessionMachine {
    profile: VendorProfile,
    credentials: Arc<Credentials>,
    detector: PromptDetector,
    deadline: Duration,
    max_login_attempts: u32,

    stage: Stage,
    escapes: EscapeJoiner,
    /// Sanitized output since the last write, for prompt detection.
    pending: PromptBuffer,
    /// Output after the vendor command was written.
    capture: String,
    capturing: bool,
    password_attempts: u32,
    finished: bool,
}

impl SessionMachine {
    /// Create a machine for one run against the given vendor.
    pub fn new(profile: VendorProfile, credentials: Arc<Credentials>, deadline: Duration) -> Self {
        Self {
            profile,
            credentials,
            detector: PromptDetector::new(),
            deadline,
            max_login_attempts: 3,
            stage: Stage::Login,
            escapes: EscapeJoiner::new(),
            pending: PromptBuffer::default(),
            capture: String::new(),
            capturing: false,
            password_attempts: 0,
            finished: false,
        }
    }

    /// Use a custom prompt detector.
    pub fn with_detector(mut self, detector: PromptDetector) -> Self {
        self.detector = detector;
        self
    }

    /// Fail after this many login password prompts.
    pub fn with_max_login_attempts(mut self, attempts: u32) -> Self {
        self.max_login_attempts = attempts;
        self
    }

    /// Current stage.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Whether the run has completed.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// The vendor profile this run uses.
    pub fn profile(&self) -> &VendorProfile {
        &self.profile
    }

    /// Feed one event. Returns nothing once the run is finished.
    pub fn handle(&mut self, event: SessionEvent) -> Vec<Action> {
        if self.finished {
            trace!("ignoring {:?} after completion", event);
            return Vec::new();
        }

        match event {
            SessionEvent::Data(raw) => self.on_data(&raw),
            SessionEvent::IdleElapsed => {
                debug!("idle window elapsed at stage {}", self.stage);
                self.succeed("Completed after idle timeout")
            }
            SessionEvent::DeadlineElapsed => self.fail(SessionError::Timeout(self.deadline)),
            SessionEvent::Closed if self.stage == Stage::Done => {
                self.succeed("Connection closed after command")
            }
            SessionEvent::Closed => self.fail(SessionError::Closed),
            SessionEvent::Error(message) => self.fail(SessionError::Transport(message)),
            SessionEvent::Cancelled => self.fail(SessionError::Cancelled),
        }
    }

    fn on_data(&mut self, raw: &str) -> Vec<Action> {
        let raw = self.escapes.join(raw);
        let mut actions = Vec::new();
        let mut paged = self.detector.is_pager(&raw);

        let text = sanitize::clean_for_capture(&raw);
        if self.capturing {
            self.capture.push_str(&text);
        }
        self.pending.push(&text);

        // A banner split across reads is only whole once the line is
        // reassembled, and by then its pieces are already captured.
        if self.detector.is_pager(self.pending.tail_line()) {
            self.pending.discard_tail_line();
            if self.capturing {
                let keep = self.capture.rfind('\n').map_or(0, |pos| pos + 1);
                self.capture.truncate(keep);
            }
            paged = true;
        }

        if paged {
            trace!("pager banner, continuing");
            actions.push(Action::Send(Input::keystroke(PAGER_CONTINUE)));
        }

        let prompt = self.detector.classify(self.pending.tail_line());
        if prompt != Prompt::Output {
            trace!("stage {}: {:?}", self.stage, prompt);
            actions.extend(self.on_prompt(prompt));
        }

        actions
    }

    fn on_prompt(&mut self, prompt: Prompt) -> Vec<Action> {
        match (self.stage, prompt) {
            (Stage::Done, Prompt::Shell { .. }) => self.succeed("Command completed"),
            (Stage::Done, _) => Vec::new(),

            (Stage::Login | Stage::Enable, Prompt::Shell { terminator: Terminator::Dollar, text }) => {
                self.fail(SessionError::UnsupportedShell { prompt: text })
            }

            (Stage::Login, Prompt::Credential(Credential::Username)) => {
                let username = self.credentials.username.clone();
                self.write(Input::line(username).settled())
            }
            (Stage::Login, Prompt::Credential(Credential::Password)) => {
                self.password_attempts += 1;
                if self.password_attempts > self.max_login_attempts {
                    return self.fail(SessionError::AuthenticationFailed {
                        stage: Stage::Login.to_string(),
                    });
                }
                let password = Input::secret(self.credentials.password.expose_secret());
                self.write(password)
            }
            (Stage::Login, Prompt::Shell { terminator: Terminator::Hash, .. }) => self.run_command(),
            (Stage::Login, Prompt::Shell { terminator: Terminator::Angle, .. })
                if self.profile.requires_elevation() =>
            {
                self.elevate()
            }
            (Stage::Login, Prompt::Shell { terminator: Terminator::Angle, .. }) => self.run_command(),
            (Stage::Login, Prompt::Shell { terminator: Terminator::Bracket, text }) => {
                if self.profile.bracket_prompts {
                    self.run_command()
                } else {
                    self.unsupported(text)
                }
            }

            (Stage::Enable, Prompt::Credential(Credential::Password)) => {
                self.advance(Stage::Command);
                let password = Input::secret(self.credentials.enable_secret());
                self.write(password)
            }
            (Stage::Enable, Prompt::Credential(Credential::Username)) => {
                self.fail(SessionError::AuthenticationFailed {
                    stage: Stage::Enable.to_string(),
                })
            }
            (Stage::Enable, Prompt::Shell { terminator: Terminator::Hash, .. }) => self.run_command(),
            (Stage::Enable, Prompt::Shell { terminator: Terminator::Angle, text }) => {
                self.fail(SessionError::EnableRejected { prompt: text })
            }
            (Stage::Enable, Prompt::Shell { text, .. }) => self.unsupported(text),

            // The enable password was asked for again: it was wrong.
            (Stage::Command, Prompt::Credential(_)) => self.fail(SessionError::AuthenticationFailed {
                stage: Stage::Enable.to_string(),
            }),
            (Stage::Command, Prompt::Shell { .. }) => self.run_command(),

            (_, Prompt::Output) => Vec::new(),
        }
    }

    fn elevate(&mut self) -> Vec<Action> {
        let elevate = self.profile.elevate_command.clone().unwrap_or_default();
        debug!("elevating with '{}'", elevate);
        self.advance(Stage::Enable);
        self.write(Input::line(elevate))
    }

    fn run_command(&mut self) -> Vec<Action> {
        let command = self.profile.show_command.clone();
        debug!("vendor {} ({}): sending '{}'", self.profile.id, self.profile.name, command);
        self.advance(Stage::Done);
        self.capturing = true;
        self.write(Input::line(command))
    }

    fn unsupported(&mut self, prompt: String) -> Vec<Action> {
        let vendor = self.profile.name.clone();
        self.fail(SessionError::UnsupportedPrompt { prompt, vendor })
    }

    fn advance(&mut self, stage: Stage) {
        debug_assert!(stage >= self.stage, "stage moved backwards");
        if stage > self.stage {
            debug!("stage {} -> {}", self.stage, stage);
            self.stage = stage;
        }
    }

    fn write(&mut self, input: Input) -> Vec<Action> {
        // Whatever preceded this write must not be matched again.
        self.pending.clear();
        vec![Action::Send(input)]
    }

    fn succeed(&mut self, message: &str) -> Vec<Action> {
        self.finished = true;
        self.advance(Stage::Done);
        vec![Action::Complete(RunResult::success(self.output(), message))]
    }

    fn fail(&mut self, error: SessionError) -> Vec<Action> {
        debug!("run failed at stage {}: {}", self.stage, error);
        self.finished = true;
        vec![Action::Complete(RunResult::failed(self.output(), error))]
    }

    /// Captured output without the command echo or the final prompt line.
    fn output(&self) -> String {
        let text = sanitize::normalize_line_endings(&self.capture);
        let mut body = text.trim_start_matches(['\r', '\n']);

        let command = self.profile.show_command.as_str();
        if let Some(first) = body.lines().next() {
            if first.trim_end().ends_with(command) {
                body = body[first.len()..].trim_start_matches(['\r', '\n']);
            }
        }

        let body = body.trim_end();
        match body.rfind('\n') {
            Some(pos) if self.is_prompt_line(&body[pos + 1..]) => body[..pos].trim_end().to_string(),
            None if self.is_prompt_line(body) => String::new(),
            _ => body.to_string(),
        }
    }

    fn is_prompt_line(&self, line: &str) -> bool {
        matches!(self.detector.classify(line), Prompt::Shell { .. })
    }
}
