//! Credential auto-answer for persistent sessions.
//!
//! Interactive sessions are not scripted, but most devices still ask for a
//! username and password after the transport is up (always over Telnet,
//! sometimes again over SSH). The responder answers those prompts until
//! the first shell prompt and then stays out of the way.

use std::sync::Arc;

use log::{debug, trace};
use secrecy::ExposeSecret;

use super::builder::Credentials;
use crate::channel::{Credential, Prompt, PromptBuffer, PromptDetector, sanitize};

/// A credential to write, as returned by [`LoginResponder::observe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginReply {
    Username,
    Password,
}

/// Answers login prompts on a persistent session.
#[derive(Debug)]
pub struct LoginResponder {
    credentials: Arc<Credentials>,
    detector: PromptDetector,
    pending: PromptBuffer,
    max_password_attempts: u32,
    password_attempts: u32,
    finished: bool,
}

impl LoginResponder {
    /// Create a responder for the given credentials.
    pub fn new(credentials: Arc<Credentials>, max_password_attempts: u32) -> Self {
        Self {
            credentials,
            detector: PromptDetector::new(),
            pending: PromptBuffer::default(),
            max_password_attempts,
            password_attempts: 0,
            finished: false,
        }
    }

    /// Whether the responder stopped answering (shell prompt seen or too many
    /// password prompts).
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Feed decoded device output; returns the credential to answer with.
    pub fn observe(&mut self, raw: &str) -> Option<LoginReply> {
        if self.finished {
            return None;
        }

        self.pending.push(&sanitize::clean_for_capture(raw));
        let reply = match self.detector.classify(self.pending.tail_line()) {
            Prompt::Credential(Credential::Username) => Some(LoginReply::Username),
            Prompt::Credential(Credential::Password) => {
                self.password_attempts += 1;
                if self.password_attempts > self.max_password_attempts {
                    debug!("password asked {} times, no longer answering", self.password_attempts);
                    self.finished = true;
                    None
                } else {
                    Some(LoginReply::Password)
                }
            }
            Prompt::Shell { text, .. } => {
                debug!("logged in at '{}'", text);
                self.finished = true;
                None
            }
            Prompt::Output => return None,
        };

        self.pending.clear();
        if let Some(reply) = reply {
            trace!("answering {:?} prompt", reply);
        }
        reply
    }

    /// The text for a reply, without line terminator.
    pub fn answer(&self, reply: LoginReply) -> &str {
        match reply {
            LoginReply::Username => &self.credentials.username,
            LoginReply::Password => self.credentials.password.expose_secret(),
        }
    }
}
