//! Session automation: requests, the state machine and its runner.
//!
//! A one-shot run is a [`SessionMachine`] (pure transitions) driven by a
//! [`Runner`] (timers and I/O). Persistent sessions only use the
//! [`LoginResponder`] to get past the login banner.

mod builder;
mod login;
mod machine;
mod response;
mod runner;

pub use builder::{ConnectRequest, Credentials, RunRequest, Target};
pub use login::{LoginReply, LoginResponder};
pub use machine::{Action, Input, PAGER_CONTINUE, SessionEvent, SessionMachine, Stage};
pub use response::RunResult;
pub use runner::{RunSettings, Runner};
