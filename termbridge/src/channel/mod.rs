//! Channel layer: output sanitizing and prompt detection.
//!
//! This module turns raw device output into clean text and decides what
//! the device is asking for, independent of the transport it came from.

mod buffer;
mod decode;
mod patterns;
pub mod sanitize;

pub use buffer::PromptBuffer;
pub use decode::{EscapeJoiner, Utf8Decoder};
pub use patterns::{
    CREDENTIAL_PRIORITY, Credential, Prompt, PromptDetector, PromptRule, RuleKind,
    SHELL_PRIORITY, Terminator,
};
