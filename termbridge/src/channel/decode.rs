//! Incremental decoding of transport chunks.
//!
//! Reads end wherever the socket happened to flush, so a character or an
//! escape sequence can straddle two chunks. Both decoders here hold back the
//! unfinished part until the next chunk completes it.

use log::trace;
use once_cell::sync::Lazy;
use regex::Regex;

/// Longest unterminated escape worth holding back. Anything longer is passed
/// through as-is.
const MAX_HELD_ESCAPE: usize = 256;

// An escape sequence cut off at the end of the text: a lone ESC, a CSI
// without its final byte, an unterminated OSC or a charset selection
// missing its argument.
static TRAILING_ESCAPE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\x1b(?:\[[0-?]*[ -/]*|\][^\x07\x1b\n]*\x1b?|[()#])?$").unwrap()
});

/// Decodes a byte stream into text across arbitrary chunk boundaries.
///
/// A multi-byte character split between two reads is held back until the
/// rest arrives instead of being replaced. Bytes that can never form valid
/// UTF-8 become U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    /// Create a decoder with nothing pending.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next chunk, returning all text that is complete so far.
    pub fn decode(&mut self, bytes: &[u8]) -> String {
        let mut data = std::mem::take(&mut self.pending);
        data.extend_from_slice(bytes);

        let mut out = String::with_capacity(data.len());
        let mut rest = data.as_slice();

        loop {
            match std::str::from_utf8(rest) {
                Ok(text) => {
                    out.push_str(text);
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    if let Ok(text) = std::str::from_utf8(valid) {
                        out.push_str(text);
                    }
                    match e.error_len() {
                        Some(len) => {
                            trace!("replacing {} invalid UTF-8 byte(s)", len);
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            self.pending = after.to_vec();
                            break;
                        }
                    }
                }
            }
        }

        out
    }

    /// Number of bytes held back waiting for the rest of a character.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }
}

/// Holds back an escape sequence split between two chunks.
///
/// Without this, `\x1b[3` + `2m` reaches the sanitizer as two halves that
/// neither look like an escape, and the parameter bytes leak into output.
#[derive(Debug, Default)]
pub struct EscapeJoiner {
    held: String,
}

impl EscapeJoiner {
    /// Create a joiner with nothing held.
    pub fn new() -> Self {
        Self::default()
    }

    /// Prepend anything held from the previous chunk and hold back a new
    /// unterminated escape at the end.
    pub fn join(&mut self, text: &str) -> String {
        let mut out = std::mem::take(&mut self.held);
        out.push_str(text);

        if let Some(found) = TRAILING_ESCAPE.find(&out) {
            if out.len() - found.start() <= MAX_HELD_ESCAPE {
                trace!("holding {} byte(s) of a split escape", out.len() - found.start());
                self.held = out.split_off(found.start());
            }
        }

        out
    }

    /// Number of bytes held back waiting for the rest of an escape.
    pub fn held_len(&self) -> usize {
        self.held.len()
    }
}
