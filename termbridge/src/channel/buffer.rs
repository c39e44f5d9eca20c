//! Prompt buffer with bounded tail retention.
//!
//! Devices deliver prompts in arbitrary fragments (`swi` + `tch#`), so the
//! detector never looks at a single chunk. Sanitized text is accumulated
//! here between writes and only the trailing line is classified.
//!
//! Only the last `search_depth` bytes matter for prompt detection, so the
//! buffer is trimmed from the front once it grows past twice that.

use memchr::memrchr;

/// Accumulates sanitized output since the last write to the device.
#[derive(Debug)]
pub struct PromptBuffer {
    /// Text received since the buffer was last cleared.
    buffer: String,

    /// How many bytes from the end are kept for prompt detection.
    search_depth: usize,
}

impl PromptBuffer {
    /// Create a new prompt buffer with the specified search depth.
    pub fn new(search_depth: usize) -> Self {
        Self {
            buffer: String::with_capacity(search_depth),
            search_depth,
        }
    }

    /// Append sanitized text.
    pub fn push(&mut self, text: &str) {
        self.buffer.push_str(text);

        if self.buffer.len() > self.search_depth * 2 {
            let mut cut = self.buffer.len() - self.search_depth;
            while !self.buffer.is_char_boundary(cut) {
                cut += 1;
            }
            self.buffer.drain(..cut);
        }
    }

    /// The text after the last line feed.
    ///
    /// This is where a device leaves its prompt, since prompts are never
    /// followed by a newline.
    pub fn tail_line(&self) -> &str {
        match memrchr(b'\n', self.buffer.as_bytes()) {
            Some(pos) => &self.buffer[pos + 1..],
            None => &self.buffer,
        }
    }

    /// Drop the trailing unterminated line, keeping everything before it.
    pub fn discard_tail_line(&mut self) {
        let keep = memrchr(b'\n', self.buffer.as_bytes()).map_or(0, |pos| pos + 1);
        self.buffer.truncate(keep);
    }

    /// Clear the buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for PromptBuffer {
    fn default() -> Self {
        Self::new(1000)
    }
}
