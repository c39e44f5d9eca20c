//! Append-only session output log.

use std::sync::{PoisonError, RwLock};

use log::trace;

/// Chunks appended after a cursor, plus whether more can follow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogSlice {
    /// New chunks, oldest first.
    pub chunks: Vec<String>,
    /// The log is sealed; nothing will be appended after these chunks.
    pub sealed: bool,
}

#[derive(Debug, Default)]
struct LogInner {
    chunks: Vec<String>,
    sealed: bool,
}

/// Ordered, append-only sequence of sanitized output chunks.
///
/// Chunks are never altered or removed, so a cursor (chunk index) taken by a
/// reader stays valid for the life of the log. The lock is never held across
/// an await.
#[derive(Debug, Default)]
pub struct OutputLog {
    inner: RwLock<LogInner>,
}

impl OutputLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk, returning the new length in chunks.
    ///
    /// Empty chunks are skipped. Appends to a sealed log are dropped.
    pub fn append(&self, chunk: impl Into<String>) -> usize {
        let chunk = chunk.into();
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if inner.sealed {
            trace!("dropping {} bytes appended to a sealed log", chunk.len());
        } else if !chunk.is_empty() {
            inner.chunks.push(chunk);
        }
        inner.chunks.len()
    }

    /// Number of chunks.
    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).chunks.len()
    }

    /// Check if nothing was appended yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Chunks from `cursor` onwards.
    pub fn read_from(&self, cursor: usize) -> LogSlice {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        LogSlice {
            chunks: inner.chunks.get(cursor..).map(<[String]>::to_vec).unwrap_or_default(),
            sealed: inner.sealed,
        }
    }

    /// Stop accepting chunks.
    pub fn seal(&self) {
        self.inner.write().unwrap_or_else(PoisonError::into_inner).sealed = true;
    }

    /// Whether the log was sealed.
    pub fn is_sealed(&self) -> bool {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).sealed
    }

    /// Copy of every chunk.
    pub fn snapshot(&self) -> Vec<String> {
        self.read_from(0).chunks
    }
}
