//! Cursor-based output streaming.
//!
//! Consumers poll a session's [`OutputLog`] at a fixed interval from their
//! own cursor and receive only what was appended since the previous poll.
//! Cursors are independent and never persisted.

use std::sync::Arc;
use std::time::Duration;

use futures_core::Stream;
use futures_util::stream;
use serde::{Deserialize, Serialize};
use tokio::time::{Interval, MissedTickBehavior};

use super::output::OutputLog;

/// Where a new consumer's cursor starts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamStart {
    /// Replay the whole log.
    #[default]
    Beginning,
    /// Only output appended after subscribing.
    Tail,
}

/// A consumer's view of a session log.
///
/// Ends once the log is sealed and everything before the seal was yielded.
#[derive(Debug)]
pub struct OutputStream {
    log: Arc<OutputLog>,
    cursor: usize,
    interval: Interval,
}

impl OutputStream {
    /// Subscribe to a log.
    pub fn new(log: Arc<OutputLog>, start: StreamStart, poll_interval: Duration) -> Self {
        let cursor = match start {
            StreamStart::Beginning => 0,
            StreamStart::Tail => log.len(),
        };

        let mut interval = tokio::time::interval(poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Self {
            log,
            cursor,
            interval,
        }
    }

    /// Current cursor (chunks already yielded).
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Wait for the next delta, or `None` when the session is gone.
    pub async fn next_chunk(&mut self) -> Option<String> {
        loop {
            self.interval.tick().await;

            let slice = self.log.read_from(self.cursor);
            if !slice.chunks.is_empty() {
                self.cursor += slice.chunks.len();
                return Some(slice.chunks.concat());
            }
            if slice.sealed {
                return None;
            }
        }
    }

    /// Turn into a [`Stream`] of deltas.
    pub fn into_stream(self) -> impl Stream<Item = String> + Send {
        stream::unfold(self, |mut output| async move {
            let chunk = output.next_chunk().await?;
            Some((chunk, output))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    const POLL: Duration = Duration::from_millis(500);

    #[tokio::test(start_paused = true)]
    async fn test_yields_only_deltas() {
        let log = Arc::new(OutputLog::new());
        log.append("a");
        log.append("b");

        let mut stream = OutputStream::new(log.clone(), StreamStart::Beginning, POLL);
        assert_eq!(stream.next_chunk().await.as_deref(), Some("ab"));

        log.append("c");
        assert_eq!(stream.next_chunk().await.as_deref(), Some("c"));
        assert_eq!(stream.cursor(), 3);

        log.seal();
        assert_eq!(stream.next_chunk().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tail_skips_history() {
        let log = Arc::new(OutputLog::new());
        log.append("banner\n");

        let mut stream = OutputStream::new(log.clone(), StreamStart::Tail, POLL);
        log.append("r1#");
        assert_eq!(stream.next_chunk().await.as_deref(), Some("r1#"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_independent_cursors() {
        let log = Arc::new(OutputLog::new());
        log.append("one");

        let mut first = OutputStream::new(log.clone(), StreamStart::Beginning, POLL);
        assert_eq!(first.next_chunk().await.as_deref(), Some("one"));

        log.append("two");
        let mut second = OutputStream::new(log.clone(), StreamStart::Beginning, POLL);
        assert_eq!(second.next_chunk().await.as_deref(), Some("onetwo"));
        assert_eq!(first.next_chunk().await.as_deref(), Some("two"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drains_before_ending() {
        let log = Arc::new(OutputLog::new());
        let stream = OutputStream::new(log.clone(), StreamStart::Beginning, POLL).into_stream();

        log.append("[telnet] connection closed\n");
        log.seal();

        let collected: Vec<String> = stream.collect().await;
        assert_eq!(collected, vec!["[telnet] connection closed\n"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_at_interval() {
        let log = Arc::new(OutputLog::new());
        let mut stream = OutputStream::new(log.clone(), StreamStart::Beginning, POLL);

        let writer = log.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(1200)).await;
            writer.append("late");
        });

        let started = tokio::time::Instant::now();
        assert_eq!(stream.next_chunk().await.as_deref(), Some("late"));
        // Picked up on the first tick after the append.
        assert_eq!(started.elapsed(), Duration::from_millis(1500));
    }
}
