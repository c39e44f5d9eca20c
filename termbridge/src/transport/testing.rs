//! Scripted in-memory transport for engine and bridge tests.

use bytes::Bytes;
use tokio::sync::mpsc;

use super::{Transport, TransportEvent, TransportKind};
use crate::error::{Result, TransportError};

/// A transport whose device side is driven by a [`DeviceScript`].
pub(crate) struct ScriptedTransport {
    kind: TransportKind,
    events: mpsc::UnboundedReceiver<TransportEvent>,
    writes: mpsc::UnboundedSender<String>,
    closed: bool,
}

/// The device end of a [`ScriptedTransport`].
pub(crate) struct DeviceScript {
    events: mpsc::UnboundedSender<TransportEvent>,
    writes: mpsc::UnboundedReceiver<String>,
}

impl ScriptedTransport {
    pub(crate) fn pair(kind: TransportKind) -> (Self, DeviceScript) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        (
            Self {
                kind,
                events: event_rx,
                writes: write_tx,
                closed: false,
            },
            DeviceScript {
                events: event_tx,
                writes: write_rx,
            },
        )
    }
}

impl DeviceScript {
    /// Emit output from the device.
    pub(crate) fn emit(&self, text: &str) {
        let _ = self
            .events
            .send(TransportEvent::Data(Bytes::copy_from_slice(text.as_bytes())));
    }

    /// Emit a terminal event.
    pub(crate) fn event(&self, event: TransportEvent) {
        let _ = self.events.send(event);
    }

    /// Next write made by the engine, or `None` once the transport is gone.
    pub(crate) async fn next_write(&mut self) -> Option<String> {
        self.writes.recv().await
    }

    /// A write that is already queued, if any.
    pub(crate) fn try_write(&mut self) -> Option<String> {
        self.writes.try_recv().ok()
    }
}

impl Transport for ScriptedTransport {
    fn kind(&self) -> TransportKind {
        self.kind
    }

    async fn send(&mut self, data: &[u8]) -> Result<()> {
        if self.closed {
            return Err(TransportError::Disconnected.into());
        }
        self.writes
            .send(String::from_utf8_lossy(data).into_owned())
            .map_err(|_| TransportError::Disconnected)?;
        Ok(())
    }

    async fn recv(&mut self) -> Option<TransportEvent> {
        if self.closed {
            return None;
        }
        self.events.recv().await
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}
