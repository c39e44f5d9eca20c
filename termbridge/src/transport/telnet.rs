//! Telnet transport over a TCP socket.

use std::time::Duration;

use bytes::{Bytes, BytesMut};
use log::{debug, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::config::{NegotiationMode, TelnetConfig};
use super::negotiation::TelnetCodec;
use super::{Transport, TransportEvent, TransportKind};
use crate::error::{Result, TransportError};

const READ_BUFFER: usize = 4096;

/// How long `close()` waits for the I/O task to shut the socket down.
const CLOSE_GRACE: Duration = Duration::from_secs(2);

/// Telnet transport.
///
/// The socket lives in a background task that strips negotiation, answers
/// it per [`NegotiationMode`] and forwards the remaining bytes as
/// [`TransportEvent::Data`].
pub struct TelnetTransport {
    writes: mpsc::UnboundedSender<Bytes>,
    events: mpsc::UnboundedReceiver<TransportEvent>,
    task: JoinHandle<()>,
}

impl TelnetTransport {
    /// Connect to the device and start the I/O task.
    pub async fn connect(config: &TelnetConfig) -> Result<Self> {
        let stream = tokio::time::timeout(
            config.timeout,
            TcpStream::connect((config.host.as_str(), config.port)),
        )
        .await
        .map_err(|_| TransportError::Timeout(config.timeout))?
        .map_err(|source| TransportError::ConnectionFailed {
            host: config.host.clone(),
            port: config.port,
            source,
        })?;

        stream.set_nodelay(true).map_err(TransportError::Io)?;
        debug!("telnet connected to {}", config.socket_addr());

        let mut transport = Self::from_stream(stream, config.negotiation);
        if let Some(ref kickstart) = config.kickstart {
            transport.send(kickstart.as_bytes()).await?;
        }

        Ok(transport)
    }

    /// Wrap an already-connected stream.
    pub fn from_stream<S>(stream: S, mode: NegotiationMode) -> Self
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(io_loop(stream, TelnetCodec::new(mode), write_rx, event_tx));

        Self {
            writes: write_tx,
            events: event_rx,
            task,
        }
    }
}

async fn io_loop<S>(
    mut stream: S,
    mut codec: TelnetCodec,
    mut writes: mpsc::UnboundedReceiver<Bytes>,
    events: mpsc::UnboundedSender<TransportEvent>,
) where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    let mut buf = BytesMut::with_capacity(READ_BUFFER);

    loop {
        buf.reserve(READ_BUFFER);

        tokio::select! {
            read = stream.read_buf(&mut buf) => match read {
                Ok(0) => {
                    debug!("telnet peer closed the connection");
                    let _ = events.send(TransportEvent::Closed);
                    return;
                }
                Ok(_) => {
                    let decoded = codec.decode(&buf.split());

                    if !decoded.replies.is_empty() {
                        if let Err(e) = write_flush(&mut stream, &decoded.replies).await {
                            let _ = events.send(TransportEvent::Error(e.to_string()));
                            return;
                        }
                    }

                    if !decoded.data.is_empty()
                        && events.send(TransportEvent::Data(decoded.data.freeze())).is_err()
                    {
                        return;
                    }
                }
                Err(e) => {
                    warn!("telnet read failed: {}", e);
                    let _ = events.send(TransportEvent::Error(e.to_string()));
                    return;
                }
            },
            outgoing = writes.recv() => match outgoing {
                Some(data) => {
                    if let Err(e) = write_flush(&mut stream, &TelnetCodec::encode(&data)).await {
                        warn!("telnet write failed: {}", e);
                        let _ = events.send(TransportEvent::Error(e.to_string()));
                        return;
                    }
                }
                None => {
                    let _ = stream.shutdown().await;
                    return;
                }
            },
        }
    }
}

async fn write_flush<S>(stream: &mut S, data: &[u8]) -> std::io::Result<()>
where
    S: AsyncWrite + Unpin,
{
    stream.write_all(data).await?;
    stream.flush().await
}

impl Transport for TelnetTransport {
    fn kind(&self) -> TransportKind {
        TransportKind::Telnet
    }

    async fn send(&mut self, data: &[u8]) -> Result<()> {
        self.writes
            .send(Bytes::copy_from_slice(data))
            .map_err(|_| TransportError::Disconnected)?;
        Ok(())
    }

    async fn recv(&mut self) -> Option<TransportEvent> {
        self.events.recv().await
    }

    async fn close(&mut self) -> Result<()> {
        // Dropping the only write sender makes the I/O task shut down.
        let (closed, _) = mpsc::unbounded_channel();
        drop(std::mem::replace(&mut self.writes, closed));

        if !self.task.is_finished()
            && tokio::time::timeout(CLOSE_GRACE, &mut self.task).await.is_err()
        {
            warn!("telnet I/O task did not stop within {:?}", CLOSE_GRACE);
            self.task.abort();
        }
        Ok(())
    }
}

impl Drop for TelnetTransport {
    fn drop(&mut self) {
        self.task.abort();
    }
}
