//! TCP transport: dialing, framing, and the serialized write path.
//!
//! All writers hand their messages to a single writer task through
//! [`MessageSender`], so concurrent senders (the dispatch loop, external
//! handlers, the keep-alive task) never interleave bytes on the socket.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::codec::TtCodec;
use crate::error::{ProtocolError, Result};
use crate::message::Message;

/// Outcome of a timed transport read.
#[derive(Debug)]
pub enum ReadOutcome {
    /// A decoded message.
    Message(Message),
    /// The read timed out with no data.
    Idle,
    /// The connection closed or a shutdown was requested.
    Closed,
}

/// Handle for submitting messages to the serialized write path.
///
/// Cheap to clone; all clones feed the same writer task.
#[derive(Clone)]
pub struct MessageSender {
    tx: mpsc::UnboundedSender<Message>,
}

impl MessageSender {
    /// Queue a message for writing. Fails once the connection has shut
    /// down.
    pub fn send(&self, message: Message) -> Result<()> {
        self.tx.send(message).map_err(|_| ProtocolError::Closed)
    }
}

/// One TCP connection to a server.
pub struct Transport {
    reader: FramedRead<OwnedReadHalf, TtCodec>,
    sender: MessageSender,
    shutdown: CancellationToken,
    writer: JoinHandle<()>,
}

impl Transport {
    /// Dial `host:port` and set up framing plus the writer task.
    pub async fn connect(host: &str, port: u16) -> Result<Self> {
        let stream = TcpStream::connect((host, port)).await?;
        if let Err(e) = enable_keepalive(&stream) {
            warn!("failed to enable TCP keepalive: {}", e);
        }

        let (read_half, write_half) = stream.into_split();
        let reader = FramedRead::new(read_half, TtCodec::new());
        let sink = FramedWrite::new(write_half, TtCodec::new());

        let (tx, rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        let writer = tokio::spawn(write_loop(sink, rx, shutdown.clone()));

        Ok(Self {
            reader,
            sender: MessageSender { tx },
            shutdown,
            writer,
        })
    }

    /// Clone a handle to the serialized write path.
    pub fn sender(&self) -> MessageSender {
        self.sender.clone()
    }

    /// Queue a message for writing.
    pub fn send(&self, message: Message) -> Result<()> {
        self.sender.send(message)
    }

    /// Read the next message, waiting at most `timeout` (forever when
    /// `None`, which latency-sensitive callers should avoid).
    pub async fn read(&mut self, timeout: Option<Duration>) -> Result<ReadOutcome> {
        if self.shutdown.is_cancelled() {
            return Ok(ReadOutcome::Closed);
        }

        let shutdown = self.shutdown.clone();
        let next = async {
            match self.reader.next().await {
                Some(Ok(msg)) => Ok(ReadOutcome::Message(msg)),
                Some(Err(e)) => Err(e),
                None => Ok(ReadOutcome::Closed),
            }
        };

        tokio::select! {
            _ = shutdown.cancelled() => Ok(ReadOutcome::Closed),
            outcome = async {
                match timeout {
                    Some(t) => match tokio::time::timeout(t, next).await {
                        Ok(res) => res,
                        Err(_) => Ok(ReadOutcome::Idle),
                    },
                    None => next.await,
                }
            } => outcome,
        }
    }

    /// Request shutdown. Idempotent; the writer task and any pending read
    /// observe the flag cooperatively.
    pub fn disconnect(&self) {
        self.shutdown.cancel();
    }

    /// Whether a shutdown has been requested.
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    pub(crate) fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }
}

impl Drop for Transport {
    fn drop(&mut self) {
        self.shutdown.cancel();
        self.writer.abort();
    }
}

async fn write_loop(
    mut sink: FramedWrite<OwnedWriteHalf, TtCodec>,
    mut rx: mpsc::UnboundedReceiver<Message>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            msg = rx.recv() => match msg {
                Some(msg) => {
                    if let Err(e) = sink.send(msg).await {
                        debug!("write failed, shutting down: {}", e);
                        shutdown.cancel();
                        break;
                    }
                }
                None => break,
            },
        }
    }
    // closes the write side of the socket
    let _ = sink.close().await;
}

fn enable_keepalive(stream: &TcpStream) -> std::io::Result<()> {
    use socket2::{SockRef, TcpKeepalive};

    let sock = SockRef::from(stream);
    let keepalive = TcpKeepalive::new()
        .with_time(Duration::from_secs(120))
        .with_interval(Duration::from_secs(30));

    sock.set_tcp_keepalive(&keepalive)
}
