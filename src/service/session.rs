//! Per-connection session state and lifecycle.
//!
//! A session owns one client connection end to end: the receive loop decodes
//! frames and feeds the router, the writer task drains the outbound queue to
//! the socket. Both halves funnel every failure into the same idempotent
//! `disconnect()`, so teardown is a single step whether it starts with EOF,
//! a read error, or a failed send.
//!
//! Outbound writes for one connection go through one queue drained by one
//! task, which preserves send-invocation order. Nothing is ordered across
//! different sessions.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_util::codec::FramedRead;
use tracing::{debug, info, warn};

use crate::core::codec::FrameCodec;
use crate::core::message::{Message, HEADER_LEN, LENGTH_PREFIX_LEN};
use crate::protocol::registry::Registry;
use crate::protocol::router::Router;
use crate::protocol::SERVER_ID;
use crate::utils::metrics::Metrics;

/// Commands consumed by a session's writer task.
#[derive(Debug)]
pub(crate) enum Outbound {
    /// Write a pre-encoded frame verbatim
    Frame(Bytes),
    /// Stop writing and close the socket
    Shutdown,
}

/// One live client connection.
///
/// Lifecycle: created by the acceptor, registered, handshaken, then active
/// until the receive loop ends for any reason. `disconnect()` flips `alive`
/// exactly once; after that every operation is a no-op.
pub struct Session {
    id: i32,
    peer: SocketAddr,
    alive: AtomicBool,
    outbound: mpsc::UnboundedSender<Outbound>,
    registry: Arc<Registry>,
    metrics: Arc<Metrics>,
}

impl Session {
    /// Build a session and the receiving end of its outbound queue. The
    /// caller hands the receiver to [`write_loop`] together with the write
    /// half of the connection.
    pub(crate) fn new(
        id: i32,
        peer: SocketAddr,
        registry: Arc<Registry>,
        metrics: Arc<Metrics>,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = Arc::new(Self {
            id,
            peer,
            alive: AtomicBool::new(true),
            outbound: tx,
            registry,
            metrics,
        });
        (session, rx)
    }

    pub fn id(&self) -> i32 {
        self.id
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Send a server-originated packet. The sender identity is always the
    /// server's reserved `0`, never anything a client supplied.
    pub fn send_packet(&self, msg_id: i32, target_id: i32, body: Bytes) {
        let message = Message::new(msg_id, SERVER_ID, target_id, body);
        match message.encode() {
            Ok(frame) => self.send_raw(frame),
            Err(e) => warn!(session_id = self.id, error = %e, "Packet encode failed"),
        }
    }

    /// Queue an already-framed byte sequence for this connection.
    ///
    /// Used by the router to avoid re-encoding per recipient. A failed
    /// enqueue means the writer is gone and the connection is presumed
    /// broken; it degrades into `disconnect()` rather than surfacing an
    /// error.
    pub fn send_raw(&self, frame: Bytes) {
        if !self.is_alive() {
            return;
        }

        let len = frame.len() as u64;
        if self.outbound.send(Outbound::Frame(frame)).is_err() {
            self.metrics.send_error();
            self.disconnect();
        } else {
            self.metrics.message_sent(len);
        }
    }

    /// Tear the session down. Idempotent: the first call removes the session
    /// from the registry and releases the connection; later calls, whether
    /// from the receive loop or a failed send racing it, are no-ops.
    pub fn disconnect(&self) {
        if !self.alive.swap(false, Ordering::SeqCst) {
            return;
        }

        // Unregister first: once removal starts, routing must attempt no
        // further sends against this session.
        self.registry.unregister(self.id);
        let _ = self.outbound.send(Outbound::Shutdown);
        self.metrics.connection_closed();
        info!(session_id = self.id, peer = %self.peer, "Session disconnected");
    }
}

/// Drain a session's outbound queue into the socket's write half.
///
/// Ends on a shutdown command, a closed queue, or a write error; a write
/// error also disconnects the session (writes are never retried).
pub(crate) async fn write_loop(
    session: Arc<Session>,
    mut rx: mpsc::UnboundedReceiver<Outbound>,
    mut writer: OwnedWriteHalf,
) {
    while let Some(cmd) = rx.recv().await {
        match cmd {
            Outbound::Frame(frame) => {
                if let Err(e) = writer.write_all(&frame).await {
                    debug!(session_id = session.id(), error = %e, "Write failed");
                    session.metrics.send_error();
                    session.disconnect();
                    break;
                }
            }
            Outbound::Shutdown => break,
        }
    }

    let _ = writer.shutdown().await;
}

/// Run a session's receive loop until disconnection.
///
/// Each decoded frame payload shorter than the fixed header is logged and
/// skipped; the connection keeps reading. Everything else is handed to the
/// router. Read errors of any kind (EOF, reset, malformed length prefix) end
/// the loop and trigger `disconnect()`.
pub(crate) async fn read_loop(
    session: Arc<Session>,
    reader: OwnedReadHalf,
    router: Arc<Router>,
    max_frame_size: usize,
) {
    let mut framed = FramedRead::new(reader, FrameCodec::with_max_frame_size(max_frame_size));

    while let Some(item) = framed.next().await {
        let payload = match item {
            Ok(payload) => payload,
            Err(e) => {
                debug!(session_id = session.id(), error = %e, "Read failed");
                break;
            }
        };

        session
            .metrics
            .message_received((LENGTH_PREFIX_LEN + payload.len()) as u64);

        if payload.len() < HEADER_LEN {
            warn!(
                session_id = session.id(),
                len = payload.len(),
                "Frame shorter than header, skipping"
            );
            session.metrics.frame_skipped();
            continue;
        }

        match Message::from_payload(payload) {
            Ok(message) => router.route(&session, message.header, message.body),
            Err(e) => {
                // Unreachable past the length check above, but never fatal
                warn!(session_id = session.id(), error = %e, "Header decode failed, skipping");
                session.metrics.frame_skipped();
            }
        }
    }

    session.disconnect();
}
