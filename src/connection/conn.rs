// src/connection/conn.rs

//! Defines `Connection`, the shared handle to one client socket.
//!
//! The read half is owned by the `ConnectionHandler` task; everything else
//! (the serialized write half, the principal, the handler chain) lives here so
//! that other connections' handlers can push to this client or disconnect it.

use crate::core::ScriptoriumError;
use crate::core::handler::{HandlerKind, MessageHandler};
use crate::core::metrics;
use crate::core::protocol::{ChunkFrameCodec, Message, WireProtocol};
use crate::core::session::{ConnectionId, Principal};
use crate::core::state::ConnectionRegistry;
use futures::SinkExt;
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{Mutex as AsyncMutex, broadcast};
use tokio_util::codec::FramedWrite;
use tracing::{debug, info, warn};

/// Any writable transport half (a TCP write half in production, a duplex pipe in tests).
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;
type FrameSink = FramedWrite<BoxedWriter, ChunkFrameCodec>;

/// Upper bound on each blocking step of `close`: acquiring the writer and
/// shutting the socket down.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

pub struct Connection {
    id: ConnectionId,
    addr: SocketAddr,
    wire: Arc<WireProtocol>,
    /// `None` once the connection is closed. The lock spans a whole frame so
    /// chunk sequences of two messages never interleave.
    writer: AsyncMutex<Option<FrameSink>>,
    principal: RwLock<Option<Principal>>,
    handlers: Mutex<Vec<Arc<dyn MessageHandler>>>,
    closed: AtomicBool,
    kill_tx: broadcast::Sender<()>,
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("addr", &self.addr)
            .field("principal", &*self.principal.read())
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Connection {
    pub fn new<W>(id: ConnectionId, addr: SocketAddr, writer: W, wire: Arc<WireProtocol>) -> Arc<Self>
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let sink = FramedWrite::new(Box::new(writer) as BoxedWriter, wire.codec());
        let (kill_tx, _) = broadcast::channel(1);
        Arc::new(Self {
            id,
            addr,
            wire,
            writer: AsyncMutex::new(Some(sink)),
            principal: RwLock::new(None),
            handlers: Mutex::new(Vec::new()),
            closed: AtomicBool::new(false),
            kill_tx,
        })
    }

    pub fn id(&self) -> &ConnectionId {
        &self.id
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub fn wire(&self) -> &Arc<WireProtocol> {
        &self.wire
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// A receiver that fires when `close` is called.
    pub fn subscribe_kill(&self) -> broadcast::Receiver<()> {
        self.kill_tx.subscribe()
    }

    // --- Principal ---

    pub fn principal(&self) -> Option<Principal> {
        self.principal.read().clone()
    }

    pub fn principal_id(&self) -> Option<i64> {
        self.principal.read().as_ref().map(|p| p.user_id)
    }

    pub fn is_authenticated(&self) -> bool {
        self.principal.read().is_some()
    }

    /// Binds or refreshes the principal.
    pub fn set_principal(&self, principal: Principal) {
        if self.principal.write().replace(principal).is_none() {
            metrics::AUTHENTICATED_SESSIONS.inc();
        }
    }

    pub fn clear_principal(&self) -> Option<Principal> {
        let previous = self.principal.write().take();
        if previous.is_some() {
            metrics::AUTHENTICATED_SESSIONS.dec();
        }
        previous
    }

    // --- Handler chain ---

    /// A copy of the chain, safe to iterate across `.await` points.
    pub fn handlers(&self) -> Vec<Arc<dyn MessageHandler>> {
        self.handlers.lock().clone()
    }

    pub fn has_handler(&self, kind: HandlerKind) -> bool {
        self.handlers.lock().iter().any(|h| h.kind() == kind)
    }

    /// Appends a handler. At most one handler of each kind may be attached;
    /// returns `false` if one already is or the connection is closed.
    pub fn attach(&self, handler: Arc<dyn MessageHandler>) -> bool {
        if self.is_closed() {
            return false;
        }
        let mut handlers = self.handlers.lock();
        if handlers.iter().any(|h| h.kind() == handler.kind()) {
            return false;
        }
        handlers.push(handler);
        true
    }

    /// Detaches and disposes the handler of the given kind.
    pub fn detach(&self, kind: HandlerKind) -> bool {
        let removed: Vec<Arc<dyn MessageHandler>> = {
            let mut handlers = self.handlers.lock();
            let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut *handlers)
                .into_iter()
                .partition(|h| h.kind() == kind);
            *handlers = kept;
            removed
        };
        for handler in &removed {
            handler.dispose();
        }
        !removed.is_empty()
    }

    // --- Outbound ---

    /// Sends a command, absorbing any failure. Returns whether it was written.
    pub async fn send<I, S>(&self, command: &str, args: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.send_message(&Message::with_args(command, args)).await
    }

    /// Sends a message, absorbing any failure. Returns whether it was written.
    pub async fn send_message(&self, message: &Message) -> bool {
        match self.try_send(message).await {
            Ok(()) => true,
            Err(e) if e.is_normal_disconnect() => {
                debug!("Dropped '{}' for closed connection {}.", message.command(), self.id);
                false
            }
            Err(e) => {
                warn!(
                    "Error sending '{}' to client {} ({}): {}",
                    message.command(),
                    self.id,
                    self.addr,
                    e
                );
                false
            }
        }
    }

    /// Serializes, encrypts and frames `message`, holding the write lock for
    /// the whole frame. A `close` aborts both the wait for the lock and a
    /// write stuck on a peer that stopped reading.
    pub async fn try_send(&self, message: &Message) -> Result<(), ScriptoriumError> {
        let payload = self.wire.seal(message);
        // Subscribe before the closed check so a concurrent `close` is seen.
        let mut kill_rx = self.kill_tx.subscribe();
        if self.is_closed() {
            return Err(ScriptoriumError::Closed);
        }
        tokio::select! {
            biased;
            _ = kill_rx.recv() => Err(ScriptoriumError::Closed),
            res = async {
                let mut writer = self.writer.lock().await;
                let sink = writer.as_mut().ok_or(ScriptoriumError::Closed)?;
                sink.send(payload).await
            } => res,
        }
    }

    // --- Lifecycle ---

    /// Disposes all handlers, clears the principal, stops the read loop and
    /// shuts the socket down. Safe to call any number of times.
    ///
    /// Never blocks on the peer: the kill signal aborts in-flight writes, and
    /// the writer wait and socket shutdown are each bounded by `CLOSE_TIMEOUT`.
    /// If either times out the socket is released with the last handle to
    /// the connection.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let handlers = std::mem::take(&mut *self.handlers.lock());
        for handler in handlers {
            handler.dispose();
        }
        self.clear_principal();
        let _ = self.kill_tx.send(());

        match tokio::time::timeout(CLOSE_TIMEOUT, self.writer.lock()).await {
            Ok(mut writer) => {
                let sink = writer.take();
                drop(writer);
                if let Some(sink) = sink {
                    // Shut the transport down directly; flushing a partially
                    // written frame could block on a peer that is not reading.
                    let mut io = sink.into_inner();
                    match tokio::time::timeout(CLOSE_TIMEOUT, io.shutdown()).await {
                        Ok(Err(e)) => {
                            debug!("Error shutting down socket for {}: {}", self.id, e)
                        }
                        Err(_) => debug!("Socket shutdown for {} timed out.", self.id),
                        Ok(Ok(())) => {}
                    }
                }
            }
            Err(_) => warn!(
                "Writer for client {} still busy after {:?}; socket is dropped with the connection.",
                self.id, CLOSE_TIMEOUT
            ),
        }
        info!("Client {} ({}) disconnected.", self.id, self.addr);
    }

    /// Removes this connection from the registry, then closes it.
    pub async fn disconnect(&self, registry: &ConnectionRegistry) {
        registry.remove(&self.id);
        self.close().await;
    }

    /// Synchronous teardown for `Drop` paths that cannot await: marks the
    /// connection closed and drops the writer if it is not in use.
    pub(crate) fn close_now(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let handlers = std::mem::take(&mut *self.handlers.lock());
        for handler in handlers {
            handler.dispose();
        }
        self.clear_principal();
        let _ = self.kill_tx.send(());
        if let Ok(mut writer) = self.writer.try_lock() {
            writer.take();
        }
    }
}
