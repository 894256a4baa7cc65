// src/connection/handler.rs

//! Defines the `ConnectionHandler` which runs the read loop of a client connection.

use super::Connection;
use super::guard::ConnectionGuard;
use crate::core::ScriptoriumError;
use crate::core::handler::{DispatchContext, dispatch};
use crate::core::metrics;
use crate::core::protocol::ChunkFrameCodec;
use crate::core::state::ServerState;
use futures::StreamExt;
use std::sync::Arc;
use tokio::io::AsyncRead;
use tokio::sync::broadcast;
use tokio_util::codec::FramedRead;
use tracing::{Instrument, debug, info, info_span, warn};

/// Owns the read half of a connection: reassembles frames, decrypts and parses
/// them, and dispatches each message in arrival order.
pub struct ConnectionHandler<R> {
    framed: FramedRead<R, ChunkFrameCodec>,
    conn: Arc<Connection>,
    state: Arc<ServerState>,
    kill_rx: broadcast::Receiver<()>,
    global_shutdown_rx: broadcast::Receiver<()>,
}

impl<R> ConnectionHandler<R>
where
    R: AsyncRead + Send + Unpin,
{
    /// Creates a new `ConnectionHandler`. Subscribes to the connection's kill
    /// signal immediately so a `close` racing with startup is not missed.
    pub fn new(
        reader: R,
        conn: Arc<Connection>,
        state: Arc<ServerState>,
        global_shutdown_rx: broadcast::Receiver<()>,
    ) -> Self {
        let kill_rx = conn.subscribe_kill();
        let framed = FramedRead::new(reader, conn.wire().codec());
        Self {
            framed,
            conn,
            state,
            kill_rx,
            global_shutdown_rx,
        }
    }

    /// The main event loop for the connection. Returns when the peer goes away,
    /// the transport fails, the connection is closed, or the server shuts down.
    pub async fn run(&mut self) {
        let _guard = ConnectionGuard::new(self.state.clone(), self.conn.clone());
        let ctx = DispatchContext::new(self.state.clone(), self.conn.clone());

        loop {
            if self.conn.is_closed() || self.state.is_shutting_down() {
                break;
            }

            tokio::select! {
                // Prioritize shutdown signals over other events.
                biased;
                _ = self.global_shutdown_rx.recv() => {
                    info!("Connection handler for {} received GLOBAL shutdown signal.", self.conn.addr());
                    break;
                }
                _ = self.kill_rx.recv() => {
                    debug!("Connection handler for {} received kill signal.", self.conn.addr());
                    break;
                }
                result = self.framed.next() => {
                    match result {
                        Some(Ok(payload)) => self.process_frame(&ctx, payload).await,
                        Some(Err(e)) => {
                            self.log_transport_error(&e);
                            break;
                        }
                        None => {
                            debug!("Connection from {} closed by peer.", self.conn.addr());
                            break;
                        }
                    }
                }
            }
        }

        self.conn.disconnect(&self.state.registry).await;
    }

    /// Decrypts and parses one frame payload, then dispatches it. A payload
    /// that does not decrypt is dropped; the connection stays up.
    async fn process_frame(&self, ctx: &DispatchContext, payload: String) {
        let message = match self.conn.wire().open(&payload) {
            Ok(message) => message,
            Err(e) => {
                warn!(
                    "Decryption error from client {} ({}): {}. Message discarded.",
                    self.conn.id(),
                    self.conn.addr(),
                    e
                );
                self.state.stats.increment_decode_failures();
                metrics::DECODE_FAILURES_TOTAL.inc();
                return;
            }
        };

        let span = info_span!(
            "command",
            name = %message.name(),
            conn.id = %self.conn.id(),
            conn.addr = %self.conn.addr()
        );
        async {
            debug!("Received '{}' with {} argument(s).", message.command(), message.args().len());
            dispatch(ctx, &message).await;
        }
        .instrument(span)
        .await;
    }

    fn log_transport_error(&self, e: &ScriptoriumError) {
        if e.is_normal_disconnect() {
            debug!("Connection from {} closed by peer: {}", self.conn.addr(), e);
        } else {
            warn!("Connection error for {}: {}", self.conn.addr(), e);
        }
    }
}
