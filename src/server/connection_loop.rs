// src/server/connection_loop.rs

//! Contains the main server loop for accepting connections and handling graceful shutdown.

use super::context::ServerContext;
use crate::connection::{Connection, ConnectionHandler};
use crate::core::metrics;
use crate::core::session::ConnectionId;
use crate::core::state::ServerState;
use anyhow::{Context, Result};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, ReadHalf};
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::broadcast;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

/// Registers a freshly accepted stream and builds its read loop.
///
/// Returns `None`, dropping (and so closing) the stream, when the server is at
/// `max_clients` or shutting down.
pub fn open_connection<S>(
    state: &Arc<ServerState>,
    stream: S,
    addr: SocketAddr,
    global_shutdown_rx: broadcast::Receiver<()>,
) -> Option<(Arc<Connection>, ConnectionHandler<ReadHalf<S>>)>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    state.stats.increment_total_connections();
    metrics::CONNECTIONS_RECEIVED_TOTAL.inc();

    if state.is_shutting_down() {
        return None;
    }
    if state.registry.count() >= state.config.max_clients {
        warn!(
            "Rejecting connection from {}: client limit of {} reached.",
            addr, state.config.max_clients
        );
        metrics::CONNECTIONS_REJECTED_TOTAL.inc();
        return None;
    }

    let id = ConnectionId::generate();
    let (reader, writer) = tokio::io::split(stream);
    let conn = Connection::new(id, addr, writer, state.wire.clone());
    if !state.registry.add(conn.clone()) {
        error!("Connection id {} collided with a live connection.", conn.id());
        return None;
    }
    metrics::CONNECTED_CLIENTS.inc();

    match conn.id().connected_at() {
        Some(at) => info!(
            "Client {} connected from {} at {}.",
            conn.id(),
            addr,
            at.format("%d.%m.%Y %H:%M:%S")
        ),
        None => info!("Client {} connected from {}.", conn.id(), addr),
    }

    let handler = ConnectionHandler::new(reader, conn.clone(), state.clone(), global_shutdown_rx);
    Some((conn, handler))
}

/// The main server loop. Runs until SIGINT or SIGTERM.
pub async fn run(ctx: ServerContext) -> Result<()> {
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to register SIGINT handler")?;
    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to register SIGTERM handler")?;

    let shutdown_signal = async move {
        tokio::select! {
            _ = sigint.recv() => info!("SIGINT received, initiating graceful shutdown."),
            _ = sigterm.recv() => info!("SIGTERM received, initiating graceful shutdown."),
        }
    };
    run_until(ctx, shutdown_signal).await;
    Ok(())
}

/// Accepts connections until `shutdown` completes or a background task fails,
/// then shuts everything down.
pub async fn run_until<F>(mut ctx: ServerContext, shutdown: F)
where
    F: Future<Output = ()>,
{
    let mut client_tasks = JoinSet::new();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;

            _ = &mut shutdown => break,

            Some(res) = ctx.background_tasks.join_next() => {
                match res {
                    Ok(Ok(())) => warn!("A background task finished unexpectedly without an error."),
                    Ok(Err(e)) => { error!("CRITICAL: Background task failed: {}. Shutting down.", e); break; }
                    Err(e) => { error!("CRITICAL: Background task panicked: {e:?}. Shutting down."); break; }
                }
            },

            res = ctx.listener.accept() => {
                match res {
                    Ok((socket, addr)) => {
                        if let Err(e) = socket.set_nodelay(true) {
                            warn!("Failed to set TCP_NODELAY for {}: {}", addr, e);
                        }
                        if let Some((_, mut handler)) =
                            open_connection(&ctx.state, socket, addr, ctx.shutdown_tx.subscribe())
                        {
                            client_tasks.spawn(async move { handler.run().await });
                        }
                    }
                    Err(e) => error!("Failed to accept connection: {}", e),
                }
            },

            Some(res) = client_tasks.join_next() => {
                if let Err(e) = res
                    && e.is_panic()
                {
                    error!("A client handler panicked: {e:?}");
                }
            },
        }
    }

    shutdown_gracefully(ctx, client_tasks).await;
}

async fn shutdown_gracefully(mut ctx: ServerContext, mut client_tasks: JoinSet<()>) {
    info!("Shutting down. Sending signal to all tasks.");
    ctx.state.begin_shutdown();
    if ctx.shutdown_tx.send(()).is_err() {
        info!("No tasks were subscribed to the shutdown signal.");
    }

    let grace = ctx.state.config.shutdown_grace;
    ctx.state.registry.disconnect_all(grace).await;

    if tokio::time::timeout(grace, async {
        while client_tasks.join_next().await.is_some() {}
    })
    .await
    .is_err()
    {
        warn!("Timed out after {:?} waiting for client tasks; aborting them.", grace);
        client_tasks.shutdown().await;
    }
    info!("All client connections closed.");

    info!("Waiting for background tasks to finish...");
    if tokio::time::timeout(Duration::from_secs(10), async {
        while ctx.background_tasks.join_next().await.is_some() {}
    })
    .await
    .is_err()
    {
        warn!("Timed out waiting for background tasks to finish cleanly.");
    };
    drop(ctx.listener);
    info!("Server shutdown complete.");
}
