// src/core/handler/mod.rs

//! The capability handler chain.
//!
//! Each connection carries an ordered list of handlers. An inbound message is
//! offered to them in attachment order and the first one that claims it stops
//! the chain. Messages nobody claims fall through to the anonymous command set
//! (`reg`, `auth`, `getimagebyid`), and anything still unclaimed is logged and
//! dropped.

mod actions;
pub mod anonymous;
pub mod authenticated;

pub use anonymous::AnonymousSession;
pub use authenticated::AuthenticatedSession;

use crate::connection::Connection;
use crate::core::metrics;
use crate::core::protocol::Message;
use crate::core::state::ServerState;
use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::warn;

/// The variants a handler can be. A connection holds at most one of each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandlerKind {
    Anonymous,
    Authenticated,
}

/// What a handler gets to work with: the server context and the connection the
/// message arrived on. Handlers keep no references of their own, so nothing
/// they hold can outlive the connection.
#[derive(Debug, Clone)]
pub struct DispatchContext {
    pub state: Arc<ServerState>,
    pub conn: Arc<Connection>,
}

impl DispatchContext {
    pub fn new(state: Arc<ServerState>, conn: Arc<Connection>) -> Self {
        Self { state, conn }
    }

    /// Replies on the originating connection. Failures are absorbed.
    pub async fn reply<I, S>(&self, command: &str, args: I) -> bool
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.conn.send(command, args).await
    }
}

#[async_trait]
pub trait MessageHandler: Send + Sync + Debug {
    fn kind(&self) -> HandlerKind;

    /// Returns `true` if this handler claims the message, in which case no
    /// other handler sees it. A claimed message may still be ignored silently
    /// (bad arity, insufficient role).
    async fn try_handle(&self, ctx: &DispatchContext, message: &Message) -> bool;

    /// Called once when the handler is detached or its connection closes.
    fn dispose(&self) {}
}

/// The outcome of offering a message to a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    Claimed(HandlerKind),
    Unknown,
}

/// Offers `message` to the connection's chain, then to the anonymous set.
pub async fn dispatch(ctx: &DispatchContext, message: &Message) -> Dispatch {
    ctx.state.stats.increment_total_commands();

    // The chain is copied so handlers may attach or detach while running.
    for handler in ctx.conn.handlers() {
        if handler.try_handle(ctx, message).await {
            record(message, "claimed");
            return Dispatch::Claimed(handler.kind());
        }
    }
    if AnonymousSession.try_handle(ctx, message).await {
        record(message, "claimed");
        return Dispatch::Claimed(HandlerKind::Anonymous);
    }

    warn!(
        "Unknown command '{}' from client {} ({}).",
        message.command(),
        ctx.conn.id(),
        ctx.conn.addr()
    );
    ctx.state.stats.increment_unknown_commands();
    metrics::COMMANDS_PROCESSED_TOTAL
        .with_label_values(&["unknown", "unknown"])
        .inc();
    Dispatch::Unknown
}

fn record(message: &Message, outcome: &str) {
    metrics::COMMANDS_PROCESSED_TOTAL
        .with_label_values(&[message.name().as_str(), outcome])
        .inc();
}
