// src/core/handler/anonymous.rs

//! The command set every connection has, authenticated or not.

use super::actions::auth;
use super::{DispatchContext, HandlerKind, MessageHandler};
use crate::core::protocol::Message;
use async_trait::async_trait;
use tracing::debug;

/// Registration, authentication and image lookup. Not attached to any chain:
/// it is the fallback tried after every attached handler has passed.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnonymousSession;

#[async_trait]
impl MessageHandler for AnonymousSession {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Anonymous
    }

    async fn try_handle(&self, ctx: &DispatchContext, message: &Message) -> bool {
        let args = message.args();
        let result = match message.name().as_str() {
            "reg" => auth::handle_register(ctx, args).await,
            "auth" => auth::handle_authenticate(ctx, args).await,
            "getimagebyid" => auth::handle_get_image_by_id(ctx, args).await,
            _ => return false,
        };
        if let Err(e) = result {
            debug!(
                "Ignored '{}' from client {}: {}",
                message.command(),
                ctx.conn.id(),
                e
            );
        }
        true
    }
}
