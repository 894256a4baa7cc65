// src/core/handler/actions/messages.rs

//! Chat-style messages attached to chapters.

use super::{expect_args, parse_i32, parse_id, parse_range, store_failure, to_json};
use crate::core::ScriptoriumError;
use crate::core::handler::DispatchContext;
use crate::core::protocol::Message;
use crate::core::session::Principal;
use crate::core::store::{ChatMessage, MessageKind};

/// Handles `getmessages <chapter_id> <start> <end>`.
pub async fn handle_get_messages(
    ctx: &DispatchContext,
    args: &[String],
) -> Result<(), ScriptoriumError> {
    let args = expect_args("getmessages", args, 3)?;
    let chapter_id = parse_id(&args[0])?;
    let range = parse_range(&args[1], &args[2])?;
    let messages = ctx
        .state
        .content
        .list_messages(chapter_id, range)
        .await
        .ok_or_else(|| store_failure("message listing"))?;
    ctx.reply("setmessages", [chapter_id.to_string(), to_json(&messages)?])
        .await;
    Ok(())
}

/// Handles `savemessage <chapter_id> <message_type_id> <content>`. The sender
/// is always the caller.
pub async fn handle_save_message(
    ctx: &DispatchContext,
    principal: &Principal,
    args: &[String],
) -> Result<(), ScriptoriumError> {
    let args = expect_args("savemessage", args, 3)?;
    let chapter_id = parse_id(&args[0])?;
    let kind_id = parse_i32(&args[1])?;
    if MessageKind::from_id(kind_id).is_none() {
        return Err(ScriptoriumError::InvalidArgument(format!(
            "unknown message type {kind_id}"
        )));
    }
    if args[2].is_empty() {
        return Err(ScriptoriumError::InvalidArgument("empty message".into()));
    }

    let message = ChatMessage {
        id: 0,
        chapter_id,
        content: args[2].clone(),
        sender_name: principal.display_name.clone(),
        message_type_id: kind_id,
    };
    let saved = ctx
        .state
        .content
        .save_message(message)
        .await
        .ok_or_else(|| store_failure("message save"))?;
    ctx.state
        .registry
        .broadcast_authenticated(&Message::new("addmessage").arg(to_json(&saved)?))
        .await;
    Ok(())
}
