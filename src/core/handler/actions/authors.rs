// src/core/handler/actions/authors.rs

use super::{expect_args, non_empty, parse_id, parse_range, store_failure, to_json};
use crate::core::ScriptoriumError;
use crate::core::handler::DispatchContext;
use crate::core::protocol::Message;
use crate::core::store::Author;

pub async fn handle_get_author_list(
    ctx: &DispatchContext,
    args: &[String],
) -> Result<(), ScriptoriumError> {
    let args = expect_args("getauthorlist", args, 2)?;
    let range = parse_range(&args[0], &args[1])?;
    let authors = ctx
        .state
        .content
        .list_authors(range)
        .await
        .ok_or_else(|| store_failure("author listing"))?;
    ctx.reply("setauthorlist", [to_json(&authors)?]).await;
    Ok(())
}

/// Handles `saveauthor <id> <name> <country>`; id 0 creates a new author.
pub async fn handle_save_author(
    ctx: &DispatchContext,
    args: &[String],
) -> Result<(), ScriptoriumError> {
    let args = expect_args("saveauthor", args, 3)?;
    let id = parse_id(&args[0])?;
    let author = Author {
        id,
        name: non_empty("name", &args[1])?.to_string(),
        country: args[2].trim().to_string(),
    };
    let saved = ctx
        .state
        .content
        .save_author(author)
        .await
        .ok_or_else(|| store_failure("author save"))?;
    let command = if id == 0 { "addauthor" } else { "updateauthor" };
    ctx.state
        .registry
        .broadcast_authenticated(&Message::new(command).arg(to_json(&saved)?))
        .await;
    Ok(())
}

pub async fn handle_remove_author(
    ctx: &DispatchContext,
    args: &[String],
) -> Result<(), ScriptoriumError> {
    let args = expect_args("removeauthor", args, 1)?;
    let id = parse_id(&args[0])?;
    if !ctx.state.content.remove_author(id).await {
        return Err(store_failure("author removal"));
    }
    ctx.state
        .registry
        .broadcast_authenticated(&Message::new("removeauthor").arg(id.to_string()))
        .await;
    Ok(())
}
