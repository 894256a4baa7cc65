// src/core/handler/actions/novels.rs

use super::{expect_args, non_empty, parse_id, parse_range, store_failure, to_json};
use crate::core::ScriptoriumError;
use crate::core::handler::DispatchContext;
use crate::core::protocol::Message;
use crate::core::store::{Chapter, Novel};
use chrono::Utc;

pub async fn handle_get_novel_list(
    ctx: &DispatchContext,
    args: &[String],
) -> Result<(), ScriptoriumError> {
    let args = expect_args("getnovellist", args, 2)?;
    let range = parse_range(&args[0], &args[1])?;
    let novels = ctx
        .state
        .content
        .list_novels(range)
        .await
        .ok_or_else(|| store_failure("novel listing"))?;
    ctx.reply("setnovellist", [to_json(&novels)?]).await;
    Ok(())
}

/// Handles `savenovel <id> <title> <author_id> <chapters_json>`; id 0 creates
/// a new novel. `chapters_json` is an array of `{"Title": ...}` objects.
pub async fn handle_save_novel(
    ctx: &DispatchContext,
    args: &[String],
) -> Result<(), ScriptoriumError> {
    let args = expect_args("savenovel", args, 4)?;
    let id = parse_id(&args[0])?;
    let title = non_empty("title", &args[1])?.to_string();
    let author_id = parse_id(&args[2])?;
    let chapters: Vec<Chapter> = serde_json::from_str(&args[3])
        .map_err(|e| ScriptoriumError::InvalidArgument(format!("chapters: {e}")))?;

    let novel = Novel {
        id,
        title,
        creation_date: Utc::now(),
        chapter_count: chapters.len(),
        author_id,
        chapters,
    };
    let saved = ctx
        .state
        .content
        .save_novel(novel)
        .await
        .ok_or_else(|| store_failure("novel save"))?;
    let command = if id == 0 { "addnovel" } else { "updatenovel" };
    ctx.state
        .registry
        .broadcast_authenticated(&Message::new(command).arg(to_json(&saved)?))
        .await;
    Ok(())
}

pub async fn handle_remove_novel(
    ctx: &DispatchContext,
    args: &[String],
) -> Result<(), ScriptoriumError> {
    let args = expect_args("removenovel", args, 1)?;
    let id = parse_id(&args[0])?;
    if !ctx.state.content.remove_novel(id).await {
        return Err(store_failure("novel removal"));
    }
    ctx.state
        .registry
        .broadcast_authenticated(&Message::new("removenovel").arg(id.to_string()))
        .await;
    Ok(())
}
