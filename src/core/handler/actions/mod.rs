// src/core/handler/actions/mod.rs

//! Command implementations, grouped by the records they touch, plus the
//! argument parsing they share.
//!
//! Every action returns `Err` for input it refuses. The calling session logs
//! the error and sends nothing, because the protocol has no error reply.

pub(super) mod auth;
pub(super) mod authors;
pub(super) mod messages;
pub(super) mod novels;
pub(super) mod profile;
pub(super) mod users;

use crate::core::ScriptoriumError;
use crate::core::handler::DispatchContext;
use serde::Serialize;
use std::ops::Range;

/// Checks the exact argument count for `command`.
pub(super) fn expect_args<'a>(
    command: &str,
    args: &'a [String],
    count: usize,
) -> Result<&'a [String], ScriptoriumError> {
    if args.len() == count {
        Ok(args)
    } else {
        Err(ScriptoriumError::WrongArgumentCount(command.to_string()))
    }
}

pub(super) fn parse_id(value: &str) -> Result<i64, ScriptoriumError> {
    Ok(value.trim().parse::<i64>()?)
}

pub(super) fn parse_i32(value: &str) -> Result<i32, ScriptoriumError> {
    Ok(value.trim().parse::<i32>()?)
}

/// Parses a `start, end` pair: end-exclusive, non-negative, `start <= end`.
pub(super) fn parse_range(start: &str, end: &str) -> Result<Range<usize>, ScriptoriumError> {
    let start = start.trim().parse::<usize>()?;
    let end = end.trim().parse::<usize>()?;
    if start > end {
        return Err(ScriptoriumError::InvalidArgument(format!(
            "range start {start} is after end {end}"
        )));
    }
    Ok(start..end)
}

pub(super) fn non_empty<'a>(field: &str, value: &'a str) -> Result<&'a str, ScriptoriumError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ScriptoriumError::InvalidArgument(format!("{field} is empty")))
    } else {
        Ok(trimmed)
    }
}

pub(super) fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, ScriptoriumError> {
    Ok(serde_json::to_string(value)?)
}

pub(super) fn store_failure(what: &str) -> ScriptoriumError {
    ScriptoriumError::Store(format!("{what} failed"))
}

/// Pushes one image as `loadimages <key>:key:<base64>`. Nothing is sent when
/// the key is empty or unknown.
pub(super) async fn push_image(ctx: &DispatchContext, key: &str) -> bool {
    if key.is_empty() {
        return false;
    }
    match ctx.state.files.resolve(key).await {
        Some(content) => {
            ctx.reply("loadimages", [format!("{key}:key:{content}")])
                .await
        }
        None => false,
    }
}
