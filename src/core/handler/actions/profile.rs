// src/core/handler/actions/profile.rs

//! The logged-in user's own profile, server info and logout.

use super::{expect_args, non_empty, push_image, store_failure};
use crate::core::ScriptoriumError;
use crate::core::handler::{DispatchContext, HandlerKind};
use crate::core::session::Principal;
use crate::core::store::User;
use tracing::info;

/// Re-reads the principal's user record and refreshes the connection's copy.
async fn refresh(ctx: &DispatchContext, principal: &Principal) -> Result<User, ScriptoriumError> {
    let user = ctx
        .state
        .users
        .find_by_id(principal.user_id)
        .await
        .ok_or_else(|| store_failure("user lookup"))?;
    ctx.conn.set_principal(Principal::from(&user));
    Ok(user)
}

async fn send_user_info(ctx: &DispatchContext, user: &User) {
    push_image(ctx, &user.avatar_id).await;
    ctx.reply("setuserinfo", [user.nickname.as_str(), user.role_name()])
        .await;
}

async fn send_edit_profile_data(ctx: &DispatchContext, user: &User) {
    ctx.reply(
        "seteditprofiledata",
        [
            user.nickname.as_str(),
            user.role_name(),
            user.avatar_id.as_str(),
        ],
    )
    .await;
}

pub async fn handle_get_user_info(
    ctx: &DispatchContext,
    principal: &Principal,
) -> Result<(), ScriptoriumError> {
    let user = refresh(ctx, principal).await?;
    send_user_info(ctx, &user).await;
    Ok(())
}

/// Replies with the number of live connections.
pub async fn handle_get_server_info(ctx: &DispatchContext) -> Result<(), ScriptoriumError> {
    let count = ctx.state.registry.count();
    ctx.reply("updateserverinfo", [count.to_string()]).await;
    Ok(())
}

pub async fn handle_get_edit_profile_info(
    ctx: &DispatchContext,
    principal: &Principal,
) -> Result<(), ScriptoriumError> {
    let keys = ctx
        .state
        .files
        .avatar_keys()
        .await
        .ok_or_else(|| store_failure("avatar listing"))?;
    let user = refresh(ctx, principal).await?;
    ctx.reply("setuseravatarimages", keys).await;
    send_edit_profile_data(ctx, &user).await;
    Ok(())
}

pub async fn handle_update_user_avatar(
    ctx: &DispatchContext,
    principal: &Principal,
    args: &[String],
) -> Result<(), ScriptoriumError> {
    let args = expect_args("updateuseravatar", args, 1)?;
    let key = non_empty("avatar key", &args[0])?;

    let mut user = refresh(ctx, principal).await?;
    user.avatar_id = key.to_string();
    if !ctx.state.users.update(&user).await {
        return Err(store_failure("avatar update"));
    }
    ctx.conn.set_principal(Principal::from(&user));
    send_user_info(ctx, &user).await;
    send_edit_profile_data(ctx, &user).await;
    Ok(())
}

/// Detaches the authenticated handler and clears the principal.
pub async fn handle_logout(ctx: &DispatchContext) -> Result<(), ScriptoriumError> {
    ctx.conn.detach(HandlerKind::Authenticated);
    if let Some(principal) = ctx.conn.clear_principal() {
        info!(
            "User {} logged out on client {}.",
            principal.user_id,
            ctx.conn.id()
        );
    }
    ctx.reply("logout_result", ["completed"]).await;
    Ok(())
}
