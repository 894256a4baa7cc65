// src/core/handler/actions/auth.rs

//! The anonymous commands: registration, authentication and image lookup.

use super::{expect_args, push_image};
use crate::core::ScriptoriumError;
use crate::core::handler::{AuthenticatedSession, DispatchContext};
use crate::core::session::Principal;
use crate::core::session::credentials::{hash_password, is_acceptable, verify_password};
use crate::core::store::NewUser;
use std::sync::Arc;
use tracing::{info, warn};

/// Placeholder id sent in failed `auth_result` replies.
const NO_ID: &str = "-1";

/// Handles `reg <login> <password>`.
pub async fn handle_register(ctx: &DispatchContext, args: &[String]) -> Result<(), ScriptoriumError> {
    if ctx.conn.is_authenticated() {
        return Err(ScriptoriumError::InvalidArgument(
            "already authenticated".into(),
        ));
    }
    let args = expect_args("reg", args, 2)?;
    let (login, password) = (args[0].as_str(), args[1].as_str());
    if !is_acceptable(login, password) {
        return Err(ScriptoriumError::InvalidArgument("credentials".into()));
    }

    let users = &ctx.state.users;
    if users.is_login_taken(login).await {
        ctx.reply("reg_result", ["login_is_taken"]).await;
        return Ok(());
    }

    let record = NewUser {
        login: login.to_string(),
        password_hash: hash_password(password),
        nickname: String::new(),
        avatar_id: ctx.state.default_avatar_key().await,
        role_id: ctx.state.config.accounts.default_role,
        fixed_key: ctx.conn.id().to_string(),
    };
    if users.create_user(record).await {
        info!("Registered user '{}' from client {}.", login, ctx.conn.id());
        ctx.reply("reg_result", ["completed"]).await;
    } else {
        warn!("Failed to persist new user '{}'.", login);
        ctx.reply("reg_result", ["internal_error"]).await;
    }
    Ok(())
}

/// Handles `auth <login> <password>`.
pub async fn handle_authenticate(
    ctx: &DispatchContext,
    args: &[String],
) -> Result<(), ScriptoriumError> {
    if ctx.conn.is_authenticated() {
        return Err(ScriptoriumError::InvalidArgument(
            "already authenticated".into(),
        ));
    }
    let args = expect_args("auth", args, 2)?;
    let (login, password) = (args[0].as_str(), args[1].as_str());
    if !is_acceptable(login, password) {
        return Err(ScriptoriumError::InvalidArgument("credentials".into()));
    }

    let Some(user) = ctx.state.users.find_by_login(login).await else {
        ctx.reply("auth_result", ["incorrect", NO_ID, NO_ID]).await;
        return Ok(());
    };
    if !verify_password(password, &user.password_hash) {
        ctx.reply("auth_result", ["incorrect_pass", NO_ID, NO_ID])
            .await;
        return Ok(());
    }

    // One live connection per user: a newer login replaces the older one.
    let registry = &ctx.state.registry;
    let _login = registry.lock_principal(user.id).await;
    if let Some(previous) = registry.find_by_principal_id(user.id)
        && previous.id() != ctx.conn.id()
    {
        info!(
            "User '{}' logged in again from {}; closing session {}.",
            user.login,
            ctx.conn.addr(),
            previous.id()
        );
        previous.disconnect(registry).await;
    }

    if !ctx
        .conn
        .attach(Arc::new(AuthenticatedSession::new(user.id)))
    {
        return Err(ScriptoriumError::Internal(format!(
            "could not attach a session to {}",
            ctx.conn.id()
        )));
    }
    ctx.conn.set_principal(Principal::from(&user));
    info!(
        "User '{}' (id {}) authenticated on client {}.",
        user.login,
        user.id,
        ctx.conn.id()
    );
    ctx.reply(
        "auth_result",
        ["allowed".to_string(), user.role_id.to_string(), user.id.to_string()],
    )
    .await;
    Ok(())
}

/// Handles `getimagebyid <key>`. Unknown keys get no reply.
pub async fn handle_get_image_by_id(
    ctx: &DispatchContext,
    args: &[String],
) -> Result<(), ScriptoriumError> {
    let args = expect_args("getimagebyid", args, 1)?;
    push_image(ctx, &args[0]).await;
    Ok(())
}
