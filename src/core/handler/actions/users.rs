// src/core/handler/actions/users.rs

//! User administration for staff.

use super::{expect_args, parse_i32, parse_id, parse_range, store_failure, to_json};
use crate::core::ScriptoriumError;
use crate::core::handler::DispatchContext;
use crate::core::protocol::Message;
use crate::core::session::Principal;
use crate::core::store::{Role, User, UserView};
use tracing::info;

pub async fn handle_get_users(ctx: &DispatchContext, args: &[String]) -> Result<(), ScriptoriumError> {
    let args = expect_args("getusers", args, 2)?;
    let range = parse_range(&args[0], &args[1])?;
    let users = ctx
        .state
        .users
        .list_users(range)
        .await
        .ok_or_else(|| store_failure("user listing"))?;
    let views: Vec<UserView> = users.iter().map(UserView::from).collect();
    ctx.reply("setusers", [to_json(&views)?]).await;
    Ok(())
}

/// Only an owner may touch an owner or hand out the owner role, and nobody
/// changes their own role.
fn may_edit(actor: &Principal, target: &User, new_role: Role) -> bool {
    let actor_is_owner = actor.role() == Some(Role::Owner);
    if target.id == actor.user_id && target.role_id != new_role.id() {
        return false;
    }
    if (target.role() == Some(Role::Owner) || new_role == Role::Owner) && !actor_is_owner {
        return false;
    }
    true
}

/// Handles `edituser <user_id> <role_id> <nickname>`.
pub async fn handle_edit_user(
    ctx: &DispatchContext,
    principal: &Principal,
    args: &[String],
) -> Result<(), ScriptoriumError> {
    let args = expect_args("edituser", args, 3)?;
    let user_id = parse_id(&args[0])?;
    let new_role = Role::from_id(parse_i32(&args[1])?)
        .ok_or_else(|| ScriptoriumError::InvalidArgument(format!("unknown role '{}'", args[1])))?;
    let nickname = args[2].trim().to_string();

    let users = &ctx.state.users;
    let mut target = users
        .find_by_id(user_id)
        .await
        .ok_or_else(|| ScriptoriumError::InvalidArgument(format!("unknown user {user_id}")))?;
    if !may_edit(principal, &target, new_role) {
        return Err(ScriptoriumError::InvalidArgument(format!(
            "user {} may not edit user {}",
            principal.user_id, user_id
        )));
    }

    target.role_id = new_role.id();
    target.nickname = nickname;
    if !users.update(&target).await {
        ctx.reply("edituser_result", ["internal_error"]).await;
        return Ok(());
    }
    ctx.reply("edituser_result", ["completed"]).await;
    info!(
        "User {} edited user {} (role {}).",
        principal.user_id,
        target.id,
        new_role.name()
    );

    let registry = &ctx.state.registry;
    let update = Message::new("updateuser").arg(to_json(&UserView::from(&target))?);
    registry.broadcast_to_roles(Role::STAFF, &update).await;

    if target.id == principal.user_id {
        ctx.conn.set_principal(Principal::from(&target));
    } else if let Some(conn) = registry.find_by_principal_id(target.id) {
        info!(
            "Disconnecting client {} after its user was edited.",
            conn.id()
        );
        conn.disconnect(registry).await;
    }
    Ok(())
}
