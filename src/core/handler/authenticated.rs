// src/core/handler/authenticated.rs

//! The handler attached to a connection after a successful `auth`.

use super::actions::{authors, messages, novels, profile, users};
use super::{DispatchContext, HandlerKind, MessageHandler};
use crate::core::ScriptoriumError;
use crate::core::protocol::Message;
use crate::core::session::Principal;
use crate::core::store::Role;
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// The commands available once logged in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthCommand {
    GetUserInfo,
    GetServerInfo,
    GetEditProfileInfo,
    UpdateUserAvatar,
    GetUsers,
    EditUser,
    GetAuthorList,
    SaveAuthor,
    RemoveAuthor,
    GetNovelList,
    SaveNovel,
    RemoveNovel,
    GetMessages,
    SaveMessage,
    Logout,
}

impl AuthCommand {
    /// Looks up a lowercase command name.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "getuserinfo" => Self::GetUserInfo,
            "getserverinfo" => Self::GetServerInfo,
            "geteditprofileinfo" => Self::GetEditProfileInfo,
            "updateuseravatar" => Self::UpdateUserAvatar,
            "getusers" => Self::GetUsers,
            "edituser" => Self::EditUser,
            "getauthorlist" => Self::GetAuthorList,
            "saveauthor" => Self::SaveAuthor,
            "removeauthor" => Self::RemoveAuthor,
            "getnovellist" => Self::GetNovelList,
            "savenovel" => Self::SaveNovel,
            "removenovel" => Self::RemoveNovel,
            "getmessages" => Self::GetMessages,
            "savemessage" => Self::SaveMessage,
            "logout" => Self::Logout,
            _ => return None,
        })
    }

    /// The roles allowed to run the command.
    pub fn roles(self) -> &'static [Role] {
        match self {
            Self::GetUsers | Self::EditUser | Self::RemoveAuthor | Self::RemoveNovel => {
                Role::STAFF
            }
            Self::SaveAuthor | Self::SaveNovel | Self::SaveMessage => Role::WRITERS,
            _ => Role::ALL,
        }
    }
}

/// Claims every command in `AuthCommand`, gated by the principal's role.
#[derive(Debug)]
pub struct AuthenticatedSession {
    user_id: i64,
    disposed: AtomicBool,
}

impl AuthenticatedSession {
    pub fn new(user_id: i64) -> Self {
        Self {
            user_id,
            disposed: AtomicBool::new(false),
        }
    }

    pub fn user_id(&self) -> i64 {
        self.user_id
    }

    async fn execute(
        &self,
        command: AuthCommand,
        ctx: &DispatchContext,
        principal: &Principal,
        args: &[String],
    ) -> Result<(), ScriptoriumError> {
        match command {
            AuthCommand::GetUserInfo => profile::handle_get_user_info(ctx, principal).await,
            AuthCommand::GetServerInfo => profile::handle_get_server_info(ctx).await,
            AuthCommand::GetEditProfileInfo => {
                profile::handle_get_edit_profile_info(ctx, principal).await
            }
            AuthCommand::UpdateUserAvatar => {
                profile::handle_update_user_avatar(ctx, principal, args).await
            }
            AuthCommand::Logout => profile::handle_logout(ctx).await,
            AuthCommand::GetUsers => users::handle_get_users(ctx, args).await,
            AuthCommand::EditUser => users::handle_edit_user(ctx, principal, args).await,
            AuthCommand::GetAuthorList => authors::handle_get_author_list(ctx, args).await,
            AuthCommand::SaveAuthor => authors::handle_save_author(ctx, args).await,
            AuthCommand::RemoveAuthor => authors::handle_remove_author(ctx, args).await,
            AuthCommand::GetNovelList => novels::handle_get_novel_list(ctx, args).await,
            AuthCommand::SaveNovel => novels::handle_save_novel(ctx, args).await,
            AuthCommand::RemoveNovel => novels::handle_remove_novel(ctx, args).await,
            AuthCommand::GetMessages => messages::handle_get_messages(ctx, args).await,
            AuthCommand::SaveMessage => {
                messages::handle_save_message(ctx, principal, args).await
            }
        }
    }
}

#[async_trait]
impl MessageHandler for AuthenticatedSession {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Authenticated
    }

    async fn try_handle(&self, ctx: &DispatchContext, message: &Message) -> bool {
        if self.disposed.load(Ordering::Acquire) {
            return false;
        }
        let Some(command) = AuthCommand::from_name(&message.name()) else {
            return false;
        };
        let principal = match ctx.conn.principal() {
            Some(p) if p.user_id == self.user_id => p,
            _ => return false,
        };

        if !principal.has_any_role(command.roles()) {
            debug!(
                "User {} (role {}) may not run '{}'; ignoring.",
                principal.user_id,
                principal.role_id,
                message.command()
            );
            return true;
        }
        if let Err(e) = self.execute(command, ctx, &principal, message.args()).await {
            debug!(
                "Ignored '{}' from user {} on client {}: {}",
                message.command(),
                principal.user_id,
                ctx.conn.id(),
                e
            );
        }
        true
    }

    fn dispose(&self) {
        self.disposed.store(true, Ordering::Release);
    }
}
