// src/core/store/model.rs

//! Records exchanged with the external stores, and the JSON projections pushed
//! to clients.
//!
//! Field names in the JSON projections are PascalCase because that is what the
//! existing clients deserialize.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Integer-coded authorization level. Lower ids are more privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    Owner = 1,
    Administrator = 2,
    Editor = 3,
    ReadOnly = 4,
}

impl Role {
    /// Every role.
    pub const ALL: &'static [Role] = &[
        Role::Owner,
        Role::Administrator,
        Role::Editor,
        Role::ReadOnly,
    ];
    /// Roles allowed to manage users and delete content.
    pub const STAFF: &'static [Role] = &[Role::Owner, Role::Administrator];
    /// Roles allowed to create and edit content.
    pub const WRITERS: &'static [Role] = &[Role::Owner, Role::Administrator, Role::Editor];

    pub fn id(self) -> i32 {
        self as i32
    }

    pub fn from_id(id: i32) -> Option<Self> {
        match id {
            1 => Some(Role::Owner),
            2 => Some(Role::Administrator),
            3 => Some(Role::Editor),
            4 => Some(Role::ReadOnly),
            _ => None,
        }
    }

    /// Display name, as shown in profile views.
    pub fn name(self) -> &'static str {
        match self {
            Role::Owner => "Owner",
            Role::Administrator => "Administrator",
            Role::Editor => "Editor",
            Role::ReadOnly => "Read-only user",
        }
    }

    /// True if `self` is strictly more privileged than `other`.
    pub fn outranks(self, other: Role) -> bool {
        self.id() < other.id()
    }
}

/// A user record as held by the user store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub login: String,
    /// Lowercase hex SHA-256 of the password.
    pub password_hash: String,
    pub nickname: String,
    pub avatar_id: String,
    pub role_id: i32,
    /// Id of the connection the account was registered from.
    pub fixed_key: String,
}

impl User {
    pub fn role(&self) -> Option<Role> {
        Role::from_id(self.role_id)
    }

    pub fn role_name(&self) -> &'static str {
        self.role().map_or("Unknown", Role::name)
    }

    /// The nickname, or the login for users who never set one.
    pub fn display_name(&self) -> &str {
        if self.nickname.is_empty() {
            &self.login
        } else {
            &self.nickname
        }
    }
}

/// The fields needed to create a user; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub login: String,
    pub password_hash: String,
    pub nickname: String,
    pub avatar_id: String,
    pub role_id: i32,
    pub fixed_key: String,
}

/// The user projection sent to staff (`setusers`, `updateuser`).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserView {
    pub id: i64,
    pub role_name: String,
    pub login: String,
    pub nickname: String,
    pub avatar_id: String,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            role_name: user.role_name().to_string(),
            login: user.login.clone(),
            nickname: user.nickname.clone(),
            avatar_id: user.avatar_id.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Author {
    #[serde(default)]
    pub id: i64,
    pub name: String,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Chapter {
    #[serde(default)]
    pub id: i64,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Novel {
    #[serde(default)]
    pub id: i64,
    pub title: String,
    pub creation_date: DateTime<Utc>,
    pub chapter_count: usize,
    pub author_id: i64,
    #[serde(default)]
    pub chapters: Vec<Chapter>,
}

/// Message type ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Text = 1,
    Image = 2,
    Sticker = 3,
}

impl MessageKind {
    pub fn from_id(id: i32) -> Option<Self> {
        match id {
            1 => Some(MessageKind::Text),
            2 => Some(MessageKind::Image),
            3 => Some(MessageKind::Sticker),
            _ => None,
        }
    }
}

/// A chat-style message attached to a chapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChatMessage {
    #[serde(default)]
    pub id: i64,
    pub chapter_id: i64,
    pub content: String,
    pub sender_name: String,
    pub message_type_id: i32,
}

/// Catalog entry for a stored file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileData {
    pub key: String,
    pub description: String,
}

/// Description tag of images offered as avatars.
pub const AVATAR_DESCRIPTION: &str = "Avatar Image File";
/// Description tag of the avatar assigned to new accounts.
pub const DEFAULT_AVATAR_DESCRIPTION: &str = "Default Avatar Image File";
