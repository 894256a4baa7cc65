// src/core/session/principal.rs

use crate::core::store::{Role, User};

/// The authenticated identity bound to a connection: a snapshot of the user
/// record, refreshed by re-fetching whenever a handler needs current data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user_id: i64,
    pub role_id: i32,
    pub display_name: String,
    pub avatar_id: String,
}

impl Principal {
    pub fn role(&self) -> Option<Role> {
        Role::from_id(self.role_id)
    }

    /// True if the principal's role is one of `roles`.
    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        self.role().is_some_and(|r| roles.contains(&r))
    }
}

impl From<&User> for Principal {
    fn from(user: &User) -> Self {
        Self {
            user_id: user.id,
            role_id: user.role_id,
            display_name: user.display_name().to_string(),
            avatar_id: user.avatar_id.clone(),
        }
    }
}
