use crate::space::UserId;
use serde::{Deserialize, Serialize};

/// Platform-wide role of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    User,
    Admin,
}

/// The user on whose behalf an operation runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub role: UserRole,
}

impl User {
    pub fn new(id: UserId, name: impl Into<String>, role: UserRole) -> Self {
        Self {
            id,
            name: name.into(),
            role,
        }
    }
}

/// Decides whether a user holds elevated authorization.
pub trait Authorizer: Send + Sync + 'static {
    fn is_elevated(&self, user: &User) -> bool;
}

/// Grants elevated authorization to users with the [`UserRole::Admin`] role.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoleAuthorizer;

impl Authorizer for RoleAuthorizer {
    fn is_elevated(&self, user: &User) -> bool {
        user.role == UserRole::Admin
    }
}
