//! Authenticated identity.

use serde::{Deserialize, Serialize};

use super::id::UserId;
use super::status::Role;

/// The authenticated user's public profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Remote user id.
    pub id: UserId,
    /// Name shown in navigation.
    pub display_name: String,
    /// Role derived from the remote role field.
    pub role: Role,
}

impl Identity {
    /// Build an identity, deriving the role from the raw role field.
    #[must_use]
    pub fn new(id: UserId, display_name: impl Into<String>, raw_role: Option<&str>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            role: Role::from_raw(raw_role),
        }
    }

    /// Whether this identity is an administrator.
    #[must_use]
    pub const fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}
