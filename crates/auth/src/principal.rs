use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::{Permission, Role};

/// The authenticated identity plus its authorization facts.
///
/// Set together with a fresh [`crate::Credential`] on login/refresh and
/// cleared together with it; the store never holds one without the other.
/// Roles and permissions come from the authoritative response body, not
/// from client-side token decoding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub email: String,
    pub username: String,
    pub display_name: String,
    pub roles: Vec<Role>,
    pub permissions: HashSet<Permission>,
}

impl Principal {
    pub fn has_role(&self, role: &Role) -> bool {
        self.roles.contains(role)
    }

    pub fn has_permission(&self, permission: &Permission) -> bool {
        self.permissions.contains(permission)
    }
}
