use serde::{Deserialize, Serialize};

use globalsourcing_core::UserId;

use crate::roles::Role;

/// A user as seen by the workflows: identity plus role.
///
/// Users are master data owned elsewhere; orders only hold their ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub role: Role,
}

impl User {
    pub fn new(id: UserId, name: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            name: name.into(),
            role,
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.role == role
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_check_is_exact() {
        let keeper = User::new(UserId::new(3), "Wang", Role::WarehouseKeeper);
        assert!(keeper.has_role(Role::WarehouseKeeper));
        assert!(!keeper.has_role(Role::Admin));
    }
}
