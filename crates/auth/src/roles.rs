use serde::{Deserialize, Serialize};

/// Business role held by a user.
///
/// A user holds exactly one role; workflows use it as a capability check at
/// the lookup boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Admin,
    Salesperson,
    Buyer,
    Transporter,
    WarehouseKeeper,
    Treasurer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Salesperson => "salesperson",
            Role::Buyer => "buyer",
            Role::Transporter => "transporter",
            Role::WarehouseKeeper => "warehouse keeper",
            Role::Treasurer => "treasurer",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_name_is_screaming_snake_case() {
        let json = serde_json::to_string(&Role::WarehouseKeeper).unwrap();
        assert_eq!(json, "\"WAREHOUSE_KEEPER\"");
        let back: Role = serde_json::from_str("\"BUYER\"").unwrap();
        assert_eq!(back, Role::Buyer);
    }
}
