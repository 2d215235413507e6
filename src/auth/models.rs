// Operator identity carried in access tokens

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Role of a shop operator
///
/// Staff run recharges, checkouts and queries; admins additionally manage the
/// service catalog and bonus rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Staff,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Staff => "staff",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The operator behind a request, as proven by a verified token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operator {
    pub id: Uuid,
    /// Display name written into ledger records
    pub name: String,
    pub role: Role,
}

impl Operator {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_display() {
        assert_eq!(Role::Staff.to_string(), "staff");
        assert_eq!(Role::Admin.to_string(), "admin");
    }

    #[test]
    fn test_role_serialization() {
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"admin\"");
        let role: Role = serde_json::from_str("\"staff\"").unwrap();
        assert_eq!(role, Role::Staff);
        assert!(serde_json::from_str::<Role>("\"owner\"").is_err());
    }
}
