//! Identity claims supplied by the authentication boundary.

use serde::{Deserialize, Serialize};

/// Caller role carried in the claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Customer,
}

impl Role {
    /// Parses the role string from the claim.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "admin" => Some(Role::Admin),
            "customer" => Some(Role::Customer),
            _ => None,
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

/// The `{identity, role}` claim the boundary attaches to every request.
///
/// Credentials are verified upstream; this service trusts the claim and only
/// applies authorization rules to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthClaim {
    /// Authenticated identity — the customer's directory email for
    /// customer-role callers.
    pub identity: String,
    pub role: Role,
}

impl AuthClaim {
    pub fn new(identity: impl Into<String>, role: Role) -> Self {
        Self {
            identity: identity.into(),
            role,
        }
    }

    /// Convenience constructor for an administrator claim.
    pub fn admin(identity: impl Into<String>) -> Self {
        Self::new(identity, Role::Admin)
    }

    /// Convenience constructor for a customer claim.
    pub fn customer(identity: impl Into<String>) -> Self {
        Self::new(identity, Role::Customer)
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}
