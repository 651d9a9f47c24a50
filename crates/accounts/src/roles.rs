use core::str::FromStr;

use serde::{Deserialize, Serialize};

use tradepost_core::DomainError;

/// Account role.
///
/// At most one account in the whole system may hold `Admin`; that invariant is
/// enforced by the registrar's conditional insert, not here.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Can manage products and accounts.
    Admin,
    /// Can manage products.
    Staff,
    /// Can manage their own cart.
    Customer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Staff => "staff",
            Role::Customer => "customer",
        }
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "staff" => Ok(Role::Staff),
            "customer" => Ok(Role::Customer),
            other => Err(DomainError::invalid_role(other)),
        }
    }
}
