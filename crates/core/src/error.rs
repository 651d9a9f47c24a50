//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Every failure carries a stable machine-readable kind (see [`DomainError::kind`])
/// plus a human-readable reason. Validation failures are terminal: they are
/// surfaced verbatim to the caller and never retried. Only `Contention` signals
/// that resubmitting the same request may succeed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. zero quantity, empty name).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A requested entity id did not resolve.
    #[error("not found")]
    NotFound,

    /// An update targeted a cart line that does not exist.
    #[error("item not found in cart")]
    ItemNotInCart,

    /// The requested (or merged) quantity exceeds the product's current stock.
    #[error("insufficient stock: requested {requested}, available {available}")]
    InsufficientStock { requested: u32, available: u32 },

    /// An account with the given email already exists.
    #[error("email already exists")]
    DuplicateEmail,

    /// The requested role is outside the allowed set.
    #[error("invalid role: {0}")]
    InvalidRole(String),

    /// An admin account already exists; the admin slot cannot be taken twice.
    #[error("admin already exists")]
    AdminAlreadyExists,

    /// The retry budget was exhausted on optimistic conflicts; no domain rule
    /// was violated. The caller may resubmit.
    #[error("too much contention after {attempts} attempts")]
    Contention { attempts: u32 },

    /// Cart provisioning failed after the account was persisted. When
    /// `needs_manual_cleanup` is set the compensating delete also failed and
    /// an account without a cart remains persisted.
    #[error(
        "account provisioning failed (needs_manual_cleanup: {needs_manual_cleanup}): {source}"
    )]
    AccountProvisioningFailed {
        #[source]
        source: Box<DomainError>,
        needs_manual_cleanup: bool,
    },

    /// The storage backend failed in a way that is neither a domain rule nor
    /// an optimistic conflict.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_role(role: impl Into<String>) -> Self {
        Self::InvalidRole(role.into())
    }

    pub fn insufficient_stock(requested: u32, available: u32) -> Self {
        Self::InsufficientStock {
            requested,
            available,
        }
    }

    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    pub fn not_found() -> Self {
        Self::NotFound
    }

    /// Stable kind identifier for logs and wire mapping by outer layers.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::NotFound => "not_found",
            Self::ItemNotInCart => "item_not_in_cart",
            Self::InsufficientStock { .. } => "insufficient_stock",
            Self::DuplicateEmail => "duplicate_email",
            Self::InvalidRole(_) => "invalid_role",
            Self::AdminAlreadyExists => "admin_already_exists",
            Self::Contention { .. } => "contention",
            Self::AccountProvisioningFailed { .. } => "account_provisioning_failed",
            Self::Storage(_) => "storage",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_is_stable_per_variant() {
        assert_eq!(DomainError::NotFound.kind(), "not_found");
        assert_eq!(DomainError::ItemNotInCart.kind(), "item_not_in_cart");
        assert_eq!(
            DomainError::insufficient_stock(4, 3).kind(),
            "insufficient_stock"
        );
        assert_eq!(DomainError::DuplicateEmail.kind(), "duplicate_email");
        assert_eq!(DomainError::AdminAlreadyExists.kind(), "admin_already_exists");
        assert_eq!(DomainError::Contention { attempts: 3 }.kind(), "contention");
    }

    #[test]
    fn provisioning_failure_carries_cause_and_cleanup_flag() {
        let err = DomainError::AccountProvisioningFailed {
            source: Box::new(DomainError::storage("insert failed")),
            needs_manual_cleanup: true,
        };
        let msg = err.to_string();
        assert!(msg.contains("needs_manual_cleanup: true"));
        assert!(msg.contains("insert failed"));
    }
}
