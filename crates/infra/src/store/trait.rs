use std::sync::Arc;

use thiserror::Error;

use tradepost_accounts::Account;
use tradepost_carts::Cart;
use tradepost_catalog::Product;
use tradepost_core::{AccountId, CartId, DomainError, ExpectedVersion, ProductId};

/// Uniqueness guards a conditional insert can trip over.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum UniqueKey {
    /// The account email index.
    Email,
    /// The single-admin guard (at most one account holding the admin role).
    AdminRole,
}

/// Store operation error.
///
/// These are **infrastructure** outcomes. `Conflict` is the only retryable
/// one; everything else is mapped to a domain error via [`StoreError::into_domain`]
/// and surfaced.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A conditioned write lost against a concurrently committed version.
    #[error("optimistic concurrency check failed: {0}")]
    Conflict(String),

    /// A conditional insert hit an already-present unique key.
    #[error("unique constraint violated: {0:?}")]
    Unique(UniqueKey),

    /// The targeted document does not exist.
    #[error("document not found")]
    NotFound,

    /// The backend itself failed (connection, lock poisoning, ...).
    #[error("storage backend failure: {0}")]
    Backend(String),
}

impl StoreError {
    /// Map a terminal store outcome onto the caller-facing taxonomy.
    ///
    /// `Conflict` is not expected here — conflicts belong inside a retry
    /// loop — so it degrades to a labeled storage failure rather than a
    /// spurious contention signal.
    pub fn into_domain(self) -> DomainError {
        match self {
            StoreError::Conflict(msg) => {
                DomainError::storage(format!("unhandled write conflict: {msg}"))
            }
            StoreError::Unique(UniqueKey::Email) => DomainError::DuplicateEmail,
            StoreError::Unique(UniqueKey::AdminRole) => DomainError::AdminAlreadyExists,
            StoreError::NotFound => DomainError::NotFound,
            StoreError::Backend(msg) => DomainError::storage(msg),
        }
    }
}

/// Account persistence.
///
/// `insert` is the conditional insert the single-admin invariant rests on:
/// one write that claims the unique email key **and**, when the account
/// carries the admin role, the admin slot. Two racing admin inserts must not
/// both succeed; the loser sees `Unique(AdminRole)` (or `Conflict` from
/// backends that can only detect the race as a transient conflict, in which
/// case the caller re-reads and retries).
pub trait AccountStore: Send + Sync {
    fn insert(&self, account: Account) -> Result<Account, StoreError>;

    fn find(&self, id: AccountId) -> Result<Option<Account>, StoreError>;

    fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    /// Returns whether a document was removed.
    fn delete(&self, id: AccountId) -> Result<bool, StoreError>;
}

/// Product persistence.
pub trait ProductStore: Send + Sync {
    fn insert(&self, product: Product) -> Result<Product, StoreError>;

    fn find(&self, id: ProductId) -> Result<Option<Product>, StoreError>;

    /// Conditioned write: fails with `Conflict` unless the stored version
    /// matches `expected`. The store bumps the version on success.
    fn save(&self, product: Product, expected: ExpectedVersion) -> Result<Product, StoreError>;

    fn delete(&self, id: ProductId) -> Result<bool, StoreError>;
}

/// Cart persistence.
pub trait CartStore: Send + Sync {
    fn insert(&self, cart: Cart) -> Result<Cart, StoreError>;

    fn find(&self, id: CartId) -> Result<Option<Cart>, StoreError>;

    /// Conditioned write: fails with `Conflict` unless the stored version
    /// matches `expected`. The store bumps the version on success.
    fn save(&self, cart: Cart, expected: ExpectedVersion) -> Result<Cart, StoreError>;

    fn delete(&self, id: CartId) -> Result<bool, StoreError>;

    /// Remove the cart owned by an account, if any.
    fn delete_by_account(&self, account_id: AccountId) -> Result<bool, StoreError>;
}

impl<S> AccountStore for Arc<S>
where
    S: AccountStore + ?Sized,
{
    fn insert(&self, account: Account) -> Result<Account, StoreError> {
        (**self).insert(account)
    }

    fn find(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        (**self).find(id)
    }

    fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        (**self).find_by_email(email)
    }

    fn delete(&self, id: AccountId) -> Result<bool, StoreError> {
        (**self).delete(id)
    }
}

impl<S> ProductStore for Arc<S>
where
    S: ProductStore + ?Sized,
{
    fn insert(&self, product: Product) -> Result<Product, StoreError> {
        (**self).insert(product)
    }

    fn find(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        (**self).find(id)
    }

    fn save(&self, product: Product, expected: ExpectedVersion) -> Result<Product, StoreError> {
        (**self).save(product, expected)
    }

    fn delete(&self, id: ProductId) -> Result<bool, StoreError> {
        (**self).delete(id)
    }
}

impl<S> CartStore for Arc<S>
where
    S: CartStore + ?Sized,
{
    fn insert(&self, cart: Cart) -> Result<Cart, StoreError> {
        (**self).insert(cart)
    }

    fn find(&self, id: CartId) -> Result<Option<Cart>, StoreError> {
        (**self).find(id)
    }

    fn save(&self, cart: Cart, expected: ExpectedVersion) -> Result<Cart, StoreError> {
        (**self).save(cart, expected)
    }

    fn delete(&self, id: CartId) -> Result<bool, StoreError> {
        (**self).delete(id)
    }

    fn delete_by_account(&self, account_id: AccountId) -> Result<bool, StoreError> {
        (**self).delete_by_account(account_id)
    }
}
