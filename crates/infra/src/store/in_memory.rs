use std::collections::HashMap;
use std::hash::Hash;
use std::sync::RwLock;

use tradepost_accounts::Account;
use tradepost_carts::Cart;
use tradepost_catalog::Product;
use tradepost_core::{AccountId, CartId, Document, ExpectedVersion, ProductId};

use super::r#trait::{AccountStore, CartStore, ProductStore, StoreError, UniqueKey};

fn poisoned() -> StoreError {
    StoreError::Backend("lock poisoned".to_string())
}

/// Conditioned write against a map held under a write lock.
///
/// The stored version is the source of truth; on success the document is
/// persisted with the version bumped by one and the updated copy is returned.
fn save_versioned<D>(
    map: &mut HashMap<D::Id, D>,
    mut doc: D,
    expected: ExpectedVersion,
) -> Result<D, StoreError>
where
    D: Document + Clone,
    D::Id: Hash,
{
    let current = match map.get(&doc.id()) {
        Some(stored) => stored.version(),
        None => return Err(StoreError::NotFound),
    };
    if !expected.matches(current) {
        return Err(StoreError::Conflict(format!(
            "expected {expected:?}, found {current}"
        )));
    }
    doc.set_version(current + 1);
    map.insert(doc.id(), doc.clone());
    Ok(doc)
}

/// In-memory account store.
///
/// Intended for tests/dev. The write lock makes `insert` the atomic
/// conditional write the registrar needs: the email index and the
/// single-admin guard are checked and claimed under the same lock.
#[derive(Debug, Default)]
pub struct InMemoryAccountStore {
    accounts: RwLock<HashMap<AccountId, Account>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.accounts.read().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of persisted accounts holding the admin role.
    pub fn admin_count(&self) -> usize {
        self.accounts
            .read()
            .map(|m| m.values().filter(|a| a.is_admin()).count())
            .unwrap_or(0)
    }
}

impl AccountStore for InMemoryAccountStore {
    fn insert(&self, mut account: Account) -> Result<Account, StoreError> {
        let mut accounts = self.accounts.write().map_err(|_| poisoned())?;
        if accounts.values().any(|a| a.email() == account.email()) {
            return Err(StoreError::Unique(UniqueKey::Email));
        }
        if account.is_admin() && accounts.values().any(|a| a.is_admin()) {
            return Err(StoreError::Unique(UniqueKey::AdminRole));
        }
        account.set_version(1);
        accounts.insert(account.id(), account.clone());
        Ok(account)
    }

    fn find(&self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let accounts = self.accounts.read().map_err(|_| poisoned())?;
        Ok(accounts.get(&id).cloned())
    }

    fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let accounts = self.accounts.read().map_err(|_| poisoned())?;
        Ok(accounts.values().find(|a| a.email() == email).cloned())
    }

    fn delete(&self, id: AccountId) -> Result<bool, StoreError> {
        let mut accounts = self.accounts.write().map_err(|_| poisoned())?;
        Ok(accounts.remove(&id).is_some())
    }
}

/// In-memory product store. Intended for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryProductStore {
    products: RwLock<HashMap<ProductId, Product>>,
}

impl InMemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProductStore for InMemoryProductStore {
    fn insert(&self, mut product: Product) -> Result<Product, StoreError> {
        let mut products = self.products.write().map_err(|_| poisoned())?;
        product.set_version(1);
        products.insert(product.id(), product.clone());
        Ok(product)
    }

    fn find(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let products = self.products.read().map_err(|_| poisoned())?;
        Ok(products.get(&id).cloned())
    }

    fn save(&self, product: Product, expected: ExpectedVersion) -> Result<Product, StoreError> {
        let mut products = self.products.write().map_err(|_| poisoned())?;
        save_versioned(&mut products, product, expected)
    }

    fn delete(&self, id: ProductId) -> Result<bool, StoreError> {
        let mut products = self.products.write().map_err(|_| poisoned())?;
        Ok(products.remove(&id).is_some())
    }
}

/// In-memory cart store. Intended for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryCartStore {
    carts: RwLock<HashMap<CartId, Cart>>,
}

impl InMemoryCartStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CartStore for InMemoryCartStore {
    fn insert(&self, mut cart: Cart) -> Result<Cart, StoreError> {
        let mut carts = self.carts.write().map_err(|_| poisoned())?;
        cart.set_version(1);
        carts.insert(cart.id(), cart.clone());
        Ok(cart)
    }

    fn find(&self, id: CartId) -> Result<Option<Cart>, StoreError> {
        let carts = self.carts.read().map_err(|_| poisoned())?;
        Ok(carts.get(&id).cloned())
    }

    fn save(&self, cart: Cart, expected: ExpectedVersion) -> Result<Cart, StoreError> {
        let mut carts = self.carts.write().map_err(|_| poisoned())?;
        save_versioned(&mut carts, cart, expected)
    }

    fn delete(&self, id: CartId) -> Result<bool, StoreError> {
        let mut carts = self.carts.write().map_err(|_| poisoned())?;
        Ok(carts.remove(&id).is_some())
    }

    fn delete_by_account(&self, account_id: AccountId) -> Result<bool, StoreError> {
        let mut carts = self.carts.write().map_err(|_| poisoned())?;
        let before = carts.len();
        carts.retain(|_, c| c.account_id() != account_id);
        Ok(carts.len() != before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tradepost_accounts::Role;

    fn test_account(email: &str, role: Role) -> Account {
        Account::new("Ada", "Lovelace", email, "h4sh", role).unwrap()
    }

    #[test]
    fn insert_assigns_version_one() {
        let store = InMemoryCartStore::new();
        let cart = store.insert(Cart::new(AccountId::new())).unwrap();
        assert_eq!(cart.version(), 1);
    }

    #[test]
    fn stale_save_is_a_conflict() {
        let store = InMemoryCartStore::new();
        let cart = store.insert(Cart::new(AccountId::new())).unwrap();

        // First conditioned write wins and bumps the version.
        let saved = store
            .save(cart.clone(), ExpectedVersion::Exact(1))
            .unwrap();
        assert_eq!(saved.version(), 2);

        // A writer still holding version 1 must lose.
        let err = store.save(cart, ExpectedVersion::Exact(1)).unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[test]
    fn save_of_missing_document_is_not_found() {
        let store = InMemoryProductStore::new();
        let product = Product::new("Widget", "", "x", 100, 1).unwrap();
        let err = store
            .save(product, ExpectedVersion::Exact(1))
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[test]
    fn duplicate_email_insert_is_rejected() {
        let store = InMemoryAccountStore::new();
        store
            .insert(test_account("ada@example.com", Role::Customer))
            .unwrap();
        let err = store
            .insert(test_account("ada@example.com", Role::Staff))
            .unwrap_err();
        assert!(matches!(err, StoreError::Unique(UniqueKey::Email)));
    }

    #[test]
    fn second_admin_insert_is_rejected_in_the_same_write() {
        let store = InMemoryAccountStore::new();
        store
            .insert(test_account("first@example.com", Role::Admin))
            .unwrap();
        let err = store
            .insert(test_account("second@example.com", Role::Admin))
            .unwrap_err();
        assert!(matches!(err, StoreError::Unique(UniqueKey::AdminRole)));
        assert_eq!(store.admin_count(), 1);
    }

    #[test]
    fn non_admin_inserts_are_unaffected_by_the_admin_guard() {
        let store = InMemoryAccountStore::new();
        store
            .insert(test_account("first@example.com", Role::Admin))
            .unwrap();
        store
            .insert(test_account("second@example.com", Role::Customer))
            .unwrap();
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn delete_by_account_removes_only_that_accounts_cart() {
        let store = InMemoryCartStore::new();
        let owner = AccountId::new();
        let kept = store.insert(Cart::new(AccountId::new())).unwrap();
        store.insert(Cart::new(owner)).unwrap();

        assert!(store.delete_by_account(owner).unwrap());
        assert!(!store.delete_by_account(owner).unwrap());
        assert!(store.find(kept.id()).unwrap().is_some());
    }
}
