//! Infrastructure layer: versioned document stores, optimistic-retry
//! coordination, and the services that enforce cross-document invariants
//! (stock-bounded carts, the single-admin guard, compensated registration).

pub mod carts;
pub mod registrar;
pub mod retry;
pub mod stock;
pub mod store;


pub use carts::CartManager;
pub use registrar::{AccountRegistrar, PasswordHasher, RegisteredAccount, RegistrationState};
pub use retry::{BackoffStrategy, RetryCoordinator, RetryPolicy, TxError};
pub use stock::StockLedger;
pub use store::in_memory::{InMemoryAccountStore, InMemoryCartStore, InMemoryProductStore};
pub use store::{AccountStore, CartStore, ProductStore, StoreError, UniqueKey};
