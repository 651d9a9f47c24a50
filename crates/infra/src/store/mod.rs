//! Versioned document stores.
//!
//! One store trait per entity, exposing the persistence primitives this core
//! relies on: `find`, keyed lookup, conditional insert, conditioned save
//! (optimistic version match), delete. Implementations guarantee per-document
//! atomicity only; nothing here spans two documents.

pub mod in_memory;
mod r#trait;

pub use r#trait::{AccountStore, CartStore, ProductStore, StoreError, UniqueKey};
