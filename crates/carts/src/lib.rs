//! Carts domain module.
//!
//! The cart document and its pure line mutations live here; stock
//! admissibility and persistence are wired up by `tradepost-infra`.

pub mod cart;
pub mod pricing;

pub use cart::{Cart, CartLine};
pub use pricing::{PricedCart, PricedLine};
