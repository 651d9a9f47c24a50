//! Catalog domain module.
//!
//! Products are owned by catalog management; this core only needs their
//! read/validation side (fresh stock reads, active flag) plus the stock
//! adjustment guard used by the external fulfillment process.

pub mod product;

pub use product::Product;
