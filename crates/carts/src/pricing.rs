//! Read-time priced views of a cart.
//!
//! Prices are never stored on the cart document; they are attached by
//! resolving every referenced product at read time. A cart holding a
//! reference to a product that no longer resolves fails enrichment as a
//! whole rather than returning a partial result.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tradepost_catalog::Product;
use tradepost_core::{AccountId, CartId, DomainError, DomainResult, ProductId};

use crate::Cart;

/// A cart line enriched with the product's current name and price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    /// Unit price in the smallest currency unit.
    pub unit_price: u64,
    pub line_total: u64,
}

impl PricedLine {
    pub fn new(product: &Product, product_id: ProductId, quantity: u32) -> DomainResult<Self> {
        let line_total = product
            .unit_price()
            .checked_mul(u64::from(quantity))
            .ok_or_else(|| DomainError::validation("line total overflows the currency range"))?;
        Ok(Self {
            product_id,
            product_name: product.name().to_string(),
            quantity,
            unit_price: product.unit_price(),
            line_total,
        })
    }
}

/// A cart enriched with per-line pricing and totals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricedCart {
    pub id: CartId,
    pub account_id: AccountId,
    pub lines: Vec<PricedLine>,
    pub total_units: u32,
    /// Sum of all line totals, in the smallest currency unit.
    pub total_price: u64,
    pub created_at: DateTime<Utc>,
}

impl PricedCart {
    /// Assemble a priced view from a cart and its already-resolved lines.
    pub fn assemble(cart: &Cart, lines: Vec<PricedLine>) -> DomainResult<Self> {
        use tradepost_core::Document;

        let total_price = lines
            .iter()
            .try_fold(0u64, |acc, l| acc.checked_add(l.line_total))
            .ok_or_else(|| DomainError::validation("cart total overflows the currency range"))?;
        Ok(Self {
            id: cart.id(),
            account_id: cart.account_id(),
            total_units: cart.total_units(),
            total_price,
            lines,
            created_at: cart.created_at(),
        })
    }
}
