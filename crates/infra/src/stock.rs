//! Stock ledger accessor.
//!
//! Read-only admissibility checks against a product's stock counter. Stock is
//! decremented only by the external fulfillment process; this core observes
//! the freshest committed value and never caches it across requests.

use tradepost_catalog::Product;
use tradepost_core::{DomainError, DomainResult, ProductId};

use crate::store::ProductStore;

/// Accessor over the product store for stock admissibility.
#[derive(Debug, Clone)]
pub struct StockLedger<P> {
    products: P,
}

impl<P: ProductStore> StockLedger<P> {
    pub fn new(products: P) -> Self {
        Self { products }
    }

    /// Resolve a sellable product by id with a fresh read.
    ///
    /// A missing product and a deactivated one are indistinguishable to this
    /// core: both are `NotFound` on the next touch.
    pub fn resolve(&self, product_id: ProductId) -> DomainResult<Product> {
        let product = self
            .products
            .find(product_id)
            .map_err(|e| e.into_domain())?;
        match product {
            Some(p) if p.can_be_sold() => Ok(p),
            _ => Err(DomainError::NotFound),
        }
    }

    /// Check that `requested` units fit within the product's current stock.
    ///
    /// Does not reserve or decrement anything; returns the freshly read
    /// product so callers can reuse it for pricing.
    pub fn check_availability(
        &self,
        product_id: ProductId,
        requested: u32,
    ) -> DomainResult<Product> {
        let product = self.resolve(product_id)?;
        if requested > product.stock_quantity() {
            return Err(DomainError::insufficient_stock(
                requested,
                product.stock_quantity(),
            ));
        }
        Ok(product)
    }
}
