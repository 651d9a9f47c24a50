//! Cart aggregate manager.
//!
//! Owns cart documents and applies every mutation as
//! load → compute new line state → validate touched lines against the stock
//! ledger → conditioned save. The whole sequence runs inside the retry
//! coordinator because "check stock, then persist the cart" is itself a
//! check-then-act race across two document types: the second committer under
//! contention must re-run against freshly read state, never commit from a
//! stale one.

use tracing::debug;

use tradepost_carts::{Cart, PricedCart, PricedLine};
use tradepost_core::{AccountId, CartId, Document, DomainError, DomainResult, ExpectedVersion, ProductId};

use crate::retry::{RetryCoordinator, TxError};
use crate::stock::StockLedger;
use crate::store::{CartStore, ProductStore};

/// Service handle over cart persistence plus stock admissibility.
#[derive(Debug, Clone)]
pub struct CartManager<C, P> {
    carts: C,
    ledger: StockLedger<P>,
    retries: RetryCoordinator,
}

impl<C: CartStore, P: ProductStore> CartManager<C, P> {
    pub fn new(carts: C, products: P) -> Self {
        Self::with_retries(carts, products, RetryCoordinator::default())
    }

    pub fn with_retries(carts: C, products: P, retries: RetryCoordinator) -> Self {
        Self {
            carts,
            ledger: StockLedger::new(products),
            retries,
        }
    }

    /// Create an empty cart bound to an account.
    pub fn create_cart(&self, account_id: AccountId) -> DomainResult<PricedCart> {
        let cart = self
            .carts
            .insert(Cart::new(account_id))
            .map_err(|e| e.into_domain())?;
        debug!(cart_id = %cart.id(), account_id = %account_id, "cart created");
        self.price_cart(&cart)
    }

    pub fn get_cart(&self, cart_id: CartId) -> DomainResult<PricedCart> {
        let cart = self.load(cart_id)?;
        self.price_cart(&cart)
    }

    /// Add units of a product, merging with any existing line.
    ///
    /// The merge rule: admissibility is checked against the cumulative total
    /// (existing + added), not the delta alone. On rejection the persisted
    /// cart is left untouched.
    pub fn add_item(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: u32,
    ) -> DomainResult<PricedCart> {
        let cart = self.retries.run(|| {
            let mut cart = self.load(cart_id)?;
            let candidate = cart.merged_quantity(product_id, quantity)?;
            self.ledger.check_availability(product_id, candidate)?;
            cart.set_line_quantity(product_id, candidate);
            let expected = ExpectedVersion::Exact(cart.version());
            Ok(self.carts.save(cart, expected)?)
        })?;
        self.price_cart(&cart)
    }

    /// Replace an existing line's quantity (not an upsert: an absent line is
    /// `ItemNotInCart`, deliberately asymmetric with `add_item`).
    pub fn update_item_quantity(
        &self,
        cart_id: CartId,
        product_id: ProductId,
        quantity: u32,
    ) -> DomainResult<PricedCart> {
        if quantity == 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        let cart = self.retries.run(|| {
            let mut cart = self.load(cart_id)?;
            cart.replace_quantity(product_id, quantity)?;
            self.ledger.check_availability(product_id, quantity)?;
            let expected = ExpectedVersion::Exact(cart.version());
            Ok(self.carts.save(cart, expected)?)
        })?;
        self.price_cart(&cart)
    }

    /// Remove a product's line. Removing an absent product is a no-op that
    /// still returns the (unchanged) cart.
    pub fn remove_item(&self, cart_id: CartId, product_id: ProductId) -> DomainResult<PricedCart> {
        let cart = self.retries.run(|| {
            let mut cart = self.load(cart_id)?;
            if !cart.remove_line(product_id) {
                return Ok(cart);
            }
            let expected = ExpectedVersion::Exact(cart.version());
            Ok(self.carts.save(cart, expected)?)
        })?;
        self.price_cart(&cart)
    }

    /// Empty all lines unconditionally. Idempotent.
    pub fn clear_cart(&self, cart_id: CartId) -> DomainResult<PricedCart> {
        let cart = self.retries.run(|| {
            let mut cart = self.load(cart_id)?;
            if cart.is_empty() {
                return Ok(cart);
            }
            cart.clear();
            let expected = ExpectedVersion::Exact(cart.version());
            Ok(self.carts.save(cart, expected)?)
        })?;
        self.price_cart(&cart)
    }

    pub fn delete_cart(&self, cart_id: CartId) -> DomainResult<()> {
        let removed = self.carts.delete(cart_id).map_err(|e| e.into_domain())?;
        if !removed {
            return Err(DomainError::NotFound);
        }
        debug!(cart_id = %cart_id, "cart deleted");
        Ok(())
    }

    /// Remove the cart bound to an account, if any (account-deletion flow).
    pub fn delete_cart_for_account(&self, account_id: AccountId) -> DomainResult<bool> {
        self.carts
            .delete_by_account(account_id)
            .map_err(|e| e.into_domain())
    }

    /// Read-time enrichment: resolve every referenced product to attach its
    /// current name and price, and sum a cart total.
    ///
    /// A line whose product no longer resolves (deleted or deactivated) fails
    /// the whole view with `NotFound` rather than being silently dropped.
    pub fn price_cart(&self, cart: &Cart) -> DomainResult<PricedCart> {
        let mut lines = Vec::with_capacity(cart.lines().len());
        for line in cart.lines() {
            let product = self.ledger.resolve(line.product_id)?;
            lines.push(PricedLine::new(&product, line.product_id, line.quantity)?);
        }
        PricedCart::assemble(cart, lines)
    }

    fn load(&self, cart_id: CartId) -> Result<Cart, TxError> {
        self.carts
            .find(cart_id)
            .map_err(TxError::from)?
            .ok_or(TxError::Domain(DomainError::NotFound))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use proptest::prelude::*;

    use super::*;
    use crate::store::in_memory::{InMemoryCartStore, InMemoryProductStore};
    use tradepost_catalog::Product;

    struct Fixture {
        manager: CartManager<Arc<InMemoryCartStore>, Arc<InMemoryProductStore>>,
        carts: Arc<InMemoryCartStore>,
        products: Arc<InMemoryProductStore>,
    }

    fn setup() -> Fixture {
        let carts = Arc::new(InMemoryCartStore::new());
        let products = Arc::new(InMemoryProductStore::new());
        Fixture {
            manager: CartManager::new(carts.clone(), products.clone()),
            carts,
            products,
        }
    }

    fn seed_product(fixture: &Fixture, price: u64, stock: u32) -> ProductId {
        let product = fixture
            .products
            .insert(Product::new("Widget", "", "gadgets", price, stock).unwrap())
            .unwrap();
        product.id()
    }

    fn seed_cart(fixture: &Fixture) -> CartId {
        fixture.manager.create_cart(AccountId::new()).unwrap().id
    }

    fn persisted_quantity(fixture: &Fixture, cart_id: CartId, product_id: ProductId) -> u32 {
        fixture
            .carts
            .find(cart_id)
            .unwrap()
            .unwrap()
            .line(product_id)
            .map(|l| l.quantity)
            .unwrap_or(0)
    }

    #[test]
    fn create_cart_returns_an_empty_priced_cart() {
        let fixture = setup();
        let account_id = AccountId::new();
        let cart = fixture.manager.create_cart(account_id).unwrap();
        assert_eq!(cart.account_id, account_id);
        assert!(cart.lines.is_empty());
        assert_eq!(cart.total_price, 0);
    }

    #[test]
    fn get_cart_of_unknown_id_is_not_found() {
        let fixture = setup();
        let err = fixture.manager.get_cart(CartId::new()).unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }

    #[test]
    fn add_item_appends_a_priced_line() {
        let fixture = setup();
        let product_id = seed_product(&fixture, 250, 10);
        let cart_id = seed_cart(&fixture);

        let cart = fixture.manager.add_item(cart_id, product_id, 3).unwrap();
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.lines[0].quantity, 3);
        assert_eq!(cart.lines[0].line_total, 750);
        assert_eq!(cart.total_price, 750);
        assert_eq!(cart.total_units, 3);
    }

    #[test]
    fn add_item_merges_and_checks_the_cumulative_total() {
        let fixture = setup();
        let product_id = seed_product(&fixture, 100, 10);
        let cart_id = seed_cart(&fixture);

        fixture.manager.add_item(cart_id, product_id, 7).unwrap();
        // 7 + 4 > 10: rejected against the merged total, line untouched.
        let err = fixture.manager.add_item(cart_id, product_id, 4).unwrap_err();
        assert_eq!(
            err,
            DomainError::InsufficientStock {
                requested: 11,
                available: 10
            }
        );
        assert_eq!(persisted_quantity(&fixture, cart_id, product_id), 7);

        // A fitting add still merges into the single line.
        let cart = fixture.manager.add_item(cart_id, product_id, 3).unwrap();
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.lines[0].quantity, 10);
    }

    #[test]
    fn add_item_of_unknown_product_is_not_found() {
        let fixture = setup();
        let cart_id = seed_cart(&fixture);
        let err = fixture
            .manager
            .add_item(cart_id, ProductId::new(), 1)
            .unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }

    #[test]
    fn add_item_rejects_zero_quantity() {
        let fixture = setup();
        let product_id = seed_product(&fixture, 100, 10);
        let cart_id = seed_cart(&fixture);
        let err = fixture.manager.add_item(cart_id, product_id, 0).unwrap_err();
        assert_eq!(err.kind(), "validation");
    }

    #[test]
    fn update_replaces_quantity_instead_of_merging() {
        let fixture = setup();
        let product_id = seed_product(&fixture, 100, 10);
        let cart_id = seed_cart(&fixture);

        fixture.manager.add_item(cart_id, product_id, 7).unwrap();
        let cart = fixture
            .manager
            .update_item_quantity(cart_id, product_id, 2)
            .unwrap();
        assert_eq!(cart.lines[0].quantity, 2);
    }

    #[test]
    fn update_on_absent_line_is_item_not_in_cart() {
        let fixture = setup();
        let product_id = seed_product(&fixture, 100, 5);
        let cart_id = seed_cart(&fixture);

        let err = fixture
            .manager
            .update_item_quantity(cart_id, product_id, 3)
            .unwrap_err();
        assert_eq!(err, DomainError::ItemNotInCart);
    }

    #[test]
    fn update_checks_the_new_absolute_quantity() {
        let fixture = setup();
        let product_id = seed_product(&fixture, 100, 10);
        let cart_id = seed_cart(&fixture);

        fixture.manager.add_item(cart_id, product_id, 2).unwrap();
        let err = fixture
            .manager
            .update_item_quantity(cart_id, product_id, 11)
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::InsufficientStock {
                requested: 11,
                available: 10
            }
        );
        assert_eq!(persisted_quantity(&fixture, cart_id, product_id), 2);
    }

    #[test]
    fn remove_item_is_idempotent() {
        let fixture = setup();
        let product_id = seed_product(&fixture, 100, 10);
        let cart_id = seed_cart(&fixture);

        fixture.manager.add_item(cart_id, product_id, 2).unwrap();
        let cart = fixture.manager.remove_item(cart_id, product_id).unwrap();
        assert!(cart.lines.is_empty());

        // Removing again is a successful no-op.
        let cart = fixture.manager.remove_item(cart_id, product_id).unwrap();
        assert!(cart.lines.is_empty());
    }

    #[test]
    fn clear_cart_is_idempotent() {
        let fixture = setup();
        let product_id = seed_product(&fixture, 100, 10);
        let cart_id = seed_cart(&fixture);

        fixture.manager.add_item(cart_id, product_id, 2).unwrap();
        let cart = fixture.manager.clear_cart(cart_id).unwrap();
        assert!(cart.lines.is_empty());

        let cart = fixture.manager.clear_cart(cart_id).unwrap();
        assert!(cart.lines.is_empty());
    }

    #[test]
    fn delete_cart_fails_on_unknown_id() {
        let fixture = setup();
        let cart_id = seed_cart(&fixture);

        fixture.manager.delete_cart(cart_id).unwrap();
        let err = fixture.manager.delete_cart(cart_id).unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }

    #[test]
    fn pricing_fails_hard_on_a_dangling_product_reference() {
        let fixture = setup();
        let product_id = seed_product(&fixture, 100, 10);
        let cart_id = seed_cart(&fixture);
        fixture.manager.add_item(cart_id, product_id, 2).unwrap();

        // Catalog management deletes the product out from under the cart.
        fixture.products.delete(product_id).unwrap();

        let err = fixture.manager.get_cart(cart_id).unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }

    #[test]
    fn pricing_fails_hard_on_a_deactivated_product() {
        let fixture = setup();
        let product_id = seed_product(&fixture, 100, 10);
        let cart_id = seed_cart(&fixture);
        fixture.manager.add_item(cart_id, product_id, 2).unwrap();

        let mut product = fixture.products.find(product_id).unwrap().unwrap();
        product.deactivate();
        let expected = ExpectedVersion::Exact(product.version());
        fixture.products.save(product, expected).unwrap();

        let err = fixture.manager.get_cart(cart_id).unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }

    #[test]
    fn stock_falling_after_a_line_was_written_blocks_the_next_write() {
        let fixture = setup();
        let product_id = seed_product(&fixture, 100, 10);
        let cart_id = seed_cart(&fixture);
        fixture.manager.add_item(cart_id, product_id, 6).unwrap();

        // Fulfillment drains stock to 4; the existing line is only re-checked
        // on the next cart write.
        let mut product = fixture.products.find(product_id).unwrap().unwrap();
        product.adjust_stock(-6).unwrap();
        let expected = ExpectedVersion::Exact(product.version());
        fixture.products.save(product, expected).unwrap();

        let err = fixture
            .manager
            .update_item_quantity(cart_id, product_id, 6)
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::InsufficientStock {
                requested: 6,
                available: 4
            }
        );
    }

    #[derive(Debug, Clone)]
    enum Op {
        Add(u32),
        Update(u32),
        Remove,
        Clear,
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (1u32..=5).prop_map(Op::Add),
            (1u32..=12).prop_map(Op::Update),
            Just(Op::Remove),
            Just(Op::Clear),
        ]
    }

    proptest! {
        /// For any operation sequence, no committed state ever holds a line
        /// above the product's stock.
        #[test]
        fn committed_line_quantity_never_exceeds_stock(ops in prop::collection::vec(op_strategy(), 1..40)) {
            let fixture = setup();
            let stock = 8;
            let product_id = seed_product(&fixture, 100, stock);
            let cart_id = seed_cart(&fixture);

            for op in ops {
                let result = match op {
                    Op::Add(q) => fixture.manager.add_item(cart_id, product_id, q),
                    Op::Update(q) => fixture.manager.update_item_quantity(cart_id, product_id, q),
                    Op::Remove => fixture.manager.remove_item(cart_id, product_id),
                    Op::Clear => fixture.manager.clear_cart(cart_id),
                };
                match result {
                    Ok(_) => {}
                    Err(DomainError::InsufficientStock { .. } | DomainError::ItemNotInCart) => {}
                    Err(other) => prop_assert!(false, "unexpected error: {:?}", other),
                }
                prop_assert!(persisted_quantity(&fixture, cart_id, product_id) <= stock);
            }
        }
    }
}
