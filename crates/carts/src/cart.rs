use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tradepost_core::{AccountId, CartId, Document, DomainError, DomainResult, ProductId};

/// One line in a cart: a weak reference to a product plus a positive quantity.
///
/// The referenced product may be deleted or deactivated after the line was
/// written; callers re-resolve it on the next touch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Shopping cart document.
///
/// # Invariants
/// - No two lines reference the same product (adds merge into one line).
/// - Every line quantity is positive.
/// - A line quantity never exceeds the product's stock observed at the time
///   the line was last written (checked by the cart manager on every write).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    id: CartId,
    account_id: AccountId,
    lines: Vec<CartLine>,
    created_at: DateTime<Utc>,
    version: u64,
}

impl Cart {
    /// Create an empty cart bound to an account.
    pub fn new(account_id: AccountId) -> Self {
        Self {
            id: CartId::new(),
            account_id,
            lines: Vec::new(),
            created_at: Utc::now(),
            version: 0,
        }
    }

    pub fn account_id(&self) -> AccountId {
        self.account_id
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn line(&self, product_id: ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.product_id == product_id)
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn total_units(&self) -> u32 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Merge rule for the add path: the candidate total is the existing line
    /// quantity plus the delta. Admissibility must be checked against this
    /// total, not the delta alone.
    pub fn merged_quantity(&self, product_id: ProductId, quantity: u32) -> DomainResult<u32> {
        if quantity == 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        let existing = self.line(product_id).map(|l| l.quantity).unwrap_or(0);
        existing
            .checked_add(quantity)
            .ok_or_else(|| DomainError::validation("quantity overflow"))
    }

    /// Write a line's quantity, creating the line if absent.
    ///
    /// The caller must have validated `quantity` against current stock first.
    pub fn set_line_quantity(&mut self, product_id: ProductId, quantity: u32) {
        match self.lines.iter_mut().find(|l| l.product_id == product_id) {
            Some(line) => line.quantity = quantity,
            None => self.lines.push(CartLine {
                product_id,
                quantity,
            }),
        }
    }

    /// Replace an existing line's quantity (update path, not an upsert).
    pub fn replace_quantity(&mut self, product_id: ProductId, quantity: u32) -> DomainResult<()> {
        if quantity == 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        match self.lines.iter_mut().find(|l| l.product_id == product_id) {
            Some(line) => {
                line.quantity = quantity;
                Ok(())
            }
            None => Err(DomainError::ItemNotInCart),
        }
    }

    /// Remove the line for a product. Returns whether a line was removed;
    /// removing an absent product is a no-op, not an error.
    pub fn remove_line(&mut self, product_id: ProductId) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.product_id != product_id);
        self.lines.len() != before
    }

    /// Empty all lines unconditionally.
    pub fn clear(&mut self) {
        self.lines.clear();
    }
}

impl Document for Cart {
    type Id = CartId;

    fn id(&self) -> CartId {
        self.id
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}
