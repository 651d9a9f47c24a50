use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tradepost_core::{Document, DomainError, DomainResult, ProductId};

/// Catalog product document.
///
/// # Invariants
/// - `unit_price` is strictly positive.
/// - `stock_quantity` never goes negative (enforced by `adjust_stock`).
/// - An inactive product cannot be sold; cart operations treat it like a
///   missing product on their next touch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    id: ProductId,
    name: String,
    description: String,
    category: String,
    /// Price in the smallest currency unit (e.g. cents).
    unit_price: u64,
    stock_quantity: u32,
    active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: u64,
}

impl Product {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        category: impl Into<String>,
        unit_price: u64,
        stock_quantity: u32,
    ) -> DomainResult<Self> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(DomainError::validation("product name cannot be empty"));
        }
        if unit_price == 0 {
            return Err(DomainError::validation("unit price must be positive"));
        }
        let now = Utc::now();
        Ok(Self {
            id: ProductId::new(),
            name,
            description: description.into(),
            category: category.into(),
            unit_price,
            stock_quantity,
            active: true,
            created_at: now,
            updated_at: now,
            version: 0,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn unit_price(&self) -> u64 {
        self.unit_price
    }

    pub fn stock_quantity(&self) -> u32 {
        self.stock_quantity
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Check if the product can be sold (must be active).
    pub fn can_be_sold(&self) -> bool {
        self.active
    }

    /// Adjust stock by a signed delta, guarding the non-negative invariant.
    ///
    /// Stock is mutated only by catalog/fulfillment flows; cart operations
    /// read it but never write it.
    pub fn adjust_stock(&mut self, delta: i64) -> DomainResult<()> {
        if delta == 0 {
            return Err(DomainError::validation("delta cannot be zero"));
        }
        let new_stock = i64::from(self.stock_quantity) + delta;
        if new_stock < 0 {
            return Err(DomainError::validation("stock cannot go negative"));
        }
        if new_stock > i64::from(u32::MAX) {
            return Err(DomainError::validation("stock exceeds maximum"));
        }
        self.stock_quantity = new_stock as u32;
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn deactivate(&mut self) {
        self.active = false;
        self.updated_at = Utc::now();
    }
}

impl Document for Product {
    type Id = ProductId;

    fn id(&self) -> ProductId {
        self.id
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn set_version(&mut self, version: u64) {
        self.version = version;
    }
}
