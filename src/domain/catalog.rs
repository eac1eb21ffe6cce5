use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Catalog - Product Records
// ============================================================================
//
// Products are shared mutable resources. The order core only ever touches
// stock and sold_count; price here is the reference price, independent of
// the per-line price snapshots taken at order time.
//
// ============================================================================

pub type ProductId = Uuid;

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    /// Reference price in minor units. Order lines carry their own snapshot.
    pub price: i64,
    pub stock: i32,
    pub sold_count: i32,
}

impl Product {
    pub fn new(name: impl Into<String>, price: i64, stock: i32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            price,
            stock,
            sold_count: 0,
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
