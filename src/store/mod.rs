use std::collections::HashMap;

use async_trait::async_trait;

use crate::domain::catalog::{Product, ProductId};
use crate::domain::order::{NewOrder, Order, OrderId, OrderStatus};
use crate::domain::user::{User, UserId};
use crate::domain::voucher::Voucher;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

// ============================================================================
// Store Traits - Persistence Boundary
// ============================================================================
//
// The engine is stateless between calls; every cross-request consistency
// guarantee lives behind these traits. In particular the stock sufficiency
// check and the decrement are a single capability of `OrderStore::create`,
// never separate read and write calls, so the read-then-write oversell race
// cannot exist regardless of backend.
//
// ============================================================================

/// Infrastructure-level store failure.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Voucher code already exists: {0}")]
    DuplicateVoucherCode(String),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

/// Outcome surface of the atomic order commit. The whole unit of work
/// rolls back on the first failing line.
#[derive(Debug, thiserror::Error)]
pub enum CommitError {
    #[error("Product does not exist: {0}")]
    ProductNotFound(ProductId),

    #[error("Not enough stock for '{name}': requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        name: String,
        requested: i32,
        available: i32,
    },

    #[error("Store failure: {0}")]
    Store(#[from] StoreError),
}

/// Result of an atomic cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelOutcome {
    /// Status set to `Cancelled` and every line restocked exactly once.
    Cancelled,
    /// Already cancelled; stock untouched.
    AlreadyCancelled,
    NotFound,
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Bulk read of the distinct product set referenced by an order.
    async fn products_by_ids(
        &self,
        ids: &[ProductId],
    ) -> Result<HashMap<ProductId, Product>, StoreError>;

    async fn product(&self, id: ProductId) -> Result<Option<Product>, StoreError>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Commit an order as one unit of work: for every line, check and
    /// decrement stock and bump the sold count, then insert the order with
    /// its lines. All mutations land together or not at all.
    async fn create(&self, order: NewOrder) -> Result<OrderId, CommitError>;

    async fn get(&self, id: OrderId) -> Result<Option<Order>, StoreError>;

    /// Plain status write, no inventory side effects. Returns false when
    /// the order does not exist.
    async fn set_status(&self, id: OrderId, status: OrderStatus) -> Result<bool, StoreError>;

    /// Atomically enter `Cancelled` and restock every line. The status
    /// check and the restock are one unit, so a double cancel can never
    /// restock twice.
    async fn cancel(&self, id: OrderId) -> Result<CancelOutcome, StoreError>;

    /// Record the reward voucher minted for an order (second unit of
    /// work). Returns false when the order does not exist.
    async fn set_reward_code(&self, id: OrderId, code: &str) -> Result<bool, StoreError>;

    /// Delete an order and its lines (lines first, no dangling lines).
    /// Deletion never compensates stock; that is cancellation's job.
    /// Returns false when the order does not exist.
    async fn delete(&self, id: OrderId) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait VoucherStore: Send + Sync {
    /// Case-insensitive code lookup.
    async fn find_code(&self, code: &str) -> Result<Option<Voucher>, StoreError>;

    /// Insert a voucher; codes are unique case-insensitively.
    async fn insert(&self, voucher: Voucher) -> Result<(), StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Named `user` rather than `get` so it cannot collide with
    /// `OrderStore::get` on a store implementing both traits.
    async fn user(&self, id: UserId) -> Result<Option<User>, StoreError>;
}
