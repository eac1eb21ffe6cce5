use super::aggregate::OrderId;
use crate::domain::catalog::ProductId;
use crate::store::StoreError;

// ============================================================================
// Order Business Rule Errors
// ============================================================================
//
// Validation, not-found, and conflict variants are all raised before any
// mutation. `Store` wraps persistence failures after the unit of work has
// already rolled itself back.
//
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("No authenticated requester")]
    Unauthenticated,

    #[error("Order must contain at least one line")]
    EmptyLines,

    #[error("Invalid line quantity: {0}")]
    InvalidQuantity(i32),

    #[error("Invalid unit price: {0}")]
    InvalidUnitPrice(i64),

    #[error("Product does not exist: {0}")]
    ProductNotFound(ProductId),

    #[error("Not enough stock for '{name}': requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        name: String,
        requested: i32,
        available: i32,
    },

    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    #[error("Status cannot be blank")]
    BlankStatus,

    #[error("Unknown order status: {0}")]
    UnknownStatus(String),

    #[error("Store failure: {0}")]
    Store(#[from] StoreError),
}
