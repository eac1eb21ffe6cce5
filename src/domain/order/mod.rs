// ============================================================================
// Order Domain - The Order Processing Core
// ============================================================================
//
// This module contains ALL order-specific code:
// - Value objects (OrderStatus, OrderLine)
// - Aggregate (Order, NewOrder, amount invariants)
// - Commands (CreateOrder, LineRequest)
// - Errors (OrderError enum)
// - Engine (OrderEngine: validate, price, commit, mint, notify)
// - Lifecycle (OrderLifecycle: status transitions, compensation, deletes)
//
// This is completely separate from the store implementations.
//
// ============================================================================

pub mod aggregate;
pub mod commands;
pub mod engine;
pub mod errors;
pub mod lifecycle;
pub mod value_objects;

// Re-export for convenience
pub use aggregate::*;
pub use commands::*;
pub use engine::*;
pub use errors::*;
pub use lifecycle::*;
pub use value_objects::*;
