// ============================================================================
// Domain Layer - Business Logic
// ============================================================================
//
// This module contains the order-processing core and the entities it
// mutates. Each area has its own submodule:
// - catalog: Product records (stock, sold count, reference price)
// - voucher: discount codes, both redeemed and minted-as-reward
// - user: the minimal user read model (contact email)
// - order: the Order aggregate, processing engine, and lifecycle controller
//
// This layer is completely separate from the store implementations.
//
// ============================================================================

pub mod catalog;
pub mod order;
pub mod user;
pub mod voucher;
