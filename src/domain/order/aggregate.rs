use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::value_objects::{discounted_total, OrderLine, OrderStatus};
use crate::domain::user::UserId;

// ============================================================================
// Order Aggregate
// ============================================================================
//
// An order owns its lines exclusively (cascade-delete, no dangling lines).
// Products and vouchers are referenced by id only.
//
// Amount invariants, maintained by `NewOrder::build`:
//   original_amount = sum of quantity * unit_price over all lines
//   total_amount    = original_amount - original_amount * discount / 100
//
// ============================================================================

pub type OrderId = i64;

/// A persisted order, as read back from the store.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Order {
    pub id: OrderId,
    pub created_at: DateTime<Utc>,
    pub placed_at: DateTime<Utc>,
    pub user_id: UserId,
    pub receiver_name: String,
    pub phone: String,
    pub address: String,
    pub note: Option<String>,
    pub status: OrderStatus,
    /// Code the customer redeemed, if any. Kept for audit; the discount
    /// it yielded is frozen in `discount_percent`.
    pub voucher_code: Option<String>,
    pub payment_method: String,
    pub original_amount: i64,
    pub discount_percent: i32,
    pub total_amount: i64,
    /// Reward voucher minted for this order. `None` means the second unit
    /// of work has not landed yet; a reconciliation job can re-mint.
    pub reward_code: Option<String>,
    pub lines: Vec<OrderLine>,
}

/// An order ready to be committed, before the store assigns its id.
#[derive(Clone, Debug)]
pub struct NewOrder {
    pub created_at: DateTime<Utc>,
    pub placed_at: DateTime<Utc>,
    pub user_id: UserId,
    pub receiver_name: String,
    pub phone: String,
    pub address: String,
    pub note: Option<String>,
    pub status: OrderStatus,
    pub voucher_code: Option<String>,
    pub payment_method: String,
    pub original_amount: i64,
    pub discount_percent: i32,
    pub total_amount: i64,
    pub lines: Vec<OrderLine>,
}

/// Everything about a new order except the computed amounts.
#[derive(Clone, Debug)]
pub struct OrderDraft {
    pub user_id: UserId,
    pub receiver_name: String,
    pub phone: String,
    pub address: String,
    pub note: Option<String>,
    pub voucher_code: Option<String>,
    pub payment_method: String,
}

impl NewOrder {
    /// Assemble an order from validated lines, computing both amounts so
    /// the invariants hold by construction. New orders always start out
    /// `Pending`.
    pub fn build(
        draft: OrderDraft,
        lines: Vec<OrderLine>,
        discount_percent: i32,
        now: DateTime<Utc>,
    ) -> Self {
        let original_amount: i64 = lines.iter().map(OrderLine::subtotal).sum();
        let total_amount = discounted_total(original_amount, discount_percent);

        Self {
            created_at: now,
            placed_at: now,
            user_id: draft.user_id,
            receiver_name: draft.receiver_name,
            phone: draft.phone,
            address: draft.address,
            note: draft.note,
            status: OrderStatus::Pending,
            voucher_code: draft.voucher_code,
            payment_method: draft.payment_method,
            original_amount,
            discount_percent,
            total_amount,
            lines,
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn draft() -> OrderDraft {
        OrderDraft {
            user_id: Uuid::new_v4(),
            receiver_name: "An Nguyen".to_string(),
            phone: "0901234567".to_string(),
            address: "12 Le Loi, District 1".to_string(),
            note: None,
            voucher_code: None,
            payment_method: "COD".to_string(),
        }
    }

    #[test]
    fn test_build_computes_amounts() {
        let lines = vec![
            OrderLine {
                product_id: Uuid::new_v4(),
                quantity: 2,
                unit_price: 50_000,
            },
            OrderLine {
                product_id: Uuid::new_v4(),
                quantity: 1,
                unit_price: 100_000,
            },
        ];

        let order = NewOrder::build(draft(), lines, 10, Utc::now());

        assert_eq!(order.original_amount, 200_000);
        assert_eq!(order.total_amount, 180_000);
        assert_eq!(order.status, OrderStatus::Pending);
    }

    #[test]
    fn test_build_without_discount() {
        let lines = vec![OrderLine {
            product_id: Uuid::new_v4(),
            quantity: 3,
            unit_price: 75_000,
        }];

        let order = NewOrder::build(draft(), lines, 0, Utc::now());

        assert_eq!(order.original_amount, 225_000);
        assert_eq!(order.total_amount, order.original_amount);
    }
}
