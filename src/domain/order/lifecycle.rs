use std::sync::Arc;

use super::aggregate::OrderId;
use super::errors::OrderError;
use super::value_objects::OrderStatus;
use crate::domain::user::UserId;
use crate::notify::{Notifier, StatusChange};
use crate::store::{CancelOutcome, OrderStore};

// ============================================================================
// Order Lifecycle Controller
// ============================================================================
//
// Applies status transitions to existing orders. The single compensation
// path is entry into Cancelled: the store restocks every line atomically
// with the status write, so a repeated cancel can never restock twice.
// Leaving Cancelled does not re-decrement stock.
//
// Deletion is an administrative purge, distinct from cancellation: lines go
// first (no dangling lines), stock is never compensated.
//
// ============================================================================

pub struct OrderLifecycle {
    orders: Arc<dyn OrderStore>,
    notifier: Notifier,
}

impl OrderLifecycle {
    pub fn new(orders: Arc<dyn OrderStore>, notifier: Notifier) -> Self {
        Self { orders, notifier }
    }

    /// Apply a status submitted over the wire. Returns the parsed status
    /// that was stored.
    pub async fn update_status(
        &self,
        order_id: OrderId,
        status_str: &str,
    ) -> Result<OrderStatus, OrderError> {
        let status = OrderStatus::parse(status_str)?;

        match status {
            OrderStatus::Cancelled => match self.orders.cancel(order_id).await? {
                CancelOutcome::Cancelled => {
                    tracing::info!(order_id, "Order cancelled, stock restored");
                }
                CancelOutcome::AlreadyCancelled => {
                    tracing::debug!(order_id, "Order already cancelled, stock untouched");
                }
                CancelOutcome::NotFound => return Err(OrderError::OrderNotFound(order_id)),
            },
            _ => {
                if !self.orders.set_status(order_id, status).await? {
                    return Err(OrderError::OrderNotFound(order_id));
                }
                tracing::info!(order_id, %status, "Order status updated");
            }
        }

        self.spawn_status_notification(order_id, status).await;
        Ok(status)
    }

    /// Admin purge: drop the order and its lines. No stock compensation.
    pub async fn delete_admin(&self, order_id: OrderId) -> Result<(), OrderError> {
        if !self.orders.delete(order_id).await? {
            return Err(OrderError::OrderNotFound(order_id));
        }
        tracing::info!(order_id, "Order deleted by admin");
        Ok(())
    }

    /// Owner-scoped delete. A missing order and someone else's order are
    /// indistinguishable to the caller. Cascades like the admin path.
    pub async fn delete_for_owner(
        &self,
        order_id: OrderId,
        user_id: UserId,
    ) -> Result<(), OrderError> {
        let order = self
            .orders
            .get(order_id)
            .await?
            .filter(|o| o.user_id == user_id)
            .ok_or(OrderError::OrderNotFound(order_id))?;

        if !self.orders.delete(order.id).await? {
            return Err(OrderError::OrderNotFound(order_id));
        }
        tracing::info!(order_id, %user_id, "Order deleted by owner");
        Ok(())
    }

    async fn spawn_status_notification(&self, order_id: OrderId, status: OrderStatus) {
        // Re-read for the receiver name; a miss here only costs the email.
        let order = match self.orders.get(order_id).await {
            Ok(Some(order)) => order,
            Ok(None) => return,
            Err(e) => {
                tracing::warn!(order_id, error = %e, "Order re-read failed, skipping notification");
                return;
            }
        };

        let change = StatusChange {
            user_id: order.user_id,
            order_id,
            receiver_name: order.receiver_name,
            status,
        };
        let notifier = self.notifier.clone();
        tokio::spawn(async move { notifier.status_changed(change).await });
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
