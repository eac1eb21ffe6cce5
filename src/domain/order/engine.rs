use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;

use super::aggregate::{NewOrder, OrderDraft, OrderId};
use super::commands::CreateOrder;
use super::errors::OrderError;
use super::value_objects::OrderLine;
use crate::domain::catalog::ProductId;
use crate::domain::voucher::Voucher;
use crate::notify::{Notifier, OrderConfirmation};
use crate::store::{CatalogStore, CommitError, OrderStore, StoreError, VoucherStore};
use crate::utils::{retry_with_backoff, RetryConfig};

// ============================================================================
// Order Processing Engine
// ============================================================================
//
// Turns a cart of line requests into a committed order. Stateless between
// calls; each request runs to completion on its own.
//
// Three stages, in strictly this sequence:
//   1. Unit of work #1: validate, price, and commit the order together
//      with its stock decrements (atomic inside the store).
//   2. Unit of work #2: mint the reward voucher. Independent by design; a
//      failure here leaves the order standing with reward_code = None so a
//      reconciliation job can re-mint.
//   3. Fire-and-forget confirmation email. Never blocks, never fails the
//      caller.
//
// Price trust boundary: the engine prices lines from the submitted
// unit_price, not from the catalog. That is the storefront's contract (the
// client displays and submits the price it showed), kept explicit here
// rather than silently re-derived.
//
// ============================================================================

pub struct OrderEngine {
    catalog: Arc<dyn CatalogStore>,
    vouchers: Arc<dyn VoucherStore>,
    orders: Arc<dyn OrderStore>,
    notifier: Notifier,
}

impl OrderEngine {
    pub fn new(
        catalog: Arc<dyn CatalogStore>,
        vouchers: Arc<dyn VoucherStore>,
        orders: Arc<dyn OrderStore>,
        notifier: Notifier,
    ) -> Self {
        Self {
            catalog,
            vouchers,
            orders,
            notifier,
        }
    }

    /// Create an order from a cart of line requests. Returns the new
    /// order's id on success.
    pub async fn create(&self, cmd: CreateOrder) -> Result<OrderId, OrderError> {
        let user_id = cmd.requester.ok_or(OrderError::Unauthenticated)?;

        if cmd.lines.is_empty() {
            return Err(OrderError::EmptyLines);
        }
        for line in &cmd.lines {
            if line.quantity <= 0 {
                return Err(OrderError::InvalidQuantity(line.quantity));
            }
            if line.unit_price < 0 {
                return Err(OrderError::InvalidUnitPrice(line.unit_price));
            }
        }

        // Bulk-read the referenced products once, then check the summed
        // quantity per product, so duplicate lines for the same product
        // are weighed together. This pass rejects bad requests before
        // anything is mutated; the store re-checks stock inside the
        // commit, which is the authoritative (race-free) check.
        let mut requested: HashMap<ProductId, i32> = HashMap::new();
        for line in &cmd.lines {
            *requested.entry(line.product_id).or_default() += line.quantity;
        }
        let distinct_ids: Vec<_> = requested.keys().copied().collect();
        let products = self.catalog.products_by_ids(&distinct_ids).await?;

        for (&product_id, &quantity) in &requested {
            let product = products
                .get(&product_id)
                .ok_or(OrderError::ProductNotFound(product_id))?;
            if quantity > product.stock {
                return Err(OrderError::InsufficientStock {
                    product_id,
                    name: product.name.clone(),
                    requested: quantity,
                    available: product.stock,
                });
            }
        }

        let lines = cmd
            .lines
            .iter()
            .map(|request| OrderLine {
                product_id: request.product_id,
                quantity: request.quantity,
                unit_price: request.unit_price,
            })
            .collect();

        let now = Utc::now();
        let discount_percent = self.discount_for(cmd.voucher_code.as_deref(), now).await?;

        let order = NewOrder::build(
            OrderDraft {
                user_id,
                receiver_name: cmd.receiver_name,
                phone: cmd.phone,
                address: cmd.address,
                note: cmd.note,
                voucher_code: cmd.voucher_code,
                payment_method: cmd.payment_method,
            },
            lines,
            discount_percent,
            now,
        );

        // Unit of work #1: stock decrements, sold-count bumps, and the
        // order insert land together or not at all.
        let order_id = self
            .orders
            .create(order.clone())
            .await
            .map_err(|e| match e {
                CommitError::ProductNotFound(id) => OrderError::ProductNotFound(id),
                CommitError::InsufficientStock {
                    product_id,
                    name,
                    requested,
                    available,
                } => OrderError::InsufficientStock {
                    product_id,
                    name,
                    requested,
                    available,
                },
                CommitError::Store(e) => OrderError::Store(e),
            })?;

        tracing::info!(
            order_id,
            %user_id,
            line_count = order.lines.len(),
            original_amount = order.original_amount,
            discount_percent,
            total_amount = order.total_amount,
            "✅ Order committed"
        );

        // Unit of work #2, then best-effort notification.
        let reward = self.mint_reward(order_id).await;

        let confirmation = OrderConfirmation {
            user_id,
            order_id,
            receiver_name: order.receiver_name,
            status: order.status,
            total_amount: order.total_amount,
            payment_method: order.payment_method,
            reward,
        };
        let notifier = self.notifier.clone();
        tokio::spawn(async move { notifier.order_confirmed(confirmation).await });

        Ok(order_id)
    }

    /// Resolve the discount for a submitted voucher code. An unknown or
    /// expired code silently yields no discount; only store failures
    /// surface.
    async fn discount_for(
        &self,
        code: Option<&str>,
        now: chrono::DateTime<Utc>,
    ) -> Result<i32, OrderError> {
        let Some(code) = code.map(str::trim).filter(|c| !c.is_empty()) else {
            return Ok(0);
        };

        match self.vouchers.find_code(code).await? {
            Some(voucher) if voucher.is_redeemable(now) => Ok(voucher.discount_percent),
            Some(_) => {
                tracing::debug!(code, "Voucher expired, no discount applied");
                Ok(0)
            }
            None => {
                tracing::debug!(code, "Unknown voucher code, no discount applied");
                Ok(0)
            }
        }
    }

    /// Mint the reward voucher for a committed order: a fresh code each
    /// attempt, recorded on the order once it lands. Returns `None` when
    /// every attempt failed; the order stands either way.
    async fn mint_reward(&self, order_id: OrderId) -> Option<Voucher> {
        let minted = retry_with_backoff(RetryConfig::conservative(), |_attempt| {
            let vouchers = self.vouchers.clone();
            async move {
                let voucher = Voucher::mint_reward(Utc::now());
                vouchers.insert(voucher.clone()).await?;
                Ok::<_, StoreError>(voucher)
            }
        })
        .await;

        match minted {
            Ok(voucher) => {
                tracing::info!(order_id, code = %voucher.code, "🎁 Reward voucher minted");
                match self.orders.set_reward_code(order_id, &voucher.code).await {
                    Ok(true) => {}
                    Ok(false) => {
                        tracing::warn!(order_id, "Order vanished before reward code was recorded");
                    }
                    Err(e) => {
                        tracing::warn!(order_id, error = %e, "Could not record reward code on order");
                    }
                }
                Some(voucher)
            }
            Err(e) => {
                tracing::warn!(
                    order_id,
                    error = %e,
                    "Reward voucher mint failed; order stands, left for reconciliation"
                );
                None
            }
        }
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
