use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{CancelOutcome, CatalogStore, CommitError, OrderStore, StoreError, UserStore, VoucherStore};
use crate::domain::catalog::{Product, ProductId};
use crate::domain::order::{NewOrder, Order, OrderId, OrderStatus};
use crate::domain::user::{User, UserId};
use crate::domain::voucher::Voucher;

// ============================================================================
// In-Memory Store
// ============================================================================
//
// Backs the unit tests and the demo binary. All four store traits share one
// state behind a single RwLock, so `create` and `cancel` get their
// all-or-nothing guarantee from holding the write guard across the whole
// check-then-mutate sequence.
//
// ============================================================================

#[derive(Default)]
struct State {
    products: HashMap<ProductId, Product>,
    orders: HashMap<OrderId, Order>,
    /// Keyed by lowercased code for case-insensitive lookup.
    vouchers: HashMap<String, Voucher>,
    users: HashMap<UserId, User>,
    next_order_id: OrderId,
}

#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_product(&self, product: Product) {
        let mut state = self.inner.write().await;
        state.products.insert(product.id, product);
    }

    pub async fn add_user(&self, user: User) {
        let mut state = self.inner.write().await;
        state.users.insert(user.id, user);
    }

    pub async fn add_voucher(&self, voucher: Voucher) {
        let mut state = self.inner.write().await;
        state.vouchers.insert(voucher.code.to_lowercase(), voucher);
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn products_by_ids(
        &self,
        ids: &[ProductId],
    ) -> Result<HashMap<ProductId, Product>, StoreError> {
        let state = self.inner.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| state.products.get(id).map(|p| (*id, p.clone())))
            .collect())
    }

    async fn product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let state = self.inner.read().await;
        Ok(state.products.get(&id).cloned())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn create(&self, order: NewOrder) -> Result<OrderId, CommitError> {
        let mut state = self.inner.write().await;

        // Validate before mutating anything; the write guard keeps the
        // check and the decrement one unit. Quantities are summed per
        // product first, so duplicate lines for the same product are
        // checked against stock as a whole rather than line by line.
        let mut requested: HashMap<ProductId, i32> = HashMap::new();
        for line in &order.lines {
            *requested.entry(line.product_id).or_default() += line.quantity;
        }
        for (&product_id, &quantity) in &requested {
            let product = state
                .products
                .get(&product_id)
                .ok_or(CommitError::ProductNotFound(product_id))?;
            if product.stock < quantity {
                return Err(CommitError::InsufficientStock {
                    product_id,
                    name: product.name.clone(),
                    requested: quantity,
                    available: product.stock,
                });
            }
        }

        for line in &order.lines {
            let product = state
                .products
                .get_mut(&line.product_id)
                .expect("validated above");
            product.stock -= line.quantity;
            product.sold_count += line.quantity;
        }

        state.next_order_id += 1;
        let id = state.next_order_id;
        state.orders.insert(
            id,
            Order {
                id,
                created_at: order.created_at,
                placed_at: order.placed_at,
                user_id: order.user_id,
                receiver_name: order.receiver_name,
                phone: order.phone,
                address: order.address,
                note: order.note,
                status: order.status,
                voucher_code: order.voucher_code,
                payment_method: order.payment_method,
                original_amount: order.original_amount,
                discount_percent: order.discount_percent,
                total_amount: order.total_amount,
                reward_code: None,
                lines: order.lines,
            },
        );

        Ok(id)
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let state = self.inner.read().await;
        Ok(state.orders.get(&id).cloned())
    }

    async fn set_status(&self, id: OrderId, status: OrderStatus) -> Result<bool, StoreError> {
        let mut state = self.inner.write().await;
        match state.orders.get_mut(&id) {
            Some(order) => {
                order.status = status;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn cancel(&self, id: OrderId) -> Result<CancelOutcome, StoreError> {
        let mut state = self.inner.write().await;

        let lines = match state.orders.get_mut(&id) {
            None => return Ok(CancelOutcome::NotFound),
            Some(order) if order.status == OrderStatus::Cancelled => {
                return Ok(CancelOutcome::AlreadyCancelled)
            }
            Some(order) => {
                order.status = OrderStatus::Cancelled;
                order.lines.clone()
            }
        };

        for line in &lines {
            if let Some(product) = state.products.get_mut(&line.product_id) {
                product.stock += line.quantity;
            }
        }

        Ok(CancelOutcome::Cancelled)
    }

    async fn set_reward_code(&self, id: OrderId, code: &str) -> Result<bool, StoreError> {
        let mut state = self.inner.write().await;
        match state.orders.get_mut(&id) {
            Some(order) => {
                order.reward_code = Some(code.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: OrderId) -> Result<bool, StoreError> {
        let mut state = self.inner.write().await;
        // Order owns its lines, so removing the aggregate removes them too.
        Ok(state.orders.remove(&id).is_some())
    }
}

#[async_trait]
impl VoucherStore for MemoryStore {
    async fn find_code(&self, code: &str) -> Result<Option<Voucher>, StoreError> {
        let state = self.inner.read().await;
        Ok(state.vouchers.get(&code.to_lowercase()).cloned())
    }

    async fn insert(&self, voucher: Voucher) -> Result<(), StoreError> {
        let mut state = self.inner.write().await;
        let key = voucher.code.to_lowercase();
        if state.vouchers.contains_key(&key) {
            return Err(StoreError::DuplicateVoucherCode(voucher.code));
        }
        state.vouchers.insert(key, voucher);
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let state = self.inner.read().await;
        Ok(state.users.get(&id).cloned())
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::{NewOrder, OrderDraft, OrderLine};
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn new_order(lines: Vec<OrderLine>) -> NewOrder {
        NewOrder::build(
            OrderDraft {
                user_id: Uuid::new_v4(),
                receiver_name: "An Nguyen".to_string(),
                phone: "0901234567".to_string(),
                address: "12 Le Loi".to_string(),
                note: None,
                voucher_code: None,
                payment_method: "COD".to_string(),
            },
            lines,
            0,
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_create_decrements_stock_and_bumps_sold_count() {
        let store = MemoryStore::new();
        let product = Product::new("Tee", 100_000, 10);
        let product_id = product.id;
        store.add_product(product).await;

        let id = store
            .create(new_order(vec![OrderLine {
                product_id,
                quantity: 4,
                unit_price: 100_000,
            }]))
            .await
            .unwrap();

        let product = store.product(product_id).await.unwrap().unwrap();
        assert_eq!(product.stock, 6);
        assert_eq!(product.sold_count, 4);
        assert!(store.get(id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_create_is_all_or_nothing() {
        let store = MemoryStore::new();
        let in_stock = Product::new("Tee", 100_000, 10);
        let scarce = Product::new("Jacket", 400_000, 1);
        let (in_stock_id, scarce_id) = (in_stock.id, scarce.id);
        store.add_product(in_stock).await;
        store.add_product(scarce).await;

        // Second line fails, so the first line's decrement must not land.
        let err = store
            .create(new_order(vec![
                OrderLine {
                    product_id: in_stock_id,
                    quantity: 2,
                    unit_price: 100_000,
                },
                OrderLine {
                    product_id: scarce_id,
                    quantity: 3,
                    unit_price: 400_000,
                },
            ]))
            .await
            .unwrap_err();

        assert!(matches!(err, CommitError::InsufficientStock { .. }));
        assert_eq!(store.product(in_stock_id).await.unwrap().unwrap().stock, 10);
        assert_eq!(store.product(scarce_id).await.unwrap().unwrap().stock, 1);
    }

    #[tokio::test]
    async fn test_duplicate_lines_for_one_product_are_summed() {
        let store = MemoryStore::new();
        let product = Product::new("Tee", 100_000, 5);
        let product_id = product.id;
        store.add_product(product).await;

        // Each line fits stock on its own; together they exceed it.
        let line = |quantity| OrderLine {
            product_id,
            quantity,
            unit_price: 100_000,
        };
        let err = store
            .create(new_order(vec![line(3), line(3)]))
            .await
            .unwrap_err();

        match err {
            CommitError::InsufficientStock {
                requested,
                available,
                ..
            } => {
                assert_eq!(requested, 6);
                assert_eq!(available, 5);
            }
            other => panic!("expected InsufficientStock, got {other:?}"),
        }
        assert_eq!(store.product(product_id).await.unwrap().unwrap().stock, 5);

        // A combination that does fit commits and drains stock exactly.
        store.create(new_order(vec![line(3), line(2)])).await.unwrap();
        assert_eq!(store.product(product_id).await.unwrap().unwrap().stock, 0);
    }

    #[tokio::test]
    async fn test_set_reward_code_reports_missing_order() {
        let store = MemoryStore::new();
        let product = Product::new("Tee", 100_000, 5);
        let product_id = product.id;
        store.add_product(product).await;

        let id = store
            .create(new_order(vec![OrderLine {
                product_id,
                quantity: 1,
                unit_price: 100_000,
            }]))
            .await
            .unwrap();

        assert!(store.set_reward_code(id, "SALEAB12CD").await.unwrap());
        let order = store.get(id).await.unwrap().unwrap();
        assert_eq!(order.reward_code.as_deref(), Some("SALEAB12CD"));

        assert!(!store.set_reward_code(999, "SALEAB12CD").await.unwrap());
    }

    #[tokio::test]
    async fn test_user_lookup() {
        let store = MemoryStore::new();
        let user = User::new("An Nguyen", "an@example.com");
        let user_id = user.id;
        store.add_user(user).await;

        assert!(store.user(user_id).await.unwrap().is_some());
        assert!(store.user(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_cancel_restocks_exactly_once() {
        let store = MemoryStore::new();
        let product = Product::new("Tee", 100_000, 5);
        let product_id = product.id;
        store.add_product(product).await;

        let id = store
            .create(new_order(vec![OrderLine {
                product_id,
                quantity: 5,
                unit_price: 100_000,
            }]))
            .await
            .unwrap();
        assert_eq!(store.product(product_id).await.unwrap().unwrap().stock, 0);

        assert_eq!(store.cancel(id).await.unwrap(), CancelOutcome::Cancelled);
        assert_eq!(store.product(product_id).await.unwrap().unwrap().stock, 5);

        // Cancelling again must not restock a second time.
        assert_eq!(
            store.cancel(id).await.unwrap(),
            CancelOutcome::AlreadyCancelled
        );
        assert_eq!(store.product(product_id).await.unwrap().unwrap().stock, 5);
    }

    #[tokio::test]
    async fn test_cancel_missing_order() {
        let store = MemoryStore::new();
        assert_eq!(store.cancel(99).await.unwrap(), CancelOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_voucher_lookup_is_case_insensitive() {
        let store = MemoryStore::new();
        store
            .add_voucher(Voucher {
                code: "Summer20".to_string(),
                discount_percent: 20,
                expires_at: Utc::now() + Duration::days(7),
            })
            .await;

        let found = store.find_code("SUMMER20").await.unwrap();
        assert_eq!(found.unwrap().discount_percent, 20);
        assert!(store.find_code("winter").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_voucher_insert_rejects_duplicate_code() {
        let store = MemoryStore::new();
        let voucher = Voucher {
            code: "SALEAAAAAA".to_string(),
            discount_percent: 10,
            expires_at: Utc::now() + Duration::days(30),
        };
        store.insert(voucher.clone()).await.unwrap();

        let err = store
            .insert(Voucher {
                code: "saleAAAAAA".to_string(),
                ..voucher
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateVoucherCode(_)));
    }

    #[tokio::test]
    async fn test_delete_removes_order_and_lines() {
        let store = MemoryStore::new();
        let product = Product::new("Tee", 100_000, 10);
        let product_id = product.id;
        store.add_product(product).await;

        let id = store
            .create(new_order(vec![OrderLine {
                product_id,
                quantity: 1,
                unit_price: 100_000,
            }]))
            .await
            .unwrap();

        assert!(store.delete(id).await.unwrap());
        assert!(store.get(id).await.unwrap().is_none());
        // Deletion is a purge, not a cancellation: stock stays decremented.
        assert_eq!(store.product(product_id).await.unwrap().unwrap().stock, 9);

        assert!(!store.delete(id).await.unwrap());
    }
}
