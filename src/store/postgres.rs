use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};

use super::{CancelOutcome, CatalogStore, CommitError, OrderStore, StoreError, UserStore, VoucherStore};
use crate::domain::catalog::{Product, ProductId};
use crate::domain::order::{NewOrder, Order, OrderId, OrderLine, OrderStatus};
use crate::domain::user::{User, UserId};
use crate::domain::voucher::Voucher;

// ============================================================================
// Postgres Store
// ============================================================================
//
// The atomic order commit is a transaction over conditional updates:
//
//   UPDATE products SET stock = stock - qty, sold_count = sold_count + qty
//   WHERE id = $1 AND stock >= qty
//
// A zero-row update means the line lost the race (or the product vanished);
// the transaction rolls back and nothing else in the order lands. Two
// concurrent orders for the last units serialize on the row lock and
// exactly one commits.
//
// ============================================================================

const SCHEMA: &[&str] = &[
    "CREATE TABLE IF NOT EXISTS products (
        id UUID PRIMARY KEY,
        name TEXT NOT NULL,
        price BIGINT NOT NULL,
        stock INT NOT NULL CHECK (stock >= 0),
        sold_count INT NOT NULL DEFAULT 0
    )",
    "CREATE TABLE IF NOT EXISTS users (
        id UUID PRIMARY KEY,
        name TEXT NOT NULL,
        email TEXT
    )",
    "CREATE TABLE IF NOT EXISTS vouchers (
        code TEXT PRIMARY KEY,
        discount_percent INT NOT NULL,
        expires_at TIMESTAMPTZ NOT NULL
    )",
    "CREATE UNIQUE INDEX IF NOT EXISTS vouchers_code_ci ON vouchers (lower(code))",
    "CREATE TABLE IF NOT EXISTS orders (
        id BIGSERIAL PRIMARY KEY,
        created_at TIMESTAMPTZ NOT NULL,
        placed_at TIMESTAMPTZ NOT NULL,
        user_id UUID NOT NULL,
        receiver_name TEXT NOT NULL,
        phone TEXT NOT NULL,
        address TEXT NOT NULL,
        note TEXT,
        status TEXT NOT NULL,
        voucher_code TEXT,
        payment_method TEXT NOT NULL,
        original_amount BIGINT NOT NULL,
        discount_percent INT NOT NULL,
        total_amount BIGINT NOT NULL,
        reward_code TEXT
    )",
    "CREATE TABLE IF NOT EXISTS order_lines (
        order_id BIGINT NOT NULL REFERENCES orders(id),
        product_id UUID NOT NULL,
        quantity INT NOT NULL,
        unit_price BIGINT NOT NULL
    )",
    "CREATE INDEX IF NOT EXISTS order_lines_order_id ON order_lines (order_id)",
];

pub struct PgStore {
    pool: PgPool,
}

fn db_err(e: sqlx::Error) -> StoreError {
    StoreError::Backend(anyhow::Error::new(e))
}

impl PgStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await
            .map_err(db_err)?;
        Ok(Self { pool })
    }

    /// Bring the schema up. Idempotent.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        for statement in SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(db_err)?;
        }
        Ok(())
    }
}

fn parse_status(raw: &str) -> Result<OrderStatus, StoreError> {
    OrderStatus::parse(raw)
        .map_err(|e| StoreError::Backend(anyhow::anyhow!("corrupt status column: {e}")))
}

fn order_from_row(row: &sqlx::postgres::PgRow, lines: Vec<OrderLine>) -> Result<Order, StoreError> {
    let status: String = row.try_get("status").map_err(db_err)?;
    Ok(Order {
        id: row.try_get("id").map_err(db_err)?,
        created_at: row.try_get("created_at").map_err(db_err)?,
        placed_at: row.try_get("placed_at").map_err(db_err)?,
        user_id: row.try_get("user_id").map_err(db_err)?,
        receiver_name: row.try_get("receiver_name").map_err(db_err)?,
        phone: row.try_get("phone").map_err(db_err)?,
        address: row.try_get("address").map_err(db_err)?,
        note: row.try_get("note").map_err(db_err)?,
        status: parse_status(&status)?,
        voucher_code: row.try_get("voucher_code").map_err(db_err)?,
        payment_method: row.try_get("payment_method").map_err(db_err)?,
        original_amount: row.try_get("original_amount").map_err(db_err)?,
        discount_percent: row.try_get("discount_percent").map_err(db_err)?,
        total_amount: row.try_get("total_amount").map_err(db_err)?,
        reward_code: row.try_get("reward_code").map_err(db_err)?,
        lines,
    })
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn products_by_ids(
        &self,
        ids: &[ProductId],
    ) -> Result<HashMap<ProductId, Product>, StoreError> {
        let rows = sqlx::query(
            "SELECT id, name, price, stock, sold_count FROM products WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut products = HashMap::with_capacity(rows.len());
        for row in rows {
            let product = Product {
                id: row.try_get("id").map_err(db_err)?,
                name: row.try_get("name").map_err(db_err)?,
                price: row.try_get("price").map_err(db_err)?,
                stock: row.try_get("stock").map_err(db_err)?,
                sold_count: row.try_get("sold_count").map_err(db_err)?,
            };
            products.insert(product.id, product);
        }
        Ok(products)
    }

    async fn product(&self, id: ProductId) -> Result<Option<Product>, StoreError> {
        let mut products = self.products_by_ids(&[id]).await?;
        Ok(products.remove(&id))
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn create(&self, order: NewOrder) -> Result<OrderId, CommitError> {
        let mut tx = self.pool.begin().await.map_err(|e| CommitError::Store(db_err(e)))?;

        for line in &order.lines {
            let updated = sqlx::query(
                "UPDATE products
                 SET stock = stock - $2, sold_count = sold_count + $2
                 WHERE id = $1 AND stock >= $2",
            )
            .bind(line.product_id)
            .bind(line.quantity)
            .execute(&mut *tx)
            .await
            .map_err(|e| CommitError::Store(db_err(e)))?;

            if updated.rows_affected() == 0 {
                // Dropping the transaction rolls back any earlier lines.
                let row = sqlx::query("SELECT name, stock FROM products WHERE id = $1")
                    .bind(line.product_id)
                    .fetch_optional(&mut *tx)
                    .await
                    .map_err(|e| CommitError::Store(db_err(e)))?;

                return Err(match row {
                    None => CommitError::ProductNotFound(line.product_id),
                    Some(row) => CommitError::InsufficientStock {
                        product_id: line.product_id,
                        name: row.try_get("name").map_err(|e| CommitError::Store(db_err(e)))?,
                        requested: line.quantity,
                        available: row
                            .try_get("stock")
                            .map_err(|e| CommitError::Store(db_err(e)))?,
                    },
                });
            }
        }

        let row = sqlx::query(
            "INSERT INTO orders (
                created_at, placed_at, user_id, receiver_name, phone, address,
                note, status, voucher_code, payment_method,
                original_amount, discount_percent, total_amount
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING id",
        )
        .bind(order.created_at)
        .bind(order.placed_at)
        .bind(order.user_id)
        .bind(&order.receiver_name)
        .bind(&order.phone)
        .bind(&order.address)
        .bind(&order.note)
        .bind(order.status.as_str())
        .bind(&order.voucher_code)
        .bind(&order.payment_method)
        .bind(order.original_amount)
        .bind(order.discount_percent)
        .bind(order.total_amount)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| CommitError::Store(db_err(e)))?;
        let order_id: OrderId = row.try_get("id").map_err(|e| CommitError::Store(db_err(e)))?;

        for line in &order.lines {
            sqlx::query(
                "INSERT INTO order_lines (order_id, product_id, quantity, unit_price)
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(order_id)
            .bind(line.product_id)
            .bind(line.quantity)
            .bind(line.unit_price)
            .execute(&mut *tx)
            .await
            .map_err(|e| CommitError::Store(db_err(e)))?;
        }

        tx.commit().await.map_err(|e| CommitError::Store(db_err(e)))?;
        Ok(order_id)
    }

    async fn get(&self, id: OrderId) -> Result<Option<Order>, StoreError> {
        let Some(row) = sqlx::query("SELECT * FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?
        else {
            return Ok(None);
        };

        let line_rows = sqlx::query(
            "SELECT product_id, quantity, unit_price FROM order_lines WHERE order_id = $1",
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?;

        let mut lines = Vec::with_capacity(line_rows.len());
        for line_row in line_rows {
            lines.push(OrderLine {
                product_id: line_row.try_get("product_id").map_err(db_err)?,
                quantity: line_row.try_get("quantity").map_err(db_err)?,
                unit_price: line_row.try_get("unit_price").map_err(db_err)?,
            });
        }

        Ok(Some(order_from_row(&row, lines)?))
    }

    async fn set_status(&self, id: OrderId, status: OrderStatus) -> Result<bool, StoreError> {
        let updated = sqlx::query("UPDATE orders SET status = $2 WHERE id = $1")
            .bind(id)
            .bind(status.as_str())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(updated.rows_affected() > 0)
    }

    async fn cancel(&self, id: OrderId) -> Result<CancelOutcome, StoreError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        // The status guard and the restock share the transaction, so two
        // concurrent cancels resolve to exactly one restock.
        let updated = sqlx::query("UPDATE orders SET status = $2 WHERE id = $1 AND status <> $2")
            .bind(id)
            .bind(OrderStatus::Cancelled.as_str())
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        if updated.rows_affected() == 0 {
            let exists: Option<OrderId> = sqlx::query_scalar("SELECT id FROM orders WHERE id = $1")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(db_err)?;
            return Ok(match exists {
                Some(_) => CancelOutcome::AlreadyCancelled,
                None => CancelOutcome::NotFound,
            });
        }

        let lines = sqlx::query("SELECT product_id, quantity FROM order_lines WHERE order_id = $1")
            .bind(id)
            .fetch_all(&mut *tx)
            .await
            .map_err(db_err)?;

        for line in lines {
            let product_id: ProductId = line.try_get("product_id").map_err(db_err)?;
            let quantity: i32 = line.try_get("quantity").map_err(db_err)?;
            sqlx::query("UPDATE products SET stock = stock + $2 WHERE id = $1")
                .bind(product_id)
                .bind(quantity)
                .execute(&mut *tx)
                .await
                .map_err(db_err)?;
        }

        tx.commit().await.map_err(db_err)?;
        Ok(CancelOutcome::Cancelled)
    }

    async fn set_reward_code(&self, id: OrderId, code: &str) -> Result<bool, StoreError> {
        let updated = sqlx::query("UPDATE orders SET reward_code = $2 WHERE id = $1")
            .bind(id)
            .bind(code)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(updated.rows_affected() > 0)
    }

    async fn delete(&self, id: OrderId) -> Result<bool, StoreError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        // Lines first, so the order row never dangles children.
        sqlx::query("DELETE FROM order_lines WHERE order_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        let deleted = sqlx::query("DELETE FROM orders WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(deleted.rows_affected() > 0)
    }
}

#[async_trait]
impl VoucherStore for PgStore {
    async fn find_code(&self, code: &str) -> Result<Option<Voucher>, StoreError> {
        let row = sqlx::query(
            "SELECT code, discount_percent, expires_at FROM vouchers WHERE lower(code) = lower($1)",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(|row| {
            Ok(Voucher {
                code: row.try_get("code").map_err(db_err)?,
                discount_percent: row.try_get("discount_percent").map_err(db_err)?,
                expires_at: row.try_get("expires_at").map_err(db_err)?,
            })
        })
        .transpose()
    }

    async fn insert(&self, voucher: Voucher) -> Result<(), StoreError> {
        let result = sqlx::query(
            "INSERT INTO vouchers (code, discount_percent, expires_at) VALUES ($1, $2, $3)",
        )
        .bind(&voucher.code)
        .bind(voucher.discount_percent)
        .bind(voucher.expires_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StoreError::DuplicateVoucherCode(voucher.code))
            }
            Err(e) => Err(db_err(e)),
        }
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn user(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let row = sqlx::query("SELECT id, name, email FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_err)?;

        row.map(|row| {
            Ok(User {
                id: row.try_get("id").map_err(db_err)?,
                name: row.try_get("name").map_err(db_err)?,
                email: row.try_get("email").map_err(db_err)?,
            })
        })
        .transpose()
    }
}

// ============================================================================
// Integration Test Notes
// ============================================================================
//
// Everything here needs a live Postgres to exercise:
// - create: conditional-update reservation, rollback on a failing line
// - cancel: status guard + restock under concurrent cancels
// - voucher unique-violation mapping
//
// The unit suite covers the same contracts against MemoryStore; run the
// binary with DATABASE_URL set to exercise this store end to end.
//
// ============================================================================
