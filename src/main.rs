use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod domain;
mod notify;
mod store;
mod utils;

use domain::catalog::Product;
use domain::order::{CreateOrder, LineRequest, OrderEngine, OrderLifecycle};
use domain::user::User;
use domain::voucher::Voucher;
use notify::{EmailClient, LogMailer, Notifier};
use store::{CatalogStore, MemoryStore, PgStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Structured logging with environment-based filtering; override with
    // RUST_LOG, e.g. RUST_LOG=debug cargo run
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,shop_orders=debug")),
        )
        .init();

    tracing::info!("🚀 Starting order processing service");

    // DATABASE_URL selects the Postgres store; without it we run the
    // in-memory store and walk through the order workflow end to end.
    if let Ok(url) = std::env::var("DATABASE_URL") {
        tracing::info!("Connecting to Postgres...");
        let store = Arc::new(PgStore::connect(&url).await?);
        store.migrate().await?;
        tracing::info!("✅ Schema ready, store wired");
        return Ok(());
    }

    tracing::info!("No DATABASE_URL set, running the in-memory demo");
    run_demo().await
}

async fn run_demo() -> anyhow::Result<()> {
    let store = Arc::new(MemoryStore::new());

    // === Seed a small catalog, a customer, and one live voucher ===
    let tee = Product::new("Basic Tee", 100_000, 10);
    let jacket = Product::new("Denim Jacket", 450_000, 3);
    let (tee_id, jacket_id) = (tee.id, jacket.id);
    let (tee_price, jacket_price) = (tee.price, jacket.price);
    store.add_product(tee).await;
    store.add_product(jacket).await;

    let customer = User::new("An Nguyen", "an@example.com");
    let customer_id = customer.id;
    tracing::info!(customer = %customer.name, "Seeded demo catalog and customer");
    store.add_user(customer).await;

    store
        .add_voucher(Voucher {
            code: "WELCOME10".to_string(),
            discount_percent: 10,
            expires_at: Utc::now() + Duration::days(7),
        })
        .await;

    // === Wire the core ===
    let notifier = Notifier::new(store.clone(), EmailClient::new(Arc::new(LogMailer)));
    let engine = OrderEngine::new(
        store.clone(),
        store.clone(),
        store.clone(),
        notifier.clone(),
    );
    let lifecycle = OrderLifecycle::new(store.clone(), notifier);

    // === Place an order with a redeemed voucher ===
    let order_id = engine
        .create(CreateOrder {
            requester: Some(customer_id),
            receiver_name: "An Nguyen".to_string(),
            phone: "0901234567".to_string(),
            address: "12 Le Loi, District 1, HCMC".to_string(),
            note: Some("Leave at the front desk".to_string()),
            voucher_code: Some("welcome10".to_string()),
            payment_method: "COD".to_string(),
            lines: vec![
                LineRequest {
                    product_id: tee_id,
                    quantity: 2,
                    unit_price: tee_price,
                },
                LineRequest {
                    product_id: jacket_id,
                    quantity: 1,
                    unit_price: jacket_price,
                },
            ],
        })
        .await?;
    tracing::info!(order_id, "✅ Order placed");

    // === Complete it ===
    lifecycle.update_status(order_id, "completed").await?;

    // === Place and cancel a second order, watching stock come back ===
    let second = engine
        .create(CreateOrder {
            requester: Some(customer_id),
            receiver_name: "An Nguyen".to_string(),
            phone: "0901234567".to_string(),
            address: "12 Le Loi, District 1, HCMC".to_string(),
            note: None,
            voucher_code: None,
            payment_method: "COD".to_string(),
            lines: vec![LineRequest {
                product_id: jacket_id,
                quantity: 2,
                unit_price: jacket_price,
            }],
        })
        .await?;
    tracing::info!(order_id = second, "✅ Second order placed");

    lifecycle.update_status(second, "cancelled").await?;
    if let Some(jacket) = store.product(jacket_id).await? {
        tracing::info!(stock = jacket.stock, "Jacket stock after cancellation");
    }

    // Let the spawned notifications flush before exiting.
    tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    tracing::info!("🎉 Demo complete");
    Ok(())
}
