//! PostgreSQL integration tests
//!
//! These tests share one PostgreSQL container and are ignored by default
//! because they need a local Docker daemon. Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration -- --ignored --test-threads=1
//! ```

use std::sync::Arc;

use chrono::Utc;
use common::CustomerId;
use domain::{Customer, LineItem, Money, Order, OrderStatus, Product, Sku};
use serial_test::serial;
use sqlx::PgPool;
use store::{
    CustomerDirectory, OrderLedger, PostgresStore, ProductStore, StoreError,
};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            PostgresStore::new(temp_pool.clone())
                .run_migrations()
                .await
                .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE payments, orders, customers, products")
        .execute(&pool)
        .await
        .unwrap();

    PostgresStore::new(pool)
}

fn widget(stock: i64) -> Product {
    Product::new("A-1", "Widget", "A widget", Money::from_cents(1999), stock)
}

async fn seeded_order(store: &PostgresStore) -> Order {
    let customer = store
        .insert_customer(Customer::new("Ada", "ada@example.com", "", ""))
        .await
        .unwrap();
    store
        .insert_order(Order::new(
            customer.id,
            format!("ORD-{}", uuid::Uuid::new_v4().simple()),
            vec![LineItem::new(
                Sku::new("A-1"),
                "Widget",
                Money::from_cents(1999),
                2,
            )],
            Utc::now(),
        ))
        .await
        .unwrap()
}

#[tokio::test]
#[serial]
#[ignore = "requires a local Docker daemon"]
async fn test_product_roundtrip_and_duplicate_sku() {
    let store = get_test_store().await;

    store.insert_product(widget(5)).await.unwrap();
    let found = store.find_by_sku(&Sku::new("a-1")).await.unwrap().unwrap();
    assert_eq!(found.name, "Widget");
    assert_eq!(found.stock, 5);

    let err = store.insert_product(widget(5)).await.unwrap_err();
    assert!(matches!(err, StoreError::AlreadyExists { .. }));
}

#[tokio::test]
#[serial]
#[ignore = "requires a local Docker daemon"]
async fn test_adjust_stock_conditional_update() {
    let store = get_test_store().await;
    store.insert_product(widget(3)).await.unwrap();
    let sku = Sku::new("A-1");

    assert_eq!(store.adjust_stock(&sku, -2).await.unwrap(), 1);

    let err = store.adjust_stock(&sku, -2).await.unwrap_err();
    match err {
        StoreError::InsufficientStock { available, .. } => assert_eq!(available, 1),
        other => panic!("unexpected error: {other}"),
    }

    assert_eq!(store.adjust_stock(&sku, 2).await.unwrap(), 3);
}

#[tokio::test]
#[serial]
#[ignore = "requires a local Docker daemon"]
async fn test_order_jsonb_roundtrip() {
    let store = get_test_store().await;
    let inserted = seeded_order(&store).await;

    let loaded = store.find_order(inserted.id).await.unwrap().unwrap();
    assert_eq!(loaded, inserted);
    assert_eq!(loaded.items[0].line_total.cents(), 3998);
}

#[tokio::test]
#[serial]
#[ignore = "requires a local Docker daemon"]
async fn test_transition_conflict_reports_current_status() {
    let store = get_test_store().await;
    let order = seeded_order(&store).await;

    let paid = store
        .transition_order(order.id, OrderStatus::Pending, OrderStatus::Paid, Utc::now())
        .await
        .unwrap();
    assert_eq!(paid.status, OrderStatus::Paid);
    assert!(paid.paid_at.is_some());

    let err = store
        .transition_order(order.id, OrderStatus::Pending, OrderStatus::Paid, Utc::now())
        .await
        .unwrap_err();
    match err {
        StoreError::TransitionConflict { current } => assert_eq!(current, OrderStatus::Paid),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
#[serial]
#[ignore = "requires a local Docker daemon"]
async fn test_find_by_identity() {
    let store = get_test_store().await;
    let customer = store
        .insert_customer(Customer::new("Ada", "ada@example.com", "", ""))
        .await
        .unwrap();

    let found = store
        .find_by_identity("ada@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.id, customer.id);

    assert!(
        store
            .find_customer(CustomerId::new())
            .await
            .unwrap()
            .is_none()
    );
}
