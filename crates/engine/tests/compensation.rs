//! Compensating-action tests.
//!
//! The engine's units of work span multiple records without a store-level
//! transaction, so a failure between the stock mutation and the order write
//! must reverse what was already applied — and a failed reversal must be
//! reported as an inconsistency, not hidden. These tests inject failures
//! through a wrapper store to exercise exactly those interleavings.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CustomerId, OrderId, PaymentId};
use domain::{
    AuthClaim, Customer, Money, Order, OrderStatus, Payment, Product, ProductUpdate, Sku,
};
use engine::{EngineError, ItemRequest, OrderEngine};
use store::{
    CustomerDirectory, MemoryStore, OrderFilter, OrderLedger, PaymentRecorder, ProductStore,
    Result as StoreResult, StoreError,
};

/// Delegating store with switchable failure points.
#[derive(Clone, Default)]
struct FlakyStore {
    inner: MemoryStore,
    fail_insert_order: Arc<AtomicBool>,
    conflict_on_transition: Arc<AtomicBool>,
    fail_negative_adjust: Arc<AtomicBool>,
    fail_remove_payment: Arc<AtomicBool>,
}

impl FlakyStore {
    fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProductStore for FlakyStore {
    async fn insert_product(&self, product: Product) -> StoreResult<Product> {
        self.inner.insert_product(product).await
    }

    async fn find_by_sku(&self, sku: &Sku) -> StoreResult<Option<Product>> {
        self.inner.find_by_sku(sku).await
    }

    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        self.inner.list_products().await
    }

    async fn update_product(&self, sku: &Sku, update: ProductUpdate) -> StoreResult<Product> {
        self.inner.update_product(sku, update).await
    }

    async fn delete_product(&self, sku: &Sku) -> StoreResult<()> {
        self.inner.delete_product(sku).await
    }

    async fn adjust_stock(&self, sku: &Sku, delta: i64) -> StoreResult<i64> {
        if delta < 0 && self.fail_negative_adjust.load(Ordering::SeqCst) {
            return Err(StoreError::InsufficientStock {
                sku: sku.clone(),
                available: 0,
            });
        }
        self.inner.adjust_stock(sku, delta).await
    }
}

#[async_trait]
impl CustomerDirectory for FlakyStore {
    async fn insert_customer(&self, customer: Customer) -> StoreResult<Customer> {
        self.inner.insert_customer(customer).await
    }

    async fn find_customer(&self, id: CustomerId) -> StoreResult<Option<Customer>> {
        self.inner.find_customer(id).await
    }

    async fn find_by_identity(&self, identity: &str) -> StoreResult<Option<Customer>> {
        self.inner.find_by_identity(identity).await
    }

    async fn list_customers(&self) -> StoreResult<Vec<Customer>> {
        self.inner.list_customers().await
    }
}

#[async_trait]
impl OrderLedger for FlakyStore {
    async fn insert_order(&self, order: Order) -> StoreResult<Order> {
        if self.fail_insert_order.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolClosed));
        }
        self.inner.insert_order(order).await
    }

    async fn find_order(&self, id: OrderId) -> StoreResult<Option<Order>> {
        self.inner.find_order(id).await
    }

    async fn list_orders(&self, filter: OrderFilter) -> StoreResult<Vec<Order>> {
        self.inner.list_orders(filter).await
    }

    async fn transition_order(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        at: DateTime<Utc>,
    ) -> StoreResult<Order> {
        if self.conflict_on_transition.load(Ordering::SeqCst) {
            return Err(StoreError::TransitionConflict { current: from });
        }
        self.inner.transition_order(id, from, to, at).await
    }
}

#[async_trait]
impl PaymentRecorder for FlakyStore {
    async fn insert_payment(&self, payment: Payment) -> StoreResult<Payment> {
        self.inner.insert_payment(payment).await
    }

    async fn remove_payment(&self, id: PaymentId) -> StoreResult<()> {
        if self.fail_remove_payment.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sqlx::Error::PoolClosed));
        }
        self.inner.remove_payment(id).await
    }

    async fn payments_for_order(&self, order: OrderId) -> StoreResult<Vec<Payment>> {
        self.inner.payments_for_order(order).await
    }

    async fn list_payments(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> StoreResult<Vec<Payment>> {
        self.inner.list_payments(from, to).await
    }
}

async fn setup() -> (OrderEngine<FlakyStore>, FlakyStore, AuthClaim) {
    let store = FlakyStore::new();
    store
        .insert_product(Product::new(
            "AB-101",
            "Widget",
            "A widget",
            Money::from_cents(2500),
            5,
        ))
        .await
        .unwrap();
    store
        .insert_customer(Customer::new("Ada", "ada@example.com", "", ""))
        .await
        .unwrap();

    (
        OrderEngine::new(store.clone()),
        store,
        AuthClaim::customer("ada@example.com"),
    )
}

fn items(qty: u32) -> Vec<ItemRequest> {
    vec![ItemRequest {
        sku: "AB-101".to_string(),
        qty,
    }]
}

async fn stock(store: &FlakyStore) -> i64 {
    store
        .find_by_sku(&Sku::new("AB-101"))
        .await
        .unwrap()
        .unwrap()
        .stock
}

#[tokio::test]
async fn failed_order_insert_releases_reserved_stock() {
    let (engine, store, claim) = setup().await;
    store.fail_insert_order.store(true, Ordering::SeqCst);

    let err = engine.place_order(&claim, &items(2)).await.unwrap_err();
    assert!(matches!(err, EngineError::Store(_)));

    // The decrement was compensated before the error surfaced.
    assert_eq!(stock(&store).await, 5);
    assert_eq!(store.inner.order_count().await, 0);
}

#[tokio::test]
async fn lost_pay_race_removes_payment_record() {
    let (engine, store, claim) = setup().await;
    let order = engine.place_order(&claim, &items(1)).await.unwrap();

    store.conflict_on_transition.store(true, Ordering::SeqCst);
    let err = engine
        .pay_order(&claim, order.id, 25.00, "Cash")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));

    // No orphaned payment record remains.
    assert_eq!(store.inner.payment_count().await, 0);
    let order = store.find_order(order.id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Pending);
}

#[tokio::test]
async fn failed_payment_removal_is_reported_as_inconsistency() {
    let (engine, store, claim) = setup().await;
    let order = engine.place_order(&claim, &items(1)).await.unwrap();

    store.conflict_on_transition.store(true, Ordering::SeqCst);
    store.fail_remove_payment.store(true, Ordering::SeqCst);

    let err = engine
        .pay_order(&claim, order.id, 25.00, "Cash")
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Inconsistent { .. }));
}

#[tokio::test]
async fn lost_cancel_race_reclaims_restored_stock() {
    let (engine, store, claim) = setup().await;
    let order = engine.place_order(&claim, &items(2)).await.unwrap();
    assert_eq!(stock(&store).await, 3);

    store.conflict_on_transition.store(true, Ordering::SeqCst);
    let err = engine.cancel_order(&claim, order.id).await.unwrap_err();
    assert!(matches!(err, EngineError::Conflict(_)));

    // The restoration was taken back; reserved stock still belongs to the
    // (still Pending) order.
    assert_eq!(stock(&store).await, 3);
}

#[tokio::test]
async fn failed_reclaim_surfaces_as_inconsistency() {
    let (engine, store, claim) = setup().await;
    let order = engine.place_order(&claim, &items(2)).await.unwrap();

    // The cancel restores +2, the transition loses its race, and the
    // reclaiming decrement finds the restored units already sold.
    store.conflict_on_transition.store(true, Ordering::SeqCst);
    store.fail_negative_adjust.store(true, Ordering::SeqCst);

    let err = engine.cancel_order(&claim, order.id).await.unwrap_err();
    assert!(matches!(err, EngineError::Inconsistent { .. }));
}
