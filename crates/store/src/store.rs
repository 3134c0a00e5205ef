use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CustomerId, OrderId, PaymentId};
use domain::{Customer, Order, OrderStatus, Payment, Product, ProductUpdate, Sku};

use crate::Result;
use crate::query::OrderFilter;

/// Catalog storage with the atomic stock-adjustment primitive the order
/// lifecycle engine depends on.
#[async_trait]
pub trait ProductStore: Send + Sync {
    /// Inserts a product. Fails with `AlreadyExists` on a duplicate sku.
    async fn insert_product(&self, product: Product) -> Result<Product>;

    /// Point lookup by sku.
    async fn find_by_sku(&self, sku: &Sku) -> Result<Option<Product>>;

    /// Lists the whole catalog, ordered by sku.
    async fn list_products(&self) -> Result<Vec<Product>>;

    /// Applies a partial update. Fails with `NotFound` for an absent sku.
    async fn update_product(&self, sku: &Sku, update: ProductUpdate) -> Result<Product>;

    /// Deletes a product. Fails with `NotFound` for an absent sku.
    async fn delete_product(&self, sku: &Sku) -> Result<()>;

    /// Atomically applies `delta` to the product's stock, but only if the
    /// resulting stock stays non-negative. Returns the new stock value.
    ///
    /// Fails with `InsufficientStock { available }` when the condition does
    /// not hold, and `NotFound` when the sku is absent. This is the
    /// compare-and-swap primitive that keeps concurrent placements from
    /// racing past a read-time stock check.
    async fn adjust_stock(&self, sku: &Sku, delta: i64) -> Result<i64>;
}

/// Customer directory keyed by id and by authenticated identity (email).
#[async_trait]
pub trait CustomerDirectory: Send + Sync {
    /// Inserts a customer. Fails with `AlreadyExists` on a duplicate email.
    async fn insert_customer(&self, customer: Customer) -> Result<Customer>;

    /// Point lookup by id.
    async fn find_customer(&self, id: CustomerId) -> Result<Option<Customer>>;

    /// Resolves an authenticated identity to a customer record.
    async fn find_by_identity(&self, identity: &str) -> Result<Option<Customer>>;

    /// Lists all customers, ordered by email.
    async fn list_customers(&self) -> Result<Vec<Customer>>;
}

/// Order ledger: creation, point lookup, filtered listing, and the
/// conditional status-transition helper.
#[async_trait]
pub trait OrderLedger: Send + Sync {
    /// Inserts a new order record.
    async fn insert_order(&self, order: Order) -> Result<Order>;

    /// Point lookup by id.
    async fn find_order(&self, id: OrderId) -> Result<Option<Order>>;

    /// Lists orders matching the filter, newest first.
    async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<Order>>;

    /// Conditionally transitions an order from `from` to `to`, stamping the
    /// timestamp belonging to `to`, and returns the updated record.
    ///
    /// Rejects transitions that are illegal in the state machine before
    /// touching storage. A zero-row update (the stored status no longer
    /// matches `from`) fails with `TransitionConflict` carrying the status
    /// actually stored — the caller lost an optimistic-concurrency race.
    async fn transition_order(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<Order>;
}

/// Payment records.
#[async_trait]
pub trait PaymentRecorder: Send + Sync {
    /// Records a payment.
    async fn insert_payment(&self, payment: Payment) -> Result<Payment>;

    /// Removes a payment record. Only used as a compensating action when the
    /// paired status flip loses its race; normal flow never deletes.
    async fn remove_payment(&self, id: PaymentId) -> Result<()>;

    /// Payments recorded against one order.
    async fn payments_for_order(&self, order: OrderId) -> Result<Vec<Payment>>;

    /// Payments in a `paid_at` range (reporting).
    async fn list_payments(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<Payment>>;
}

/// The full storage surface the engine and the API are generic over.
pub trait Store: ProductStore + CustomerDirectory + OrderLedger + PaymentRecorder {}

impl<T> Store for T where T: ProductStore + CustomerDirectory + OrderLedger + PaymentRecorder {}
