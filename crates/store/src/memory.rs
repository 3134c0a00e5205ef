use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CustomerId, OrderId, PaymentId};
use domain::{Customer, Order, OrderStatus, Payment, Product, ProductUpdate, Sku};
use tokio::sync::RwLock;

use crate::query::OrderFilter;
use crate::store::{CustomerDirectory, OrderLedger, PaymentRecorder, ProductStore};
use crate::{Result, StoreError};

#[derive(Default)]
struct Tables {
    products: HashMap<Sku, Product>,
    customers: HashMap<CustomerId, Customer>,
    orders: HashMap<OrderId, Order>,
    payments: HashMap<PaymentId, Payment>,
}

/// In-memory store implementation for tests and development.
///
/// All tables live behind one `RwLock`, so every primitive — in particular
/// the conditional stock adjustment and status transition — is atomic with
/// respect to concurrent callers, matching the guarantees of the
/// database-backed implementation.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of orders stored.
    pub async fn order_count(&self) -> usize {
        self.tables.read().await.orders.len()
    }

    /// Returns the number of payments stored.
    pub async fn payment_count(&self) -> usize {
        self.tables.read().await.payments.len()
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn insert_product(&self, product: Product) -> Result<Product> {
        let mut tables = self.tables.write().await;
        if tables.products.contains_key(&product.sku) {
            return Err(StoreError::already_exists("product", &product.sku));
        }
        tables.products.insert(product.sku.clone(), product.clone());
        Ok(product)
    }

    async fn find_by_sku(&self, sku: &Sku) -> Result<Option<Product>> {
        Ok(self.tables.read().await.products.get(sku).cloned())
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        let tables = self.tables.read().await;
        let mut products: Vec<_> = tables.products.values().cloned().collect();
        products.sort_by(|a, b| a.sku.as_str().cmp(b.sku.as_str()));
        Ok(products)
    }

    async fn update_product(&self, sku: &Sku, update: ProductUpdate) -> Result<Product> {
        let mut tables = self.tables.write().await;
        let product = tables
            .products
            .get_mut(sku)
            .ok_or_else(|| StoreError::not_found("product", sku))?;
        update.apply(product);
        Ok(product.clone())
    }

    async fn delete_product(&self, sku: &Sku) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables
            .products
            .remove(sku)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found("product", sku))
    }

    async fn adjust_stock(&self, sku: &Sku, delta: i64) -> Result<i64> {
        let mut tables = self.tables.write().await;
        let product = tables
            .products
            .get_mut(sku)
            .ok_or_else(|| StoreError::not_found("product", sku))?;

        let new_stock = product.stock + delta;
        if new_stock < 0 {
            return Err(StoreError::InsufficientStock {
                sku: sku.clone(),
                available: product.stock,
            });
        }
        product.stock = new_stock;
        Ok(new_stock)
    }
}

#[async_trait]
impl CustomerDirectory for MemoryStore {
    async fn insert_customer(&self, customer: Customer) -> Result<Customer> {
        let mut tables = self.tables.write().await;
        if tables.customers.values().any(|c| c.email == customer.email) {
            return Err(StoreError::already_exists("customer", &customer.email));
        }
        tables.customers.insert(customer.id, customer.clone());
        Ok(customer)
    }

    async fn find_customer(&self, id: CustomerId) -> Result<Option<Customer>> {
        Ok(self.tables.read().await.customers.get(&id).cloned())
    }

    async fn find_by_identity(&self, identity: &str) -> Result<Option<Customer>> {
        let tables = self.tables.read().await;
        Ok(tables
            .customers
            .values()
            .find(|c| c.email == identity)
            .cloned())
    }

    async fn list_customers(&self) -> Result<Vec<Customer>> {
        let tables = self.tables.read().await;
        let mut customers: Vec<_> = tables.customers.values().cloned().collect();
        customers.sort_by(|a, b| a.email.cmp(&b.email));
        Ok(customers)
    }
}

#[async_trait]
impl OrderLedger for MemoryStore {
    async fn insert_order(&self, order: Order) -> Result<Order> {
        let mut tables = self.tables.write().await;
        tables.orders.insert(order.id, order.clone());
        Ok(order)
    }

    async fn find_order(&self, id: OrderId) -> Result<Option<Order>> {
        Ok(self.tables.read().await.orders.get(&id).cloned())
    }

    async fn list_orders(&self, filter: OrderFilter) -> Result<Vec<Order>> {
        let tables = self.tables.read().await;
        let mut orders: Vec<_> = tables
            .orders
            .values()
            .filter(|o| filter.matches(o))
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn transition_order(
        &self,
        id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
        at: DateTime<Utc>,
    ) -> Result<Order> {
        if !from.can_transition(to) {
            return Err(StoreError::IllegalTransition { from, to });
        }

        let mut tables = self.tables.write().await;
        let order = tables
            .orders
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("order", id))?;

        if order.status != from {
            return Err(StoreError::TransitionConflict {
                current: order.status,
            });
        }

        order.apply_transition(to, at);
        Ok(order.clone())
    }
}

#[async_trait]
impl PaymentRecorder for MemoryStore {
    async fn insert_payment(&self, payment: Payment) -> Result<Payment> {
        let mut tables = self.tables.write().await;
        tables.payments.insert(payment.id, payment.clone());
        Ok(payment)
    }

    async fn remove_payment(&self, id: PaymentId) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables
            .payments
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StoreError::not_found("payment", id))
    }

    async fn payments_for_order(&self, order: OrderId) -> Result<Vec<Payment>> {
        let tables = self.tables.read().await;
        Ok(tables
            .payments
            .values()
            .filter(|p| p.order == order)
            .cloned()
            .collect())
    }

    async fn list_payments(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<Payment>> {
        let tables = self.tables.read().await;
        Ok(tables
            .payments
            .values()
            .filter(|p| from.is_none_or(|f| p.paid_at >= f) && to.is_none_or(|t| p.paid_at <= t))
            .cloned()
            .collect())
    }
}
