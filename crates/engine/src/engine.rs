//! The order lifecycle engine.

use std::collections::HashSet;

use chrono::Utc;
use common::OrderId;
use domain::{
    AuthClaim, Customer, LineItem, Money, Order, OrderStatus, Payment, PaymentMethod, Sku,
};
use serde::Deserialize;
use store::{OrderFilter, Store, StoreError};

use crate::error::EngineError;
use crate::reference;

/// One requested line in a place-order call.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemRequest {
    pub sku: String,
    pub qty: u32,
}

/// Drives the order state machine over the storage primitives.
///
/// Generic over the store so the same engine runs against the in-memory
/// backend in tests and PostgreSQL in production. The engine holds no
/// mutable state of its own — the store is the single source of truth, and
/// every cross-record invariant goes through its conditional updates.
pub struct OrderEngine<S> {
    store: S,
}

impl<S: Store> OrderEngine<S> {
    /// Creates an engine over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Places an order for the requesting customer.
    ///
    /// Validates the request, snapshots sku/name/price into line items,
    /// reserves stock via conditional decrements, and creates the `Pending`
    /// order. Any failure after the first decrement releases everything
    /// already reserved before the error is returned.
    #[tracing::instrument(skip(self, claim), fields(identity = %claim.identity))]
    pub async fn place_order(
        &self,
        claim: &AuthClaim,
        items: &[ItemRequest],
    ) -> Result<Order, EngineError> {
        let started = std::time::Instant::now();

        if items.is_empty() {
            return Err(EngineError::InvalidInput(
                "Invalid order data. Items are required.".to_string(),
            ));
        }

        let customer = self.resolve_customer(claim).await?;

        // Validate every line and snapshot catalog data before touching
        // stock, so a rejected request mutates nothing.
        let mut seen = HashSet::new();
        let mut lines = Vec::with_capacity(items.len());
        for item in items {
            if item.qty == 0 {
                return Err(EngineError::InvalidInput(
                    "Invalid item data. SKU and positive quantity required.".to_string(),
                ));
            }
            let sku = Sku::new(&item.sku);
            if sku.is_empty() {
                return Err(EngineError::InvalidInput(
                    "Invalid item data. SKU and positive quantity required.".to_string(),
                ));
            }
            if !seen.insert(sku.clone()) {
                return Err(EngineError::InvalidInput(format!(
                    "Duplicate product {sku} in order. Please combine quantities."
                )));
            }

            let product = self
                .store
                .find_by_sku(&sku)
                .await?
                .ok_or(EngineError::ProductNotFound { sku: sku.clone() })?;

            // Advisory read-time check; the conditional decrement below is
            // the authoritative one.
            if product.stock < item.qty as i64 {
                return Err(EngineError::InsufficientStock {
                    sku,
                    available: product.stock,
                    requested: item.qty,
                });
            }

            lines.push(LineItem::new(sku, product.name, product.price, item.qty));
        }

        // Reserve stock with conditional decrements. A concurrent order may
        // have consumed stock since the check above; the decrement fails
        // rather than going negative, and everything already reserved is
        // released.
        let mut reserved: Vec<(Sku, u32)> = Vec::with_capacity(lines.len());
        for line in &lines {
            match self.store.adjust_stock(&line.sku, -(line.qty as i64)).await {
                Ok(_) => reserved.push((line.sku.clone(), line.qty)),
                Err(StoreError::InsufficientStock { sku, available }) => {
                    self.release_stock(&reserved).await?;
                    return Err(EngineError::InsufficientStock {
                        sku,
                        available,
                        requested: line.qty,
                    });
                }
                Err(e) => {
                    self.release_stock(&reserved).await?;
                    return Err(e.into());
                }
            }
        }

        let order = Order::new(customer.id, reference::order_number(), lines, Utc::now());
        let order = match self.store.insert_order(order).await {
            Ok(order) => order,
            Err(e) => {
                self.release_stock(&reserved).await?;
                return Err(e.into());
            }
        };

        metrics::counter!("orders_placed_total").increment(1);
        metrics::histogram!("order_placement_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        tracing::info!(order_id = %order.id, order_number = %order.order_number, "order placed");
        Ok(order)
    }

    /// Records a payment against a `Pending` order and flips it to `Paid`.
    ///
    /// The amount, rounded to cents, must equal the order total exactly —
    /// no overpayment, no underpayment tolerance.
    #[tracing::instrument(skip(self, claim), fields(identity = %claim.identity))]
    pub async fn pay_order(
        &self,
        claim: &AuthClaim,
        order_id: OrderId,
        amount: f64,
        method: &str,
    ) -> Result<(Payment, Order), EngineError> {
        let order = self.load_owned_order(claim, order_id).await?;

        if !order.status.can_pay() {
            return Err(EngineError::InvalidState {
                action: "paid",
                current: order.status,
                required: "Pending",
            });
        }

        if !amount.is_finite() || amount <= 0.0 {
            return Err(EngineError::InvalidInput(
                "Invalid payment amount".to_string(),
            ));
        }
        let provided = Money::from_dollars_f64(amount);
        if provided != order.total {
            return Err(EngineError::InvalidAmount {
                required: order.total,
                provided,
            });
        }

        let method = PaymentMethod::parse(method).ok_or_else(|| {
            EngineError::InvalidInput(format!(
                "Invalid payment method: {method}. Valid methods: {}",
                PaymentMethod::ALL.map(|m| m.as_str()).join(", ")
            ))
        })?;

        // Unit of work: payment record first (reversible), then the
        // conditional status flip. Losing the flip removes the record again.
        let now = Utc::now();
        let payment = self
            .store
            .insert_payment(Payment::new(
                order.id,
                provided,
                method,
                reference::transaction_id(),
                now,
            ))
            .await?;

        let order = match self
            .store
            .transition_order(order.id, OrderStatus::Pending, OrderStatus::Paid, now)
            .await
        {
            Ok(order) => order,
            Err(e) => {
                if let Err(undo) = self.store.remove_payment(payment.id).await {
                    tracing::error!(payment_id = %payment.id, error = %undo,
                        "failed to remove payment after lost transition");
                    return Err(EngineError::Inconsistent {
                        detail: format!(
                            "payment {} recorded but order {} was not marked paid: {undo}",
                            payment.id, order.id
                        ),
                    });
                }
                return Err(match e {
                    StoreError::TransitionConflict { current } => EngineError::Conflict(format!(
                        "order was updated concurrently; status is now {current}"
                    )),
                    other => other.into(),
                });
            }
        };

        metrics::counter!("orders_paid_total").increment(1);
        tracing::info!(order_id = %order.id, transaction_id = %payment.transaction_id, "payment recorded");
        Ok((payment, order))
    }

    /// Marks a `Paid` order as `Fulfilled`. Administrators only.
    #[tracing::instrument(skip(self, claim), fields(identity = %claim.identity))]
    pub async fn fulfill_order(
        &self,
        claim: &AuthClaim,
        order_id: OrderId,
    ) -> Result<Order, EngineError> {
        if !claim.is_admin() {
            return Err(EngineError::Forbidden);
        }

        let order = self
            .store
            .find_order(order_id)
            .await?
            .ok_or(EngineError::OrderNotFound(order_id))?;

        if !order.status.can_fulfill() {
            return Err(EngineError::InvalidState {
                action: "fulfilled",
                current: order.status,
                required: "Paid",
            });
        }

        let order = self
            .store
            .transition_order(order.id, OrderStatus::Paid, OrderStatus::Fulfilled, Utc::now())
            .await
            .map_err(|e| match e {
                StoreError::TransitionConflict { current } => EngineError::Conflict(format!(
                    "order was updated concurrently; status is now {current}"
                )),
                other => other.into(),
            })?;

        metrics::counter!("orders_fulfilled_total").increment(1);
        tracing::info!(order_id = %order.id, "order fulfilled");
        Ok(order)
    }

    /// Cancels an order, restoring its reserved stock.
    ///
    /// Customers may cancel their own `Pending` orders; administrators may
    /// also cancel `Paid` ones. Stock restoration and the status flip commit
    /// together: if the flip loses a race the restorations are reversed, and
    /// a failed reversal (restored stock already resold) is reported as a
    /// fatal inconsistency.
    #[tracing::instrument(skip(self, claim), fields(identity = %claim.identity))]
    pub async fn cancel_order(
        &self,
        claim: &AuthClaim,
        order_id: OrderId,
    ) -> Result<Order, EngineError> {
        let order = self.load_owned_order(claim, order_id).await?;

        if claim.is_admin() {
            if !order.status.can_cancel() {
                return Err(EngineError::InvalidState {
                    action: "cancelled",
                    current: order.status,
                    required: "Pending or Paid",
                });
            }
        } else if order.status != OrderStatus::Pending {
            // Customers cannot cancel paid orders.
            return Err(EngineError::InvalidState {
                action: "cancelled",
                current: order.status,
                required: "Pending",
            });
        }

        let mut restored: Vec<(Sku, u32)> = Vec::with_capacity(order.items.len());
        for item in &order.items {
            match self.store.adjust_stock(&item.sku, item.qty as i64).await {
                Ok(_) => restored.push((item.sku.clone(), item.qty)),
                Err(e) => {
                    self.reclaim_stock(&restored).await?;
                    return Err(e.into());
                }
            }
        }

        let observed = order.status;
        let order = match self
            .store
            .transition_order(order.id, observed, OrderStatus::Cancelled, Utc::now())
            .await
        {
            Ok(order) => order,
            Err(e) => {
                self.reclaim_stock(&restored).await?;
                return Err(match e {
                    StoreError::TransitionConflict { current } => EngineError::Conflict(format!(
                        "order was updated concurrently; status is now {current}"
                    )),
                    other => other.into(),
                });
            }
        };

        metrics::counter!("orders_cancelled_total").increment(1);
        tracing::info!(order_id = %order.id, "order cancelled, stock restored");
        Ok(order)
    }

    /// Loads one order, enforcing that non-admin callers own it.
    #[tracing::instrument(skip(self, claim), fields(identity = %claim.identity))]
    pub async fn get_order(
        &self,
        claim: &AuthClaim,
        order_id: OrderId,
    ) -> Result<Order, EngineError> {
        self.load_owned_order(claim, order_id).await
    }

    /// Lists orders, newest first. Administrators see everything; customers
    /// see only their own.
    #[tracing::instrument(skip(self, claim), fields(identity = %claim.identity))]
    pub async fn list_orders(&self, claim: &AuthClaim) -> Result<Vec<Order>, EngineError> {
        let filter = if claim.is_admin() {
            OrderFilter::all()
        } else {
            let customer = self.resolve_customer(claim).await?;
            OrderFilter::for_customer(customer.id)
        };
        Ok(self.store.list_orders(filter).await?)
    }

    async fn resolve_customer(&self, claim: &AuthClaim) -> Result<Customer, EngineError> {
        self.store
            .find_by_identity(&claim.identity)
            .await?
            .ok_or_else(|| EngineError::CustomerNotFound {
                identity: claim.identity.clone(),
            })
    }

    /// Loads an order and checks the caller may act on it: admins always,
    /// customers only on their own orders.
    async fn load_owned_order(
        &self,
        claim: &AuthClaim,
        order_id: OrderId,
    ) -> Result<Order, EngineError> {
        let order = self
            .store
            .find_order(order_id)
            .await?
            .ok_or(EngineError::OrderNotFound(order_id))?;

        if !claim.is_admin() {
            let owns = self
                .store
                .find_by_identity(&claim.identity)
                .await?
                .is_some_and(|c| c.id == order.customer);
            if !owns {
                return Err(EngineError::Forbidden);
            }
        }
        Ok(order)
    }

    /// Compensating action: returns reserved quantities to stock.
    async fn release_stock(&self, reserved: &[(Sku, u32)]) -> Result<(), EngineError> {
        for (sku, qty) in reserved {
            if let Err(e) = self.store.adjust_stock(sku, *qty as i64).await {
                tracing::error!(%sku, qty, error = %e, "stock release failed");
                return Err(EngineError::Inconsistent {
                    detail: format!("failed to release {qty} reserved units of {sku}: {e}"),
                });
            }
        }
        Ok(())
    }

    /// Compensating action for a failed cancellation: takes back quantities
    /// that were already restored. This can itself fail if the restored
    /// stock was sold in the meantime, which is a real inconsistency and is
    /// reported as such.
    async fn reclaim_stock(&self, restored: &[(Sku, u32)]) -> Result<(), EngineError> {
        for (sku, qty) in restored {
            if let Err(e) = self.store.adjust_stock(sku, -(*qty as i64)).await {
                tracing::error!(%sku, qty, error = %e, "stock reclaim failed");
                return Err(EngineError::Inconsistent {
                    detail: format!("failed to reclaim {qty} restored units of {sku}: {e}"),
                });
            }
        }
        Ok(())
    }
}
