use common::OrderId;
use domain::{Money, OrderStatus, Sku};
use store::StoreError;
use thiserror::Error;

/// Errors returned by the order lifecycle engine.
///
/// Business-rule failures are detected before any mutation; `Store` and
/// `Inconsistent` are the only variants that can follow a partial attempt,
/// and both imply every applied effect was reversed (or, for
/// `Inconsistent`, that a reversal itself failed and the stores need
/// operator attention).
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed or missing request fields.
    #[error("{0}")]
    InvalidInput(String),

    /// The requesting identity has no customer record.
    #[error("Customer not found for identity {identity}")]
    CustomerNotFound { identity: String },

    /// A requested sku does not exist in the catalog.
    #[error("Product with SKU {sku} not found")]
    ProductNotFound { sku: Sku },

    /// The referenced order does not exist.
    #[error("Order not found: {0}")]
    OrderNotFound(OrderId),

    /// The caller is not allowed to act on this order.
    #[error("Access denied")]
    Forbidden,

    /// Requested quantity exceeds the available stock.
    #[error("Insufficient stock for {sku}. Available: {available}, Requested: {requested}")]
    InsufficientStock {
        sku: Sku,
        available: i64,
        requested: u32,
    },

    /// The operation is not legal for the order's current status.
    #[error("Order cannot be {action}. Current status: {current}, required: {required}")]
    InvalidState {
        action: &'static str,
        current: OrderStatus,
        required: &'static str,
    },

    /// Payment amount does not exactly match the order total.
    #[error("Payment must exactly match order total. Required: {required}, provided: {provided}")]
    InvalidAmount { required: Money, provided: Money },

    /// Another operation changed the resource first; the caller may retry.
    #[error("Concurrent update lost: {0}")]
    Conflict(String),

    /// A compensating action failed; stock and order state may disagree.
    #[error("State reconciliation failed: {detail}")]
    Inconsistent { detail: String },

    /// Infrastructure failure in the store; the caller may retry.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}
