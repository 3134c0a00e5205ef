use domain::{OrderStatus, Sku};
use thiserror::Error;

/// Errors that can occur when interacting with the store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The referenced record does not exist.
    #[error("{kind} not found: {key}")]
    NotFound { kind: &'static str, key: String },

    /// A unique key (sku, email, order number) is already taken.
    #[error("{kind} already exists: {key}")]
    AlreadyExists { kind: &'static str, key: String },

    /// A conditional stock adjustment would have driven stock below zero.
    #[error("Insufficient stock for {sku}: {available} available")]
    InsufficientStock { sku: Sku, available: i64 },

    /// A conditional status transition matched zero rows: another operation
    /// changed the order first. Carries the status actually stored.
    #[error("Order status changed concurrently: now {current}")]
    TransitionConflict { current: OrderStatus },

    /// The requested transition is not legal in the state machine.
    #[error("Illegal order transition: {from} -> {to}")]
    IllegalTransition { from: OrderStatus, to: OrderStatus },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn not_found(kind: &'static str, key: impl ToString) -> Self {
        StoreError::NotFound {
            kind,
            key: key.to_string(),
        }
    }

    pub fn already_exists(kind: &'static str, key: impl ToString) -> Self {
        StoreError::AlreadyExists {
            kind,
            key: key.to_string(),
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
