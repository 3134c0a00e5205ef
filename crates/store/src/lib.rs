//! Storage layer for the order-management service.
//!
//! The store is the single source of truth and the only shared mutable
//! resource; multiple server instances may run against it concurrently, so
//! every cross-record invariant (stock non-negativity, status transition
//! legality) is enforced here through atomic conditional updates rather than
//! in-process locks:
//!
//! - [`ProductStore::adjust_stock`] applies a delta only when the result
//!   stays non-negative, and reports the available quantity on failure.
//! - [`OrderLedger::transition_order`] flips the status only when the stored
//!   status still matches the one the caller observed, and reports the
//!   actual status on a lost race.
//!
//! Two implementations are provided: [`MemoryStore`] for tests and
//! development, and [`PostgresStore`] backed by `sqlx`.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use postgres::PostgresStore;
pub use query::OrderFilter;
pub use store::{CustomerDirectory, OrderLedger, PaymentRecorder, ProductStore, Store};
