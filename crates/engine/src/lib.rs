//! Order lifecycle engine.
//!
//! Orchestrates the product store, customer directory, order ledger and
//! payment recorder so that each operation — place, pay, fulfill, cancel —
//! takes effect as one all-or-nothing unit of work:
//!
//! - Stock is reserved and released exclusively through the store's
//!   conditional adjustment, so it can never go negative even when
//!   concurrent requests race past the advisory read-time check.
//! - Status transitions are single conditional writes; a lost race is
//!   reported as a conflict, never applied twice.
//! - Multi-record effects use compensating actions: the reversible write
//!   happens first and is undone if the second write fails. A failed
//!   compensation is surfaced as a fatal inconsistency, never hidden.
//!
//! All validation happens before the first mutation; a rejected operation
//! leaves the stores exactly as they were.

pub mod engine;
pub mod error;
pub mod reference;

pub use engine::{ItemRequest, OrderEngine};
pub use error::EngineError;
