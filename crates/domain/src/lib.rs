//! Data model for the order-management service.
//!
//! This crate holds the plain domain records shared by the storage layer,
//! the order lifecycle engine, and the HTTP surface:
//! - `Money` — exact integer-cents amounts
//! - `Product` / `Sku` — the catalog
//! - `Customer` — the customer directory record
//! - `Order` / `OrderStatus` / `LineItem` — the order ledger record and its
//!   state machine
//! - `Payment` / `PaymentMethod` — recorded payment attempts
//! - `AuthClaim` / `Role` — the identity claim supplied by the boundary

pub mod auth;
pub mod customer;
pub mod money;
pub mod order;
pub mod payment;
pub mod product;

pub use auth::{AuthClaim, Role};
pub use customer::Customer;
pub use money::Money;
pub use order::{LineItem, Order, OrderStatus};
pub use payment::{Payment, PaymentMethod};
pub use product::{Product, ProductUpdate, Sku};
