//! Order records and their state machine.

use chrono::{DateTime, Utc};
use common::{CustomerId, OrderId};
use serde::{Deserialize, Serialize};

use crate::money::Money;
use crate::product::Sku;

/// The status of an order in its lifecycle.
///
/// Transitions:
/// ```text
/// Pending ──► Paid ──► Fulfilled
///    │          │
///    └──────────┴──► Cancelled
/// ```
///
/// `Fulfilled` and `Cancelled` are terminal. Every transition is applied as
/// a conditional write against the status observed by the caller, so a
/// transition can never be applied twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OrderStatus {
    /// Order has been placed and stock reserved, awaiting payment.
    #[default]
    Pending,

    /// Payment recorded, awaiting fulfillment.
    Paid,

    /// Order has been shipped/handed over (terminal).
    Fulfilled,

    /// Order was cancelled and its stock restored (terminal).
    Cancelled,
}

impl OrderStatus {
    /// Returns true if `self → to` is a legal transition.
    pub fn can_transition(&self, to: OrderStatus) -> bool {
        matches!(
            (self, to),
            (OrderStatus::Pending, OrderStatus::Paid)
                | (OrderStatus::Paid, OrderStatus::Fulfilled)
                | (OrderStatus::Pending, OrderStatus::Cancelled)
                | (OrderStatus::Paid, OrderStatus::Cancelled)
        )
    }

    /// Returns true if payment can be accepted in this status.
    pub fn can_pay(&self) -> bool {
        matches!(self, OrderStatus::Pending)
    }

    /// Returns true if the order can be fulfilled in this status.
    pub fn can_fulfill(&self) -> bool {
        matches!(self, OrderStatus::Paid)
    }

    /// Returns true if an administrator may cancel in this status.
    pub fn can_cancel(&self) -> bool {
        matches!(self, OrderStatus::Pending | OrderStatus::Paid)
    }

    /// Returns true if this is a terminal status.
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Fulfilled | OrderStatus::Cancelled)
    }

    /// Returns the status name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Paid => "Paid",
            OrderStatus::Fulfilled => "Fulfilled",
            OrderStatus::Cancelled => "Cancelled",
        }
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(OrderStatus::Pending),
            "Paid" => Ok(OrderStatus::Paid),
            "Fulfilled" => Ok(OrderStatus::Fulfilled),
            "Cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(format!("unknown order status: {other}")),
        }
    }
}

/// One entry in an order.
///
/// `name` and `price` are copied from the product at order time; historical
/// orders must not change when catalog prices change later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub sku: Sku,
    pub name: String,
    pub price: Money,
    pub qty: u32,
    pub line_total: Money,
}

impl LineItem {
    /// Creates a line item, computing the line total from price and quantity.
    pub fn new(sku: Sku, name: impl Into<String>, price: Money, qty: u32) -> Self {
        Self {
            sku,
            name: name.into(),
            price,
            qty,
            line_total: price.multiply(qty),
        }
    }
}

/// An order ledger record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub customer: CustomerId,
    pub order_number: String,
    pub items: Vec<LineItem>,
    pub total: Money,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    pub fulfilled_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

impl Order {
    /// Creates a new `Pending` order. The total is computed from the line
    /// items, never passed in, so it always equals the sum of line totals.
    pub fn new(
        customer: CustomerId,
        order_number: impl Into<String>,
        items: Vec<LineItem>,
        created_at: DateTime<Utc>,
    ) -> Self {
        let total = Self::total_of(&items);
        Self {
            id: OrderId::new(),
            customer,
            order_number: order_number.into(),
            items,
            total,
            status: OrderStatus::Pending,
            created_at,
            paid_at: None,
            fulfilled_at: None,
            cancelled_at: None,
        }
    }

    /// Sum of line totals.
    pub fn total_of(items: &[LineItem]) -> Money {
        items.iter().map(|item| item.line_total).sum()
    }

    /// Records a status transition, stamping the timestamp that belongs to
    /// the target status. Callers are expected to have verified legality.
    pub fn apply_transition(&mut self, to: OrderStatus, at: DateTime<Utc>) {
        self.status = to;
        match to {
            OrderStatus::Paid => self.paid_at = Some(at),
            OrderStatus::Fulfilled => self.fulfilled_at = Some(at),
            OrderStatus::Cancelled => self.cancelled_at = Some(at),
            OrderStatus::Pending => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn items() -> Vec<LineItem> {
        vec![
            LineItem::new(Sku::new("A-1"), "Widget", Money::from_cents(1999), 2),
            LineItem::new(Sku::new("B-2"), "Gadget", Money::from_cents(500), 1),
        ]
    }

    #[test]
    fn test_default_status_is_pending() {
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
    }

    #[test]
    fn test_legal_transitions() {
        assert!(OrderStatus::Pending.can_transition(OrderStatus::Paid));
        assert!(OrderStatus::Paid.can_transition(OrderStatus::Fulfilled));
        assert!(OrderStatus::Pending.can_transition(OrderStatus::Cancelled));
        assert!(OrderStatus::Paid.can_transition(OrderStatus::Cancelled));

        assert!(!OrderStatus::Pending.can_transition(OrderStatus::Fulfilled));
        assert!(!OrderStatus::Fulfilled.can_transition(OrderStatus::Cancelled));
        assert!(!OrderStatus::Cancelled.can_transition(OrderStatus::Pending));
        assert!(!OrderStatus::Cancelled.can_transition(OrderStatus::Cancelled));
    }

    #[test]
    fn test_status_predicates() {
        assert!(OrderStatus::Pending.can_pay());
        assert!(!OrderStatus::Paid.can_pay());

        assert!(OrderStatus::Paid.can_fulfill());
        assert!(!OrderStatus::Pending.can_fulfill());

        assert!(OrderStatus::Pending.can_cancel());
        assert!(OrderStatus::Paid.can_cancel());
        assert!(!OrderStatus::Fulfilled.can_cancel());

        assert!(OrderStatus::Fulfilled.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(!OrderStatus::Pending.is_terminal());
    }

    #[test]
    fn test_status_display_and_parse() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Paid,
            OrderStatus::Fulfilled,
            OrderStatus::Cancelled,
        ] {
            let parsed: OrderStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("Shipped".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_line_total_is_price_times_qty() {
        let item = LineItem::new(Sku::new("A-1"), "Widget", Money::from_cents(1999), 3);
        assert_eq!(item.line_total.cents(), 5997);
    }

    #[test]
    fn test_order_total_equals_sum_of_line_totals() {
        let order = Order::new(CustomerId::new(), "ORD-1", items(), Utc::now());
        assert_eq!(order.total, Order::total_of(&order.items));
        assert_eq!(order.total.cents(), 1999 * 2 + 500);
    }

    #[test]
    fn test_transition_stamps_matching_timestamp() {
        let mut order = Order::new(CustomerId::new(), "ORD-1", items(), Utc::now());
        let at = Utc::now();

        order.apply_transition(OrderStatus::Paid, at);
        assert_eq!(order.status, OrderStatus::Paid);
        assert_eq!(order.paid_at, Some(at));
        assert_eq!(order.fulfilled_at, None);
        assert_eq!(order.cancelled_at, None);
    }

    #[test]
    fn test_order_serialization_roundtrip() {
        let order = Order::new(CustomerId::new(), "ORD-1", items(), Utc::now());
        let json = serde_json::to_string(&order).unwrap();
        let back: Order = serde_json::from_str(&json).unwrap();
        assert_eq!(order, back);
    }
}
