use chrono::{DateTime, Utc};
use common::CustomerId;
use domain::OrderStatus;

/// Builder for filtering order listings.
///
/// Allows filtering by owning customer, status, and creation time range.
/// Results are always returned newest first.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    /// Filter by owning customer.
    pub customer: Option<CustomerId>,

    /// Filter by order status.
    pub status: Option<OrderStatus>,

    /// Filter by orders created at or after this timestamp.
    pub from: Option<DateTime<Utc>>,

    /// Filter by orders created at or before this timestamp.
    pub to: Option<DateTime<Utc>>,
}

impl OrderFilter {
    /// Creates an empty filter matching every order.
    pub fn all() -> Self {
        Self::default()
    }

    /// Creates a filter for one customer's orders.
    pub fn for_customer(customer: CustomerId) -> Self {
        Self {
            customer: Some(customer),
            ..Default::default()
        }
    }

    /// Filters by status.
    pub fn status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Filters by creation time at or after `from`.
    pub fn from(mut self, from: DateTime<Utc>) -> Self {
        self.from = Some(from);
        self
    }

    /// Filters by creation time at or before `to`.
    pub fn to(mut self, to: DateTime<Utc>) -> Self {
        self.to = Some(to);
        self
    }

    /// Returns true if the order matches the filter.
    pub fn matches(&self, order: &domain::Order) -> bool {
        if let Some(customer) = self.customer
            && order.customer != customer
        {
            return false;
        }
        if let Some(status) = self.status
            && order.status != status
        {
            return false;
        }
        if let Some(from) = self.from
            && order.created_at < from
        {
            return false;
        }
        if let Some(to) = self.to
            && order.created_at > to
        {
            return false;
        }
        true
    }
}
