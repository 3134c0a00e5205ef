//! Recorded payments.

use chrono::{DateTime, Utc};
use common::{OrderId, PaymentId};
use serde::{Deserialize, Serialize};

use crate::money::Money;

/// The fixed set of accepted payment methods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PaymentMethod {
    #[serde(rename = "Credit Card")]
    CreditCard,
    #[serde(rename = "Debit Card")]
    DebitCard,
    #[serde(rename = "PayPal")]
    PayPal,
    #[serde(rename = "Bank Transfer")]
    BankTransfer,
    #[serde(rename = "Cash")]
    Cash,
}

impl PaymentMethod {
    /// All accepted methods, for validation messages.
    pub const ALL: [PaymentMethod; 5] = [
        PaymentMethod::CreditCard,
        PaymentMethod::DebitCard,
        PaymentMethod::PayPal,
        PaymentMethod::BankTransfer,
        PaymentMethod::Cash,
    ];

    /// Returns the wire/display name of the method.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::CreditCard => "Credit Card",
            PaymentMethod::DebitCard => "Debit Card",
            PaymentMethod::PayPal => "PayPal",
            PaymentMethod::BankTransfer => "Bank Transfer",
            PaymentMethod::Cash => "Cash",
        }
    }

    /// Parses a wire name; `None` for anything outside the fixed set.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|m| m.as_str() == s)
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A recorded payment attempt.
///
/// Created exclusively by the pay operation while the order is `Pending`;
/// never mutated. At most one exists per order under normal flow — removal
/// only happens as a compensating action when the status flip loses a race.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub order: OrderId,
    pub amount: Money,
    pub method: PaymentMethod,
    pub transaction_id: String,
    pub paid_at: DateTime<Utc>,
}

impl Payment {
    /// Creates a payment record with a fresh id.
    pub fn new(
        order: OrderId,
        amount: Money,
        method: PaymentMethod,
        transaction_id: impl Into<String>,
        paid_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: PaymentId::new(),
            order,
            amount,
            method,
            transaction_id: transaction_id.into(),
            paid_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_exact_wire_names() {
        assert_eq!(
            PaymentMethod::parse("Credit Card"),
            Some(PaymentMethod::CreditCard)
        );
        assert_eq!(PaymentMethod::parse("Cash"), Some(PaymentMethod::Cash));
        assert_eq!(PaymentMethod::parse("credit card"), None);
        assert_eq!(PaymentMethod::parse("Bitcoin"), None);
    }

    #[test]
    fn test_serializes_as_wire_name() {
        let json = serde_json::to_string(&PaymentMethod::BankTransfer).unwrap();
        assert_eq!(json, "\"Bank Transfer\"");
        let back: PaymentMethod = serde_json::from_str(&json).unwrap();
        assert_eq!(back, PaymentMethod::BankTransfer);
    }
}
