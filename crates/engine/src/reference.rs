//! Human-readable reference generation for orders and payments.

use chrono::Utc;
use uuid::Uuid;

/// Generates an order number of the form `ORD-<epoch millis>-<5 chars>`.
///
/// Uniqueness is best-effort (collision probability negligible, not
/// cryptographically guaranteed); the ledger's unique index is the backstop.
pub fn order_number() -> String {
    format!("ORD-{}-{}", Utc::now().timestamp_millis(), suffix(5))
}

/// Generates a payment transaction id of the form `TXN-<epoch millis>-<8 chars>`.
pub fn transaction_id() -> String {
    format!("TXN-{}-{}", Utc::now().timestamp_millis(), suffix(8))
}

fn suffix(len: usize) -> String {
    Uuid::new_v4().simple().to_string()[..len].to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_order_number_shape() {
        let number = order_number();
        let parts: Vec<_> = number.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "ORD");
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 5);
    }

    #[test]
    fn test_transaction_id_shape() {
        let id = transaction_id();
        assert!(id.starts_with("TXN-"));
        assert_eq!(id.split('-').nth(2).unwrap().len(), 8);
    }

    #[test]
    fn test_references_differ() {
        assert_ne!(order_number(), order_number());
        assert_ne!(transaction_id(), transaction_id());
    }
}
