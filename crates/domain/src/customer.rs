//! Customer directory records.

use common::CustomerId;
use serde::{Deserialize, Serialize};

/// A customer record.
///
/// Created and maintained independently of orders; orders hold the id as a
/// weak reference and never manage the customer's lifecycle. `email` doubles
/// as the authentication identity and is unique in the directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: CustomerId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
}

impl Customer {
    /// Creates a customer with a fresh id and a lowercased email.
    pub fn new(
        name: impl Into<String>,
        email: impl AsRef<str>,
        phone: impl Into<String>,
        address: impl Into<String>,
    ) -> Self {
        Self {
            id: CustomerId::new(),
            name: name.into(),
            email: email.as_ref().trim().to_lowercase(),
            phone: phone.into(),
            address: address.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_is_normalized() {
        let customer = Customer::new("Ada", " Ada@Example.COM ", "", "");
        assert_eq!(customer.email, "ada@example.com");
    }
}
