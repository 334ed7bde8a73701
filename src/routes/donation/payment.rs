//! Payment-provider boundary. Settlement callbacks are not implemented;
//! this only mints the identifiers a gateway checkout needs and the hosted
//! payment URL to send the donor to.

use serde::Serialize;
use uuid::Uuid;

use crate::config::Config;

#[derive(Debug, Serialize)]
pub struct PaymentInitiation {
    pub payment_url: String,
    pub transaction_id: String,
    pub reference: String,
}

pub fn new_transaction_id() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("SAQ_{}", hex[..12].to_uppercase())
}

pub fn new_payment_reference() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("REF_{}", hex[..16].to_uppercase())
}

pub fn checkout(config: &Config, transaction_id: &str, reference: &str) -> PaymentInitiation {
    PaymentInitiation {
        payment_url: format!("{}/pay/{}", config.payment_gateway_url, reference),
        transaction_id: transaction_id.to_string(),
        reference: reference.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifiers_carry_their_prefixes() {
        let txn = new_transaction_id();
        assert!(txn.starts_with("SAQ_"));
        assert_eq!(txn.len(), 4 + 12);

        let reference = new_payment_reference();
        assert!(reference.starts_with("REF_"));
        assert_eq!(reference.len(), 4 + 16);
    }

    #[test]
    fn identifiers_are_unique_per_call() {
        assert_ne!(new_transaction_id(), new_transaction_id());
        assert_ne!(new_payment_reference(), new_payment_reference());
    }
}
