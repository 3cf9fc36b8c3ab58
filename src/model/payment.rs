//! Payment shapes owned by the payment service.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::PENDING_STATUS;

/// Payment status. Terminal once set; the gateway never transitions it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Paid,
    Canceled,
}

/// A payment as returned by the payment service, also embedded verbatim
/// in rental views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub payment_uid: Uuid,
    pub status: PaymentStatus,
    pub price: i64,
}

/// Payload for payment creation.
///
/// `payment_uid` is the gateway-minted idempotency key; omitted on plain
/// live calls where the backend mints its own.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_uid: Option<Uuid>,
    pub price: i64,
}

/// Acknowledgment for a payment creation deferred to the retry queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentAck {
    pub payment_uid: Uuid,
    pub status: String,
    pub price: i64,
}

impl PaymentAck {
    pub fn pending(payment_uid: Uuid, price: i64) -> Self {
        Self {
            payment_uid,
            status: PENDING_STATUS.to_string(),
            price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_status_uses_upper_snake_names() {
        assert_eq!(serde_json::to_string(&PaymentStatus::Paid).unwrap(), "\"PAID\"");
        assert_eq!(
            serde_json::to_string(&PaymentStatus::Canceled).unwrap(),
            "\"CANCELED\""
        );
    }

    #[test]
    fn create_request_omits_absent_idempotency_key() {
        let plain = CreatePaymentRequest {
            payment_uid: None,
            price: 100,
        };
        let value = serde_json::to_value(plain).unwrap();
        assert!(value.get("paymentUid").is_none());

        let keyed = CreatePaymentRequest {
            payment_uid: Some(Uuid::new_v4()),
            price: 100,
        };
        let value = serde_json::to_value(keyed).unwrap();
        assert!(value.get("paymentUid").is_some());
    }

    #[test]
    fn pending_ack_carries_the_marker_status() {
        let ack = PaymentAck::pending(Uuid::new_v4(), 250);
        let value = serde_json::to_value(ack).unwrap();
        assert_eq!(value["status"], "PENDING");
        assert_eq!(value["price"], 250);
    }
}
