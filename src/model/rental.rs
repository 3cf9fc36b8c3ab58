//! Rental shapes: the rental service's records plus the enriched views the
//! gateway exposes.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{CarInfo, Payment, PENDING_STATUS};

/// Rental lifecycle status. Transitions are monotonic: IN_PROGRESS may
/// become FINISHED or CANCELED, never the reverse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RentalStatus {
    InProgress,
    Finished,
    Canceled,
}

/// A rental as returned by the rental service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rental {
    pub rental_uid: Uuid,
    pub username: String,
    pub payment_uid: Uuid,
    pub car_uid: Uuid,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub status: RentalStatus,
}

/// Payload sent to the rental service on creation.
///
/// `rental_uid` is the gateway-minted idempotency key so a replayed
/// creation lands at most once.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendRentalCreate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rental_uid: Option<Uuid>,
    pub username: String,
    pub payment_uid: Uuid,
    pub car_uid: Uuid,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
}

/// Inbound rental creation request; the renter name arrives in the
/// `X-User-Name` header, not the body.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRentalRequest {
    pub car_uid: Uuid,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
}

/// Response for a rental created live, payment included.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRentalResponse {
    pub rental_uid: Uuid,
    pub status: RentalStatus,
    pub car_uid: Uuid,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub payment: Payment,
}

/// Acknowledgment for a rental creation deferred to the retry queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RentalAck {
    pub rental_uid: Uuid,
    pub status: String,
    pub car_uid: Uuid,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
}

impl RentalAck {
    pub fn pending(rental_uid: Uuid, request: &CreateRentalRequest) -> Self {
        Self {
            rental_uid,
            status: PENDING_STATUS.to_string(),
            car_uid: request.car_uid,
            date_from: request.date_from,
            date_to: request.date_to,
        }
    }
}

/// Rental view the gateway returns: the rental record enriched with car
/// and payment details, each degrading independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RentalView {
    pub rental_uid: Uuid,
    pub status: RentalStatus,
    pub date_from: NaiveDate,
    pub date_to: NaiveDate,
    pub car: CarInfo,
    pub payment: Option<Payment>,
}
