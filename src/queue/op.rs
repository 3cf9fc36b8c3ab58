//! The closed set of deferred mutating operations.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clients::Backend;

/// A mutating call deferred for replay.
///
/// Creation variants carry gateway-minted uids; the backends treat them as
/// idempotency keys, so a replay lands at most once.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum QueuedOperation {
    CreateRental {
        rental_uid: Uuid,
        payment_uid: Uuid,
        username: String,
        car_uid: Uuid,
        date_from: NaiveDate,
        date_to: NaiveDate,
    },
    CancelRental {
        rental_uid: Uuid,
        username: String,
    },
    FinishRental {
        rental_uid: Uuid,
        username: String,
    },
    ReleaseCar {
        car_uid: Uuid,
    },
    CreatePayment {
        payment_uid: Uuid,
        price: i64,
    },
    CancelPayment {
        payment_uid: Uuid,
    },
}

impl QueuedOperation {
    /// The queue this operation lives in: the backend owning its primary
    /// effect. Replay may still touch other backends through their own
    /// breakers.
    pub fn backend(&self) -> Backend {
        match self {
            QueuedOperation::CreateRental { .. }
            | QueuedOperation::CancelRental { .. }
            | QueuedOperation::FinishRental { .. } => Backend::Rental,
            QueuedOperation::ReleaseCar { .. } => Backend::Cars,
            QueuedOperation::CreatePayment { .. } | QueuedOperation::CancelPayment { .. } => {
                Backend::Payment
            }
        }
    }

    /// Identifier of the entity this operation mutates. Entries sharing a
    /// key replay in submission order.
    pub fn resource_key(&self) -> Uuid {
        match self {
            QueuedOperation::CreateRental { rental_uid, .. }
            | QueuedOperation::CancelRental { rental_uid, .. }
            | QueuedOperation::FinishRental { rental_uid, .. } => *rental_uid,
            QueuedOperation::ReleaseCar { car_uid } => *car_uid,
            QueuedOperation::CreatePayment { payment_uid, .. }
            | QueuedOperation::CancelPayment { payment_uid } => *payment_uid,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            QueuedOperation::CreateRental { .. } => "create_rental",
            QueuedOperation::CancelRental { .. } => "cancel_rental",
            QueuedOperation::FinishRental { .. } => "finish_rental",
            QueuedOperation::ReleaseCar { .. } => "release_car",
            QueuedOperation::CreatePayment { .. } => "create_payment",
            QueuedOperation::CancelPayment { .. } => "cancel_payment",
        }
    }
}
