//! Degraded response bodies served while a backend is unreachable.
//!
//! Every builder is stateless and immediate. Collections degrade to
//! empty, entity reads degrade to a body that keeps the identifier and
//! nulls the rest, so callers can tell "missing" from "unknown".

use serde_json::{json, Value};
use uuid::Uuid;

use crate::model::{CarInfo, CarPage, PENDING_STATUS};

/// Empty listing page echoing the requested pagination.
pub fn empty_car_page(page: u32, size: u32) -> CarPage {
    CarPage {
        page,
        page_size: size,
        total_elements: 0,
        items: Vec::new(),
    }
}

/// Car info placeholder for a car that is neither reachable nor cached.
pub fn unknown_car_info(car_uid: Uuid) -> CarInfo {
    CarInfo {
        car_uid,
        brand: String::new(),
        model: String::new(),
        registration_number: String::new(),
    }
}

/// Full car body with every field but the uid nulled.
pub fn unknown_car(car_uid: Uuid) -> Value {
    json!({
        "carUid": car_uid,
        "brand": "",
        "model": "",
        "registrationNumber": "",
        "power": null,
        "price": null,
        "type": null,
        "available": null,
    })
}

/// Rental body with every field but the uid nulled.
pub fn unknown_rental(rental_uid: Uuid) -> Value {
    json!({
        "rentalUid": rental_uid,
        "status": null,
        "dateFrom": null,
        "dateTo": null,
        "car": null,
        "payment": null,
    })
}

/// Payment body with every field but the uid nulled.
pub fn unknown_payment(payment_uid: Uuid) -> Value {
    json!({
        "paymentUid": payment_uid,
        "status": null,
        "price": null,
    })
}

/// Acknowledgment for a rental mutation accepted into the retry queue.
pub fn pending_rental_ack(rental_uid: Uuid) -> Value {
    json!({
        "rentalUid": rental_uid,
        "status": PENDING_STATUS,
    })
}
