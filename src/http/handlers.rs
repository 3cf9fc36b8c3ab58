//! One handler per gateway operation.
//!
//! Every backend call runs through [`guarded`], which folds breaker
//! admission, outcome recording, and error classification into one
//! three-way result. Handlers then decide per operation what a degraded
//! answer looks like: an empty collection, a cached or nulled entity, or
//! a queued operation acknowledged with `202 PENDING`.

use std::future::Future;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::clients::{Backend, CallError};
use crate::http::error::ApiError;
use crate::http::fallback;
use crate::http::server::AppState;
use crate::model::{
    BackendRentalCreate, CarInfo, CreatePaymentRequest, CreateRentalRequest,
    CreateRentalResponse, Payment, PaymentAck, Rental, RentalAck, RentalView,
};
use crate::observability::metrics;
use crate::queue::QueuedOperation;

/// Outcome of one breaker-guarded backend call.
enum CallOutcome<T> {
    Ok(T),
    /// The backend processed the request and said no (4xx).
    Rejected(ApiError),
    /// Open breaker or transient failure; the caller degrades or queues.
    Unavailable,
}

async fn guarded<T, F>(state: &AppState, backend: Backend, call: F) -> CallOutcome<T>
where
    F: Future<Output = Result<T, CallError>>,
{
    let breaker = state.breakers.get(backend);
    if !breaker.allow() {
        tracing::debug!(backend = %backend, "Call rejected by open breaker");
        return CallOutcome::Unavailable;
    }
    let result = call.await;
    breaker.record_call(&result);
    match result {
        Ok(value) => CallOutcome::Ok(value),
        Err(CallError::Status { status, message }) if status < 500 => {
            CallOutcome::Rejected(match status {
                404 => ApiError::NotFound(message),
                _ => ApiError::Upstream { status, message },
            })
        }
        Err(err) => {
            tracing::warn!(backend = %backend, error = %err, "Backend call failed");
            CallOutcome::Unavailable
        }
    }
}

fn require_username(headers: &HeaderMap) -> Result<String, ApiError> {
    headers
        .get("X-User-Name")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(ToOwned::to_owned)
        .ok_or(ApiError::MissingUserName)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    page: Option<u32>,
    size: Option<u32>,
    show_all: Option<bool>,
}

impl PageQuery {
    fn validated(&self) -> Result<(u32, u32, bool), ApiError> {
        let page = self.page.unwrap_or(1);
        let size = self.size.unwrap_or(10);
        if page < 1 {
            return Err(ApiError::Validation("page must be at least 1".into()));
        }
        if !(1..=100).contains(&size) {
            return Err(ApiError::Validation(
                "size must be between 1 and 100".into(),
            ));
        }
        Ok((page, size, self.show_all.unwrap_or(false)))
    }
}

// --- Cars ---

pub async fn list_cars(
    State(state): State<AppState>,
    Query(query): Query<PageQuery>,
) -> Result<Response, ApiError> {
    let (page, size, show_all) = query.validated()?;
    match guarded(
        &state,
        Backend::Cars,
        state.backends.cars.list(page, size, show_all),
    )
    .await
    {
        CallOutcome::Ok(cars) => {
            state.cache.insert_all(&cars.items);
            Ok(Json(cars).into_response())
        }
        CallOutcome::Rejected(err) => Err(err),
        CallOutcome::Unavailable => {
            metrics::fallback("cars", "list_cars");
            Ok(Json(fallback::empty_car_page(page, size)).into_response())
        }
    }
}

pub async fn get_car(
    State(state): State<AppState>,
    Path(car_uid): Path<Uuid>,
) -> Result<Response, ApiError> {
    match guarded(&state, Backend::Cars, state.backends.cars.get(car_uid)).await {
        CallOutcome::Ok(car) => {
            state.cache.insert(car.clone());
            Ok(Json(car).into_response())
        }
        CallOutcome::Rejected(err) => Err(err),
        CallOutcome::Unavailable => {
            metrics::fallback("cars", "get_car");
            match state.cache.get(car_uid) {
                Some(car) => Ok(Json(car).into_response()),
                None => Ok(Json(fallback::unknown_car(car_uid)).into_response()),
            }
        }
    }
}

// --- Rentals ---

pub async fn list_rentals(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let username = require_username(&headers)?;
    match guarded(
        &state,
        Backend::Rental,
        state.backends.rental.list(&username),
    )
    .await
    {
        CallOutcome::Ok(rentals) => {
            let mut views = Vec::with_capacity(rentals.len());
            for rental in rentals {
                views.push(rental_view(&state, rental).await);
            }
            Ok(Json(views).into_response())
        }
        CallOutcome::Rejected(err) => Err(err),
        CallOutcome::Unavailable => {
            metrics::fallback("rental", "list_rentals");
            Ok(Json(Vec::<RentalView>::new()).into_response())
        }
    }
}

pub async fn get_rental(
    State(state): State<AppState>,
    Path(rental_uid): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let username = require_username(&headers)?;
    match guarded(
        &state,
        Backend::Rental,
        state.backends.rental.get(rental_uid, &username),
    )
    .await
    {
        CallOutcome::Ok(rental) => Ok(Json(rental_view(&state, rental).await).into_response()),
        CallOutcome::Rejected(err) => Err(err),
        CallOutcome::Unavailable => {
            metrics::fallback("rental", "get_rental");
            Ok(Json(fallback::unknown_rental(rental_uid)).into_response())
        }
    }
}

pub async fn create_rental(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<CreateRentalRequest>,
) -> Result<Response, ApiError> {
    let username = require_username(&headers)?;
    if request.date_to < request.date_from {
        return Err(ApiError::Validation(
            "dateTo must not precede dateFrom".into(),
        ));
    }

    // Identifiers are minted before the first backend call; a queued
    // replay re-sends them, so partial work converges instead of doubling.
    let rental_uid = Uuid::new_v4();
    let payment_uid = Uuid::new_v4();

    let queued = || {
        state.queues.enqueue(QueuedOperation::CreateRental {
            rental_uid,
            payment_uid,
            username: username.clone(),
            car_uid: request.car_uid,
            date_from: request.date_from,
            date_to: request.date_to,
        });
        metrics::fallback("rental", "create_rental");
        (
            StatusCode::ACCEPTED,
            Json(RentalAck::pending(rental_uid, &request)),
        )
            .into_response()
    };

    // 1. Car lookup, the price basis. A cached car is good enough to
    //    price the rental when the cars service cannot answer.
    let car = match guarded(
        &state,
        Backend::Cars,
        state.backends.cars.get(request.car_uid),
    )
    .await
    {
        CallOutcome::Ok(car) => {
            state.cache.insert(car.clone());
            car
        }
        CallOutcome::Rejected(err) => return Err(err),
        CallOutcome::Unavailable => match state.cache.get(request.car_uid) {
            Some(car) => {
                metrics::fallback("cars", "create_rental_price");
                car
            }
            None => return Ok(queued()),
        },
    };
    let price = (request.date_to - request.date_from).num_days() * car.price;

    // 2. Create the payment.
    let payment_request = CreatePaymentRequest {
        payment_uid: Some(payment_uid),
        price,
    };
    let payment = match guarded(
        &state,
        Backend::Payment,
        state.backends.payment.create(&payment_request),
    )
    .await
    {
        CallOutcome::Ok(payment) => payment,
        CallOutcome::Rejected(err) => return Err(err),
        CallOutcome::Unavailable => return Ok(queued()),
    };

    // 3. Hold the car.
    match guarded(
        &state,
        Backend::Cars,
        state.backends.cars.set_availability(request.car_uid, false),
    )
    .await
    {
        CallOutcome::Ok(()) => {}
        CallOutcome::Rejected(err) => {
            cancel_payment_or_queue(&state, payment_uid).await;
            return Err(err);
        }
        CallOutcome::Unavailable => return Ok(queued()),
    }

    // 4. Record the rental.
    let backend_request = BackendRentalCreate {
        rental_uid: Some(rental_uid),
        username: username.clone(),
        payment_uid,
        car_uid: request.car_uid,
        date_from: request.date_from,
        date_to: request.date_to,
    };
    let rental = match guarded(
        &state,
        Backend::Rental,
        state.backends.rental.create(&backend_request),
    )
    .await
    {
        CallOutcome::Ok(rental) => rental,
        CallOutcome::Rejected(err) => {
            release_car_or_queue(&state, request.car_uid).await;
            cancel_payment_or_queue(&state, payment_uid).await;
            return Err(err);
        }
        CallOutcome::Unavailable => return Ok(queued()),
    };

    Ok(Json(CreateRentalResponse {
        rental_uid: rental.rental_uid,
        status: rental.status,
        car_uid: rental.car_uid,
        date_from: rental.date_from,
        date_to: rental.date_to,
        payment,
    })
    .into_response())
}

pub async fn cancel_rental(
    State(state): State<AppState>,
    Path(rental_uid): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let username = require_username(&headers)?;

    let queued = || {
        state.queues.enqueue(QueuedOperation::CancelRental {
            rental_uid,
            username: username.clone(),
        });
        metrics::fallback("rental", "cancel_rental");
        (
            StatusCode::ACCEPTED,
            Json(fallback::pending_rental_ack(rental_uid)),
        )
            .into_response()
    };

    // 1. Fetch for the compensation targets.
    let rental = match guarded(
        &state,
        Backend::Rental,
        state.backends.rental.get(rental_uid, &username),
    )
    .await
    {
        CallOutcome::Ok(rental) => rental,
        CallOutcome::Rejected(err) => return Err(err),
        CallOutcome::Unavailable => return Ok(queued()),
    };

    // 2. Cancel the rental itself.
    match guarded(
        &state,
        Backend::Rental,
        state.backends.rental.cancel(rental_uid),
    )
    .await
    {
        CallOutcome::Ok(()) => {}
        CallOutcome::Rejected(err) => return Err(err),
        CallOutcome::Unavailable => return Ok(queued()),
    }

    // 3. Release the car and the money; queue-backed, never fail the response.
    release_car_or_queue(&state, rental.car_uid).await;
    cancel_payment_or_queue(&state, rental.payment_uid).await;

    Ok(StatusCode::NO_CONTENT.into_response())
}

pub async fn finish_rental(
    State(state): State<AppState>,
    Path(rental_uid): Path<Uuid>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let username = require_username(&headers)?;

    let queued = || {
        state.queues.enqueue(QueuedOperation::FinishRental {
            rental_uid,
            username: username.clone(),
        });
        metrics::fallback("rental", "finish_rental");
        (
            StatusCode::ACCEPTED,
            Json(fallback::pending_rental_ack(rental_uid)),
        )
            .into_response()
    };

    let rental = match guarded(
        &state,
        Backend::Rental,
        state.backends.rental.get(rental_uid, &username),
    )
    .await
    {
        CallOutcome::Ok(rental) => rental,
        CallOutcome::Rejected(err) => return Err(err),
        CallOutcome::Unavailable => return Ok(queued()),
    };

    match guarded(
        &state,
        Backend::Rental,
        state.backends.rental.finish(rental_uid),
    )
    .await
    {
        CallOutcome::Ok(()) => {}
        CallOutcome::Rejected(err) => return Err(err),
        CallOutcome::Unavailable => return Ok(queued()),
    }

    // The payment stays PAID on finish; only the car returns to the pool.
    release_car_or_queue(&state, rental.car_uid).await;

    Ok(StatusCode::NO_CONTENT.into_response())
}

// --- Payments ---

pub async fn create_payment(
    State(state): State<AppState>,
    Json(request): Json<CreatePaymentRequest>,
) -> Result<Response, ApiError> {
    if request.price < 0 {
        return Err(ApiError::Validation("price must not be negative".into()));
    }
    // A caller-supplied uid doubles as an idempotency key; absent one,
    // the gateway mints it so a queued replay stays exactly-once.
    let payment_uid = request.payment_uid.unwrap_or_else(Uuid::new_v4);
    let backend_request = CreatePaymentRequest {
        payment_uid: Some(payment_uid),
        price: request.price,
    };
    match guarded(
        &state,
        Backend::Payment,
        state.backends.payment.create(&backend_request),
    )
    .await
    {
        CallOutcome::Ok(payment) => Ok(Json(payment).into_response()),
        CallOutcome::Rejected(err) => Err(err),
        CallOutcome::Unavailable => {
            state.queues.enqueue(QueuedOperation::CreatePayment {
                payment_uid,
                price: request.price,
            });
            metrics::fallback("payment", "create_payment");
            Ok((
                StatusCode::ACCEPTED,
                Json(PaymentAck::pending(payment_uid, request.price)),
            )
                .into_response())
        }
    }
}

pub async fn get_payment(
    State(state): State<AppState>,
    Path(payment_uid): Path<Uuid>,
) -> Result<Response, ApiError> {
    match guarded(
        &state,
        Backend::Payment,
        state.backends.payment.get(payment_uid),
    )
    .await
    {
        CallOutcome::Ok(payment) => Ok(Json(payment).into_response()),
        CallOutcome::Rejected(err) => Err(err),
        CallOutcome::Unavailable => {
            metrics::fallback("payment", "get_payment");
            Ok(Json(fallback::unknown_payment(payment_uid)).into_response())
        }
    }
}

// --- Enrichment ---

async fn rental_view(state: &AppState, rental: Rental) -> RentalView {
    let car = car_info(state, rental.car_uid).await;
    let payment = payment_info(state, rental.payment_uid).await;
    RentalView {
        rental_uid: rental.rental_uid,
        status: rental.status,
        date_from: rental.date_from,
        date_to: rental.date_to,
        car,
        payment,
    }
}

async fn car_info(state: &AppState, car_uid: Uuid) -> CarInfo {
    match guarded(state, Backend::Cars, state.backends.cars.get(car_uid)).await {
        CallOutcome::Ok(car) => {
            state.cache.insert(car.clone());
            CarInfo::from(&car)
        }
        _ => {
            metrics::fallback("cars", "car_info");
            state
                .cache
                .get(car_uid)
                .map(|car| CarInfo::from(&car))
                .unwrap_or_else(|| fallback::unknown_car_info(car_uid))
        }
    }
}

async fn payment_info(state: &AppState, payment_uid: Uuid) -> Option<Payment> {
    match guarded(
        state,
        Backend::Payment,
        state.backends.payment.get(payment_uid),
    )
    .await
    {
        CallOutcome::Ok(payment) => Some(payment),
        _ => {
            metrics::fallback("payment", "payment_info");
            None
        }
    }
}

// --- Compensations ---

/// Put a car back into the pool; if the cars service is down, the
/// release is queued rather than lost.
async fn release_car_or_queue(state: &AppState, car_uid: Uuid) {
    match guarded(
        state,
        Backend::Cars,
        state.backends.cars.set_availability(car_uid, true),
    )
    .await
    {
        CallOutcome::Ok(()) => {}
        CallOutcome::Rejected(err) => {
            tracing::warn!(car_uid = %car_uid, error = %err, "Car release rejected");
        }
        CallOutcome::Unavailable => {
            state
                .queues
                .enqueue(QueuedOperation::ReleaseCar { car_uid });
        }
    }
}

async fn cancel_payment_or_queue(state: &AppState, payment_uid: Uuid) {
    match guarded(
        state,
        Backend::Payment,
        state.backends.payment.cancel(payment_uid),
    )
    .await
    {
        CallOutcome::Ok(()) => {}
        CallOutcome::Rejected(err) => {
            tracing::warn!(payment_uid = %payment_uid, error = %err, "Payment cancel rejected");
        }
        CallOutcome::Unavailable => {
            state
                .queues
                .enqueue(QueuedOperation::CancelPayment { payment_uid });
        }
    }
}

// --- Manage ---

pub async fn manage_health(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.health.report())
}

pub async fn manage_breakers(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.breakers.snapshots())
}

pub async fn manage_queue(State(state): State<AppState>) -> impl IntoResponse {
    let queues: Vec<_> = Backend::ALL
        .iter()
        .map(|backend| {
            let queue = state.queues.get(*backend);
            json!({
                "backend": backend.name(),
                "depth": queue.depth(),
                "dropped": queue.dropped(),
            })
        })
        .collect();
    Json(json!({
        "queues": queues,
        "deadLetters": {
            "total": state.dead_letters.total(),
            "records": state.dead_letters.snapshot(),
        },
    }))
}

pub async fn manage_cache(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "entries": state.cache.len(),
        "cars": state.cache.snapshot(),
    }))
}
