//! Typed REST clients for the three backend services.
//!
//! Every call is bounded by the configured timeout and classified on
//! return: transport errors and 5xx answers are transient (they feed the
//! circuit breaker), well-formed 4xx answers are the backend doing its
//! job and never count against it.

pub mod cars;
pub mod payment;
pub mod rental;

pub use cars::CarsClient;
pub use payment::PaymentClient;
pub use rental::RentalClient;

use std::fmt;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::config::GatewayConfig;

/// The backend dependencies fronted by the gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Cars,
    Rental,
    Payment,
}

impl Backend {
    pub const ALL: [Backend; 3] = [Backend::Cars, Backend::Rental, Backend::Payment];

    pub fn name(self) -> &'static str {
        match self {
            Backend::Cars => "cars",
            Backend::Rental => "rental",
            Backend::Payment => "payment",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A failed backend call.
#[derive(Debug, Error)]
pub enum CallError {
    #[error("call timed out")]
    Timeout,
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("backend answered {status}: {message}")]
    Status { status: u16, message: String },
    #[error("response body invalid: {0}")]
    Decode(String),
}

impl CallError {
    /// Whether this failure counts against the breaker window.
    pub fn is_transient(&self) -> bool {
        match self {
            CallError::Timeout | CallError::Connect(_) | CallError::Decode(_) => true,
            CallError::Status { status, .. } => *status >= 500,
        }
    }

    /// HTTP status of a well-formed backend answer, if there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            CallError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            CallError::Timeout
        } else {
            CallError::Connect(err.to_string())
        }
    }
}

/// Reject non-2xx answers, keeping a truncated body for the error report.
pub(crate) async fn check_status(
    response: reqwest::Response,
) -> Result<reqwest::Response, CallError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message: String = response
        .text()
        .await
        .unwrap_or_default()
        .chars()
        .take(200)
        .collect();
    Err(CallError::Status {
        status: status.as_u16(),
        message,
    })
}

pub(crate) async fn into_json<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, CallError> {
    let response = check_status(response).await?;
    response
        .json()
        .await
        .map_err(|err| CallError::Decode(err.to_string()))
}

/// The three clients sharing one pooled HTTP connection.
pub struct Backends {
    pub cars: CarsClient,
    pub rental: RentalClient,
    pub payment: PaymentClient,
}

impl Backends {
    pub fn from_config(config: &GatewayConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.backend_call_secs))
            .build()?;
        Ok(Self {
            cars: CarsClient::new(http.clone(), &config.backends.cars.base_url),
            rental: RentalClient::new(http.clone(), &config.backends.rental.base_url),
            payment: PaymentClient::new(http, &config.backends.payment.base_url),
        })
    }
}
