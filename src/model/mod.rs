//! Wire types for the entities the gateway proxies.
//!
//! The gateway never persists these; it relays the representations the
//! backend services own. All JSON field names are camelCase to match the
//! backends' contracts.

pub mod car;
pub mod payment;
pub mod rental;

pub use car::{Car, CarInfo, CarPage, CarType};
pub use payment::{CreatePaymentRequest, Payment, PaymentAck, PaymentStatus};
pub use rental::{
    BackendRentalCreate, CreateRentalRequest, CreateRentalResponse, Rental, RentalAck,
    RentalStatus, RentalView,
};

/// Status marker carried by acknowledgments for queued writes.
pub const PENDING_STATUS: &str = "PENDING";
