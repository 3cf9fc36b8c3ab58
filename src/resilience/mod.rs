//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Call to backend:
//!     → circuit_breaker.rs allow()? (short-circuit when the backend is down)
//!     → call runs with its own deadline (clients layer)
//!     → record_success()/record_failure() feed the sliding window
//!
//! Deferred write replay:
//!     → backoff.rs schedules the next attempt (exponential + jitter)
//! ```
//!
//! # Design Decisions
//! - One breaker per backend; no shared failure budget across backends
//! - Breaker state is driven only by call outcomes, never by health probes
//! - Breaker-open rejections are not call outcomes and never enter the window

pub mod backoff;
pub mod circuit_breaker;

pub use backoff::calculate_backoff;
pub use circuit_breaker::{
    BreakerSet, BreakerSettings, BreakerSnapshot, BreakerState, CircuitBreaker,
};
