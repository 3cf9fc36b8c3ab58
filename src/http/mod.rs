//! HTTP surface of the gateway.
//!
//! # Data Flow
//!
//! ```text
//! Inbound Request
//!     |
//!     v
//! server.rs (router + request-id / trace / timeout / body-limit layers)
//!     |
//!     v
//! handlers.rs (one operation per route, breaker-guarded backend calls)
//!     |
//!     +-- success ------> typed model response
//!     +-- backend 4xx --> error.rs (status preserved for the caller)
//!     +-- unavailable --> fallback.rs body, cache.rs hit, or a queued
//!                         operation acknowledged with 202 PENDING
//! ```
//!
//! # Design Decisions
//!
//! - Handlers never see raw transport errors; `guarded` collapses every
//!   backend call into ok / rejected / unavailable
//! - Backend unavailability never surfaces as a 5xx on this interface
//! - The car cache is advisory: populated on successful reads, consulted
//!   only when the cars service cannot answer

pub mod cache;
pub mod error;
pub mod fallback;
pub mod handlers;
pub mod server;

pub use cache::CarCache;
pub use error::ApiError;
pub use server::{AppState, GatewayServer};
