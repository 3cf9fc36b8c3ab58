//! Backend health telemetry.
//!
//! # Data Flow
//! ```text
//! monitor.rs (interval ticker, GET {backend}/manage/health with timeout)
//!     → registry.rs (last outcome, latency, consecutive failures)
//!     → /manage/health (aggregate: ok unless a probe failed or went stale)
//! ```
//!
//! # Design Decisions
//! - Advisory only: probe results never gate routing and never feed the
//!   circuit breakers; live call outcomes are the breakers' only signal
//! - A dependency that was never probed reports "unknown" without
//!   degrading the aggregate, so a disabled monitor keeps /manage/health
//!   quiet instead of permanently alarmed

pub mod monitor;
pub mod registry;

pub use monitor::HealthMonitor;
pub use registry::{AggregateHealth, DependencyHealth, HealthRegistry};
