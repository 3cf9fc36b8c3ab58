//! Resilient gateway for the car rental platform.

pub mod clients;
pub mod config;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod model;
pub mod observability;
pub mod queue;
pub mod resilience;

pub use clients::Backend;
pub use config::schema::GatewayConfig;
pub use http::GatewayServer;
pub use lifecycle::Shutdown;
