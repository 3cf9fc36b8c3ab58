//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, apply env overrides)
//!     → validation.rs (semantic checks, all errors at once)
//!     → GatewayConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults so the gateway runs with no file at all
//! - Backend URLs can be overridden from the environment, matching how
//!   deployments wire service addresses

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{default_config, load_config, ConfigError};
pub use schema::{
    BackendsConfig, BreakerConfig, GatewayConfig, HealthConfig, ListenerConfig,
    ObservabilityConfig, RetryConfig, TimeoutConfig,
};
