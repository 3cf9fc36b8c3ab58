//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files;
//! every section has defaults so a minimal (or absent) file works.

use serde::{Deserialize, Serialize};

use crate::clients::Backend;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, body limit).
    pub listener: ListenerConfig,

    /// Backend base URLs.
    pub backends: BackendsConfig,

    /// Circuit breaker tunables, shared by all three breakers.
    pub breaker: BreakerConfig,

    /// Retry queue tunables.
    pub retry: RetryConfig,

    /// Backend health probing.
    pub health: HealthConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum accepted request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

/// One backend's location.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendEndpoint {
    /// Base URL without trailing slash (e.g., "http://localhost:8070").
    pub base_url: String,
}

impl Default for BackendEndpoint {
    fn default() -> Self {
        Self {
            base_url: String::new(),
        }
    }
}

/// The three downstream services the gateway fronts.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendsConfig {
    pub cars: BackendEndpoint,
    pub rental: BackendEndpoint,
    pub payment: BackendEndpoint,
}

impl BackendsConfig {
    pub fn url(&self, backend: Backend) -> &str {
        match backend {
            Backend::Cars => &self.cars.base_url,
            Backend::Rental => &self.rental.base_url,
            Backend::Payment => &self.payment.base_url,
        }
    }
}

impl Default for BackendsConfig {
    fn default() -> Self {
        Self {
            cars: BackendEndpoint {
                base_url: "http://localhost:8070".to_string(),
            },
            rental: BackendEndpoint {
                base_url: "http://localhost:8060".to_string(),
            },
            payment: BackendEndpoint {
                base_url: "http://localhost:8050".to_string(),
            },
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Number of trailing call outcomes kept per backend.
    pub window_size: usize,

    /// Minimum calls in the window before the failure ratio is applied.
    pub min_calls: usize,

    /// Failure ratio at or above which the breaker opens (0, 1].
    pub failure_ratio: f64,

    /// Seconds an open breaker waits before admitting probes.
    pub open_cooldown_secs: u64,

    /// Maximum concurrent probe calls while half-open.
    pub half_open_max_probes: usize,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            window_size: 10,
            min_calls: 5,
            failure_ratio: 0.5,
            open_cooldown_secs: 30,
            half_open_max_probes: 3,
        }
    }
}

/// Retry queue configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Entries held per backend queue; the oldest is evicted beyond this.
    pub capacity: usize,

    /// Replay attempts before an entry is dead-lettered.
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,

    /// Dead-letter records retained for inspection.
    pub dead_letter_capacity: usize,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            capacity: 128,
            max_attempts: 5,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
            dead_letter_capacity: 256,
        }
    }
}

/// Backend health probe configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthConfig {
    /// Enable periodic probing.
    pub enabled: bool,

    /// Probe interval in seconds.
    pub interval_secs: u64,

    /// Per-probe timeout in seconds.
    pub timeout_secs: u64,

    /// Seconds after which a successful probe no longer counts as fresh.
    pub stale_after_secs: u64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 10,
            timeout_secs: 3,
            stale_after_secs: 30,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total time allowed for one backend call in seconds.
    pub backend_call_secs: u64,

    /// Total time allowed for one inbound request in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            backend_call_secs: 5,
            request_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
