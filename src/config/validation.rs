//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (ratios, windows, timeouts)
//! - Check addresses and backend URLs actually parse
//!
//! # Design Decisions
//! - Returns all validation errors, not just the first
//! - Validation is a pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::fmt;
use std::net::SocketAddr;

use url::Url;

use crate::config::schema::GatewayConfig;

/// One rejected configuration value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn check_url(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    match Url::parse(value) {
        Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {
            if url.host_str().is_none() {
                errors.push(ValidationError {
                    field,
                    message: format!("'{value}' has no host"),
                });
            }
        }
        Ok(url) => errors.push(ValidationError {
            field,
            message: format!("unsupported scheme '{}'", url.scheme()),
        }),
        Err(err) => errors.push(ValidationError {
            field,
            message: format!("'{value}' is not a URL: {err}"),
        }),
    }
}

fn check_addr(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError {
            field,
            message: format!("'{value}' is not a socket address"),
        });
    }
}

fn check_nonzero(errors: &mut Vec<ValidationError>, field: &'static str, value: u64) {
    if value == 0 {
        errors.push(ValidationError {
            field,
            message: "must be at least 1".to_string(),
        });
    }
}

pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_addr(&mut errors, "listener.bind_address", &config.listener.bind_address);
    check_nonzero(
        &mut errors,
        "listener.max_body_bytes",
        config.listener.max_body_bytes as u64,
    );

    check_url(&mut errors, "backends.cars.base_url", &config.backends.cars.base_url);
    check_url(&mut errors, "backends.rental.base_url", &config.backends.rental.base_url);
    check_url(&mut errors, "backends.payment.base_url", &config.backends.payment.base_url);

    let breaker = &config.breaker;
    check_nonzero(&mut errors, "breaker.window_size", breaker.window_size as u64);
    check_nonzero(&mut errors, "breaker.min_calls", breaker.min_calls as u64);
    if breaker.min_calls > breaker.window_size {
        errors.push(ValidationError {
            field: "breaker.min_calls",
            message: format!(
                "cannot exceed window_size ({} > {})",
                breaker.min_calls, breaker.window_size
            ),
        });
    }
    if !(breaker.failure_ratio > 0.0 && breaker.failure_ratio <= 1.0) {
        errors.push(ValidationError {
            field: "breaker.failure_ratio",
            message: format!("{} is outside (0, 1]", breaker.failure_ratio),
        });
    }
    check_nonzero(&mut errors, "breaker.open_cooldown_secs", breaker.open_cooldown_secs);
    check_nonzero(
        &mut errors,
        "breaker.half_open_max_probes",
        breaker.half_open_max_probes as u64,
    );

    let retry = &config.retry;
    check_nonzero(&mut errors, "retry.capacity", retry.capacity as u64);
    check_nonzero(&mut errors, "retry.max_attempts", retry.max_attempts as u64);
    if retry.base_delay_ms > retry.max_delay_ms {
        errors.push(ValidationError {
            field: "retry.base_delay_ms",
            message: format!(
                "cannot exceed max_delay_ms ({} > {})",
                retry.base_delay_ms, retry.max_delay_ms
            ),
        });
    }
    check_nonzero(
        &mut errors,
        "retry.dead_letter_capacity",
        retry.dead_letter_capacity as u64,
    );

    if config.health.enabled {
        check_nonzero(&mut errors, "health.interval_secs", config.health.interval_secs);
        check_nonzero(&mut errors, "health.timeout_secs", config.health.timeout_secs);
        check_nonzero(&mut errors, "health.stale_after_secs", config.health.stale_after_secs);
    }

    check_nonzero(
        &mut errors,
        "timeouts.backend_call_secs",
        config.timeouts.backend_call_secs,
    );
    check_nonzero(&mut errors, "timeouts.request_secs", config.timeouts.request_secs);

    match config.observability.log_level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => {}
        other => errors.push(ValidationError {
            field: "observability.log_level",
            message: format!("unknown level '{other}'"),
        }),
    }
    if config.observability.metrics_enabled {
        check_addr(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
