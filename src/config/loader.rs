//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid configuration: {}", join_errors(.0))]
    Invalid(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load, override from the environment, and validate a TOML config file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let mut config: GatewayConfig =
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })?;
    apply_env_overrides(&mut config);
    validate_config(&config).map_err(ConfigError::Invalid)?;
    Ok(config)
}

/// Defaults plus environment, for running without a config file.
pub fn default_config() -> Result<GatewayConfig, ConfigError> {
    let mut config = GatewayConfig::default();
    apply_env_overrides(&mut config);
    validate_config(&config).map_err(ConfigError::Invalid)?;
    Ok(config)
}

/// Deployment environments point the gateway at backends through these
/// variables; a set, non-empty variable beats the file.
fn apply_env_overrides(config: &mut GatewayConfig) {
    let slots = [
        ("CARS_SERVICE_URL", &mut config.backends.cars.base_url),
        ("RENTAL_SERVICE_URL", &mut config.backends.rental.base_url),
        ("PAYMENT_SERVICE_URL", &mut config.backends.payment.base_url),
    ];
    for (var, slot) in slots {
        if let Ok(value) = std::env::var(var) {
            if !value.is_empty() {
                *slot = value;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_file_uses_defaults() {
        let config: GatewayConfig = toml::from_str("").unwrap();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
        assert_eq!(config.backends.cars.base_url, "http://localhost:8070");
        assert_eq!(config.retry.capacity, 128);
    }

    #[test]
    fn sections_override_defaults() {
        let toml = r#"
            [listener]
            bind_address = "127.0.0.1:9999"

            [backends.rental]
            base_url = "http://rental.internal:8060"

            [breaker]
            failure_ratio = 0.75
            open_cooldown_secs = 5
        "#;
        let config: GatewayConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:9999");
        assert_eq!(config.backends.rental.base_url, "http://rental.internal:8060");
        assert_eq!(config.breaker.failure_ratio, 0.75);
        assert_eq!(config.breaker.open_cooldown_secs, 5);
        // Untouched sections keep their defaults.
        assert_eq!(config.backends.payment.base_url, "http://localhost:8050");
        assert_eq!(config.breaker.window_size, 10);
    }

    #[test]
    fn env_variables_override_file_urls() {
        let mut config = GatewayConfig::default();
        std::env::set_var("CARS_SERVICE_URL", "http://cars.test:8070");
        apply_env_overrides(&mut config);
        std::env::remove_var("CARS_SERVICE_URL");

        assert_eq!(config.backends.cars.base_url, "http://cars.test:8070");
        assert_eq!(config.backends.rental.base_url, "http://localhost:8060");
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_config(Path::new("/definitely/not/here.toml")).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.toml"));
    }
}
