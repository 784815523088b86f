//! Configuration validation.
//!
//! Serde handles the syntactic side; these checks are semantic and run
//! before a config is accepted into the system. All errors are returned,
//! not just the first.

use thiserror::Error;

use crate::config::schema::ApiConfig;

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("invalid bind address {0:?}")]
    BindAddress(String),
    #[error("api path {0:?} must start with '/' and not end with '/'")]
    ApiPath(String),
    #[error("broadcast poll interval must be greater than zero")]
    PollInterval,
    #[error("request timeout must be greater than zero")]
    RequestTimeout,
    #[error("broker management url must not be empty")]
    BrokerUrl,
    #[error("invalid metrics address {0:?}")]
    MetricsAddress(String),
}

/// Validate a configuration. Pure function; collects every violation.
pub fn validate_config(config: &ApiConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config
        .listener
        .bind_address
        .parse::<std::net::SocketAddr>()
        .is_err()
    {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    for path in [&config.api.base_path, &config.api.public_base_path] {
        if !path.starts_with('/') || path.ends_with('/') {
            errors.push(ValidationError::ApiPath(path.clone()));
        }
    }

    if config.broadcast.poll_interval_secs == 0 {
        errors.push(ValidationError::PollInterval);
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::RequestTimeout);
    }

    if config.broker.management_url.is_empty() {
        errors.push(ValidationError::BrokerUrl);
    }

    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<std::net::SocketAddr>()
            .is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ApiConfig::default()).is_ok());
    }

    #[test]
    fn test_all_errors_are_collected() {
        let mut config = ApiConfig::default();
        config.listener.bind_address = "not-an-address".into();
        config.api.base_path = "management/".into();
        config.broadcast.poll_interval_secs = 0;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_metrics_address_only_checked_when_enabled() {
        let mut config = ApiConfig::default();
        config.observability.metrics_address = "nope".into();
        assert!(validate_config(&config).is_ok());

        config.observability.metrics_enabled = true;
        assert!(validate_config(&config).is_err());
    }
}
