//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files, and
//! every field has a default so a minimal config works out of the box.

use serde::{Deserialize, Serialize};

/// Root configuration for the management API.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ApiConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// API path prefixes.
    pub api: ApiPathsConfig,

    /// Live-update broadcasting settings.
    pub broadcast: BroadcastConfig,

    /// Message broker management API settings.
    pub broker: BrokerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Cross-origin settings for the management frontend.
    pub cors: CorsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8143").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8143".to_string(),
        }
    }
}

/// Path prefixes for the authenticated and public parts of the API.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiPathsConfig {
    pub base_path: String,
    pub public_base_path: String,
}

impl Default for ApiPathsConfig {
    fn default() -> Self {
        Self {
            base_path: "/management".to_string(),
            public_base_path: "/management/public".to_string(),
        }
    }
}

/// Live-update broadcasting settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BroadcastConfig {
    /// Seconds between successive fingerprint checks.
    pub poll_interval_secs: u64,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 5,
        }
    }
}

/// Message broker management API settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BrokerConfig {
    /// Base URL of the broker management API.
    pub management_url: String,
    pub user: String,
    pub password: String,
    /// Vhost, URL-encoded ("%2F" for the default vhost).
    pub vhost: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            management_url: "http://localhost:15672".to_string(),
            user: "guest".to_string(),
            password: "guest".to_string(),
            vhost: "%2F".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Whole-request timeout in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Cross-origin settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Origins allowed to call the API from a browser.
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                "http://localhost:8080".to_string(),
                "http://127.0.0.1:8080".to_string(),
            ],
        }
    }
}

/// Observability settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Address the exporter listens on.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.listener.bind_address, "0.0.0.0:8143");
        assert_eq!(config.api.base_path, "/management");
        assert_eq!(config.broadcast.poll_interval_secs, 5);
        assert!(!config.observability.metrics_enabled);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: ApiConfig = toml::from_str(
            r#"
            [listener]
            bind_address = "127.0.0.1:9000"

            [broadcast]
            poll_interval_secs = 1
            "#,
        )
        .unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
        assert_eq!(config.broadcast.poll_interval_secs, 1);
        assert_eq!(config.api.public_base_path, "/management/public");
    }
}
