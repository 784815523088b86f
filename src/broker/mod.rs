//! Message broker management client.
//!
//! Thin client for the broker's own management HTTP API, used to list the
//! queues and purge one. Broker responses are passed through to the caller
//! together with their status code.

use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

use crate::config::BrokerConfig;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("broker request failed: {0}")]
    Request(#[from] reqwest::Error),
}

/// Client for the broker management API.
#[derive(Debug, Clone)]
pub struct BrokerClient {
    management_url: String,
    user: String,
    password: String,
    vhost: String,
    http: reqwest::Client,
}

impl BrokerClient {
    pub fn new(config: &BrokerConfig) -> Self {
        Self {
            management_url: config.management_url.trim_end_matches('/').to_string(),
            user: config.user.clone(),
            password: config.password.clone(),
            vhost: config.vhost.clone(),
            http: reqwest::Client::new(),
        }
    }

    /// List the queues on the configured vhost.
    pub async fn get_queues(&self) -> Result<(Value, StatusCode), BrokerError> {
        let url = format!("{}/api/queues/{}", self.management_url, self.vhost);
        let response = self
            .http
            .get(url)
            .basic_auth(&self.user, Some(&self.password))
            .send()
            .await?;
        let status = response.status();
        let body = response.json().await.unwrap_or(Value::Null);
        Ok((body, status))
    }

    /// Purge all messages from a queue.
    pub async fn purge_queue(&self, name: &str) -> Result<(Value, StatusCode), BrokerError> {
        let url = format!(
            "{}/api/queues/{}/{}/contents",
            self.management_url, self.vhost, name
        );
        let response = self
            .http
            .delete(url)
            .basic_auth(&self.user, Some(&self.password))
            .send()
            .await?;
        let status = response.status();
        let body = response.json().await.unwrap_or(Value::Null);
        Ok((body, status))
    }
}
