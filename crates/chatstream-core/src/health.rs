//! Backend readiness probe.

use std::time::Duration;

use anyhow::Result;

use crate::HealthStatus;
use crate::config::Config;
use crate::error::{StreamError, StreamErrorKind, StreamResult, classify_reqwest_error};
use crate::transport::USER_AGENT;

/// Queries the backend health endpoint.
#[derive(Debug, Clone)]
pub struct HealthClient {
    http: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HealthClient {
    pub fn new(base_url: &str, health_path: &str, timeout: Duration) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: format!("{}{}", base_url.trim_end_matches('/'), health_path),
            timeout,
        }
    }

    /// # Errors
    /// Returns an error if the configured base URL is invalid.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(
            &config.effective_base_url()?,
            &config.health_path,
            config.health_timeout(),
        ))
    }

    /// Fetches the current health report.
    ///
    /// # Errors
    /// Returns an error if the request fails, times out, returns a non-2xx
    /// status, or the body is not a health report.
    pub async fn check(&self) -> StreamResult<HealthStatus> {
        let response = self
            .http
            .get(&self.url)
            .timeout(self.timeout)
            .header("accept", "application/json")
            .header("user-agent", USER_AGENT)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StreamError::http_status(status.as_u16(), &body));
        }

        let body = response.text().await.map_err(|e| classify_reqwest_error(&e))?;
        let health: HealthStatus = serde_json::from_str(&body).map_err(|err| StreamError {
            kind: StreamErrorKind::Parse,
            message: format!("Invalid health response: {err}"),
            details: Some(body.clone()),
        })?;

        if !health.is_ready() {
            tracing::info!(
                init_error = health.init_error().unwrap_or(""),
                "backend not ready"
            );
        }
        Ok(health)
    }
}
