//! Backend health report.

use serde::{Deserialize, Serialize};

/// Response body of the backend `/health` endpoint.
///
/// Backends disagree on shape: some report `ok`, others a `status` string,
/// and readiness details are optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthStatus {
    pub ok: Option<bool>,
    pub status: Option<String>,
    pub initialized: Option<bool>,
    pub model_loaded: Option<bool>,
    pub init_error: Option<String>,
    pub error: Option<String>,
}

impl HealthStatus {
    /// Returns true when the backend can answer questions.
    pub fn is_ready(&self) -> bool {
        let reported_ok = self.ok.unwrap_or(false) || self.status.as_deref() == Some("ok");
        reported_ok && self.initialized != Some(false) && self.model_loaded != Some(false)
    }

    /// Returns the startup error reported by the backend, if any.
    pub fn init_error(&self) -> Option<&str> {
        self.init_error
            .as_deref()
            .or(self.error.as_deref())
            .filter(|e| !e.trim().is_empty())
    }
}
