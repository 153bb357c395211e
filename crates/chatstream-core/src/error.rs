//! Transport error taxonomy.
//!
//! Malformed frames never produce an error (the decoder falls back to raw
//! text) and a user-initiated stop is not an error either, so everything here
//! describes the connection itself.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Categories of transport failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamErrorKind {
    /// Non-success HTTP status when opening the stream
    HttpStatus,
    /// Connect or request timeout
    Timeout,
    /// Connection refused, reset or body read failure
    Connection,
    /// Server closed the stream without a `done` or `error` frame
    ClosedEarly,
    /// No frame arrived within the idle window
    Idle,
    /// Response body could not be parsed (health probe only; stream frames
    /// never fail to decode)
    Parse,
}

impl fmt::Display for StreamErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamErrorKind::HttpStatus => write!(f, "http_status"),
            StreamErrorKind::Timeout => write!(f, "timeout"),
            StreamErrorKind::Connection => write!(f, "connection"),
            StreamErrorKind::ClosedEarly => write!(f, "closed_early"),
            StreamErrorKind::Idle => write!(f, "idle"),
            StreamErrorKind::Parse => write!(f, "parse"),
        }
    }
}

/// Structured transport error with kind and details.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamError {
    pub kind: StreamErrorKind,
    /// One-line summary suitable for display
    pub message: String,
    /// Optional additional details (e.g., raw error body)
    pub details: Option<String>,
}

impl StreamError {
    pub fn new(kind: StreamErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    /// Creates an HTTP status error, pulling a readable message out of the
    /// body when the backend sent JSON.
    pub fn http_status(status: u16, body: &str) -> Self {
        if body.is_empty() {
            return Self::new(StreamErrorKind::HttpStatus, format!("HTTP {status}"));
        }

        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|json| extract_error_message(&json))
            .map_or_else(|| format!("HTTP {status}"), |msg| format!("HTTP {status}: {msg}"));

        Self {
            kind: StreamErrorKind::HttpStatus,
            message,
            details: Some(body.to_string()),
        }
    }

    pub fn closed_early() -> Self {
        Self::new(
            StreamErrorKind::ClosedEarly,
            "Stream closed before the answer completed",
        )
    }

    pub fn idle(after_secs: u64) -> Self {
        Self::new(
            StreamErrorKind::Idle,
            format!("Stream idle: no data for {after_secs}s"),
        )
    }
}

/// Backend error bodies are either `{"detail": ".."}` or
/// `{"error": {"message": ".."}}`.
fn extract_error_message(json: &Value) -> Option<String> {
    if let Some(detail) = json.get("detail").and_then(Value::as_str) {
        return Some(detail.to_string());
    }
    json.get("error")
        .and_then(|err| err.get("message").and_then(Value::as_str).or(err.as_str()))
        .map(str::to_string)
}

/// Classifies a reqwest failure into a transport error.
pub fn classify_reqwest_error(e: &reqwest::Error) -> StreamError {
    if e.is_timeout() {
        StreamError::new(StreamErrorKind::Timeout, format!("Request timed out: {e}"))
    } else if e.is_connect() {
        StreamError::new(StreamErrorKind::Connection, format!("Connection failed: {e}"))
    } else if e.is_request() {
        StreamError::new(StreamErrorKind::Connection, format!("Request error: {e}"))
    } else {
        StreamError::new(StreamErrorKind::Connection, format!("Network error: {e}"))
    }
}

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for StreamError {}

/// Result type for transport operations.
pub type StreamResult<T> = std::result::Result<T, StreamError>;
