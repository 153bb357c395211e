//! Decoded stream events and citation sources.

use serde::{Deserialize, Serialize};

/// How a source's `score` should be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreType {
    /// Higher is better
    Relevance,
    /// Lower is better
    Distance,
    None,
}

/// A retrieved document cited by the answer.
///
/// Field names follow the backend wire format (`source`, `href`); the Rust
/// names describe what the presentation layer does with them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Source {
    /// Identifier, unique within one batch.
    #[serde(default)]
    pub id: i64,
    /// Display label (usually the document path).
    #[serde(rename = "source", default)]
    pub label: String,
    #[serde(rename = "href", default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
    /// Retrieval rank, 1-based.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_type: Option<ScoreType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl Source {
    pub fn new(id: i64, label: impl Into<String>) -> Self {
        Self {
            id,
            label: label.into(),
            link: None,
            preview: None,
            rank: None,
            score_type: None,
            score: None,
        }
    }

    /// Returns the link to open for this source.
    ///
    /// An explicit link wins. Labels under `docs/` are served by the backend
    /// as static files, so they resolve to a site-relative path.
    pub fn resolved_link(&self) -> Option<String> {
        if let Some(link) = self.link.as_deref().filter(|l| !l.trim().is_empty()) {
            return Some(link.to_string());
        }
        self.label
            .starts_with("docs/")
            .then(|| format!("/{}", self.label))
    }
}

/// One classified frame from the answer stream.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodedEvent {
    /// Answer text fragment
    Token { text: String },
    /// Citation batch; replaces any earlier batch
    SourceBatch { items: Vec<Source> },
    /// Server finished the answer
    Done,
    /// Server-signalled failure
    Error { message: String },
    /// Informational status (e.g. "started")
    Status { message: String },
    /// Server-side timing report
    PerfTime { data: String },
    /// Keepalive
    Heartbeat,
}

impl DecodedEvent {
    pub fn token(text: impl Into<String>) -> Self {
        Self::Token { text: text.into() }
    }

    /// Returns true for events after which the server sends nothing more.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Error { .. })
    }
}
