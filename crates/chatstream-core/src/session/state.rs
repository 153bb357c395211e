use crate::Source;

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Server sent `done` and everything received was revealed
    Completed,
    /// Server or transport failed; partial text was kept
    Errored,
    /// Caller stopped the session
    Cancelled,
}

/// Lifecycle of one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Idle,
    /// Connection open, tokens arriving
    Streaming,
    /// Connection closed, buffered text still being revealed
    Draining,
    Closed(CloseReason),
}

impl SessionState {
    pub fn is_open(self) -> bool {
        matches!(self, Self::Streaming | Self::Draining)
    }

    pub fn is_closed(self) -> bool {
        matches!(self, Self::Closed(_))
    }
}

/// Everything the presentation layer renders for the current session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionView {
    pub question: String,
    pub state: SessionState,
    /// Revealed answer text; only grows until the next `start`.
    pub visible_text: String,
    pub sources: Vec<Source>,
    pub last_error: Option<String>,
    /// Latest server status message
    pub status: Option<String>,
    /// Server timing report
    pub perf_time: Option<String>,
}

impl SessionView {
    pub(crate) fn started(question: &str) -> Self {
        Self {
            question: question.to_string(),
            state: SessionState::Streaming,
            ..Self::default()
        }
    }

    pub fn is_open(&self) -> bool {
        self.state.is_open()
    }
}

/// Notice appended after the partial answer when a session fails.
pub(crate) fn error_notice(message: &str) -> String {
    format!("\n[Error: {message}]")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_states() {
        assert!(!SessionState::Idle.is_open());
        assert!(SessionState::Streaming.is_open());
        assert!(SessionState::Draining.is_open());
        assert!(!SessionState::Closed(CloseReason::Completed).is_open());
        assert!(SessionState::Closed(CloseReason::Cancelled).is_closed());
    }

    #[test]
    fn test_started_view_is_reset() {
        let view = SessionView::started("2+2?");
        assert_eq!(view.question, "2+2?");
        assert_eq!(view.state, SessionState::Streaming);
        assert!(view.visible_text.is_empty());
        assert!(view.sources.is_empty());
        assert_eq!(view.last_error, None);
    }
}
