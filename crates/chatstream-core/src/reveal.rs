//! Paced reveal of buffered answer text.
//!
//! Tokens arrive in bursts of arbitrary size. The reveal buffer holds text
//! that has arrived but is not yet shown, and hands it out one display word
//! per tick so the visible answer grows at a steady pace.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;

/// Default time between reveal ticks.
pub const DEFAULT_REVEAL_INTERVAL: Duration = Duration::from_millis(30);

/// Optional leading whitespace, one word, at most one trailing separator.
static NEXT_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*\S+\s?").unwrap());

/// FIFO of received-but-unrevealed text.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RevealBuffer {
    pending: String,
}

impl RevealBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends newly arrived text at the back.
    pub fn push(&mut self, text: &str) {
        self.pending.push_str(text);
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn pending(&self) -> &str {
        &self.pending
    }

    /// Drops everything not yet revealed.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Removes and returns the chunk to reveal on this tick.
    ///
    /// Returns `None` when nothing is pending. When the buffer holds only
    /// whitespace the chunk is a single character, so every tick makes
    /// progress.
    pub fn next_chunk(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }

        let end = match NEXT_WORD.find(&self.pending) {
            Some(m) => m.end(),
            None => self
                .pending
                .chars()
                .next()
                .map_or(self.pending.len(), char::len_utf8),
        };

        let rest = self.pending.split_off(end);
        Some(std::mem::replace(&mut self.pending, rest))
    }
}
