//! Session controller: one in-flight question at a time.
//!
//! `start` opens the stream and spawns the session task; the task reveals
//! text at a steady pace and publishes [`SessionView`] snapshots. `stop`
//! cancels it and waits until the connection and ticker are gone.

mod driver;
mod state;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub use state::{CloseReason, SessionState, SessionView};

use crate::Source;
use crate::config::Config;
use crate::reveal::DEFAULT_REVEAL_INTERVAL;
use crate::transport::{SseTransport, StreamRequest, Transport};

/// Per-controller knobs applied to every session it starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSettings {
    pub reveal_interval: Duration,
    /// Fail the stream after this long without frames; `None` waits forever.
    pub idle_timeout: Option<Duration>,
    pub k: Option<u32>,
    pub debug: bool,
    pub heartbeat_secs: Option<u32>,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            reveal_interval: DEFAULT_REVEAL_INTERVAL,
            idle_timeout: None,
            k: None,
            debug: false,
            heartbeat_secs: None,
        }
    }
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            reveal_interval: config.reveal_interval(),
            idle_timeout: config.idle_timeout(),
            k: config.k,
            debug: config.debug,
            heartbeat_secs: config.heartbeat_secs,
        }
    }

    fn request(&self, question: &str) -> StreamRequest {
        StreamRequest {
            question: question.to_string(),
            k: self.k,
            debug: self.debug,
            heartbeat_secs: self.heartbeat_secs,
        }
    }
}

struct ActiveSession {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Owns the lifecycle of streamed answers for one conversation surface.
pub struct SessionController {
    transport: Arc<dyn Transport>,
    settings: SessionSettings,
    view: watch::Sender<SessionView>,
    active: Option<ActiveSession>,
}

impl SessionController {
    pub fn new(transport: Arc<dyn Transport>, settings: SessionSettings) -> Self {
        let (view, _) = watch::channel(SessionView::default());
        Self {
            transport,
            settings,
            view,
            active: None,
        }
    }

    /// Builds a controller streaming from the configured backend.
    ///
    /// # Errors
    /// Returns an error if the configured base URL is invalid.
    pub fn from_config(config: &Config) -> Result<Self> {
        let transport = SseTransport::from_config(config)?;
        Ok(Self::new(
            Arc::new(transport),
            SessionSettings::from_config(config),
        ))
    }

    /// Starts streaming an answer to `question`.
    ///
    /// Returns false without doing anything if a session is still open or
    /// the question is blank. Otherwise clears the previous answer, sources
    /// and error, and returns immediately; text arrives asynchronously.
    ///
    /// # Panics
    /// Panics if called outside a Tokio runtime.
    pub fn start(&mut self, question: &str) -> bool {
        let question = question.trim();
        if question.is_empty() {
            tracing::debug!("ignoring blank question");
            return false;
        }
        if self.view.borrow().is_open() {
            tracing::debug!("session already open, ignoring start");
            return false;
        }

        // The previous task already published its final state.
        if let Some(previous) = self.active.take() {
            previous.cancel.cancel();
        }

        self.view.send_replace(SessionView::started(question));
        tracing::info!(question_len = question.len(), "session started");

        let cancel = CancellationToken::new();
        let task = tokio::spawn(driver::run(driver::SessionTask {
            transport: Arc::clone(&self.transport),
            request: self.settings.request(question),
            reveal_interval: self.settings.reveal_interval,
            idle_timeout: self.settings.idle_timeout,
            view: self.view.clone(),
            cancel: cancel.clone(),
        }));
        self.active = Some(ActiveSession { cancel, task });
        true
    }

    /// Cancels the current session.
    ///
    /// When this returns, the connection is released and no reveal tick is
    /// left running. Text not yet revealed is discarded; revealed text stays.
    /// Calling it again, or with no session, does nothing.
    pub async fn stop(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };

        active.cancel.cancel();
        if let Err(err) = active.task.await {
            tracing::warn!(%err, "session task ended abnormally");
        }

        let cancelled = self.view.send_if_modified(|view| {
            let open = view.state.is_open();
            if open {
                view.state = SessionState::Closed(CloseReason::Cancelled);
            }
            open
        });
        if cancelled {
            tracing::info!("session stopped by caller");
        }
    }

    /// Waits until the current session is no longer open and returns the
    /// final view. Returns immediately when nothing is open.
    pub async fn closed(&self) -> SessionView {
        let mut rx = self.view.subscribe();
        match rx.wait_for(|view| !view.is_open()).await {
            Ok(view) => view.clone(),
            // Sender is owned by `self`.
            Err(_) => self.view(),
        }
    }

    /// Subscribes to view updates.
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view.subscribe()
    }

    /// Snapshot of the current view.
    pub fn view(&self) -> SessionView {
        self.view.borrow().clone()
    }

    pub fn state(&self) -> SessionState {
        self.view.borrow().state
    }

    pub fn visible_text(&self) -> String {
        self.view.borrow().visible_text.clone()
    }

    pub fn is_open(&self) -> bool {
        self.view.borrow().is_open()
    }

    pub fn last_error(&self) -> Option<String> {
        self.view.borrow().last_error.clone()
    }

    pub fn sources(&self) -> Vec<Source> {
        self.view.borrow().sources.clone()
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if let Some(active) = &self.active {
            active.cancel.cancel();
        }
    }
}
