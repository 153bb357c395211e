//! The task behind one session.
//!
//! Frame delivery, reveal ticks and the idle watchdog are multiplexed in a
//! single task, so the reveal buffer has exactly one writer at a time and
//! never needs a lock. The task publishes every change through the watch
//! channel; nobody else writes to the view while it runs.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::state::{CloseReason, SessionState, SessionView, error_notice};
use crate::DecodedEvent;
use crate::error::{StreamError, StreamResult};
use crate::reveal::RevealBuffer;
use crate::transport::{FrameStream, StreamRequest, Transport};

pub(super) struct SessionTask {
    pub transport: Arc<dyn Transport>,
    pub request: StreamRequest,
    pub reveal_interval: Duration,
    pub idle_timeout: Option<Duration>,
    pub view: watch::Sender<SessionView>,
    pub cancel: CancellationToken,
}

/// Mutable state owned by the task.
struct Driver {
    view: watch::Sender<SessionView>,
    frames: Option<FrameStream>,
    buffer: RevealBuffer,
    failure: Option<String>,
}

impl Driver {
    fn route(&mut self, event: DecodedEvent) {
        match event {
            DecodedEvent::Token { text } => self.buffer.push(&text),
            DecodedEvent::SourceBatch { items } => {
                tracing::debug!(count = items.len(), "sources received");
                self.view.send_modify(|view| view.sources = items);
            }
            DecodedEvent::Done => {
                tracing::debug!(pending = self.buffer.pending().len(), "answer complete, draining");
                self.close_transport();
            }
            DecodedEvent::Error { message } => {
                tracing::warn!(error = %message, "server signalled error");
                self.fail(message);
            }
            DecodedEvent::Status { message } => {
                self.view.send_modify(|view| view.status = Some(message));
            }
            DecodedEvent::PerfTime { data } => {
                self.view.send_modify(|view| view.perf_time = Some(data));
            }
            DecodedEvent::Heartbeat => {}
        }
    }

    fn transport_failed(&mut self, err: &StreamError) {
        tracing::warn!(kind = %err.kind, error = %err, "answer stream failed");
        self.fail(err.message.clone());
    }

    fn fail(&mut self, message: String) {
        self.failure = Some(message.clone());
        self.view.send_modify(|view| view.last_error = Some(message));
        self.close_transport();
    }

    fn close_transport(&mut self) {
        if let Some(mut frames) = self.frames.take() {
            frames.close();
        }
        self.view.send_if_modified(|view| {
            let streaming = view.state == SessionState::Streaming;
            if streaming {
                view.state = SessionState::Draining;
            }
            streaming
        });
    }

    fn reveal_next(&mut self) {
        if let Some(chunk) = self.buffer.next_chunk() {
            self.view.send_modify(|view| view.visible_text.push_str(&chunk));
        }
    }

    fn is_drained(&self) -> bool {
        self.frames.is_none() && self.buffer.is_empty()
    }

    fn finish(&mut self) {
        let failure = self.failure.take();
        self.view.send_modify(|view| {
            if let Some(message) = &failure {
                view.visible_text.push_str(&error_notice(message));
                view.state = SessionState::Closed(CloseReason::Errored);
            } else {
                view.state = SessionState::Closed(CloseReason::Completed);
            }
        });
        tracing::info!(errored = failure.is_some(), "session closed");
    }
}

async fn next_frame(frames: &mut Option<FrameStream>) -> Option<StreamResult<DecodedEvent>> {
    match frames {
        Some(frames) => frames.next().await,
        None => std::future::pending().await,
    }
}

fn idle_error(idle_timeout: Option<Duration>) -> StreamError {
    StreamError::idle(idle_timeout.map_or(0, |d| d.as_secs()))
}

/// Runs one session to completion.
///
/// On cancellation it returns without touching the view; the caller owns
/// the final state then. Dropping the task's locals releases the connection
/// and discards unrevealed text.
pub(super) async fn run(task: SessionTask) {
    let SessionTask {
        transport,
        request,
        reveal_interval,
        idle_timeout,
        view,
        cancel,
    } = task;

    // The idle window also bounds a server that never answers the request.
    let idle_sleep = tokio::time::sleep(idle_timeout.unwrap_or(Duration::MAX));
    tokio::pin!(idle_sleep);

    let opened = tokio::select! {
        biased;
        () = cancel.cancelled() => return,
        result = transport.open(request) => result,
        () = &mut idle_sleep, if idle_timeout.is_some() => Err(idle_error(idle_timeout)),
    };

    let mut driver = Driver {
        view,
        frames: None,
        buffer: RevealBuffer::new(),
        failure: None,
    };
    match opened {
        Ok(frames) => driver.frames = Some(frames),
        Err(err) => driver.transport_failed(&err),
    }

    let mut ticker = tokio::time::interval(reveal_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    if let Some(period) = idle_timeout {
        idle_sleep.as_mut().reset(Instant::now() + period);
    }

    loop {
        let watchdog_armed = idle_timeout.is_some() && driver.frames.is_some();

        tokio::select! {
            biased;
            () = cancel.cancelled() => return,
            _ = ticker.tick() => {
                driver.reveal_next();
                if driver.is_drained() {
                    driver.finish();
                    return;
                }
            }
            item = next_frame(&mut driver.frames) => {
                if let Some(period) = idle_timeout {
                    idle_sleep.as_mut().reset(Instant::now() + period);
                }
                match item {
                    Some(Ok(event)) => driver.route(event),
                    Some(Err(err)) => driver.transport_failed(&err),
                    None => driver.close_transport(),
                }
            }
            () = &mut idle_sleep, if watchdog_armed => {
                driver.transport_failed(&idle_error(idle_timeout));
            }
        }
    }
}
