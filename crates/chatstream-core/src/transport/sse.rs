//! Server-sent events transport over reqwest.

use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};

use anyhow::Result;
use eventsource_stream::{EventStream, Eventsource};
use futures_util::Stream;
use futures_util::future::BoxFuture;

use super::{FrameStream, StreamRequest, Transport};
use crate::DecodedEvent;
use crate::config::Config;
use crate::error::{StreamError, StreamErrorKind, StreamResult, classify_reqwest_error};
use crate::protocol::decode;

/// Standard User-Agent header for chatstream requests.
pub const USER_AGENT: &str = concat!("chatstream/", env!("CARGO_PKG_VERSION"));

/// Opens `GET {base_url}{stream_path}?q=...` as an event stream.
#[derive(Debug, Clone)]
pub struct SseTransport {
    http: reqwest::Client,
    stream_url: String,
}

impl SseTransport {
    /// Creates a transport for the given backend.
    ///
    /// `base_url` should not end with a slash; `stream_path` should start
    /// with one.
    pub fn new(base_url: &str, stream_path: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            stream_url: format!("{}{}", base_url.trim_end_matches('/'), stream_path),
        }
    }

    /// Creates a transport from resolved configuration.
    ///
    /// # Errors
    /// Returns an error if the configured base URL is invalid.
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(&config.effective_base_url()?, &config.stream_path))
    }

    pub fn stream_url(&self) -> &str {
        &self.stream_url
    }
}

impl Transport for SseTransport {
    fn open(&self, request: StreamRequest) -> BoxFuture<'static, StreamResult<FrameStream>> {
        let http = self.http.clone();
        let url = self.stream_url.clone();

        Box::pin(async move {
            tracing::debug!(%url, question_len = request.question.len(), "opening answer stream");

            let response = http
                .get(&url)
                .query(&request.query_pairs())
                .header("accept", "text/event-stream")
                .header("cache-control", "no-cache")
                .header("user-agent", USER_AGENT)
                .send()
                .await
                .map_err(|e| classify_reqwest_error(&e))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let err = StreamError::http_status(status.as_u16(), &body);
                tracing::warn!(status = status.as_u16(), error = %err, "answer stream rejected");
                return Err(err);
            }

            Ok(sse_frames(response.bytes_stream()))
        })
    }
}

/// Splits an SSE byte stream into decoded frames.
///
/// Each dispatched event's `data` is one frame. Bytes that arrive without
/// completing an event (comment keepalives, events without data, partial
/// frames) surface as [`DecodedEvent::Heartbeat`] so the session sees the
/// connection is alive; they never become answer text.
fn sse_frames<S, E>(byte_stream: S) -> FrameStream
where
    S: Stream<Item = std::result::Result<bytes::Bytes, E>> + Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    let received = Arc::new(AtomicBool::new(false));
    let tap = ReceiveTap {
        inner: Box::pin(byte_stream),
        received: Arc::clone(&received),
    };
    FrameStream::new(SseFrames {
        events: tap.eventsource(),
        received,
    })
}

/// Byte stream that flags every chunk it hands to the SSE parser.
struct ReceiveTap<S> {
    inner: Pin<Box<S>>,
    received: Arc<AtomicBool>,
}

impl<S, E> Stream for ReceiveTap<S>
where
    S: Stream<Item = std::result::Result<bytes::Bytes, E>>,
{
    type Item = std::result::Result<bytes::Bytes, E>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let poll = self.inner.as_mut().poll_next(cx);
        if let Poll::Ready(Some(Ok(_))) = &poll {
            self.received.store(true, Ordering::Relaxed);
        }
        poll
    }
}

struct SseFrames<S> {
    events: EventStream<ReceiveTap<S>>,
    /// Set by the tap, cleared once the bytes produced an item
    received: Arc<AtomicBool>,
}

impl<S, E> Stream for SseFrames<S>
where
    S: Stream<Item = std::result::Result<bytes::Bytes, E>>,
    E: std::error::Error,
{
    type Item = StreamResult<DecodedEvent>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        match Pin::new(&mut self.events).poll_next(cx) {
            Poll::Ready(Some(Ok(event))) => {
                self.received.store(false, Ordering::Relaxed);
                if event.data.is_empty() {
                    return Poll::Ready(Some(Ok(DecodedEvent::Heartbeat)));
                }
                Poll::Ready(Some(Ok(decode(&event.data))))
            }
            Poll::Ready(Some(Err(e))) => Poll::Ready(Some(Err(StreamError::new(
                StreamErrorKind::Connection,
                format!("SSE stream error: {e}"),
            )))),
            Poll::Ready(None) => Poll::Ready(None),
            Poll::Pending => {
                // Bytes were consumed but no event is complete yet.
                if self.received.swap(false, Ordering::Relaxed) {
                    Poll::Ready(Some(Ok(DecodedEvent::Heartbeat)))
                } else {
                    Poll::Pending
                }
            }
        }
    }
}
