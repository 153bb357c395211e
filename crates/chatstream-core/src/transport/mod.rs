//! Answer stream transport.
//!
//! A transport opens one live connection per question and yields decoded
//! events through a [`FrameStream`]. The frame stream enforces the terminal
//! contract for every transport: it ends right after a `done`/`error` frame
//! or a transport failure, and a connection that ends any other way yields a
//! [`StreamErrorKind::ClosedEarly`](crate::StreamErrorKind::ClosedEarly)
//! error instead of going quiet.

mod sse;

use std::pin::Pin;
use std::task::{Context, Poll};

use futures_util::Stream;
use futures_util::future::BoxFuture;
use futures_util::stream::BoxStream;

pub use sse::{SseTransport, USER_AGENT};

use crate::DecodedEvent;
use crate::error::{StreamError, StreamResult};
use crate::protocol::decode;

/// Parameters of one streaming request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamRequest {
    pub question: String,
    /// Number of sources to retrieve
    pub k: Option<u32>,
    pub debug: bool,
    /// Keepalive period requested from the server
    pub heartbeat_secs: Option<u32>,
}

impl StreamRequest {
    pub fn new(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            k: None,
            debug: false,
            heartbeat_secs: None,
        }
    }

    /// Query parameters in wire order. Optional knobs are omitted when unset.
    pub fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![("q", self.question.clone())];
        if let Some(k) = self.k {
            pairs.push(("k", k.to_string()));
        }
        if self.debug {
            pairs.push(("debug", "1".to_string()));
        }
        if let Some(secs) = self.heartbeat_secs {
            pairs.push(("heartbeat", secs.to_string()));
        }
        pairs
    }
}

/// Opens answer streams.
pub trait Transport: Send + Sync {
    /// Opens one connection for `request`.
    ///
    /// Resolves once the server has accepted the stream; frames then arrive
    /// through the returned [`FrameStream`].
    fn open(&self, request: StreamRequest) -> BoxFuture<'static, StreamResult<FrameStream>>;
}

/// Live sequence of decoded events for one question.
///
/// Dropping or closing it releases the underlying connection.
pub struct FrameStream {
    inner: Option<BoxStream<'static, StreamResult<DecodedEvent>>>,
}

impl FrameStream {
    /// Wraps a stream of already decoded events.
    pub fn new<S>(events: S) -> Self
    where
        S: Stream<Item = StreamResult<DecodedEvent>> + Send + 'static,
    {
        Self {
            inner: Some(Box::pin(events)),
        }
    }

    /// Wraps a stream of raw frame payloads, decoding each one.
    pub fn from_raw<S>(frames: S) -> Self
    where
        S: Stream<Item = StreamResult<String>> + Send + 'static,
    {
        use futures_util::StreamExt;

        Self::new(frames.map(|frame| frame.map(|raw| decode(&raw))))
    }

    /// Closes the connection. Safe to call repeatedly or after the stream
    /// has already finished.
    pub fn close(&mut self) {
        if self.inner.take().is_some() {
            tracing::debug!("answer stream closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }
}

impl std::fmt::Debug for FrameStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameStream")
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl Stream for FrameStream {
    type Item = StreamResult<DecodedEvent>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let Some(inner) = self.inner.as_mut() else {
            return Poll::Ready(None);
        };

        let poll = inner.as_mut().poll_next(cx);
        match poll {
            Poll::Ready(Some(Ok(event))) => {
                if event.is_terminal() {
                    self.close();
                }
                Poll::Ready(Some(Ok(event)))
            }
            Poll::Ready(Some(Err(err))) => {
                self.close();
                Poll::Ready(Some(Err(err)))
            }
            Poll::Ready(None) => {
                self.close();
                Poll::Ready(Some(Err(StreamError::closed_early())))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use futures_util::StreamExt;
    use futures_util::stream;

    use super::*;
    use crate::StreamErrorKind;

    fn raw(frames: &[&str]) -> FrameStream {
        let frames: Vec<StreamResult<String>> =
            frames.iter().map(|f| Ok((*f).to_string())).collect();
        FrameStream::from_raw(stream::iter(frames))
    }

    #[test]
    fn test_query_pairs_omit_unset_knobs() {
        assert_eq!(
            StreamRequest::new("2+2?").query_pairs(),
            vec![("q", "2+2?".to_string())]
        );
    }

    #[test]
    fn test_query_pairs_carry_all_knobs() {
        let request = StreamRequest {
            k: Some(3),
            debug: true,
            heartbeat_secs: Some(2),
            ..StreamRequest::new("why?")
        };
        assert_eq!(
            request.query_pairs(),
            vec![
                ("q", "why?".to_string()),
                ("k", "3".to_string()),
                ("debug", "1".to_string()),
                ("heartbeat", "2".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_stream_ends_after_done() {
        let mut frames = raw(&[
            r#"{"type":"token","text":"4"}"#,
            r#"{"type":"done"}"#,
            r#"{"type":"token","text":"ignored"}"#,
        ]);

        let events: Vec<_> = (&mut frames).collect().await;
        assert_eq!(
            events,
            vec![Ok(DecodedEvent::token("4")), Ok(DecodedEvent::Done)]
        );
        assert!(frames.is_closed());
    }

    #[tokio::test]
    async fn test_stream_ends_after_error_frame() {
        let events: Vec<_> = raw(&[
            r#"{"type":"error","message":"boom"}"#,
            r#"{"type":"done"}"#,
        ])
        .collect()
        .await;
        assert_eq!(
            events,
            vec![Ok(DecodedEvent::Error {
                message: "boom".to_string()
            })]
        );
    }

    #[tokio::test]
    async fn test_quiet_end_surfaces_closed_early() {
        let events: Vec<_> = raw(&[r#"{"type":"token","text":"Hel"}"#]).collect().await;

        assert_eq!(events.len(), 2);
        assert_eq!(events[0], Ok(DecodedEvent::token("Hel")));
        let err = events[1].clone().unwrap_err();
        assert_eq!(err.kind, StreamErrorKind::ClosedEarly);
    }

    #[tokio::test]
    async fn test_transport_error_is_terminal() {
        let items: Vec<StreamResult<DecodedEvent>> = vec![
            Err(StreamError::new(StreamErrorKind::Connection, "reset")),
            Ok(DecodedEvent::token("late")),
        ];
        let events: Vec<_> = FrameStream::new(stream::iter(items)).collect().await;

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].clone().unwrap_err().message, "reset");
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let mut frames = raw(&[r#"{"type":"token","text":"a"}"#]);
        frames.close();
        frames.close();
        assert!(frames.is_closed());
        assert_eq!(frames.next().await, None);
    }
}
