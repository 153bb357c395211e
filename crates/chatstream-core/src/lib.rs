//! Streaming chat client: SSE transport, frame decoding, paced reveal and
//! session lifecycle.

pub mod config;
pub mod error;
pub mod health;
pub mod logging;
pub mod protocol;
pub mod reveal;
pub mod session;
pub mod transport;

pub use chatstream_types::{DecodedEvent, HealthStatus, ScoreType, Source};
pub use config::Config;
pub use error::{StreamError, StreamErrorKind, StreamResult};
pub use health::HealthClient;
pub use session::{CloseReason, SessionController, SessionSettings, SessionState, SessionView};
pub use transport::{FrameStream, SseTransport, StreamRequest, Transport};
