//! Frame payload decoding.
//!
//! Every payload decodes to some event. Anything that is not a recognised
//! typed frame comes back as a token carrying the raw payload, so no text the
//! server sent is ever lost.

use serde_json::Value;

use crate::{DecodedEvent, Source};

/// Decodes one frame payload.
pub fn decode(raw: &str) -> DecodedEvent {
    let Ok(value) = serde_json::from_str::<Value>(raw) else {
        tracing::debug!(len = raw.len(), "non-JSON frame, passing through as text");
        return DecodedEvent::token(raw);
    };

    decode_typed(&value).unwrap_or_else(|| {
        tracing::debug!("unrecognised frame, passing through as text");
        DecodedEvent::token(raw)
    })
}

fn decode_typed(value: &Value) -> Option<DecodedEvent> {
    let frame_type = value.get("type")?.as_str()?;
    let event = match frame_type {
        "token" => DecodedEvent::Token {
            text: value.get("text")?.as_str()?.to_string(),
        },
        "sources" => DecodedEvent::SourceBatch {
            items: decode_sources(value.get("items")),
        },
        "done" => DecodedEvent::Done,
        "error" => DecodedEvent::Error {
            message: string_field(value, "message")
                .or_else(|| string_field(value, "error"))
                .unwrap_or("Unknown error")
                .to_string(),
        },
        "status" => DecodedEvent::Status {
            message: string_field(value, "message").unwrap_or_default().to_string(),
        },
        "perf_time" => DecodedEvent::PerfTime {
            data: string_field(value, "data").unwrap_or_default().to_string(),
        },
        "ping" | "heartbeat" => DecodedEvent::Heartbeat,
        _ => return None,
    };
    Some(event)
}

fn string_field<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// Decodes a source list, dropping items that don't fit the schema.
fn decode_sources(items: Option<&Value>) -> Vec<Source> {
    let Some(items) = items.and_then(Value::as_array) else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| match serde_json::from_value::<Source>(item.clone()) {
            Ok(source) => Some(source),
            Err(err) => {
                tracing::debug!(%err, "skipping malformed source item");
                None
            }
        })
        .collect()
}
