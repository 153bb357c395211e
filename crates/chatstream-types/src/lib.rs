//! Wire and domain types shared by the chatstream crates.

pub mod events;
pub mod health;

pub use events::{DecodedEvent, ScoreType, Source};
pub use health::HealthStatus;
