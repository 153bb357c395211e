//! Answer stream wire protocol.

mod decode;

pub use decode::decode;
