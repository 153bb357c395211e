//! Tracing subscriber setup for hosts embedding the client.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the log filter (e.g. `chatstream_core=debug`).
pub const LOG_ENV: &str = "CHATSTREAM_LOG";

const DEFAULT_FILTER: &str = "warn";

/// Installs a stderr fmt subscriber filtered by `CHATSTREAM_LOG`.
///
/// Returns false if a global subscriber was already installed, in which case
/// nothing changes.
pub fn init() -> bool {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        // The first call may lose to another test in this binary.
        let _first = init();
        assert!(!init(), "second init must not replace the subscriber");
    }
}
