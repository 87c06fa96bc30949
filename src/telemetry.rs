//! Telemetry initialization.
//!
//! Diagnostics go through `tracing`; there is no ambient verbosity state.
//! The subscriber writes human-readable events to stderr, filtered by
//! `PALIMPSEST_LOG` (standard `EnvFilter` syntax, e.g. `debug` or
//! `palimpsest=trace`), defaulting to `warn` so replays stay quiet unless
//! something actually goes wrong.

use tracing_subscriber::EnvFilter;

/// Environment variable controlling the log filter.
pub const LOG_ENV: &str = "PALIMPSEST_LOG";

/// Initialize the stderr subscriber.
///
/// Safe to call more than once; only the first call installs a subscriber
/// (later calls are no-ops, which keeps tests that initialize telemetry
/// from panicking).
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init();
        init();
    }
}
