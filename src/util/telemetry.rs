//! Telemetry helpers for structured logging and tracing.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset: queue lifecycle warnings and
/// errors, without per-task debug noise.
pub const DEFAULT_LOG_FILTER: &str = "prism_queue=info";

/// Install an env-filtered fmt subscriber for queue diagnostics, unless the
/// application already installed one.
///
/// `RUST_LOG=prism_queue=debug` traces every enqueue, start, outcome and
/// expiration tick.
pub fn init_tracing() {
    if tracing::dispatcher::has_been_set() {
        return;
    }
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
