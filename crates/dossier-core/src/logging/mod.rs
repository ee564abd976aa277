//! Structured logging setup.
//!
//! All crates log through `tracing` macros with structured fields
//! (`session_id`, `attempt`, `delay_ms`, `code`, `event_type`). Binaries call
//! [`init_subscriber`] once; tests use [`test_utils::capture_logs`].

pub mod test_utils;

use tracing_subscriber::EnvFilter;

/// Default filter when neither `RUST_LOG` nor settings provide one.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Install the global stderr subscriber.
///
/// `RUST_LOG` takes precedence over `level`. Subsequent calls are no-ops.
pub fn init_subscriber(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact();

    // try_init fails only when a global subscriber is already set
    let _ = subscriber.try_init();
}
