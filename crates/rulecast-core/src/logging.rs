//! Structured logging with `tracing`.
//!
//! The hook binary speaks JSON on stdout, so every log line goes to stderr.
//! `RUST_LOG` takes precedence over the configured level when set.

use tracing_subscriber::EnvFilter;

/// Default level when neither `RUST_LOG` nor settings provide one.
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Install the process-wide subscriber, writing to stderr.
///
/// Call once at startup. Subsequent calls are no-ops.
///
/// # Arguments
///
/// * `level` - Minimum level (`error`, `warn`, `info`, `debug`, `trace`) or
///   any `EnvFilter` directive string.
pub fn init_subscriber(level: &str) {
    let filter = build_filter(level);

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact();

    // A second install fails quietly; the first subscriber stays.
    let _ = subscriber.try_init();
}

/// Build an [`EnvFilter`] from `RUST_LOG`, falling back to `level`, and
/// finally to [`DEFAULT_LOG_LEVEL`] if `level` is not a valid directive.
fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL))
}
