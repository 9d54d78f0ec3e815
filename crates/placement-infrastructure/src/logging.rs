//! Structured logging setup.
//!
//! Single entry point for wiring `tracing` output; the rest of the
//! workspace only ever calls `tracing::{debug,info,...}!` macros directly
//! and never touches a subscriber.

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

/// Output format for the process-wide tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable, for local development.
    #[default]
    Text,
    /// Newline-delimited JSON, for log aggregation.
    Json,
}

/// Install the global `tracing` subscriber.
///
/// The filter directive defaults to `info` and honors `RUST_LOG` when
/// set, following the usual `tracing-subscriber` convention. Call this
/// once at process startup; calling it twice panics, same as
/// `tracing_subscriber::fmt().init()` does.
pub fn init(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}
