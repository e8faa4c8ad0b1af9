// src/logging.rs

//! Logging setup for `edgeq` using `tracing` + `tracing-subscriber`.
//!
//! The library itself only *emits* `tracing` events; installing a subscriber
//! is the embedding application's job. This helper exists for demos and small
//! hosts that have no logging story of their own. Priority for determining
//! the log level:
//! 1. the explicit `level` argument (if provided)
//! 2. `EDGEQ_LOG` environment variable (e.g. "info", "debug")
//! 3. default to `info`

use anyhow::Result;
use tracing_subscriber::fmt;

/// Initialise a global logging subscriber.
///
/// Safe to call once at startup; calling it again panics inside
/// `tracing-subscriber`, so hosts with their own subscriber should simply
/// not call this.
pub fn init_logging(level: Option<tracing::Level>) -> Result<()> {
    let level = match level {
        Some(lvl) => lvl,
        None => std::env::var("EDGEQ_LOG")
            .ok()
            .and_then(|s| parse_level_str(&s))
            .unwrap_or(tracing::Level::INFO),
    };

    fmt()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .init();

    Ok(())
}

fn parse_level_str(s: &str) -> Option<tracing::Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(tracing::Level::ERROR),
        "warn" | "warning" => Some(tracing::Level::WARN),
        "info" => Some(tracing::Level::INFO),
        "debug" => Some(tracing::Level::DEBUG),
        "trace" => Some(tracing::Level::TRACE),
        _ => None,
    }
}
