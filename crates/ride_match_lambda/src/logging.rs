//! Structured log setup shared by the binaries.
//!
//! Every handler log line carries a `component`, an `event` name and a
//! JSON `details` object, emitted through `tracing` so the subscriber
//! decides formatting and filtering.

use serde_json::Value;
use tracing::Level;
use tracing_subscriber::EnvFilter;

pub const DEFAULT_LOG_FILTER: &str = "info";

/// Installs a JSON subscriber honouring `RUST_LOG`. Safe to call twice.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let _ = tracing_subscriber::fmt()
        .json()
        .flatten_event(true)
        .with_current_span(false)
        .with_target(false)
        .with_env_filter(filter)
        .try_init();
}

pub fn log_event(level: Level, component: &'static str, event: &'static str, details: Value) {
    if level == Level::ERROR {
        tracing::error!(component, event, details = %details);
    } else if level == Level::WARN {
        tracing::warn!(component, event, details = %details);
    } else if level == Level::INFO {
        tracing::info!(component, event, details = %details);
    } else {
        tracing::debug!(component, event, details = %details);
    }
}
