//! Structured logging configuration.
//!
//! Records emitted by the bracket engine through the `log` facade are
//! bridged into the same subscriber.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging
///
/// Log levels are configurable via the `RUST_LOG` env var.
///
/// # Example
///
/// ```no_run
/// use be_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,hyper=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log a bracket lifecycle event with structured data
///
/// # Arguments
///
/// * `event_type` - Type of event (`generated`, `regenerated`, `reset`, ...)
/// * `tournament_id` - Tournament the event belongs to
/// * `message` - Event message
///
/// # Example
///
/// ```
/// use be_server::logging::log_bracket_event;
///
/// log_bracket_event("generated", 42, "double_elimination, 14 matches");
/// ```
pub fn log_bracket_event(event_type: &str, tournament_id: i64, message: &str) {
    tracing::info!(
        event_type = event_type,
        tournament_id = tournament_id,
        "BRACKET: {}",
        message
    );
}

/// Log performance metric
///
/// # Arguments
///
/// * `operation` - Operation name
/// * `duration_ms` - Duration in milliseconds
/// * `metadata` - Additional metadata
///
/// # Example
///
/// ```
/// use be_server::logging::log_performance;
/// use std::time::Instant;
///
/// let start = Instant::now();
/// // ... do work ...
/// let duration = start.elapsed().as_millis() as u64;
/// log_performance("generate_bracket", duration, Some("tournament 42"));
/// ```
pub fn log_performance(operation: &str, duration_ms: u64, metadata: Option<&str>) {
    if duration_ms > 1000 {
        tracing::warn!(
            operation = operation,
            duration_ms = duration_ms,
            metadata = metadata,
            "PERFORMANCE: Slow operation"
        );
    } else {
        tracing::debug!(
            operation = operation,
            duration_ms = duration_ms,
            metadata = metadata,
            "Performance metric"
        );
    }
}
