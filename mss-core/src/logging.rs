//! Structured logging for service center runs
//!
//! The engine logs through `tracing`; these helpers install a `tracing-subscriber`
//! formatter and provide the spans the engine enters.
//!
//! # Controlling output
//!
//! ```rust
//! use mss_core::logging::init_simulation_logging_with_level;
//! init_simulation_logging_with_level("debug");
//! ```
//!
//! `RUST_LOG` takes precedence over the level passed in:
//!
//! ```bash
//! RUST_LOG=mss_core=debug cargo run --example service_center
//! RUST_LOG=mss_core::calendar=trace cargo run --example service_center
//! ```
//!
//! Levels used by the engine:
//! - **INFO**: run start and end
//! - **DEBUG**: arrivals, evictions, assignments, completions
//! - **TRACE**: calendar pushes, buffer slot changes
//! - **WARN**: stale departures
//!
//! Every initializer uses `try_init`, so calling one twice (or from several tests)
//! is harmless.

use crate::time::SimTime;
use crate::types::EventId;
use tracing::{info, Span};
use tracing_subscriber::{filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging at `info`.
pub fn init_simulation_logging() {
    init_simulation_logging_with_level("info")
}

/// Initialize logging with a specific level
///
/// # Arguments
/// * `level` - Log level: "trace", "debug", "info", "warn", or "error"
pub fn init_simulation_logging_with_level(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("{}={level},mss_metrics={level}", env!("CARGO_CRATE_NAME")).into());

    let installed = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_file(true)
                .with_line_number(true),
        )
        .with(filter)
        .try_init();

    if installed.is_ok() {
        info!("Simulation logging initialized at level: {}", level);
    }
}

/// Everything at `trace`, pretty-printed.
pub fn init_detailed_simulation_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "mss_core=trace,mss_metrics=debug".into());

    let installed = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_file(true)
                .with_line_number(true)
                .pretty(),
        )
        .with(filter)
        .try_init();

    if installed.is_ok() {
        info!("Detailed simulation logging initialized");
    }
}

/// Span covering a whole run.
pub fn simulation_span(name: &str) -> Span {
    tracing::info_span!("simulation", name = name)
}

/// Span covering the processing of one event.
pub fn event_span(event_id: EventId, kind: &str, time: SimTime) -> Span {
    tracing::trace_span!("event", id = %event_id, kind = kind, time = %time)
}

/// Run lifecycle messages.
pub mod events {
    use super::*;

    pub fn simulation_started(name: &str, horizon: SimTime, pending_events: usize) {
        info!(simulation = name, horizon = %horizon, pending_events, "Simulation started");
    }

    pub fn simulation_completed(reason: &str, final_time: SimTime, events_processed: u64) {
        info!(
            reason,
            final_time = %final_time,
            events_processed,
            "Simulation completed"
        );
    }

    pub fn simulation_cancelled(final_time: SimTime, events_processed: u64) {
        info!(final_time = %final_time, events_processed, "Simulation cancelled");
    }
}
