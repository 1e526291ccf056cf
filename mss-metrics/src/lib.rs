//! Metrics capture for service center runs
//!
//! The engine in `mss-core` emits counters, a gauge and histograms through the
//! `metrics` facade. Installing a [`SimulationRecorder`] (usually through
//! [`with_simulation_metrics_recorder`]) collects them into a [`SimulationMetrics`]
//! that can be queried or exported after the run.

pub mod error;
pub mod recorder;
pub mod simulation_metrics;

pub use error::MetricsError;
pub use recorder::{with_simulation_metrics_recorder, SimulationRecorder};
pub use simulation_metrics::{HistogramStats, MetricsSnapshot, SimulationMetrics};
