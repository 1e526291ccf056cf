//! Running statistics kept by the engine
//!
//! [`RunningStats`] accumulates mean and sum of squared deviations in a single pass
//! (Welford), so the unbiased sample variance is available after every completion
//! without storing samples.

use serde::Serialize;

/// Single-pass mean/variance accumulator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RunningStats {
    count: u64,
    sum: f64,
    mean: f64,
    sum_sq_diff: f64,
}

impl RunningStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.sum_sq_diff += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// Mean of the samples, 0 when empty.
    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Accumulated sum of squared deviations from the running mean.
    pub fn sum_sq_diff(&self) -> f64 {
        self.sum_sq_diff
    }

    /// Unbiased sample variance: `sum_sq_diff / (n - 1)` for `n > 1`, else 0.
    pub fn variance(&self) -> f64 {
        if self.count > 1 {
            self.sum_sq_diff / (self.count - 1) as f64
        } else {
            0.0
        }
    }
}

/// Per-source counters and time statistics.
///
/// All times are in seconds.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SourceStatistics {
    pub generated: u64,
    pub rejected: u64,
    pub completed: u64,
    pub time_in_system: RunningStats,
    pub waiting: RunningStats,
    pub service: RunningStats,
}

impl SourceStatistics {
    /// Fraction of generated requests that were evicted; 0 before any arrival.
    pub fn rejection_probability(&self) -> f64 {
        if self.generated > 0 {
            self.rejected as f64 / self.generated as f64
        } else {
            0.0
        }
    }

    pub(crate) fn record_completion(&mut self, time_in_system: f64, waiting: f64, service: f64) {
        self.completed += 1;
        self.time_in_system.push(time_in_system);
        self.waiting.push(waiting);
        self.service.push(service);
    }
}
