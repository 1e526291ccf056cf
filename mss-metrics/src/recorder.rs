//! A `metrics::Recorder` implementation backed by `SimulationMetrics`.
//!
//! Prefer a *local* recorder so parallel tests and repeated runs never share state:
//!
//! ```rust
//! # use std::sync::{Arc, Mutex};
//! # use mss_metrics::{SimulationMetrics, with_simulation_metrics_recorder};
//! let metrics = Arc::new(Mutex::new(SimulationMetrics::new()));
//! with_simulation_metrics_recorder(&metrics, || {
//!     metrics::counter!("mss_requests_generated_total", "source" => "source-1").increment(1);
//! });
//! assert_eq!(
//!     metrics.lock().unwrap().get_counter("mss_requests_generated_total", &[("source", "source-1")]),
//!     Some(1)
//! );
//! ```

use crate::simulation_metrics::SimulationMetrics;
use metrics::{Counter, Gauge, Histogram, Key, KeyName, Metadata, Recorder, SharedString, Unit};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Clone)]
pub struct SimulationRecorder {
    metrics: Arc<Mutex<SimulationMetrics>>,
}

impl SimulationRecorder {
    pub fn new(metrics: Arc<Mutex<SimulationMetrics>>) -> Self {
        Self { metrics }
    }
}

/// Run `f` with a recorder feeding `metrics` installed for the current thread.
pub fn with_simulation_metrics_recorder<T>(metrics: &Arc<Mutex<SimulationMetrics>>, f: impl FnOnce() -> T) -> T {
    let recorder = SimulationRecorder::new(metrics.clone());
    metrics::with_local_recorder(&recorder, f)
}

/// Name, labels and destination shared by every handle kind.
struct Handle {
    metrics: Arc<Mutex<SimulationMetrics>>,
    name: String,
    labels: Vec<(String, String)>,
}

impl Handle {
    fn new(metrics: &Arc<Mutex<SimulationMetrics>>, key: &Key) -> Self {
        Self {
            metrics: metrics.clone(),
            name: key.name().to_string(),
            labels: key
                .labels()
                .map(|l| (l.key().to_string(), l.value().to_string()))
                .collect(),
        }
    }

    // recovers the guard from a poisoned lock
    fn lock(&self) -> MutexGuard<'_, SimulationMetrics> {
        self.metrics.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl metrics::CounterFn for Handle {
    fn increment(&self, value: u64) {
        self.lock().increment_counter_by_owned(&self.name, value, &self.labels);
    }

    fn absolute(&self, value: u64) {
        self.lock().set_counter_absolute_owned(&self.name, value, &self.labels);
    }
}

impl metrics::GaugeFn for Handle {
    fn increment(&self, value: f64) {
        self.lock().increment_gauge_owned(&self.name, value, &self.labels);
    }

    fn decrement(&self, value: f64) {
        self.lock().increment_gauge_owned(&self.name, -value, &self.labels);
    }

    fn set(&self, value: f64) {
        self.lock().record_gauge_owned(&self.name, value, &self.labels);
    }
}

impl metrics::HistogramFn for Handle {
    fn record(&self, value: f64) {
        self.lock().record_histogram_owned(&self.name, value, &self.labels);
    }
}

impl Recorder for SimulationRecorder {
    fn describe_counter(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn describe_gauge(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn describe_histogram(&self, _key: KeyName, _unit: Option<Unit>, _description: SharedString) {}

    fn register_counter(&self, key: &Key, _metadata: &Metadata<'_>) -> Counter {
        Counter::from_arc(Arc::new(Handle::new(&self.metrics, key)))
    }

    fn register_gauge(&self, key: &Key, _metadata: &Metadata<'_>) -> Gauge {
        Gauge::from_arc(Arc::new(Handle::new(&self.metrics, key)))
    }

    fn register_histogram(&self, key: &Key, _metadata: &Metadata<'_>) -> Histogram {
        Histogram::from_arc(Arc::new(Handle::new(&self.metrics, key)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorder_captures_metrics_macros() {
        let metrics = Arc::new(Mutex::new(SimulationMetrics::new()));

        with_simulation_metrics_recorder(&metrics, || {
            metrics::counter!("mss_requests_rejected_total", "source" => "source-3").increment(2);
            metrics::counter!("mss_stale_departures_total").increment(1);
            metrics::gauge!("mss_buffer_occupancy").set(4.0);
            metrics::gauge!("mss_buffer_occupancy").decrement(1.0);
            metrics::histogram!("mss_waiting_time_seconds", "source" => "source-3").record(12.5);
        });

        let locked = metrics.lock().unwrap();
        assert_eq!(
            locked.get_counter("mss_requests_rejected_total", &[("source", "source-3")]),
            Some(2)
        );
        assert_eq!(locked.get_counter_simple("mss_stale_departures_total"), Some(1));
        assert_eq!(locked.get_gauge("mss_buffer_occupancy", &[]), Some(3.0));

        let hist = locked
            .get_histogram_stats("mss_waiting_time_seconds", &[("source", "source-3")])
            .unwrap();
        assert_eq!(hist.count, 1);
        assert_eq!(hist.max, 12.5);
    }

    #[test]
    fn recording_continues_after_lock_is_poisoned() {
        let metrics = Arc::new(Mutex::new(SimulationMetrics::new()));
        let shared = metrics.clone();
        let _ = std::thread::spawn(move || {
            let _guard = shared.lock().unwrap();
            panic!("poison the lock");
        })
        .join();
        assert!(metrics.is_poisoned());

        with_simulation_metrics_recorder(&metrics, || {
            metrics::counter!("mss_requests_generated_total").increment(3);
        });
        let locked = metrics.lock().unwrap_or_else(PoisonError::into_inner);
        assert_eq!(locked.get_counter_simple("mss_requests_generated_total"), Some(3));
    }

    #[test]
    fn nothing_is_captured_outside_the_closure() {
        let metrics = Arc::new(Mutex::new(SimulationMetrics::new()));
        with_simulation_metrics_recorder(&metrics, || {});
        metrics::counter!("outside_total").increment(1);
        assert_eq!(metrics.lock().unwrap().get_counter_simple("outside_total"), None);
    }
}
