//! In-memory store for everything emitted through the `metrics` facade
//!
//! Metrics are keyed by name plus a sorted label set, so lookups do not depend on
//! the order labels were written in at the call site. Histograms keep exact count,
//! sum, min and max, and an `hdrhistogram` at micro-unit resolution for quantiles.

use crate::error::MetricsError;
use hdrhistogram::Histogram as HdrHistogram;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::warn;

/// Recorded values are multiplied by this before they enter the HDR histogram.
const HISTOGRAM_SCALE: f64 = 1_000_000.0;
const HISTOGRAM_SIGFIGS: u8 = 3;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct MetricKey {
    name: String,
    labels: Vec<(String, String)>,
}

impl MetricKey {
    fn new(name: &str, labels: &[(&str, &str)]) -> Self {
        Self::from_pairs(name, labels.iter().map(|(k, v)| (k.to_string(), v.to_string())))
    }

    fn from_owned(name: &str, labels: &[(String, String)]) -> Self {
        Self::from_pairs(name, labels.iter().cloned())
    }

    fn from_pairs(name: &str, labels: impl Iterator<Item = (String, String)>) -> Self {
        let mut labels: Vec<(String, String)> = labels.collect();
        labels.sort();
        Self {
            name: name.to_string(),
            labels,
        }
    }

    fn label_map(&self) -> BTreeMap<String, String> {
        self.labels.iter().cloned().collect()
    }
}

#[derive(Debug)]
struct HistogramData {
    hdr: HdrHistogram<u64>,
    count: usize,
    sum: f64,
    min: f64,
    max: f64,
}

impl HistogramData {
    fn new() -> Result<Self, MetricsError> {
        let hdr = HdrHistogram::new(HISTOGRAM_SIGFIGS).map_err(|e| MetricsError::Histogram(e.to_string()))?;
        Ok(Self {
            hdr,
            count: 0,
            sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
        })
    }

    fn record(&mut self, value: f64) -> Result<(), MetricsError> {
        self.hdr
            .record((value * HISTOGRAM_SCALE).round() as u64)
            .map_err(|e| MetricsError::Histogram(e.to_string()))?;
        self.count += 1;
        self.sum += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        Ok(())
    }

    fn quantile(&self, q: f64) -> f64 {
        self.hdr.value_at_quantile(q) as f64 / HISTOGRAM_SCALE
    }

    fn stats(&self) -> HistogramStats {
        HistogramStats {
            count: self.count,
            sum: self.sum,
            min: self.min,
            max: self.max,
            mean: self.sum / self.count as f64,
            median: self.quantile(0.5),
            p95: self.quantile(0.95),
            p99: self.quantile(0.99),
        }
    }
}

/// Summary of one histogram, in the units values were recorded in.
///
/// `count`, `sum`, `min`, `max` and `mean` are exact; the quantiles carry the
/// HDR histogram's three significant digits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistogramStats {
    pub count: usize,
    pub sum: f64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub median: f64,
    pub p95: f64,
    pub p99: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CounterEntry {
    pub name: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    pub value: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GaugeEntry {
    pub name: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistogramEntry {
    pub name: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    pub stats: HistogramStats,
}

/// Point-in-time copy of every metric, sorted by name then labels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub counters: Vec<CounterEntry>,
    pub gauges: Vec<GaugeEntry>,
    pub histograms: Vec<HistogramEntry>,
}

impl MetricsSnapshot {
    /// # Errors
    ///
    /// [`MetricsError::Serialization`] if encoding fails.
    pub fn to_json(&self, pretty: bool) -> Result<String, MetricsError> {
        let json = if pretty {
            serde_json::to_string_pretty(self)?
        } else {
            serde_json::to_string(self)?
        };
        Ok(json)
    }
}

/// Counters, gauges and histograms collected during a simulation run
#[derive(Debug, Default)]
pub struct SimulationMetrics {
    counters: BTreeMap<MetricKey, u64>,
    gauges: BTreeMap<MetricKey, f64>,
    histograms: BTreeMap<MetricKey, HistogramData>,
}

impl SimulationMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_counter(&mut self, name: &str, value: u64, labels: &[(&str, &str)]) {
        *self.counters.entry(MetricKey::new(name, labels)).or_insert(0) += value;
    }

    pub fn record_gauge(&mut self, name: &str, value: f64, labels: &[(&str, &str)]) {
        self.gauges.insert(MetricKey::new(name, labels), value);
    }

    /// Record one histogram sample.
    ///
    /// # Errors
    ///
    /// [`MetricsError::InvalidMetric`] for negative or non-finite values.
    pub fn record_histogram(&mut self, name: &str, value: f64, labels: &[(&str, &str)]) -> Result<(), MetricsError> {
        self.record_histogram_at(MetricKey::new(name, labels), value)
    }

    pub(crate) fn increment_counter_by_owned(&mut self, name: &str, value: u64, labels: &[(String, String)]) {
        *self.counters.entry(MetricKey::from_owned(name, labels)).or_insert(0) += value;
    }

    pub(crate) fn set_counter_absolute_owned(&mut self, name: &str, value: u64, labels: &[(String, String)]) {
        let counter = self.counters.entry(MetricKey::from_owned(name, labels)).or_insert(0);
        *counter = (*counter).max(value);
    }

    pub(crate) fn increment_gauge_owned(&mut self, name: &str, delta: f64, labels: &[(String, String)]) {
        *self.gauges.entry(MetricKey::from_owned(name, labels)).or_insert(0.0) += delta;
    }

    pub(crate) fn record_gauge_owned(&mut self, name: &str, value: f64, labels: &[(String, String)]) {
        self.gauges.insert(MetricKey::from_owned(name, labels), value);
    }

    pub(crate) fn record_histogram_owned(&mut self, name: &str, value: f64, labels: &[(String, String)]) {
        if let Err(e) = self.record_histogram_at(MetricKey::from_owned(name, labels), value) {
            warn!(metric = name, error = %e, "Dropping histogram sample");
        }
    }

    fn record_histogram_at(&mut self, key: MetricKey, value: f64) -> Result<(), MetricsError> {
        if !value.is_finite() || value < 0.0 {
            return Err(MetricsError::InvalidMetric(format!(
                "{} received {value}; histograms hold finite non-negative values",
                key.name
            )));
        }
        let histogram = match self.histograms.entry(key) {
            std::collections::btree_map::Entry::Occupied(entry) => entry.into_mut(),
            std::collections::btree_map::Entry::Vacant(entry) => entry.insert(HistogramData::new()?),
        };
        histogram.record(value)
    }

    /// Counter value for an exact label set (order-insensitive).
    pub fn get_counter(&self, name: &str, labels: &[(&str, &str)]) -> Option<u64> {
        self.counters.get(&MetricKey::new(name, labels)).copied()
    }

    /// Counter recorded without labels.
    pub fn get_counter_simple(&self, name: &str) -> Option<u64> {
        self.get_counter(name, &[])
    }

    /// Sum of a counter over every label set.
    pub fn counter_total(&self, name: &str) -> u64 {
        self.counters
            .iter()
            .filter(|(key, _)| key.name == name)
            .map(|(_, value)| value)
            .sum()
    }

    pub fn get_gauge(&self, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
        self.gauges.get(&MetricKey::new(name, labels)).copied()
    }

    pub fn get_histogram_stats(&self, name: &str, labels: &[(&str, &str)]) -> Option<HistogramStats> {
        self.histograms.get(&MetricKey::new(name, labels)).map(HistogramData::stats)
    }

    pub fn get_metrics_snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            counters: self
                .counters
                .iter()
                .map(|(key, value)| CounterEntry {
                    name: key.name.clone(),
                    labels: key.label_map(),
                    value: *value,
                })
                .collect(),
            gauges: self
                .gauges
                .iter()
                .map(|(key, value)| GaugeEntry {
                    name: key.name.clone(),
                    labels: key.label_map(),
                    value: *value,
                })
                .collect(),
            histograms: self
                .histograms
                .iter()
                .map(|(key, data)| HistogramEntry {
                    name: key.name.clone(),
                    labels: key.label_map(),
                    stats: data.stats(),
                })
                .collect(),
        }
    }

    /// Clear all metrics data
    pub fn clear(&mut self) {
        self.counters.clear();
        self.gauges.clear();
        self.histograms.clear();
    }
}
