//! Error types for metrics collection

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("Invalid metric: {0}")]
    InvalidMetric(String),

    #[error("Histogram error: {0}")]
    Histogram(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
