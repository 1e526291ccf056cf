//! Error types for the service center engine

use crate::types::{RequestId, ServerId, SourceId};
use thiserror::Error;

/// Fatal errors: a broken invariant upstream of the failing call.
///
/// These abort a run; they never turn into a statistic.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("Precondition violated in {operation}: {reason}")]
    PreconditionViolation {
        operation: &'static str,
        reason: String,
    },

    #[error("Buffer reports full but no occupied slot found (capacity: {capacity})")]
    NoVictimFound { capacity: usize },

    #[error("Unknown server: {0}")]
    UnknownServer(ServerId),

    #[error("Unknown source: {0}")]
    UnknownSource(SourceId),

    #[error("Invalid configuration: {0}")]
    Configuration(#[from] ConfigError),
}

impl SimError {
    pub(crate) fn precondition(operation: &'static str, reason: impl Into<String>) -> Self {
        SimError::PreconditionViolation {
            operation,
            reason: reason.into(),
        }
    }
}

/// Recoverable event-level conditions, handled inside the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    #[error("Stale departure for {server}: expected request {expected}, server holds {actual:?}")]
    StaleDeparture {
        server: ServerId,
        expected: RequestId,
        actual: Option<RequestId>,
    },
}

/// Errors raised while validating simulation parameters
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("Field '{field}' must be positive and finite, got {value}")]
    NonPositive { field: String, value: f64 },

    #[error("Field '{field}' must not exceed {max}, got {value}")]
    OutOfRange { field: String, value: f64, max: f64 },

    #[error("Buffer capacity must be at least 1")]
    ZeroCapacity,

    #[error("At least one request source is required")]
    NoSources,

    #[error("At least one server is required")]
    NoServers,
}

/// Ensure `value` is a usable positive time parameter.
pub(crate) fn ensure_positive(field: impl Into<String>, value: f64) -> Result<f64, ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(ConfigError::NonPositive {
            field: field.into(),
            value,
        })
    }
}

/// Ensure `value` is positive, finite and no larger than `max`.
pub(crate) fn ensure_in_range(field: impl Into<String>, value: f64, max: f64) -> Result<f64, ConfigError> {
    let field = field.into();
    if value > max && value.is_finite() {
        return Err(ConfigError::OutOfRange { field, value, max });
    }
    ensure_positive(field, value)
}
