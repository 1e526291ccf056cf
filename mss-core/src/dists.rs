//! Distribution traits and implementations for arrival patterns and service times
//!
//! Sources draw inter-arrival gaps from an [`ArrivalPattern`], servers draw service
//! durations from a [`ServiceTimeDistribution`]. The reference center uses
//! [`UniformArrivals`] and [`ExponentialServiceTime`]; the constant variants exist
//! for scripted scenarios where every event time must be known up front.
//!
//! Every random implementation owns its generator, seeded explicitly, so two
//! entities never share generator state.

use crate::error::{ensure_in_range, ConfigError};
use crate::time::SimTime;
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Exp, Uniform};
use std::time::Duration;

/// Largest accepted mean, in seconds. Keeps the uniform range `[0, 2 * mean)`
/// inside what a [`SimTime`] can hold.
pub const MAX_MEAN_SECS: f64 = SimTime::MAX_SECS / 2.0;

/// Convert a drawn sample to a `Duration`, saturating at the largest `SimTime`.
fn sample_duration(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs.min(SimTime::MAX_SECS)).unwrap_or(Duration::ZERO)
}

/// Source of inter-arrival gaps for one request stream.
pub trait ArrivalPattern: Send {
    /// Gap between the previous arrival and the next one.
    fn next_interval(&mut self) -> Duration;

    /// Configured mean gap.
    fn mean(&self) -> Duration;
}

/// Source of service durations for one server.
pub trait ServiceTimeDistribution: Send {
    /// Draw one service duration.
    fn sample(&mut self) -> Duration;

    /// Configured mean service time.
    fn mean(&self) -> Duration;
}

// =============================================================================
// Arrival Pattern Implementations
// =============================================================================

/// Uniform inter-arrival gaps on `[0, 2 * mean)`.
///
/// The sample mean of the gaps converges to the configured interval.
pub struct UniformArrivals {
    mean: Duration,
    rng: StdRng,
    dist: Uniform<f64>,
}

impl UniformArrivals {
    /// Create a uniform arrival pattern with mean gap `mean_secs`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NonPositive`] if the mean is not a positive finite number
    /// and [`ConfigError::OutOfRange`] if it exceeds [`MAX_MEAN_SECS`].
    pub fn new(mean_secs: f64, seed: u64) -> Result<Self, ConfigError> {
        Self::with_rng(mean_secs, StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(mean_secs: f64, rng: StdRng) -> Result<Self, ConfigError> {
        let mean_secs = ensure_in_range("mean_interval", mean_secs, MAX_MEAN_SECS)?;
        Ok(Self {
            mean: Duration::from_secs_f64(mean_secs),
            rng,
            dist: Uniform::new(0.0, 2.0 * mean_secs),
        })
    }
}

impl ArrivalPattern for UniformArrivals {
    fn next_interval(&mut self) -> Duration {
        sample_duration(self.dist.sample(&mut self.rng))
    }

    fn mean(&self) -> Duration {
        self.mean
    }
}

/// Fixed inter-arrival gap.
#[derive(Debug, Clone)]
pub struct ConstantArrivals {
    interval: Duration,
}

impl ConstantArrivals {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl ArrivalPattern for ConstantArrivals {
    fn next_interval(&mut self) -> Duration {
        self.interval
    }

    fn mean(&self) -> Duration {
        self.interval
    }
}

// =============================================================================
// Service Time Distribution Implementations
// =============================================================================

/// Exponentially distributed service times with a given mean.
pub struct ExponentialServiceTime {
    mean: Duration,
    rng: StdRng,
    exp_dist: Exp<f64>,
}

impl ExponentialServiceTime {
    /// Create an exponential service time distribution with mean `mean_secs`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NonPositive`] if the mean is not a positive finite number
    /// and [`ConfigError::OutOfRange`] if it exceeds [`MAX_MEAN_SECS`].
    pub fn new(mean_secs: f64, seed: u64) -> Result<Self, ConfigError> {
        Self::with_rng(mean_secs, StdRng::seed_from_u64(seed))
    }

    pub fn with_rng(mean_secs: f64, rng: StdRng) -> Result<Self, ConfigError> {
        let mean_secs = ensure_in_range("mean_service_time", mean_secs, MAX_MEAN_SECS)?;
        let exp_dist = Exp::new(1.0 / mean_secs).map_err(|_| ConfigError::NonPositive {
            field: "mean_service_time".to_string(),
            value: mean_secs,
        })?;
        Ok(Self {
            mean: Duration::from_secs_f64(mean_secs),
            rng,
            exp_dist,
        })
    }

    /// Rate parameter (services per time unit).
    pub fn rate(&self) -> f64 {
        1.0 / self.mean.as_secs_f64()
    }
}

impl ServiceTimeDistribution for ExponentialServiceTime {
    fn sample(&mut self) -> Duration {
        sample_duration(self.exp_dist.sample(&mut self.rng))
    }

    fn mean(&self) -> Duration {
        self.mean
    }
}

/// Always returns the same service time.
#[derive(Debug, Clone)]
pub struct ConstantServiceTime {
    duration: Duration,
}

impl ConstantServiceTime {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }
}

impl ServiceTimeDistribution for ConstantServiceTime {
    fn sample(&mut self) -> Duration {
        self.duration
    }

    fn mean(&self) -> Duration {
        self.duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_arrivals_stay_in_range() {
        let mut pattern = UniformArrivals::new(5.0, 7).unwrap();
        for _ in 0..1_000 {
            let gap = pattern.next_interval();
            assert!(gap < Duration::from_secs(10));
        }
        assert_eq!(pattern.mean(), Duration::from_secs(5));
    }

    #[test]
    fn test_uniform_arrivals_sample_mean() {
        let mut pattern = UniformArrivals::new(10.0, 11).unwrap();
        let n = 20_000;
        let total: f64 = (0..n).map(|_| pattern.next_interval().as_secs_f64()).sum();
        let mean = total / n as f64;
        assert!((mean - 10.0).abs() < 0.25, "sample mean {mean} too far from 10");
    }

    #[test]
    fn test_uniform_arrivals_invalid_mean() {
        assert!(matches!(
            UniformArrivals::new(0.0, 1),
            Err(ConfigError::NonPositive { .. })
        ));
        assert!(UniformArrivals::new(f64::NAN, 1).is_err());
    }

    #[test]
    fn test_same_seed_same_gaps() {
        let mut a = UniformArrivals::new(3.0, 99).unwrap();
        let mut b = UniformArrivals::new(3.0, 99).unwrap();
        for _ in 0..50 {
            assert_eq!(a.next_interval(), b.next_interval());
        }
    }

    #[test]
    fn test_exponential_service_time() {
        let mut dist = ExponentialServiceTime::new(2.0, 5).unwrap();
        assert_eq!(dist.rate(), 0.5);
        assert_eq!(dist.mean(), Duration::from_secs(2));

        let n = 20_000;
        let total: f64 = (0..n).map(|_| dist.sample().as_secs_f64()).sum();
        let mean = total / n as f64;
        assert!((mean - 2.0).abs() < 0.1, "sample mean {mean} too far from 2");
    }

    #[test]
    fn test_exponential_invalid_mean() {
        assert!(ExponentialServiceTime::new(-1.0, 5).is_err());
    }

    #[test]
    fn test_oversized_mean_is_rejected() {
        assert!(matches!(
            UniformArrivals::new(1e308, 1),
            Err(ConfigError::OutOfRange { field, .. }) if field == "mean_interval"
        ));
        assert!(matches!(
            ExponentialServiceTime::new(MAX_MEAN_SECS * 1.5, 1),
            Err(ConfigError::OutOfRange { field, .. }) if field == "mean_service_time"
        ));
        assert!(matches!(
            UniformArrivals::new(f64::INFINITY, 1),
            Err(ConfigError::NonPositive { .. })
        ));
    }

    #[test]
    fn test_largest_mean_samples_stay_representable() {
        let mut arrivals = UniformArrivals::new(MAX_MEAN_SECS, 4).unwrap();
        let mut service = ExponentialServiceTime::new(MAX_MEAN_SECS, 4).unwrap();
        let limit = Duration::from_secs_f64(SimTime::MAX_SECS);
        for _ in 0..1_000 {
            assert!(arrivals.next_interval() <= limit);
            assert!(service.sample() <= limit);
        }
    }

    #[test]
    fn test_constant_variants() {
        let mut arrivals = ConstantArrivals::new(Duration::from_secs(3));
        let mut service = ConstantServiceTime::new(Duration::from_millis(250));
        assert_eq!(arrivals.next_interval(), Duration::from_secs(3));
        assert_eq!(arrivals.next_interval(), Duration::from_secs(3));
        assert_eq!(service.sample(), Duration::from_millis(250));
        assert_eq!(service.mean(), Duration::from_millis(250));
    }
}
