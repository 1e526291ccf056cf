//! Simulated clock values

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};
use std::time::Duration;

/// A point on the simulated time axis, in nanoseconds since the start of the run.
///
/// Configuration and statistics speak in `f64` time units (treated as seconds);
/// the engine itself only ever compares and offsets `SimTime` values, which keeps
/// event ordering exact and reproducible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SimTime(u64);

impl SimTime {
    /// Largest value, in seconds, that fits in a `SimTime`.
    pub const MAX_SECS: f64 = (u64::MAX as f64) / 1_000_000_000.0;

    /// The start of the run.
    pub const fn zero() -> Self {
        SimTime(0)
    }

    pub const fn from_nanos(nanos: u64) -> Self {
        SimTime(nanos)
    }

    pub const fn from_millis(millis: u64) -> Self {
        SimTime(millis * 1_000_000)
    }

    pub const fn from_secs(secs: u64) -> Self {
        SimTime(secs * 1_000_000_000)
    }

    /// Saturates at the largest representable time.
    pub fn from_duration(duration: Duration) -> Self {
        SimTime(saturating_nanos(duration))
    }

    pub fn as_duration(&self) -> Duration {
        Duration::from_nanos(self.0)
    }

    pub const fn as_nanos(&self) -> u64 {
        self.0
    }

    /// Time since the start of the run, in seconds.
    pub fn as_secs_f64(&self) -> f64 {
        self.as_duration().as_secs_f64()
    }

    /// Elapsed time since `earlier`, saturating at zero.
    pub fn duration_since(&self, earlier: SimTime) -> Duration {
        Duration::from_nanos(self.0.saturating_sub(earlier.0))
    }
}

impl Add<Duration> for SimTime {
    type Output = SimTime;

    fn add(self, rhs: Duration) -> Self::Output {
        SimTime(self.0.saturating_add(saturating_nanos(rhs)))
    }
}

fn saturating_nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}

impl Sub<SimTime> for SimTime {
    type Output = Duration;

    fn sub(self, rhs: SimTime) -> Self::Output {
        self.duration_since(rhs)
    }
}

impl Default for SimTime {
    fn default() -> Self {
        SimTime::zero()
    }
}

impl From<f64> for SimTime {
    /// Convert from seconds (as f64) to SimTime
    ///
    /// # Examples
    /// ```
    /// # use mss_core::SimTime;
    /// let time = SimTime::from(2.5);
    /// assert_eq!(time.as_nanos(), 2_500_000_000);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if the input is negative, infinite, or NaN.
    fn from(secs: f64) -> Self {
        if !secs.is_finite() {
            panic!("SimTime cannot be created from non-finite value: {secs}");
        }
        if secs < 0.0 {
            panic!("SimTime cannot be negative: {secs}");
        }

        if secs > Self::MAX_SECS {
            panic!("SimTime value too large: {secs} seconds (max: {} seconds)", Self::MAX_SECS);
        }

        SimTime::from_nanos((secs * 1_000_000_000.0) as u64)
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}", self.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simtime_units() {
        assert_eq!(SimTime::zero().as_nanos(), 0);
        assert_eq!(SimTime::from_millis(3).as_nanos(), 3_000_000);
        assert_eq!(SimTime::from_secs(2).as_nanos(), 2_000_000_000);
        assert_eq!(SimTime::from_secs(7).as_secs_f64(), 7.0);
    }

    #[test]
    fn test_simtime_arithmetic() {
        let t1 = SimTime::from_secs(10);
        let t2 = SimTime::from_secs(4);

        assert_eq!(t1 + Duration::from_secs(5), SimTime::from_secs(15));
        assert_eq!(t1 - t2, Duration::from_secs(6));
        // saturates instead of going negative
        assert_eq!(t2 - t1, Duration::ZERO);
    }

    #[test]
    fn test_simtime_from_f64() {
        assert_eq!(SimTime::from(1.0).as_nanos(), 1_000_000_000);
        assert_eq!(SimTime::from(0.25).as_nanos(), 250_000_000);
        assert_eq!(SimTime::from(1000.0), SimTime::from_secs(1000));
    }

    #[test]
    #[should_panic(expected = "SimTime cannot be negative")]
    fn test_simtime_from_negative_f64() {
        let _ = SimTime::from(-1.0);
    }

    #[test]
    #[should_panic(expected = "SimTime cannot be created from non-finite value")]
    fn test_simtime_from_nan_f64() {
        let _ = SimTime::from(f64::NAN);
    }

    #[test]
    fn test_simtime_add_saturates() {
        let near_end = SimTime::from_nanos(u64::MAX - 10);
        assert_eq!(near_end + Duration::from_secs(1), SimTime::from_nanos(u64::MAX));
        assert_eq!(SimTime::zero() + Duration::MAX, SimTime::from_nanos(u64::MAX));
        assert_eq!(SimTime::from_duration(Duration::MAX), SimTime::from_nanos(u64::MAX));
    }

    #[test]
    fn test_simtime_display() {
        assert_eq!(SimTime::from_millis(12_345).to_string(), "12.345");
    }
}
