//! Simulation parameters
//!
//! All time values are `f64` time units (seconds). [`SimulationConfig::default`] is
//! the reference service center: three sources of decreasing priority, three
//! servers, a five-slot buffer and a horizon of 1000.

use crate::dists::MAX_MEAN_SECS;
use crate::error::{ensure_in_range, ConfigError};
use crate::request::Priority;
use crate::time::SimTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Mean gap between arrivals.
    pub mean_interval: f64,
    pub priority: Priority,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub mean_service_time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Master seed; every source and server derives its own stream from it.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// End of the simulated horizon.
    pub horizon: f64,
    pub buffer_capacity: usize,
    pub sources: Vec<SourceConfig>,
    pub servers: Vec<ServerConfig>,
}

fn default_seed() -> u64 {
    1
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            horizon: 1000.0,
            buffer_capacity: 5,
            sources: vec![
                SourceConfig {
                    mean_interval: 10.0,
                    priority: Priority::Warranty,
                },
                SourceConfig {
                    mean_interval: 7.0,
                    priority: Priority::Corporate,
                },
                SourceConfig {
                    mean_interval: 5.0,
                    priority: Priority::Private,
                },
            ],
            servers: vec![ServerConfig { mean_service_time: 10.0 }; 3],
        }
    }
}

impl SimulationConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_horizon(mut self, horizon: f64) -> Self {
        self.horizon = horizon;
        self
    }

    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    /// Give every server the same mean service time.
    pub fn with_shared_service_time(mut self, mean_service_time: f64) -> Self {
        for server in &mut self.servers {
            server.mean_service_time = mean_service_time;
        }
        self
    }

    /// Check every parameter before anything is built from it.
    ///
    /// # Errors
    ///
    /// The first invalid parameter found, as a [`ConfigError`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        ensure_in_range("horizon", self.horizon, SimTime::MAX_SECS)?;
        if self.buffer_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.sources.is_empty() {
            return Err(ConfigError::NoSources);
        }
        if self.servers.is_empty() {
            return Err(ConfigError::NoServers);
        }
        for (i, source) in self.sources.iter().enumerate() {
            ensure_in_range(format!("sources[{i}].mean_interval"), source.mean_interval, MAX_MEAN_SECS)?;
        }
        for (i, server) in self.servers.iter().enumerate() {
            ensure_in_range(
                format!("servers[{i}].mean_service_time"),
                server.mean_service_time,
                MAX_MEAN_SECS,
            )?;
        }
        Ok(())
    }
}
