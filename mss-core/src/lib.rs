//! Discrete event engine for a multi-source, finite-buffer, multi-server service center.
//!
//! Requests of three priority tiers arrive from independent sources, wait in a
//! fixed-size ring buffer and are served one at a time by a pool of servers.
//! When the buffer is full, the most recently buffered request is evicted to make
//! room. The engine records, per source, how many requests were generated,
//! rejected and completed, and the mean and variance of time in system, waiting
//! time and service time.
//!
//! # Architecture Overview
//!
//! - [`SimulationEngine`] owns everything and advances the clock one event at a time.
//! - [`EventCalendar`] orders pending arrivals and departures by `(time, sequence)`.
//! - [`Dispatcher`] owns the [`Buffer`] and the [`ServiceUnit`]s and decides
//!   admission, eviction and which request goes to which server.
//! - [`Executor`] drives the engine to completion, for a number of steps, or until
//!   a [`CancellationToken`] fires.
//!
//! # Basic Usage
//!
//! ```rust
//! use mss_core::{Executor, SimulationConfig, SimulationEngine};
//!
//! let config = SimulationConfig::default().with_seed(7);
//! let mut engine = SimulationEngine::from_config(&config).unwrap();
//! engine.execute(Executor::to_completion()).unwrap();
//!
//! let report = engine.report();
//! println!("{report}");
//! ```
//!
//! # Time Model
//!
//! All timing uses [`SimTime`], a nanosecond count on the simulated axis. Parameters
//! and statistics are expressed in seconds. Every random stream is seeded from the
//! configuration, so a run is fully reproducible.

pub mod buffer;
pub mod calendar;
pub mod config;
pub mod dispatcher;
pub mod dists;
pub mod engine;
pub mod error;
pub mod execute;
pub mod logging;
pub mod randomness;
pub mod report;
pub mod request;
pub mod server;
pub mod source;
pub mod stats;
pub mod time;
pub mod types;

pub use buffer::Buffer;
pub use calendar::{Event, EventCalendar, EventKind};
pub use config::{ServerConfig, SimulationConfig, SourceConfig};
pub use dispatcher::{Admission, Assignment, AssignmentOutcome, Dispatcher};
pub use dists::{ArrivalPattern, ServiceTimeDistribution};
pub use engine::{CompletionRecord, EngineBuilder, EngineState, SimulationEngine, StepOutcome, StepReport};
pub use error::{ConfigError, EventError, SimError};
pub use execute::{CancellationToken, Execute, Executor, RunOutcome, RunSummary};
pub use logging::{
    event_span, init_detailed_simulation_logging, init_simulation_logging, init_simulation_logging_with_level,
    simulation_span,
};
pub use report::{EngineSnapshot, SimulationReport};
pub use request::{Priority, Request, RequestStatus};
pub use server::ServiceUnit;
pub use source::RequestSource;
pub use stats::{RunningStats, SourceStatistics};
pub use time::SimTime;
pub use types::{EventId, RequestId, ServerId, SourceId};
