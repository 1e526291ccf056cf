//! The simulation engine: owns every component and advances the clock one event at a time.
//!
//! One [`SimulationEngine::step`] pops the earliest calendar event and applies it:
//!
//! - **Arrival**: count it, stamp the buffer entry time, admit the request (possibly
//!   evicting the most recent waiting one), try one assignment, and schedule the
//!   source's next arrival.
//! - **Departure**: if the named server still serves the named request, complete it,
//!   fold the request's times into the per-source statistics and try one assignment;
//!   otherwise skip it as stale without touching any statistic.
//!
//! Either way one more assignment is attempted before the step ends. An event later
//! than the horizon is discarded and the engine moves to [`EngineState::Finished`].

use std::time::Duration;

use metrics::{counter, gauge, histogram};
use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::buffer::Buffer;
use crate::calendar::{Event, EventCalendar, EventKind};
use crate::config::SimulationConfig;
use crate::dispatcher::{Assignment, AssignmentOutcome, Dispatcher};
use crate::dists::{ArrivalPattern, ExponentialServiceTime, ServiceTimeDistribution, UniformArrivals};
use crate::error::{ensure_positive, ConfigError, EventError, SimError};
use crate::execute::{Execute, RunSummary};
use crate::logging::{event_span, events, simulation_span};
use crate::randomness::{entity_rng, SEED_DOMAIN_SERVER, SEED_DOMAIN_SOURCE};
use crate::report::{EngineSnapshot, SimulationReport};
use crate::request::{Priority, Request};
use crate::server::ServiceUnit;
use crate::source::RequestSource;
use crate::stats::SourceStatistics;
use crate::time::SimTime;
use crate::types::{EventId, RequestId, ServerId, SourceId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EngineState {
    /// No event processed yet.
    Idle,
    Running,
    /// Calendar exhausted or horizon passed. Terminal.
    Finished,
}

/// Times of one completed request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CompletionRecord {
    pub request: RequestId,
    pub source: SourceId,
    pub server: ServerId,
    pub time_in_system: Duration,
    pub waiting: Duration,
    pub service: Duration,
}

/// Everything one step did, for observers and the display layer.
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    pub event_id: EventId,
    pub time: SimTime,
    pub kind: EventKind,
    /// Slot an arriving request was placed in.
    pub admission_slot: Option<usize>,
    /// Request evicted to admit the arrival, marked `Rejected`.
    pub evicted: Option<Request>,
    /// Services started during the step.
    pub assignments: Vec<Assignment>,
    pub completion: Option<CompletionRecord>,
    /// Set when a departure no longer matched its server.
    pub stale: Option<EventError>,
}

impl StepReport {
    fn new(event_id: EventId, time: SimTime, kind: EventKind) -> Self {
        Self {
            event_id,
            time,
            kind,
            admission_slot: None,
            evicted: None,
            assignments: Vec::new(),
            completion: None,
            stale: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    Processed(StepReport),
    Finished,
}

/// Programmatic construction with arbitrary arrival and service distributions.
///
/// ```
/// use mss_core::{EngineBuilder, Priority, SimTime};
/// use mss_core::dists::{ConstantArrivals, ConstantServiceTime};
/// use std::time::Duration;
///
/// let engine = EngineBuilder::new(SimTime::from_secs(100), 2)
///     .source(Priority::Warranty, ConstantArrivals::new(Duration::from_secs(1)))
///     .server(ConstantServiceTime::new(Duration::from_secs(3)))
///     .build()
///     .unwrap();
/// assert_eq!(engine.pending_events(), 1);
/// ```
pub struct EngineBuilder {
    horizon: SimTime,
    buffer_capacity: usize,
    sources: Vec<(Priority, Box<dyn ArrivalPattern>)>,
    servers: Vec<Box<dyn ServiceTimeDistribution>>,
}

impl EngineBuilder {
    pub fn new(horizon: SimTime, buffer_capacity: usize) -> Self {
        Self {
            horizon,
            buffer_capacity,
            sources: Vec::new(),
            servers: Vec::new(),
        }
    }

    /// Add a source; sources are numbered in insertion order.
    pub fn source(self, priority: Priority, arrivals: impl ArrivalPattern + 'static) -> Self {
        self.boxed_source(priority, Box::new(arrivals))
    }

    pub fn boxed_source(mut self, priority: Priority, arrivals: Box<dyn ArrivalPattern>) -> Self {
        self.sources.push((priority, arrivals));
        self
    }

    /// Add a server; servers are numbered in insertion order.
    pub fn server(self, service_time: impl ServiceTimeDistribution + 'static) -> Self {
        self.boxed_server(Box::new(service_time))
    }

    pub fn boxed_server(mut self, service_time: Box<dyn ServiceTimeDistribution>) -> Self {
        self.servers.push(service_time);
        self
    }

    /// Build the engine and schedule the first arrival of every source.
    ///
    /// A center without servers is accepted: it only fills its buffer and evicts.
    ///
    /// # Errors
    ///
    /// [`SimError::Configuration`] for a zero horizon, zero capacity or no sources.
    pub fn build(self) -> Result<SimulationEngine, SimError> {
        ensure_positive("horizon", self.horizon.as_secs_f64())?;
        if self.sources.is_empty() {
            return Err(ConfigError::NoSources.into());
        }
        let buffer = Buffer::new(self.buffer_capacity)?;

        let sources: Vec<RequestSource> = self
            .sources
            .into_iter()
            .enumerate()
            .map(|(i, (priority, arrivals))| RequestSource::new(SourceId(i), priority, arrivals))
            .collect();
        let servers = self
            .servers
            .into_iter()
            .enumerate()
            .map(|(i, service_time)| ServiceUnit::new(ServerId(i), service_time))
            .collect();

        let mut engine = SimulationEngine {
            state: EngineState::Idle,
            clock: SimTime::zero(),
            horizon: self.horizon,
            calendar: EventCalendar::new(),
            dispatcher: Dispatcher::new(buffer, servers),
            statistics: vec![SourceStatistics::default(); sources.len()],
            sources,
            next_request_id: 1,
            steps: 0,
            stale_departures: 0,
        };
        for index in 0..engine.sources.len() {
            engine.schedule_next_arrival(index);
        }

        info!(
            sources = engine.sources.len(),
            servers = engine.dispatcher.servers().len(),
            buffer_capacity = engine.dispatcher.buffer().capacity(),
            horizon = %engine.horizon,
            "Service center built"
        );
        Ok(engine)
    }
}

/// The discrete-event core of the service center.
///
/// See the [module documentation](self) for the step semantics.
pub struct SimulationEngine {
    state: EngineState,
    clock: SimTime,
    horizon: SimTime,
    calendar: EventCalendar,
    dispatcher: Dispatcher,
    sources: Vec<RequestSource>,
    statistics: Vec<SourceStatistics>,
    next_request_id: u64,
    steps: u64,
    stale_departures: u64,
}

impl SimulationEngine {
    /// Build the engine described by `config` with the reference distributions:
    /// uniform inter-arrival gaps and exponential service times, each entity
    /// seeded from `config.seed`.
    ///
    /// # Errors
    ///
    /// [`SimError::Configuration`] if the configuration does not validate.
    pub fn from_config(config: &SimulationConfig) -> Result<Self, SimError> {
        config.validate()?;

        let mut builder = EngineBuilder::new(SimTime::from(config.horizon), config.buffer_capacity);
        for (i, source) in config.sources.iter().enumerate() {
            let rng = entity_rng(config.seed, SEED_DOMAIN_SOURCE, i as u64);
            builder = builder.source(source.priority, UniformArrivals::with_rng(source.mean_interval, rng)?);
        }
        for (i, server) in config.servers.iter().enumerate() {
            let rng = entity_rng(config.seed, SEED_DOMAIN_SERVER, i as u64);
            builder = builder.server(ExponentialServiceTime::with_rng(server.mean_service_time, rng)?);
        }
        builder.build()
    }

    pub fn builder(horizon: SimTime, buffer_capacity: usize) -> EngineBuilder {
        EngineBuilder::new(horizon, buffer_capacity)
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_finished(&self) -> bool {
        self.state == EngineState::Finished
    }

    /// Current simulated time.
    pub fn clock(&self) -> SimTime {
        self.clock
    }

    pub fn horizon(&self) -> SimTime {
        self.horizon
    }

    pub fn calendar(&self) -> &EventCalendar {
        &self.calendar
    }

    pub fn pending_events(&self) -> usize {
        self.calendar.len()
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn sources(&self) -> &[RequestSource] {
        &self.sources
    }

    /// Per-source statistics, indexed by source position.
    pub fn statistics(&self) -> &[SourceStatistics] {
        &self.statistics
    }

    pub fn source_statistics(&self, source: SourceId) -> Option<&SourceStatistics> {
        self.statistics.get(source.index())
    }

    /// Events processed so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Departures skipped because their server no longer matched.
    pub fn stale_departures(&self) -> u64 {
        self.stale_departures
    }

    /// Put an externally built event on the calendar.
    pub fn schedule(&mut self, event: Event) -> EventId {
        self.calendar.push(event)
    }

    /// Read-only view of the whole center for a display layer.
    pub fn snapshot(&self) -> EngineSnapshot {
        EngineSnapshot::capture(self)
    }

    /// End-of-run table; valid at any point, typically after the run.
    pub fn report(&self) -> SimulationReport {
        SimulationReport::capture(self)
    }

    /// Run with `executor` inside a `simulation` span.
    ///
    /// ```
    /// use mss_core::{Executor, SimulationConfig, SimulationEngine};
    ///
    /// let mut engine = SimulationEngine::from_config(&SimulationConfig::default()).unwrap();
    /// engine.execute(Executor::steps(100)).unwrap();
    /// assert_eq!(engine.steps(), 100);
    /// ```
    ///
    /// # Errors
    ///
    /// The first fatal error raised by a step.
    pub fn execute(&mut self, executor: impl Execute) -> Result<RunSummary, SimError> {
        let span = simulation_span("service-center");
        let _guard = span.enter();
        if self.state == EngineState::Idle {
            events::simulation_started("service-center", self.horizon, self.calendar.len());
        }
        executor.execute(self)
    }

    /// Process one event.
    ///
    /// # Errors
    ///
    /// Precondition violations and buffer inconsistencies; the engine state should be
    /// considered broken after an error.
    pub fn step(&mut self) -> Result<StepOutcome, SimError> {
        if self.state == EngineState::Finished {
            return Ok(StepOutcome::Finished);
        }
        let Some((event_id, event)) = self.calendar.pop_earliest() else {
            self.finish("calendar empty");
            return Ok(StepOutcome::Finished);
        };
        if event.time() > self.horizon {
            trace!(event_id = %event_id, time = %event.time(), "Discarding event past horizon");
            self.finish("horizon reached");
            return Ok(StepOutcome::Finished);
        }

        self.state = EngineState::Running;
        self.clock = event.time();
        self.steps += 1;

        let span = event_span(event_id, event.kind().as_str(), self.clock);
        let _guard = span.enter();

        let mut report = StepReport::new(event_id, self.clock, event.kind());
        match event {
            Event::Arrival { source, request, .. } => self.handle_arrival(source, request, &mut report)?,
            Event::Departure { server, request, .. } => {
                self.handle_departure(server, request, &mut report)?
            }
        }
        self.dispatch(&mut report)?;

        gauge!("mss_buffer_occupancy").set(self.dispatcher.buffer().occupied_count() as f64);
        Ok(StepOutcome::Processed(report))
    }

    fn handle_arrival(
        &mut self,
        source: SourceId,
        mut request: Request,
        report: &mut StepReport,
    ) -> Result<(), SimError> {
        let stats = self
            .statistics
            .get_mut(source.index())
            .ok_or(SimError::UnknownSource(source))?;
        stats.generated += 1;
        counter!("mss_requests_generated_total", "source" => source.to_string()).increment(1);

        request.stamp_buffer_entry(self.clock);
        debug!(request = %request.id(), %source, priority = %request.priority(), "Arrival");

        let admission = self.dispatcher.accept(request)?;
        report.admission_slot = Some(admission.slot);
        if let Some(victim) = admission.evicted {
            let victim_source = victim.source();
            let victim_stats = self
                .statistics
                .get_mut(victim_source.index())
                .ok_or(SimError::UnknownSource(victim_source))?;
            victim_stats.rejected += 1;
            counter!("mss_requests_rejected_total", "source" => victim_source.to_string()).increment(1);
            report.evicted = Some(victim);
        }

        self.dispatch(report)?;
        self.schedule_next_arrival(source.index());
        Ok(())
    }

    fn handle_departure(
        &mut self,
        server: ServerId,
        request: RequestId,
        report: &mut StepReport,
    ) -> Result<(), SimError> {
        let unit = self
            .dispatcher
            .server_mut(server)
            .ok_or(SimError::UnknownServer(server))?;

        let in_service = unit.current_request_id();
        if in_service != Some(request) {
            let stale = EventError::StaleDeparture {
                server,
                expected: request,
                actual: in_service,
            };
            warn!(error = %stale, "Skipping stale departure");
            self.stale_departures += 1;
            counter!("mss_stale_departures_total").increment(1);
            report.stale = Some(stale);
            return Ok(());
        }

        let done = unit.complete_service(self.clock)?;
        let source = done.request.source();
        let service = done.service_time();
        let time_in_system = self.clock - done.request.created_at();
        let waiting = time_in_system.saturating_sub(service);

        self.statistics
            .get_mut(source.index())
            .ok_or(SimError::UnknownSource(source))?
            .record_completion(
                time_in_system.as_secs_f64(),
                waiting.as_secs_f64(),
                service.as_secs_f64(),
            );
        counter!("mss_requests_completed_total", "source" => source.to_string()).increment(1);
        histogram!("mss_waiting_time_seconds", "source" => source.to_string()).record(waiting.as_secs_f64());
        histogram!("mss_service_time_seconds", "source" => source.to_string()).record(service.as_secs_f64());

        debug!(
            %request,
            %server,
            %source,
            time_in_system = time_in_system.as_secs_f64(),
            waiting = waiting.as_secs_f64(),
            "Departure"
        );
        report.completion = Some(CompletionRecord {
            request,
            source,
            server,
            time_in_system,
            waiting,
            service,
        });

        self.dispatch(report)
    }

    /// One dispatch attempt; a started service gets its departure scheduled.
    fn dispatch(&mut self, report: &mut StepReport) -> Result<(), SimError> {
        if let AssignmentOutcome::Assigned(assignment) = self.dispatcher.try_assign(self.clock)? {
            let unit = self
                .dispatcher
                .server_mut(assignment.server)
                .ok_or(SimError::UnknownServer(assignment.server))?;
            let duration = unit.service_duration();
            self.calendar.push(Event::Departure {
                time: assignment.started_at + duration,
                server: assignment.server,
                request: assignment.request,
            });
            report.assignments.push(assignment);
        }
        Ok(())
    }

    /// Draw the next arrival of source `index` and put it on the calendar.
    fn schedule_next_arrival(&mut self, index: usize) {
        let id = RequestId(self.next_request_id);
        self.next_request_id += 1;

        let source = &mut self.sources[index];
        let time = source.next_arrival_time(self.clock);
        let request = source.generate(time, id);
        self.calendar.push(Event::Arrival {
            time,
            source: source.id(),
            request,
        });
    }

    fn finish(&mut self, reason: &str) {
        self.state = EngineState::Finished;
        events::simulation_completed(reason, self.clock, self.steps);
    }
}

impl std::fmt::Debug for SimulationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulationEngine")
            .field("state", &self.state)
            .field("clock", &self.clock)
            .field("horizon", &self.horizon)
            .field("pending_events", &self.calendar.len())
            .field("steps", &self.steps)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dists::{ConstantArrivals, ConstantServiceTime};
    use crate::request::RequestStatus;

    fn secs(s: u64) -> Duration {
        Duration::from_secs(s)
    }

    fn processed(outcome: StepOutcome) -> StepReport {
        match outcome {
            StepOutcome::Processed(report) => report,
            StepOutcome::Finished => panic!("engine finished early"),
        }
    }

    #[test]
    fn builder_primes_one_arrival_per_source() {
        let engine = EngineBuilder::new(SimTime::from_secs(10), 2)
            .source(Priority::Private, ConstantArrivals::new(secs(2)))
            .source(Priority::Warranty, ConstantArrivals::new(secs(3)))
            .server(ConstantServiceTime::new(secs(1)))
            .build()
            .unwrap();
        assert_eq!(engine.state(), EngineState::Idle);
        assert_eq!(engine.pending_events(), 2);
        assert_eq!(engine.calendar().peek_time(), Some(SimTime::from_secs(2)));
    }

    #[test]
    fn builder_rejects_invalid_parameters() {
        let no_sources = EngineBuilder::new(SimTime::from_secs(10), 2).build();
        assert!(matches!(no_sources, Err(SimError::Configuration(ConfigError::NoSources))));

        let zero_capacity = EngineBuilder::new(SimTime::from_secs(10), 0)
            .source(Priority::Private, ConstantArrivals::new(secs(1)))
            .build();
        assert!(matches!(zero_capacity, Err(SimError::Configuration(ConfigError::ZeroCapacity))));

        let zero_horizon = EngineBuilder::new(SimTime::zero(), 1)
            .source(Priority::Private, ConstantArrivals::new(secs(1)))
            .build();
        assert!(matches!(zero_horizon, Err(SimError::Configuration(_))));
    }

    #[test]
    fn from_config_reports_out_of_range_values() {
        let far_horizon = SimulationConfig::default().with_horizon(1e11);
        assert!(matches!(
            SimulationEngine::from_config(&far_horizon),
            Err(SimError::Configuration(ConfigError::OutOfRange { .. }))
        ));

        let mut huge_interval = SimulationConfig::default();
        huge_interval.sources[0].mean_interval = 1e308;
        assert!(matches!(
            SimulationEngine::from_config(&huge_interval),
            Err(SimError::Configuration(ConfigError::OutOfRange { .. }))
        ));
    }

    #[test]
    fn arrival_is_served_immediately_by_idle_server() {
        let mut engine = EngineBuilder::new(SimTime::from_secs(100), 1)
            .source(Priority::Corporate, ConstantArrivals::new(secs(4)))
            .server(ConstantServiceTime::new(secs(3)))
            .build()
            .unwrap();

        let report = processed(engine.step().unwrap());
        assert_eq!(report.kind, EventKind::Arrival);
        assert_eq!(report.time, SimTime::from_secs(4));
        assert_eq!(report.assignments.len(), 1);
        assert!(engine.dispatcher().buffer().is_empty());
        assert_eq!(engine.state(), EngineState::Running);

        let report = processed(engine.step().unwrap());
        assert_eq!(report.kind, EventKind::Departure);
        assert_eq!(report.time, SimTime::from_secs(7));
        let completion = report.completion.unwrap();
        assert_eq!(completion.service, secs(3));
        assert_eq!(completion.waiting, Duration::ZERO);

        let stats = &engine.statistics()[0];
        assert_eq!(stats.generated, 1);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.service.mean(), 3.0);
    }

    #[test]
    fn waiting_time_is_time_in_system_minus_service() {
        // arrivals every 1s, service 3s: the second request waits in the buffer
        let mut engine = EngineBuilder::new(SimTime::from_secs(100), 3)
            .source(Priority::Private, ConstantArrivals::new(secs(1)))
            .server(ConstantServiceTime::new(secs(3)))
            .build()
            .unwrap();

        let completions: Vec<CompletionRecord> = std::iter::from_fn(|| match engine.step().unwrap() {
            StepOutcome::Processed(report) => Some(report),
            StepOutcome::Finished => None,
        })
        .filter_map(|report| report.completion)
        .take(2)
        .collect();

        assert_eq!(completions[0].request, RequestId(1));
        assert_eq!(completions[0].waiting, Duration::ZERO);
        // requests 2 and 3 wait with equal priority; the later one (3s) goes first at 4s
        assert_eq!(completions[1].request, RequestId(3));
        assert_eq!(completions[1].time_in_system, secs(4));
        assert_eq!(completions[1].waiting, secs(1));
        assert_eq!(completions[1].service, secs(3));
    }

    #[test]
    fn event_past_horizon_finishes_run() {
        let mut engine = EngineBuilder::new(SimTime::from_secs(5), 1)
            .source(Priority::Private, ConstantArrivals::new(secs(2)))
            .build()
            .unwrap();

        processed(engine.step().unwrap()); // t=2
        processed(engine.step().unwrap()); // t=4
        assert_eq!(engine.step().unwrap(), StepOutcome::Finished); // t=6 > 5
        assert!(engine.is_finished());
        assert_eq!(engine.clock(), SimTime::from_secs(4));
        assert_eq!(engine.steps(), 2);
        // terminal: further steps are no-ops
        assert_eq!(engine.step().unwrap(), StepOutcome::Finished);
        assert_eq!(engine.steps(), 2);
    }

    #[test]
    fn event_exactly_at_horizon_is_processed() {
        let mut engine = EngineBuilder::new(SimTime::from_secs(4), 1)
            .source(Priority::Private, ConstantArrivals::new(secs(2)))
            .build()
            .unwrap();
        processed(engine.step().unwrap());
        let report = processed(engine.step().unwrap());
        assert_eq!(report.time, SimTime::from_secs(4));
    }

    #[test]
    fn no_servers_means_fill_then_evict() {
        let mut engine = EngineBuilder::new(SimTime::from_secs(100), 2)
            .source(Priority::Private, ConstantArrivals::new(secs(1)))
            .build()
            .unwrap();

        for _ in 0..2 {
            assert!(processed(engine.step().unwrap()).evicted.is_none());
        }
        let report = processed(engine.step().unwrap());
        let victim = report.evicted.unwrap();
        assert_eq!(victim.id(), RequestId(2));
        assert_eq!(victim.status(), RequestStatus::Rejected);
        assert_eq!(engine.statistics()[0].rejected, 1);
        assert_eq!(engine.statistics()[0].generated, 3);
    }

    #[test]
    fn unknown_server_in_departure_is_fatal() {
        let mut engine = EngineBuilder::new(SimTime::from_secs(100), 1)
            .source(Priority::Private, ConstantArrivals::new(secs(50)))
            .build()
            .unwrap();
        engine.schedule(Event::Departure {
            time: SimTime::from_secs(1),
            server: ServerId(7),
            request: RequestId(1),
        });
        assert!(matches!(engine.step(), Err(SimError::UnknownServer(ServerId(7)))));
    }
}
