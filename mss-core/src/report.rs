//! Read-only views of the engine for display layers
//!
//! [`EngineSnapshot`] is the per-step picture (buffer ring, servers, calendar);
//! [`SimulationReport`] is the end-of-run table. Both serialize with `serde`.

use std::fmt;

use serde::Serialize;

use crate::calendar::{Event, EventKind};
use crate::engine::{EngineState, SimulationEngine};
use crate::request::{Priority, RequestStatus};
use crate::time::SimTime;
use crate::types::{EventId, RequestId, ServerId, SourceId};

/// Occupant of one buffer slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotView {
    pub request: RequestId,
    pub source: SourceId,
    pub priority: Priority,
    pub status: RequestStatus,
    pub entered_buffer_at: SimTime,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerView {
    pub id: ServerId,
    pub busy: bool,
    pub request: Option<RequestId>,
    pub service_started_at: Option<SimTime>,
    pub completed: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingEvent {
    pub id: EventId,
    pub kind: EventKind,
    pub time: SimTime,
    pub request: RequestId,
    /// Source for arrivals, absent for departures.
    pub source: Option<SourceId>,
    /// Server for departures, absent for arrivals.
    pub server: Option<ServerId>,
}

impl PendingEvent {
    fn from_event(id: EventId, event: &Event) -> Self {
        let (source, server) = match event {
            Event::Arrival { source, .. } => (Some(*source), None),
            Event::Departure { server, .. } => (None, Some(*server)),
        };
        Self {
            id,
            kind: event.kind(),
            time: event.time(),
            request: event.request_id(),
            source,
            server,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceRejection {
    pub source: SourceId,
    pub generated: u64,
    pub rejected: u64,
    pub rejection_probability: f64,
}

/// Everything a step-by-step display shows after one event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EngineSnapshot {
    pub clock: SimTime,
    pub state: EngineState,
    pub buffer: Vec<Option<SlotView>>,
    pub buffer_cursor: usize,
    pub servers: Vec<ServerView>,
    pub server_cursor: usize,
    /// Remaining calendar in firing order.
    pub calendar: Vec<PendingEvent>,
    pub rejections: Vec<SourceRejection>,
}

impl EngineSnapshot {
    pub(crate) fn capture(engine: &SimulationEngine) -> Self {
        let dispatcher = engine.dispatcher();
        let buffer = dispatcher
            .buffer()
            .slots()
            .iter()
            .map(|slot| {
                slot.as_ref().map(|request| SlotView {
                    request: request.id(),
                    source: request.source(),
                    priority: request.priority(),
                    status: request.status(),
                    entered_buffer_at: request.entered_buffer_at(),
                })
            })
            .collect();
        let servers = dispatcher
            .servers()
            .iter()
            .map(|server| ServerView {
                id: server.id(),
                busy: server.is_busy(),
                request: server.current_request_id(),
                service_started_at: server.service_started_at(),
                completed: server.completed(),
            })
            .collect();
        let calendar = engine
            .calendar()
            .pending()
            .into_iter()
            .map(|(id, event)| PendingEvent::from_event(id, event))
            .collect();
        let rejections = engine
            .statistics()
            .iter()
            .enumerate()
            .map(|(i, stats)| SourceRejection {
                source: SourceId(i),
                generated: stats.generated,
                rejected: stats.rejected,
                rejection_probability: stats.rejection_probability(),
            })
            .collect();

        Self {
            clock: engine.clock(),
            state: engine.state(),
            buffer,
            buffer_cursor: dispatcher.buffer().cursor(),
            servers,
            server_cursor: dispatcher.server_cursor(),
            calendar,
            rejections,
        }
    }
}

/// One row of the end-of-run table. Times are in seconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceReport {
    pub source: SourceId,
    pub priority: Priority,
    pub generated: u64,
    pub rejected: u64,
    pub completed: u64,
    pub rejection_probability: f64,
    pub mean_time_in_system: f64,
    pub mean_waiting: f64,
    pub mean_service: f64,
    pub waiting_variance: f64,
    pub service_variance: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerReport {
    pub server: ServerId,
    pub completed: u64,
    pub busy_time: f64,
    /// Busy time over the horizon.
    pub utilization: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReportTotals {
    pub generated: u64,
    pub rejected: u64,
    pub completed: u64,
    pub rejection_probability: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationReport {
    pub clock: SimTime,
    pub horizon: SimTime,
    pub steps: u64,
    pub stale_departures: u64,
    pub sources: Vec<SourceReport>,
    pub servers: Vec<ServerReport>,
    pub totals: ReportTotals,
}

impl SimulationReport {
    pub(crate) fn capture(engine: &SimulationEngine) -> Self {
        let sources: Vec<SourceReport> = engine
            .sources()
            .iter()
            .zip(engine.statistics())
            .map(|(source, stats)| SourceReport {
                source: source.id(),
                priority: source.priority(),
                generated: stats.generated,
                rejected: stats.rejected,
                completed: stats.completed,
                rejection_probability: stats.rejection_probability(),
                mean_time_in_system: stats.time_in_system.mean(),
                mean_waiting: stats.waiting.mean(),
                mean_service: stats.service.mean(),
                waiting_variance: stats.waiting.variance(),
                service_variance: stats.service.variance(),
            })
            .collect();

        let horizon = engine.horizon().as_secs_f64();
        let servers = engine
            .dispatcher()
            .servers()
            .iter()
            .map(|server| {
                let busy_time = server.busy_time().as_secs_f64();
                ServerReport {
                    server: server.id(),
                    completed: server.completed(),
                    busy_time,
                    utilization: if horizon > 0.0 { busy_time / horizon } else { 0.0 },
                }
            })
            .collect();

        let generated = sources.iter().map(|row| row.generated).sum();
        let rejected = sources.iter().map(|row| row.rejected).sum();
        let totals = ReportTotals {
            generated,
            rejected,
            completed: sources.iter().map(|row| row.completed).sum(),
            rejection_probability: if generated > 0 {
                rejected as f64 / generated as f64
            } else {
                0.0
            },
        };

        Self {
            clock: engine.clock(),
            horizon: engine.horizon(),
            steps: engine.steps(),
            stale_departures: engine.stale_departures(),
            sources,
            servers,
            totals,
        }
    }
}

impl fmt::Display for SimulationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<10} {:<10} {:>9} {:>9} {:>9} {:>8} {:>9} {:>9} {:>9} {:>9} {:>9}",
            "source", "priority", "generated", "rejected", "completed", "p_rej", "t_sys", "t_wait", "t_serv",
            "d_wait", "d_serv"
        )?;
        for row in &self.sources {
            writeln!(
                f,
                "{:<10} {:<10} {:>9} {:>9} {:>9} {:>8.4} {:>9.3} {:>9.3} {:>9.3} {:>9.3} {:>9.3}",
                row.source.to_string(),
                row.priority.to_string(),
                row.generated,
                row.rejected,
                row.completed,
                row.rejection_probability,
                row.mean_time_in_system,
                row.mean_waiting,
                row.mean_service,
                row.waiting_variance,
                row.service_variance,
            )?;
        }
        writeln!(
            f,
            "{:<10} {:<10} {:>9} {:>9} {:>9} {:>8.4}",
            "total", "", self.totals.generated, self.totals.rejected, self.totals.completed,
            self.totals.rejection_probability
        )?;
        writeln!(f)?;
        writeln!(f, "{:<10} {:>9} {:>11} {:>11}", "server", "completed", "busy_time", "utilization")?;
        for row in &self.servers {
            writeln!(
                f,
                "{:<10} {:>9} {:>11.3} {:>11.4}",
                row.server.to_string(),
                row.completed,
                row.busy_time,
                row.utilization
            )?;
        }
        Ok(())
    }
}
