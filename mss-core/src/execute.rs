//! Run modes and cancellation for driving a [`SimulationEngine`](crate::SimulationEngine).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::engine::{SimulationEngine, StepOutcome, StepReport};
use crate::error::SimError;
use crate::logging::events;

/// Cooperative stop signal for a run.
///
/// Checked only between whole steps, so a cancelled engine is always in a
/// consistent state and can still produce its report.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Why a run returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunOutcome {
    /// The engine reached its terminal state.
    Finished,
    /// The step limit was hit first.
    StepLimit,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Steps processed by this run (not since engine construction).
    pub steps: u64,
    pub outcome: RunOutcome,
}

/// Simulation execution trait.
pub trait Execute {
    /// Executes the simulation until some stopping condition is reached.
    ///
    /// # Errors
    ///
    /// The first fatal [`SimError`] raised by a step.
    fn execute(self, engine: &mut SimulationEngine) -> Result<RunSummary, SimError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EndCondition {
    Finished,
    Steps(u64),
}

/// Executor is used for simple execution of an entire simulation.
///
/// ```
/// use mss_core::{Execute, Executor, SimulationConfig, SimulationEngine};
///
/// let mut engine = SimulationEngine::from_config(&SimulationConfig::default().with_horizon(50.0)).unwrap();
/// let summary = Executor::to_completion().execute(&mut engine).unwrap();
/// assert!(engine.is_finished());
/// assert_eq!(summary.steps, engine.steps());
/// ```
#[derive(Debug, Clone)]
pub struct Executor {
    end_condition: EndCondition,
    cancellation: Option<CancellationToken>,
}

impl Executor {
    /// Run until the calendar empties or the horizon is passed.
    #[must_use]
    pub fn to_completion() -> Self {
        Self {
            end_condition: EndCondition::Finished,
            cancellation: None,
        }
    }

    /// Execute at most this many steps, fewer if the engine finishes first.
    #[must_use]
    pub fn steps(steps: u64) -> Self {
        Self {
            end_condition: EndCondition::Steps(steps),
            cancellation: None,
        }
    }

    /// Stop between steps once `token` is cancelled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Registers a side effect that is called _after_ each processed step.
    #[must_use]
    pub fn side_effect<F>(self, func: F) -> ExecutorWithSideEffect<F>
    where
        F: FnMut(&SimulationEngine, &StepReport),
    {
        ExecutorWithSideEffect {
            executor: self,
            side_effect: func,
        }
    }
}

impl Execute for Executor {
    fn execute(self, engine: &mut SimulationEngine) -> Result<RunSummary, SimError> {
        run_with(engine, &self, |_, _| {})
    }
}

pub struct ExecutorWithSideEffect<F>
where
    F: FnMut(&SimulationEngine, &StepReport),
{
    executor: Executor,
    side_effect: F,
}

impl<F> Execute for ExecutorWithSideEffect<F>
where
    F: FnMut(&SimulationEngine, &StepReport),
{
    fn execute(self, engine: &mut SimulationEngine) -> Result<RunSummary, SimError> {
        run_with(engine, &self.executor, self.side_effect)
    }
}

fn run_with<F>(engine: &mut SimulationEngine, executor: &Executor, mut side_effect: F) -> Result<RunSummary, SimError>
where
    F: FnMut(&SimulationEngine, &StepReport),
{
    let mut steps = 0;
    loop {
        if executor.cancellation.as_ref().is_some_and(CancellationToken::is_cancelled) {
            events::simulation_cancelled(engine.clock(), engine.steps());
            return Ok(RunSummary {
                steps,
                outcome: RunOutcome::Cancelled,
            });
        }
        if let EndCondition::Steps(limit) = executor.end_condition {
            if steps >= limit {
                return Ok(RunSummary {
                    steps,
                    outcome: RunOutcome::StepLimit,
                });
            }
        }

        match engine.step()? {
            StepOutcome::Finished => {
                return Ok(RunSummary {
                    steps,
                    outcome: RunOutcome::Finished,
                })
            }
            StepOutcome::Processed(report) => {
                steps += 1;
                side_effect(engine, &report);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::dists::{ConstantArrivals, ConstantServiceTime};
    use crate::engine::EngineBuilder;
    use crate::request::Priority;
    use crate::time::SimTime;
    use std::time::Duration;

    fn engine() -> SimulationEngine {
        // one arrival per second until t=10
        EngineBuilder::new(SimTime::from_secs(10), 3)
            .source(Priority::Corporate, ConstantArrivals::new(Duration::from_secs(1)))
            .server(ConstantServiceTime::new(Duration::from_millis(500)))
            .build()
            .unwrap()
    }

    #[test]
    fn test_to_completion() {
        let mut engine = engine();
        let summary = Executor::to_completion().execute(&mut engine).unwrap();
        // 10 arrivals and 10 departures, the last at 10.5 past the horizon
        assert_eq!(summary.outcome, RunOutcome::Finished);
        assert_eq!(summary.steps, 19);
        assert!(engine.is_finished());
    }

    #[test]
    fn test_steps() {
        let mut engine = engine();
        let summary = Executor::steps(4).execute(&mut engine).unwrap();
        assert_eq!(summary, RunSummary { steps: 4, outcome: RunOutcome::StepLimit });
        assert_eq!(engine.clock(), SimTime::from_millis(2500));

        let rest = Executor::steps(100).execute(&mut engine).unwrap();
        assert_eq!(rest.outcome, RunOutcome::Finished);
        assert_eq!(engine.steps(), 19);
    }

    #[test]
    fn test_cancelled_before_start() {
        let mut engine = engine();
        let token = CancellationToken::new();
        token.cancel();
        let summary = Executor::to_completion()
            .with_cancellation(token)
            .execute(&mut engine)
            .unwrap();
        assert_eq!(summary, RunSummary { steps: 0, outcome: RunOutcome::Cancelled });
        assert_eq!(engine.steps(), 0);
    }

    #[test]
    fn test_cancel_from_side_effect() {
        let mut engine = engine();
        let token = CancellationToken::new();
        let trigger = token.clone();
        let summary = Executor::to_completion()
            .with_cancellation(token)
            .side_effect(move |engine, _| {
                if engine.steps() == 5 {
                    trigger.cancel();
                }
            })
            .execute(&mut engine)
            .unwrap();
        assert_eq!(summary.outcome, RunOutcome::Cancelled);
        assert_eq!(summary.steps, 5);
        // report is still available and consistent
        let report = engine.report();
        assert_eq!(report.steps, 5);
        assert_eq!(report.totals.generated, 3);
    }

    #[test]
    fn test_side_effect_sees_every_step() {
        let mut engine = engine();
        let mut kinds = Vec::new();
        Executor::steps(3)
            .side_effect(|_, report| kinds.push(report.kind))
            .execute(&mut engine)
            .unwrap();
        use crate::calendar::EventKind::{Arrival, Departure};
        assert_eq!(kinds, vec![Arrival, Departure, Arrival]);
    }
}
