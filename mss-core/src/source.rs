//! Request sources: independent arrival streams

use crate::dists::ArrivalPattern;
use crate::request::{Priority, Request};
use crate::time::SimTime;
use crate::types::{RequestId, SourceId};
use std::time::Duration;

/// One arrival stream with a fixed priority class.
///
/// Sources never interact; each owns its own [`ArrivalPattern`].
pub struct RequestSource {
    id: SourceId,
    priority: Priority,
    arrivals: Box<dyn ArrivalPattern>,
}

impl RequestSource {
    pub fn new(id: SourceId, priority: Priority, arrivals: Box<dyn ArrivalPattern>) -> Self {
        Self {
            id,
            priority,
            arrivals,
        }
    }

    pub fn id(&self) -> SourceId {
        self.id
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn mean_interval(&self) -> Duration {
        self.arrivals.mean()
    }

    /// Time of the next arrival after `now`. Always strictly later than `now`.
    pub fn next_arrival_time(&mut self, now: SimTime) -> SimTime {
        let gap = self.arrivals.next_interval().max(Duration::from_nanos(1));
        now + gap
    }

    /// Build a fresh request created at `time`.
    pub fn generate(&self, time: SimTime, id: RequestId) -> Request {
        Request::new(id, self.id, time, self.priority)
    }
}

impl std::fmt::Debug for RequestSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSource")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("mean_interval", &self.arrivals.mean())
            .finish()
    }
}
