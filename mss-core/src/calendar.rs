use std::cmp::Ordering;
use std::collections::BinaryHeap;

use serde::Serialize;
use tracing::trace;

use crate::request::Request;
use crate::time::SimTime;
use crate::types::{EventId, RequestId, ServerId, SourceId};

/// A pending occurrence in the service center.
///
/// Events are immutable once created; the calendar only moves them around.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// A new request from `source` reaches the center. The request is created when
    /// the arrival is scheduled, so its id is already known.
    Arrival {
        time: SimTime,
        source: SourceId,
        request: Request,
    },
    /// `server` finishes serving `request`.
    Departure {
        time: SimTime,
        server: ServerId,
        request: RequestId,
    },
}

impl Event {
    pub fn time(&self) -> SimTime {
        match self {
            Event::Arrival { time, .. } | Event::Departure { time, .. } => *time,
        }
    }

    pub fn request_id(&self) -> RequestId {
        match self {
            Event::Arrival { request, .. } => request.id(),
            Event::Departure { request, .. } => *request,
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Event::Arrival { .. } => EventKind::Arrival,
            Event::Departure { .. } => EventKind::Departure,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EventKind {
    Arrival,
    Departure,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Arrival => "arrival",
            EventKind::Departure => "departure",
        }
    }
}

/// Entry type stored in the calendar: the event plus its insertion sequence number.
#[derive(Debug)]
struct CalendarEntry {
    id: EventId,
    event: Event,
}

impl PartialEq for CalendarEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for CalendarEntry {}

impl PartialOrd for CalendarEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CalendarEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse the ordering for min-heap behavior in BinaryHeap; equal times fire
        // in insertion order.
        other
            .event
            .time()
            .cmp(&self.event.time())
            .then_with(|| other.id.cmp(&self.id))
    }
}

/// Time-ordered queue of pending arrivals and departures.
///
/// Ordering is `(time, insertion sequence)`, so replaying the same pushes always
/// pops the same sequence, ties included. There is no cancellation: a scheduled
/// event always fires.
#[derive(Debug, Default)]
pub struct EventCalendar {
    next_event_id: u64,
    events: BinaryHeap<CalendarEntry>,
}

impl EventCalendar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `event`, returning its sequence number.
    pub fn push(&mut self, event: Event) -> EventId {
        self.next_event_id += 1;
        let id = EventId(self.next_event_id);
        trace!(event_id = %id, kind = event.kind().as_str(), time = %event.time(), "Event scheduled");
        self.events.push(CalendarEntry { id, event });
        id
    }

    /// Remove and return the earliest event.
    pub fn pop_earliest(&mut self) -> Option<(EventId, Event)> {
        self.events.pop().map(|entry| (entry.id, entry.event))
    }

    /// Time of the earliest pending event.
    pub fn peek_time(&self) -> Option<SimTime> {
        self.events.peek().map(|entry| entry.event.time())
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Pending events in firing order.
    pub fn pending(&self) -> Vec<(EventId, &Event)> {
        let mut entries: Vec<&CalendarEntry> = self.events.iter().collect();
        // descending under the reversed Ord is firing order
        entries.sort_by(|a, b| b.cmp(a));
        entries.into_iter().map(|entry| (entry.id, &entry.event)).collect()
    }
}
