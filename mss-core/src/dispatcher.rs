//! Dispatcher: admission, eviction and server assignment
//!
//! The dispatcher owns the buffer and the servers and makes every placement
//! decision of the center:
//!
//! - admission: insert into the ring, or overwrite the most recent entry when full;
//! - request choice: highest priority first, and within a priority tier the request
//!   that entered the buffer most recently;
//! - server choice: round robin from an internal cursor, independent of the request.
//!
//! Each [`Dispatcher::try_assign`] call starts at most one service; callers loop to
//! drain several eligible pairs.

use crate::buffer::Buffer;
use crate::error::SimError;
use crate::request::Request;
use crate::server::ServiceUnit;
use crate::time::SimTime;
use crate::types::{RequestId, ServerId, SourceId};
use serde::Serialize;
use tracing::debug;

/// Result of admitting one request into the buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Admission {
    /// Slot the new request landed in.
    pub slot: usize,
    /// Request overwritten to make room, already marked `Rejected`.
    pub evicted: Option<Request>,
}

/// A service started by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Assignment {
    pub request: RequestId,
    pub source: SourceId,
    pub server: ServerId,
    pub started_at: SimTime,
}

/// Outcome of one dispatch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentOutcome {
    Assigned(Assignment),
    /// Nothing is waiting.
    BufferEmpty,
    /// Every server is busy.
    NoFreeServer,
}

impl AssignmentOutcome {
    pub fn is_assigned(&self) -> bool {
        matches!(self, AssignmentOutcome::Assigned(_))
    }

    pub fn assignment(&self) -> Option<Assignment> {
        match self {
            AssignmentOutcome::Assigned(assignment) => Some(*assignment),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct Dispatcher {
    buffer: Buffer,
    servers: Vec<ServiceUnit>,
    server_cursor: usize,
}

impl Dispatcher {
    pub fn new(buffer: Buffer, servers: Vec<ServiceUnit>) -> Self {
        Self {
            buffer,
            servers,
            server_cursor: 0,
        }
    }

    pub fn buffer(&self) -> &Buffer {
        &self.buffer
    }

    pub fn servers(&self) -> &[ServiceUnit] {
        &self.servers
    }

    pub fn server(&self, id: ServerId) -> Option<&ServiceUnit> {
        self.servers.get(id.index())
    }

    pub fn server_mut(&mut self, id: ServerId) -> Option<&mut ServiceUnit> {
        self.servers.get_mut(id.index())
    }

    /// Next server position the round robin will probe first.
    pub fn server_cursor(&self) -> usize {
        self.server_cursor
    }

    /// Admit `request` into the buffer, evicting the most recent entry if it is full.
    ///
    /// # Errors
    ///
    /// Propagates buffer inconsistencies ([`SimError::NoVictimFound`]).
    pub fn accept(&mut self, request: Request) -> Result<Admission, SimError> {
        if self.buffer.is_full() {
            let (victim, slot) = self.buffer.evict_and_insert(request)?;
            debug!(
                slot,
                victim = %victim.id(),
                victim_source = %victim.source(),
                "Buffer full, evicted most recent request"
            );
            Ok(Admission {
                slot,
                evicted: Some(victim),
            })
        } else {
            let slot = self.buffer.insert(request)?;
            Ok(Admission { slot, evicted: None })
        }
    }

    /// First idle server at or after the cursor; advances the cursor past it.
    pub fn select_server_round_robin(&mut self) -> Option<ServerId> {
        let count = self.servers.len();
        let index = (0..count)
            .map(|offset| (self.server_cursor + offset) % count)
            .find(|&index| self.servers[index].is_available())?;
        self.server_cursor = (index + 1) % count;
        Some(self.servers[index].id())
    }

    /// Slot of the waiting request with the largest `(priority, buffer entry time)`.
    ///
    /// Among equal priorities the most recent buffer entry wins. On a full tie the
    /// lowest slot index is kept.
    pub fn select_highest_priority_waiting(&self) -> Option<(usize, &Request)> {
        self.buffer.occupied().fold(None, |best, (index, request)| match best {
            Some((_, current)) if !outranks(request, current) => best,
            _ => Some((index, request)),
        })
    }

    /// Start at most one service at `now`.
    ///
    /// # Errors
    ///
    /// Propagates precondition violations from the buffer or the chosen server.
    pub fn try_assign(&mut self, now: SimTime) -> Result<AssignmentOutcome, SimError> {
        let Some((slot, _)) = self.select_highest_priority_waiting() else {
            return Ok(AssignmentOutcome::BufferEmpty);
        };
        let Some(server_id) = self.select_server_round_robin() else {
            return Ok(AssignmentOutcome::NoFreeServer);
        };

        let request = self.buffer.release(slot)?;
        let assignment = Assignment {
            request: request.id(),
            source: request.source(),
            server: server_id,
            started_at: now,
        };
        self.servers[server_id.index()].start_service(request, now)?;

        debug!(
            request = %assignment.request,
            server = %assignment.server,
            slot,
            "Request assigned"
        );
        Ok(AssignmentOutcome::Assigned(assignment))
    }
}

fn outranks(candidate: &Request, current: &Request) -> bool {
    (candidate.priority(), candidate.entered_buffer_at()) > (current.priority(), current.entered_buffer_at())
}
