//! Requests flowing through the service center

use crate::time::SimTime;
use crate::types::{RequestId, SourceId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Request class. Ordering is by rank: `Private < Corporate < Warranty`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Private,
    Corporate,
    Warranty,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Priority::Private => "private",
            Priority::Corporate => "corporate",
            Priority::Warranty => "warranty",
        };
        f.write_str(name)
    }
}

/// Lifecycle of a request.
///
/// `New -> Buffered -> Processing -> Completed`, or `New/Buffered -> Rejected`
/// when evicted while waiting. `Completed` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RequestStatus {
    New,
    Buffered,
    Processing,
    Completed,
    Rejected,
}

impl RequestStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, RequestStatus::Completed | RequestStatus::Rejected)
    }
}

/// A single request. Only its status and buffer-entry time change after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    id: RequestId,
    source: SourceId,
    created_at: SimTime,
    entered_buffer_at: SimTime,
    priority: Priority,
    status: RequestStatus,
}

impl Request {
    pub fn new(id: RequestId, source: SourceId, created_at: SimTime, priority: Priority) -> Self {
        Self {
            id,
            source,
            created_at,
            entered_buffer_at: created_at,
            priority,
            status: RequestStatus::New,
        }
    }

    pub fn id(&self) -> RequestId {
        self.id
    }

    pub fn source(&self) -> SourceId {
        self.source
    }

    pub fn created_at(&self) -> SimTime {
        self.created_at
    }

    pub fn entered_buffer_at(&self) -> SimTime {
        self.entered_buffer_at
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn status(&self) -> RequestStatus {
        self.status
    }

    pub(crate) fn stamp_buffer_entry(&mut self, time: SimTime) {
        self.entered_buffer_at = time;
    }

    pub(crate) fn set_status(&mut self, status: RequestStatus) {
        self.status = status;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn priority_is_ranked() {
        assert!(Priority::Private < Priority::Corporate);
        assert!(Priority::Corporate < Priority::Warranty);
        assert_eq!(
            [Priority::Warranty, Priority::Private, Priority::Corporate]
                .into_iter()
                .max(),
            Some(Priority::Warranty)
        );
    }

    #[test]
    fn new_request_defaults() {
        let request = Request::new(RequestId(3), SourceId(1), SimTime::from_secs(4), Priority::Corporate);
        assert_eq!(request.status(), RequestStatus::New);
        assert_eq!(request.entered_buffer_at(), SimTime::from_secs(4));
        assert!(!request.status().is_terminal());
        assert!(RequestStatus::Rejected.is_terminal());
        assert!(RequestStatus::Completed.is_terminal());
    }
}
