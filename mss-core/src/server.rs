//! Servers: one request at a time, with a busy-time accumulator

use crate::dists::ServiceTimeDistribution;
use crate::error::SimError;
use crate::request::{Request, RequestStatus};
use crate::time::SimTime;
use crate::types::{RequestId, ServerId};
use std::time::Duration;

/// A request that has just finished service.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletedService {
    pub request: Request,
    pub started_at: SimTime,
    pub finished_at: SimTime,
}

impl CompletedService {
    pub fn service_time(&self) -> Duration {
        self.finished_at - self.started_at
    }
}

/// A single server of the center.
///
/// The request in service and the busy flag live in one `Option`, so a server is
/// busy exactly when it holds a request.
pub struct ServiceUnit {
    id: ServerId,
    in_service: Option<Request>,
    service_started_at: SimTime,
    busy_time: Duration,
    completed: u64,
    service_time: Box<dyn ServiceTimeDistribution>,
}

impl ServiceUnit {
    pub fn new(id: ServerId, service_time: Box<dyn ServiceTimeDistribution>) -> Self {
        Self {
            id,
            in_service: None,
            service_started_at: SimTime::zero(),
            busy_time: Duration::ZERO,
            completed: 0,
            service_time,
        }
    }

    pub fn id(&self) -> ServerId {
        self.id
    }

    pub fn is_available(&self) -> bool {
        self.in_service.is_none()
    }

    pub fn is_busy(&self) -> bool {
        self.in_service.is_some()
    }

    /// Request in service, if any.
    pub fn current_request(&self) -> Option<&Request> {
        self.in_service.as_ref()
    }

    pub fn current_request_id(&self) -> Option<RequestId> {
        self.in_service.as_ref().map(Request::id)
    }

    /// Start time of the current service. Meaningful only while busy.
    pub fn service_started_at(&self) -> Option<SimTime> {
        self.in_service.as_ref().map(|_| self.service_started_at)
    }

    /// Sum of all completed service durations.
    pub fn busy_time(&self) -> Duration {
        self.busy_time
    }

    pub fn completed(&self) -> u64 {
        self.completed
    }

    pub fn mean_service_time(&self) -> Duration {
        self.service_time.mean()
    }

    /// Begin serving `request` at `time`.
    ///
    /// # Errors
    ///
    /// [`SimError::PreconditionViolation`] if the server is already busy.
    pub fn start_service(&mut self, mut request: Request, time: SimTime) -> Result<(), SimError> {
        if let Some(current) = &self.in_service {
            return Err(SimError::precondition(
                "start_service",
                format!("{} is busy with request {}", self.id, current.id()),
            ));
        }
        request.set_status(RequestStatus::Processing);
        self.in_service = Some(request);
        self.service_started_at = time;
        Ok(())
    }

    /// Finish the current service at `time` and free the server.
    ///
    /// # Errors
    ///
    /// [`SimError::PreconditionViolation`] if the server is idle.
    pub fn complete_service(&mut self, time: SimTime) -> Result<CompletedService, SimError> {
        let mut request = self.in_service.take().ok_or_else(|| {
            SimError::precondition("complete_service", format!("{} is idle", self.id))
        })?;
        self.busy_time += time - self.service_started_at;
        self.completed += 1;
        request.set_status(RequestStatus::Completed);
        Ok(CompletedService {
            request,
            started_at: self.service_started_at,
            finished_at: time,
        })
    }

    /// Draw one service duration. Does not touch the busy state.
    pub fn service_duration(&mut self) -> Duration {
        self.service_time.sample()
    }
}

impl std::fmt::Debug for ServiceUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceUnit")
            .field("id", &self.id)
            .field("in_service", &self.current_request_id())
            .field("busy_time", &self.busy_time)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dists::ConstantServiceTime;
    use crate::request::Priority;
    use crate::types::SourceId;

    fn server() -> ServiceUnit {
        ServiceUnit::new(
            ServerId(0),
            Box::new(ConstantServiceTime::new(Duration::from_secs(3))),
        )
    }

    fn request(id: u64) -> Request {
        Request::new(RequestId(id), SourceId(0), SimTime::zero(), Priority::Private)
    }

    #[test]
    fn start_then_complete_accumulates_busy_time() {
        let mut server = server();
        assert!(server.is_available());

        server.start_service(request(1), SimTime::from_secs(2)).unwrap();
        assert!(server.is_busy());
        assert_eq!(server.current_request().unwrap().status(), RequestStatus::Processing);
        assert_eq!(server.service_started_at(), Some(SimTime::from_secs(2)));

        let done = server.complete_service(SimTime::from_secs(7)).unwrap();
        assert_eq!(done.request.status(), RequestStatus::Completed);
        assert_eq!(done.service_time(), Duration::from_secs(5));
        assert!(server.is_available());
        assert_eq!(server.service_started_at(), None);

        server.start_service(request(2), SimTime::from_secs(10)).unwrap();
        server.complete_service(SimTime::from_secs(11)).unwrap();
        assert_eq!(server.busy_time(), Duration::from_secs(6));
        assert_eq!(server.completed(), 2);
    }

    #[test]
    fn start_on_busy_server_fails() {
        let mut server = server();
        server.start_service(request(1), SimTime::zero()).unwrap();
        let err = server.start_service(request(2), SimTime::zero()).unwrap_err();
        assert!(matches!(err, SimError::PreconditionViolation { operation: "start_service", .. }));
        assert_eq!(server.current_request_id(), Some(RequestId(1)));
    }

    #[test]
    fn complete_on_idle_server_fails() {
        let mut server = server();
        let err = server.complete_service(SimTime::from_secs(1)).unwrap_err();
        assert!(matches!(err, SimError::PreconditionViolation { operation: "complete_service", .. }));
        assert_eq!(server.busy_time(), Duration::ZERO);
    }

    #[test]
    fn service_duration_leaves_state_alone() {
        let mut server = server();
        assert_eq!(server.service_duration(), Duration::from_secs(3));
        assert!(server.is_available());
    }
}
