//! Fixed-capacity ring buffer holding waiting requests
//!
//! Slots are `Option<Request>`: occupancy and payload travel together. An insertion
//! cursor spreads placements around the ring, and on overflow the slot just behind
//! the cursor (the most recent insertion) is overwritten, regardless of priority.

use crate::error::{ConfigError, SimError};
use crate::request::{Request, RequestStatus};
use tracing::trace;

#[derive(Debug, Clone)]
pub struct Buffer {
    slots: Vec<Option<Request>>,
    cursor: usize,
}

impl Buffer {
    /// Create an empty buffer with `capacity` slots.
    ///
    /// # Errors
    ///
    /// [`ConfigError::ZeroCapacity`] if `capacity` is zero.
    pub fn new(capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(Self {
            slots: vec![None; capacity],
            cursor: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Next slot to probe for insertion.
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn occupied_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    pub fn is_full(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(Option::is_none)
    }

    pub fn get(&self, index: usize) -> Option<&Request> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// All slots in index order.
    pub fn slots(&self) -> &[Option<Request>] {
        &self.slots
    }

    /// Occupied slots with their indices.
    pub fn occupied(&self) -> impl Iterator<Item = (usize, &Request)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|request| (index, request)))
    }

    /// Place `request` in the first empty slot at or after the cursor.
    ///
    /// # Errors
    ///
    /// [`SimError::PreconditionViolation`] if the buffer is full.
    pub fn insert(&mut self, mut request: Request) -> Result<usize, SimError> {
        let capacity = self.capacity();
        let index = (0..capacity)
            .map(|offset| (self.cursor + offset) % capacity)
            .find(|&index| self.slots[index].is_none())
            .ok_or_else(|| {
                SimError::precondition("buffer_insert", format!("buffer is full ({capacity} slots)"))
            })?;

        request.set_status(RequestStatus::Buffered);
        trace!(slot = index, request = %request.id(), "Request buffered");
        self.slots[index] = Some(request);
        self.cursor = (index + 1) % capacity;
        Ok(index)
    }

    /// Overwrite the most recently filled slot with `request`.
    ///
    /// The victim is the slot just behind the cursor; if that slot is empty the ring
    /// is scanned backwards for the nearest occupied one. The victim comes back
    /// marked `Rejected`. The cursor does not move.
    ///
    /// # Errors
    ///
    /// [`SimError::PreconditionViolation`] if the buffer is not full, and
    /// [`SimError::NoVictimFound`] if no occupied slot exists at all.
    pub fn evict_and_insert(&mut self, mut request: Request) -> Result<(Request, usize), SimError> {
        let capacity = self.capacity();
        if !self.is_full() {
            return Err(SimError::precondition(
                "buffer_evict",
                format!("buffer has free slots ({}/{capacity} occupied)", self.occupied_count()),
            ));
        }

        let index = (1..=capacity)
            .map(|back| (self.cursor + capacity - back) % capacity)
            .find(|&index| self.slots[index].is_some())
            .ok_or(SimError::NoVictimFound { capacity })?;

        request.set_status(RequestStatus::Buffered);
        let mut victim = self.slots[index]
            .replace(request)
            .ok_or(SimError::NoVictimFound { capacity })?;
        victim.set_status(RequestStatus::Rejected);
        trace!(slot = index, victim = %victim.id(), "Request evicted");
        Ok((victim, index))
    }

    /// Empty slot `index` and hand its request back.
    ///
    /// # Errors
    ///
    /// [`SimError::PreconditionViolation`] if the index is out of range or the slot is empty.
    pub fn release(&mut self, index: usize) -> Result<Request, SimError> {
        let capacity = self.capacity();
        self.slots
            .get_mut(index)
            .ok_or_else(|| {
                SimError::precondition("buffer_release", format!("slot {index} out of range 0..{capacity}"))
            })?
            .take()
            .ok_or_else(|| SimError::precondition("buffer_release", format!("slot {index} is empty")))
    }
}
