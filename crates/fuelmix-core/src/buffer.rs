use crate::fixed::{DEFAULT_EPSILON, Fixed64, UNBOUNDED};
use crate::material::Resource;
use std::collections::VecDeque;

/// Errors from pushing into a buffer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BufferError {
    #[error("pushing {quantity} kg would overflow buffer with {space} kg of space")]
    Overflow { quantity: Fixed64, space: Fixed64 },
    #[error("negative buffer capacity: {0}")]
    NegativeCapacity(Fixed64),
}

/// A capacity-limited queue of resource batches.
pub trait ResourceBuffer {
    type Item: Resource;

    /// Total mass currently held.
    fn quantity(&self) -> Fixed64;

    /// Remaining capacity.
    fn space(&self) -> Fixed64;

    /// Remove and return every batch, oldest first.
    fn pop_all(&mut self) -> Vec<Self::Item>;

    /// Enqueue a batch. Fails without modifying the buffer if it does not fit.
    fn push(&mut self, item: Self::Item) -> Result<(), BufferError>;
}

/// Default [`ResourceBuffer`]: a FIFO of batches with a mass capacity.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ResBuf<R> {
    items: VecDeque<R>,
    capacity: Fixed64,
    quantity: Fixed64,
}

impl<R: Resource> ResBuf<R> {
    pub fn new(capacity: Fixed64) -> Result<Self, BufferError> {
        if capacity < Fixed64::ZERO {
            return Err(BufferError::NegativeCapacity(capacity));
        }
        Ok(Self {
            items: VecDeque::new(),
            capacity,
            quantity: Fixed64::ZERO,
        })
    }

    /// A buffer with no capacity limit.
    pub fn unbounded() -> Self {
        Self {
            items: VecDeque::new(),
            capacity: UNBOUNDED,
            quantity: Fixed64::ZERO,
        }
    }

    pub fn capacity(&self) -> Fixed64 {
        self.capacity
    }

    /// Number of queued batches.
    pub fn count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate queued batches, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &R> {
        self.items.iter()
    }

    /// Remove the oldest batch.
    pub fn pop(&mut self) -> Option<R> {
        let item = self.items.pop_front()?;
        self.quantity = (self.quantity - item.quantity()).max(Fixed64::ZERO);
        Some(item)
    }
}

impl<R: Resource> ResourceBuffer for ResBuf<R> {
    type Item = R;

    fn quantity(&self) -> Fixed64 {
        self.quantity
    }

    fn space(&self) -> Fixed64 {
        (self.capacity - self.quantity).max(Fixed64::ZERO)
    }

    fn pop_all(&mut self) -> Vec<R> {
        self.quantity = Fixed64::ZERO;
        self.items.drain(..).collect()
    }

    fn push(&mut self, item: R) -> Result<(), BufferError> {
        let quantity = item.quantity();
        let space = self.space();
        if quantity - space > DEFAULT_EPSILON {
            return Err(BufferError::Overflow { quantity, space });
        }
        self.quantity = self.quantity.saturating_add(quantity);
        self.items.push_back(item);
        Ok(())
    }
}
