//! Bounded, sparse, ordered slot storage.
//!
//! Ports on a hub, configurations of a device, interfaces of a configuration
//! and endpoints of an interface all live in fixed-capacity collections where
//! an empty slot is distinct from a filled slot 0.

use thiserror::Error;

/// Attempt to store past the end of a [`SlotArray`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("slot {index} is outside capacity {capacity}")]
pub struct SlotError {
    pub index: usize,
    pub capacity: usize,
}

/// Fixed-capacity sparse array indexed by slot number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotArray<T> {
    slots: Vec<Option<T>>,
    capacity: usize,
}

impl<T> SlotArray<T> {
    /// Create an empty array that accepts slots `0..capacity`.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::new(),
            capacity,
        }
    }

    /// Maximum number of slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Store `value` at `index`, returning whatever occupied it before.
    pub fn insert(&mut self, index: usize, value: T) -> Result<Option<T>, SlotError> {
        if index >= self.capacity {
            return Err(SlotError {
                index,
                capacity: self.capacity,
            });
        }
        if self.slots.len() <= index {
            self.slots.resize_with(index + 1, || None);
        }
        Ok(self.slots[index].replace(value))
    }

    /// Store `value` in the lowest empty slot.
    pub fn push(&mut self, value: T) -> Result<usize, SlotError> {
        let index = self
            .slots
            .iter()
            .position(Option::is_none)
            .unwrap_or(self.slots.len());
        self.insert(index, value)?;
        Ok(index)
    }

    /// Empty `index`, returning its previous value.
    pub fn remove(&mut self, index: usize) -> Option<T> {
        self.slots.get_mut(index).and_then(Option::take)
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Filled slots in ascending slot order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|v| (i, v)))
    }

    /// Filled values in ascending slot order.
    pub fn values(&self) -> impl Iterator<Item = &T> + '_ {
        self.slots.iter().flatten()
    }

    /// Number of filled slots.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
