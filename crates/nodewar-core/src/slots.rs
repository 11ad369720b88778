//! Fixed-length attacker slot arrays.
//!
//! Unlike the instance pool, slots keep insertion order: removing an entry
//! shifts the later ones down, because the order is what the UI shows.

use crate::id::{AttackId, AttackTypeId};

/// One occupied attacker slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttackerSlot {
    pub attack: AttackId,
    pub attack_type: AttackTypeId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttackerSlots {
    capacity: usize,
    entries: Vec<AttackerSlot>,
}

impl AttackerSlots {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Vec::with_capacity(capacity),
        }
    }

    /// Append an entry. A full array hands the entry back untouched so the
    /// caller can release whatever it allocated for it.
    pub fn push(&mut self, slot: AttackerSlot) -> Result<usize, AttackerSlot> {
        if self.is_full() {
            return Err(slot);
        }
        self.entries.push(slot);
        Ok(self.entries.len() - 1)
    }

    /// Remove the entry at `index`, shifting later entries down by one.
    pub fn pop(&mut self, index: usize) -> Option<AttackerSlot> {
        (index < self.entries.len()).then(|| self.entries.remove(index))
    }

    /// Remove the entry holding `attack`, if any.
    pub fn remove_attack(&mut self, attack: AttackId) -> Option<AttackerSlot> {
        let index = self.position(attack)?;
        self.pop(index)
    }

    pub fn position(&self, attack: AttackId) -> Option<usize> {
        self.entries.iter().position(|s| s.attack == attack)
    }

    /// Empty the array, returning what it held in order.
    pub fn clear(&mut self) -> Vec<AttackerSlot> {
        std::mem::take(&mut self.entries)
    }

    pub fn get(&self, index: usize) -> Option<&AttackerSlot> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AttackerSlot> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.capacity
    }
}
