//! Health and shield bookkeeping for a single node.

use crate::fixed::Fixed64;

/// Health plus an absorbing shield layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vitals {
    health: Fixed64,
    max_health: Fixed64,
    shield: Fixed64,
}

impl Vitals {
    /// Full health, with the given starting shield.
    pub fn new(max_health: Fixed64, shield: Fixed64) -> Self {
        Self {
            health: max_health,
            max_health,
            shield,
        }
    }

    pub fn health(&self) -> Fixed64 {
        self.health
    }

    pub fn max_health(&self) -> Fixed64 {
        self.max_health
    }

    pub fn shield(&self) -> Fixed64 {
        self.shield
    }

    /// Health plus shield. Targeting strategies rank on this.
    pub fn total(&self) -> Fixed64 {
        self.health + self.shield
    }

    pub fn is_dead(&self) -> bool {
        self.total() <= Fixed64::ZERO
    }

    /// Apply damage to the shield first, spilling the remainder into health.
    ///
    /// Health never goes below zero; the amount that would have taken it
    /// below zero is returned as overkill so callers can chain it into
    /// follow-up effects.
    pub fn apply_damage(&mut self, value: Fixed64) -> Fixed64 {
        let value = value.max(Fixed64::ZERO);
        self.shield -= value;
        if self.shield < Fixed64::ZERO {
            self.health += self.shield;
            self.shield = Fixed64::ZERO;
        }
        if self.health < Fixed64::ZERO {
            let overkill = -self.health;
            self.health = Fixed64::ZERO;
            overkill
        } else {
            Fixed64::ZERO
        }
    }

    /// Restore health, capped at max. Returns the amount actually healed.
    pub fn apply_heal(&mut self, value: Fixed64) -> Fixed64 {
        let before = self.health;
        self.health = (self.health + value.max(Fixed64::ZERO)).min(self.max_health);
        self.health - before
    }

    /// Add shield. Shields have no cap.
    pub fn apply_shield(&mut self, value: Fixed64) {
        self.shield += value.max(Fixed64::ZERO);
    }

    /// Remove up to `value` shield without touching health.
    pub fn strip_shield(&mut self, value: Fixed64) {
        self.shield = (self.shield - value.max(Fixed64::ZERO)).max(Fixed64::ZERO);
    }

    /// Reset to `health` with no shield. Used when a node changes hands.
    pub fn reset_to(&mut self, health: Fixed64) {
        self.health = health.min(self.max_health);
        self.shield = Fixed64::ZERO;
    }
}
