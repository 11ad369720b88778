//! A single-effect on/off timer attached to each node.
//!
//! Expiry actions are plain values handed back to the owner when the timer
//! runs out (or when an override asks for them), never stored closures.

use crate::fixed::{Fixed64, Seconds};

/// The effects a node can be under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusEffect {
    /// The node cannot attack.
    Disabled,
    /// The node holds a temporary shield that is stripped on expiry.
    Fortified,
}

/// What happens to an active effect when a new one replaces it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverridePolicy {
    /// Drop the old effect silently.
    #[default]
    Cancel,
    /// Hand the old effect's expiry action back as if it had run out.
    FireExpiry,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActiveStatus<A> {
    pub effect: StatusEffect,
    pub remaining: Seconds,
    pub on_expire: Option<A>,
}

/// An effect that ended, with its expiry action if it had one.
#[derive(Debug, Clone, PartialEq)]
pub struct Expired<A> {
    pub effect: StatusEffect,
    pub action: Option<A>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StatusTimer<A> {
    active: Option<ActiveStatus<A>>,
}

impl<A> Default for StatusTimer<A> {
    fn default() -> Self {
        Self { active: None }
    }
}

impl<A> StatusTimer<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `effect` for `duration`, replacing whatever was active.
    ///
    /// Returns the replaced effect's expiry when `policy` is
    /// [`OverridePolicy::FireExpiry`] and something was active.
    pub fn set(
        &mut self,
        effect: StatusEffect,
        duration: Seconds,
        on_expire: Option<A>,
        policy: OverridePolicy,
    ) -> Option<Expired<A>> {
        let previous = self.active.replace(ActiveStatus {
            effect,
            remaining: duration,
            on_expire,
        });
        match (previous, policy) {
            (Some(prev), OverridePolicy::FireExpiry) => Some(Expired {
                effect: prev.effect,
                action: prev.on_expire,
            }),
            _ => None,
        }
    }

    /// Count down. Returns the expiry when the effect runs out.
    pub fn tick(&mut self, delta: Seconds) -> Option<Expired<A>> {
        let status = self.active.as_mut()?;
        status.remaining -= delta;
        if status.remaining > Fixed64::ZERO {
            return None;
        }
        self.active.take().map(|s| Expired {
            effect: s.effect,
            action: s.on_expire,
        })
    }

    /// Clear without firing anything.
    pub fn reset(&mut self) {
        self.active = None;
    }

    pub fn current(&self) -> Option<&ActiveStatus<A>> {
        self.active.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn has(&self, effect: StatusEffect) -> bool {
        self.active.as_ref().is_some_and(|s| s.effect == effect)
    }
}
