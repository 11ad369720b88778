//! Deferred user-input continuations.
//!
//! Clicking "link" or "target" starts an action that only completes when the
//! player clicks a second node. Until then the action sits here under an
//! [`ActionId`]. A phase teardown cancels every pending action; finishing a
//! cancelled action fails with [`PhaseError::ActionCancelled`].

use nodewar_core::id::{AttackId, NodeId};
use slotmap::{SlotMap, new_key_type};
use tracing::debug;

use crate::error::PhaseError;

new_key_type! {
    /// Handle to an unfinished two-click action.
    pub struct ActionId;
}

/// What the second click completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingAction {
    /// Tether `from` to the next clicked node.
    Link { from: NodeId },
    /// Focus `attack` on the next clicked node.
    Target { attack: AttackId },
}

#[derive(Debug, Default)]
pub struct PendingActions {
    actions: SlotMap<ActionId, PendingAction>,
}

impl PendingActions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, action: PendingAction) -> ActionId {
        let id = self.actions.insert(action);
        debug!(?id, ?action, "action pending");
        id
    }

    pub fn get(&self, id: ActionId) -> Option<&PendingAction> {
        self.actions.get(id)
    }

    /// Take the action out. Fails if it is no longer pending.
    pub fn resolve(&mut self, id: ActionId) -> Result<PendingAction, PhaseError> {
        self.actions
            .remove(id)
            .ok_or(PhaseError::ActionCancelled(id))
    }

    /// Take the action out only if `accept` matches it. A mismatch leaves the
    /// action pending.
    pub fn resolve_if<F>(&mut self, id: ActionId, accept: F) -> Result<PendingAction, PhaseError>
    where
        F: FnOnce(&PendingAction) -> bool,
    {
        match self.actions.get(id) {
            None => Err(PhaseError::ActionCancelled(id)),
            Some(action) if !accept(action) => Err(PhaseError::MismatchedAction(id)),
            Some(_) => self.resolve(id),
        }
    }

    /// Returns whether the action was still pending.
    pub fn cancel(&mut self, id: ActionId) -> bool {
        self.actions.remove(id).is_some()
    }

    /// Cancel every action that `stale` matches, e.g. links from a removed
    /// node.
    pub fn cancel_where<F>(&mut self, mut stale: F) -> usize
    where
        F: FnMut(&PendingAction) -> bool,
    {
        let before = self.actions.len();
        self.actions.retain(|_, action| !stale(action));
        before - self.actions.len()
    }

    pub fn cancel_all(&mut self) -> usize {
        let cancelled = self.actions.len();
        self.actions.clear();
        if cancelled > 0 {
            debug!(cancelled, "pending actions cancelled");
        }
        cancelled
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
