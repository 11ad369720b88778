use nodewar_core::combat::CombatError;
use nodewar_core::graph::GraphError;
use nodewar_core::id::{Allegiance, NodeId};
use nodewar_core::layout::LayoutError;

use crate::collab::StoreError;
use crate::controller::PhaseKind;
use crate::pending::ActionId;

/// Errors that can occur while driving the phases.
#[derive(Debug, thiserror::Error)]
pub enum PhaseError {
    /// The operation belongs to a phase other than the current one.
    #[error("{expected:?} phase operation called during the {actual:?} phase")]
    WrongPhase {
        expected: PhaseKind,
        actual: PhaseKind,
    },

    /// The pending action was cancelled by a teardown, or already resolved.
    #[error("pending action {0:?} was cancelled")]
    ActionCancelled(ActionId),

    /// The pending action is of a different kind than the one being finished.
    #[error("pending action {0:?} is not of the expected kind")]
    MismatchedAction(ActionId),

    /// The store holds no layout under this name.
    #[error("no stored layout for '{0}'")]
    MissingLayout(String),

    /// Saving was refused because the layout breaks the hub distance rule.
    #[error("layout is invalid: {unreachable} nodes unreachable, {too_far} too far from a hub")]
    InvalidLayout { unreachable: usize, too_far: usize },

    /// The node fights for the wrong side for this operation.
    #[error("node {node:?} is not {expected:?}")]
    WrongSide { node: NodeId, expected: Allegiance },

    #[error(transparent)]
    Graph(#[from] GraphError),

    #[error(transparent)]
    Combat(#[from] CombatError),

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Store(#[from] StoreError),
}
