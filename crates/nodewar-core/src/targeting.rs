//! Stateless target selection.

use crate::fixed::Fixed64;
use crate::id::NodeId;
use std::cmp::Ordering;

/// What a strategy sees of one attackable node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetCandidate {
    pub node: NodeId,
    pub health: Fixed64,
    pub shield: Fixed64,
}

impl TargetCandidate {
    pub fn total(&self) -> Fixed64 {
        self.health + self.shield
    }
}

/// Orders two candidates; the one ordered first is attacked.
pub type TargetComparator = fn(&TargetCandidate, &TargetCandidate) -> Ordering;

/// How an attack picks among its attackable neighbors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TargetingStrategy {
    /// Finish off the weakest node first.
    #[default]
    LowestTotalHealth,
    HighestTotalHealth,
    Custom(TargetComparator),
}

impl TargetingStrategy {
    fn compare(&self, a: &TargetCandidate, b: &TargetCandidate) -> Ordering {
        let primary = match self {
            TargetingStrategy::LowestTotalHealth => a.total().cmp(&b.total()),
            TargetingStrategy::HighestTotalHealth => b.total().cmp(&a.total()),
            TargetingStrategy::Custom(cmp) => cmp(a, b),
        };
        primary.then_with(|| a.node.cmp(&b.node))
    }

    /// Pick a target. Ties go to the smaller node id so the choice does not
    /// depend on candidate order.
    pub fn select(&self, candidates: &[TargetCandidate]) -> Option<NodeId> {
        candidates
            .iter()
            .min_by(|a, b| self.compare(a, b))
            .map(|c| c.node)
    }
}
