use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies a node in the entity graph.
    pub struct NodeId;

    /// Identifies a tether (undirected link) between two nodes.
    pub struct TetherId;

    /// Identifies an attack instance owned by the combat engine.
    pub struct AttackId;
}

/// Identifies a node type in the registry. Cheap to copy and compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeTypeId(pub u32);

/// Identifies an attack type in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AttackTypeId(pub u32);

/// Stable logical id of a slot in an [`InstancePool`](crate::pool::InstancePool).
///
/// The id never changes for the lifetime of the pool; the physical index the
/// slot occupies does, as slots are swapped between the visible and hidden
/// partitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SlotId(pub u32);

impl SlotId {
    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}

/// Which side a node fights for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Allegiance {
    #[default]
    Friendly,
    Enemy,
}

impl Allegiance {
    /// The other side.
    pub fn flipped(self) -> Self {
        match self {
            Allegiance::Friendly => Allegiance::Enemy,
            Allegiance::Enemy => Allegiance::Friendly,
        }
    }
}

/// A point in scene space. The core never interprets it beyond carrying it
/// through to collaborators and the persisted layout.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position(pub [f64; 3]);

impl Position {
    pub const ORIGIN: Position = Position([0.0, 0.0, 0.0]);

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self([x, y, z])
    }
}
