//! Recording collaborators and stored layouts for tests.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]`.

use std::collections::{BTreeMap, BTreeSet};

use nodewar_core::fixed::Seconds;
use nodewar_core::graph::{EntityGraph, NodeData, TetherData};
use nodewar_core::id::{Allegiance, AttackTypeId, NodeId, Position, TetherId};
use nodewar_core::layout::{LayoutEncoding, SavedLayout};
use nodewar_core::pool::Slot;
use nodewar_core::test_utils::*;

use crate::collab::{Collaborators, LayoutStore, MemoryStore, Overlay, SceneRenderer};

/// Name of the opponent in [`skirmish_store`].
pub const RIVAL: &str = "rival";

// ===========================================================================
// Recording collaborators
// ===========================================================================

/// Tracks what a real renderer would be showing.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    pub nodes: BTreeSet<NodeId>,
    pub tethers: BTreeSet<TetherId>,
    pub allegiance: BTreeMap<NodeId, Allegiance>,
    /// Visible beam count per attack type at the last sync.
    pub pools: BTreeMap<AttackTypeId, usize>,
    pub frames: u64,
    pub drifts: u64,
    pub clears: usize,
}

impl SceneRenderer for RecordingRenderer {
    fn spawn_node(&mut self, id: NodeId, data: &NodeData) {
        self.nodes.insert(id);
        self.allegiance.insert(id, data.allegiance);
    }

    fn despawn_node(&mut self, id: NodeId) {
        self.nodes.remove(&id);
        self.allegiance.remove(&id);
    }

    fn set_allegiance(&mut self, id: NodeId, allegiance: Allegiance) {
        self.allegiance.insert(id, allegiance);
    }

    fn link(&mut self, id: TetherId, _data: &TetherData) {
        self.tethers.insert(id);
    }

    fn unlink(&mut self, id: TetherId) {
        self.tethers.remove(&id);
    }

    fn sync_pool(&mut self, attack_type: AttackTypeId, visible: &[Slot]) {
        self.pools.insert(attack_type, visible.len());
    }

    fn animate(&mut self, _delta: Seconds) {
        self.frames += 1;
    }

    fn idle_drift(&mut self, _interval: Seconds) {
        self.drifts += 1;
    }

    fn clear(&mut self) {
        self.nodes.clear();
        self.tethers.clear();
        self.allegiance.clear();
        self.pools.clear();
        self.clears += 1;
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[derive(Debug, Default)]
pub struct RecordingOverlay {
    pub notices: Vec<String>,
    pub selected: Option<NodeId>,
    pub currency: Option<u32>,
    pub clears: usize,
}

impl Overlay for RecordingOverlay {
    fn notice(&mut self, message: &str) {
        self.notices.push(message.to_string());
    }

    fn select(&mut self, node: Option<NodeId>) {
        self.selected = node;
    }

    fn show_currency(&mut self, balance: u32) {
        self.currency = Some(balance);
    }

    fn clear(&mut self) {
        self.selected = None;
        self.currency = None;
        self.clears += 1;
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

pub fn recording_collaborators(store: impl LayoutStore + 'static) -> Collaborators {
    Collaborators::new(RecordingRenderer::default(), RecordingOverlay::default(), store)
}

pub fn rendered(collab: &Collaborators) -> &RecordingRenderer {
    collab
        .renderer_as::<RecordingRenderer>()
        .expect("renderer is a RecordingRenderer")
}

pub fn overlay(collab: &Collaborators) -> &RecordingOverlay {
    collab
        .overlay_as::<RecordingOverlay>()
        .expect("overlay is a RecordingOverlay")
}

pub fn stored(collab: &Collaborators) -> &MemoryStore {
    collab
        .store_as::<MemoryStore>()
        .expect("store is a MemoryStore")
}

// ===========================================================================
// Stored layouts
// ===========================================================================

/// hub - base - base, saved as plain JSON.
pub fn home_layout() -> String {
    let (graph, _, _) = hub_chain(2);
    SavedLayout::from_graph(&graph, "home")
        .encode(LayoutEncoding::Json)
        .expect("layout encodes")
}

/// hub - base - turret, saved as base64.
pub fn rival_layout() -> String {
    let mut graph = EntityGraph::new(standard_registry());
    let hub = graph
        .create_node(hub_type(), Position::ORIGIN)
        .expect("hub type is registered");
    let base = graph
        .create_node(base_type(), Position::new(1.0, 0.0, 0.0))
        .expect("base type is registered");
    let turret = graph
        .create_node(turret_type(), Position::new(2.0, 0.0, 0.0))
        .expect("turret type is registered");
    graph.tether(hub, base).expect("fresh link");
    graph.tether(base, turret).expect("fresh link");
    SavedLayout::from_graph(&graph, "rival")
        .encode(LayoutEncoding::Base64Json)
        .expect("layout encodes")
}

/// The player's [`home_layout`] and one opponent, [`RIVAL`].
pub fn skirmish_store() -> MemoryStore {
    MemoryStore::new()
        .with_layout(home_layout())
        .with_opponent(RIVAL, rival_layout())
}
