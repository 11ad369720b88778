//! Narrow interfaces to the parts of the game this crate does not own.
//!
//! Rendering, the on-screen overlay and layout persistence live outside the
//! simulation. Each phase talks to them only through the traits here, bundled
//! in [`Collaborators`]. Every notification has a no-op default so an
//! implementation only overrides what it cares about.

use std::collections::BTreeMap;

use nodewar_core::fixed::Seconds;
use nodewar_core::graph::{EntityGraph, NodeData, TetherData};
use nodewar_core::id::{Allegiance, AttackTypeId, NodeId, TetherId};
use nodewar_core::pool::Slot;

// ---------------------------------------------------------------------------
// SceneRenderer
// ---------------------------------------------------------------------------

/// The 3D scene: one renderable per node and tether, one instanced mesh per
/// attack type.
pub trait SceneRenderer: std::fmt::Debug {
    fn spawn_node(&mut self, id: NodeId, data: &NodeData) {
        let _ = (id, data);
    }

    fn despawn_node(&mut self, id: NodeId) {
        let _ = id;
    }

    /// A captured node changed sides.
    fn set_allegiance(&mut self, id: NodeId, allegiance: Allegiance) {
        let _ = (id, allegiance);
    }

    fn link(&mut self, id: TetherId, data: &TetherData) {
        let _ = (id, data);
    }

    fn unlink(&mut self, id: TetherId) {
        let _ = id;
    }

    /// Mirror the visible prefix of an attack type's beam pool.
    fn sync_pool(&mut self, attack_type: AttackTypeId, visible: &[Slot]) {
        let _ = (attack_type, visible);
    }

    /// Per-frame animation.
    fn animate(&mut self, delta: Seconds) {
        let _ = delta;
    }

    /// Per-tick idle motion.
    fn idle_drift(&mut self, interval: Seconds) {
        let _ = interval;
    }

    /// Drop every renderable.
    fn clear(&mut self) {}

    fn as_any(&self) -> &dyn std::any::Any;
}

// ---------------------------------------------------------------------------
// Overlay
// ---------------------------------------------------------------------------

/// Read-only UI drawn over the scene.
pub trait Overlay: std::fmt::Debug {
    fn notice(&mut self, message: &str) {
        let _ = message;
    }

    fn select(&mut self, node: Option<NodeId>) {
        let _ = node;
    }

    fn show_currency(&mut self, balance: u32) {
        let _ = balance;
    }

    /// Per-frame repositioning of labels that follow nodes.
    fn reposition(&mut self, delta: Seconds) {
        let _ = delta;
    }

    fn clear(&mut self) {}

    fn as_any(&self) -> &dyn std::any::Any;
}

// ---------------------------------------------------------------------------
// LayoutStore
// ---------------------------------------------------------------------------

/// A failure reported by a [`LayoutStore`] backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("layout store: {0}")]
pub struct StoreError(pub String);

/// Where the player's layout, the opponents' layouts and the currency
/// balance are kept. Layouts travel as encoded text.
pub trait LayoutStore: std::fmt::Debug {
    fn load_layout(&self) -> Result<Option<String>, StoreError>;

    fn save_layout(&mut self, text: &str) -> Result<(), StoreError>;

    /// Names of the opponents whose layouts can be attacked.
    fn opponents(&self) -> Result<Vec<String>, StoreError>;

    fn load_opponent(&self, name: &str) -> Result<Option<String>, StoreError>;

    fn load_currency(&self) -> Result<Option<u32>, StoreError>;

    fn save_currency(&mut self, balance: u32) -> Result<(), StoreError>;

    fn as_any(&self) -> &dyn std::any::Any;
}

/// A [`LayoutStore`] held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    layout: Option<String>,
    opponents: BTreeMap<String, String>,
    currency: Option<u32>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_layout(mut self, text: impl Into<String>) -> Self {
        self.layout = Some(text.into());
        self
    }

    pub fn with_opponent(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.opponents.insert(name.into(), text.into());
        self
    }

    pub fn with_currency(mut self, balance: u32) -> Self {
        self.currency = Some(balance);
        self
    }

    pub fn layout(&self) -> Option<&str> {
        self.layout.as_deref()
    }

    pub fn currency(&self) -> Option<u32> {
        self.currency
    }
}

impl LayoutStore for MemoryStore {
    fn load_layout(&self) -> Result<Option<String>, StoreError> {
        Ok(self.layout.clone())
    }

    fn save_layout(&mut self, text: &str) -> Result<(), StoreError> {
        self.layout = Some(text.to_string());
        Ok(())
    }

    fn opponents(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.opponents.keys().cloned().collect())
    }

    fn load_opponent(&self, name: &str) -> Result<Option<String>, StoreError> {
        Ok(self.opponents.get(name).cloned())
    }

    fn load_currency(&self) -> Result<Option<u32>, StoreError> {
        Ok(self.currency)
    }

    fn save_currency(&mut self, balance: u32) -> Result<(), StoreError> {
        self.currency = Some(balance);
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Headless stand-ins
// ---------------------------------------------------------------------------

/// Renders nothing.
#[derive(Debug, Default)]
pub struct NullRenderer;

impl SceneRenderer for NullRenderer {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

/// Shows nothing.
#[derive(Debug, Default)]
pub struct NullOverlay;

impl Overlay for NullOverlay {
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Collaborators
// ---------------------------------------------------------------------------

/// The collaborators every phase is built from.
#[derive(Debug)]
pub struct Collaborators {
    pub renderer: Box<dyn SceneRenderer>,
    pub overlay: Box<dyn Overlay>,
    pub store: Box<dyn LayoutStore>,
}

impl Collaborators {
    pub fn new(
        renderer: impl SceneRenderer + 'static,
        overlay: impl Overlay + 'static,
        store: impl LayoutStore + 'static,
    ) -> Self {
        Self {
            renderer: Box::new(renderer),
            overlay: Box::new(overlay),
            store: Box::new(store),
        }
    }

    /// No renderer and no overlay, only persistence.
    pub fn headless(store: impl LayoutStore + 'static) -> Self {
        Self::new(NullRenderer, NullOverlay, store)
    }

    /// Downcast the renderer to its concrete type.
    pub fn renderer_as<T: 'static>(&self) -> Option<&T> {
        self.renderer.as_any().downcast_ref::<T>()
    }

    pub fn overlay_as<T: 'static>(&self) -> Option<&T> {
        self.overlay.as_any().downcast_ref::<T>()
    }

    pub fn store_as<T: 'static>(&self) -> Option<&T> {
        self.store.as_any().downcast_ref::<T>()
    }

    /// Spawn a renderable for every node and tether of `graph`.
    pub(crate) fn show_graph(&mut self, graph: &EntityGraph) {
        for (id, data) in graph.nodes() {
            self.renderer.spawn_node(id, data);
        }
        for (id, data) in graph.tethers() {
            self.renderer.link(id, data);
        }
    }

    /// Drop everything the renderer and overlay are showing.
    pub(crate) fn clear(&mut self) {
        self.renderer.clear();
        self.overlay.clear();
    }
}
