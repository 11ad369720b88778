//! Layout editing between battles.
//!
//! The player places nodes (paying their cost), links them with two clicks,
//! removes them, and saves the layout once every node sits within the hub
//! distance limit.

use std::sync::Arc;

use nodewar_core::fixed::Fixed64;
use nodewar_core::graph::{EntityGraph, GraphError, LayoutReport, ValidationError};
use nodewar_core::id::{Allegiance, NodeId, NodeTypeId, Position, TetherId};
use nodewar_core::layout::{LayoutEncoding, SavedLayout};
use nodewar_core::registry::{NodeKind, Registry};
use nodewar_data::GameSettings;
use tracing::{debug, info, warn};

use crate::collab::Collaborators;
use crate::error::PhaseError;
use crate::ledger::CurrencyLedger;
use crate::pending::{ActionId, PendingAction, PendingActions};

#[derive(Debug)]
pub struct BuildPhase {
    graph: EntityGraph,
    ledger: CurrencyLedger,
    pending: PendingActions,
    max_hub_distance: u32,
    encoding: LayoutEncoding,
    background: String,
}

impl BuildPhase {
    /// Load the stored layout, or start from a lone hub when there is none.
    pub fn new(
        registry: Arc<Registry>,
        settings: &GameSettings,
        collab: &mut Collaborators,
    ) -> Result<Self, PhaseError> {
        let mut graph = EntityGraph::new(registry);
        let mut background = settings.background.clone();
        match collab.store.load_layout()? {
            Some(text) => {
                let saved = SavedLayout::decode(&text)?;
                saved.load_into(&mut graph, Allegiance::Friendly)?;
                if !saved.background.is_empty() {
                    background = saved.background;
                }
            }
            None => seed_hub(&mut graph)?,
        }
        let ledger = CurrencyLedger::new(
            collab
                .store
                .load_currency()?
                .unwrap_or(settings.starting_currency),
        );

        collab.show_graph(&graph);
        collab.overlay.show_currency(ledger.balance());
        info!(
            nodes = graph.node_count(),
            tethers = graph.tether_count(),
            balance = ledger.balance(),
            "build phase ready"
        );
        Ok(Self {
            graph,
            ledger,
            pending: PendingActions::new(),
            max_hub_distance: settings.max_hub_distance,
            encoding: settings.layout_encoding,
            background,
        })
    }

    pub fn graph(&self) -> &EntityGraph {
        &self.graph
    }

    pub fn ledger(&self) -> &CurrencyLedger {
        &self.ledger
    }

    pub fn pending(&self) -> &PendingActions {
        &self.pending
    }

    pub fn background(&self) -> &str {
        &self.background
    }

    // -----------------------------------------------------------------------
    // Editing
    // -----------------------------------------------------------------------

    /// Buy and place a node. `Ok(None)` when the balance does not cover its
    /// cost.
    pub fn place(
        &mut self,
        collab: &mut Collaborators,
        node_type: NodeTypeId,
        position: Position,
    ) -> Result<Option<NodeId>, PhaseError> {
        let cost = self
            .graph
            .registry()
            .get_node_type(node_type)
            .map(|def| def.cost)
            .ok_or(GraphError::Validation(ValidationError::UnknownNodeType(
                node_type,
            )))?;
        if !self.ledger.can_afford(cost) {
            collab.overlay.notice("not enough currency");
            return Ok(None);
        }
        let id = self.graph.create_node(node_type, position)?;
        self.ledger.spend(cost);
        if let Some(data) = self.graph.get_node(id) {
            collab.renderer.spawn_node(id, data);
        }
        collab.overlay.show_currency(self.ledger.balance());
        Ok(Some(id))
    }

    pub fn link(
        &mut self,
        collab: &mut Collaborators,
        a: NodeId,
        b: NodeId,
    ) -> Result<TetherId, PhaseError> {
        let id = self.graph.tether(a, b).inspect_err(|err| {
            warn!(%err, "link rejected");
        })?;
        if let Some(data) = self.graph.get_tether(id) {
            collab.renderer.link(id, data);
        }
        Ok(id)
    }

    /// First click of a link: remember `from` until [`finish_link`].
    ///
    /// [`finish_link`]: Self::finish_link
    pub fn begin_link(
        &mut self,
        collab: &mut Collaborators,
        from: NodeId,
    ) -> Result<ActionId, PhaseError> {
        if !self.graph.contains_node(from) {
            return Err(GraphError::NodeNotFound(from).into());
        }
        collab.overlay.select(Some(from));
        Ok(self.pending.begin(PendingAction::Link { from }))
    }

    /// Second click of a link. The action is used up even when the tether is
    /// rejected.
    pub fn finish_link(
        &mut self,
        collab: &mut Collaborators,
        action: ActionId,
        to: NodeId,
    ) -> Result<TetherId, PhaseError> {
        let PendingAction::Link { from } = self
            .pending
            .resolve_if(action, |a| matches!(a, PendingAction::Link { .. }))?
        else {
            return Err(PhaseError::MismatchedAction(action));
        };
        collab.overlay.select(None);
        self.link(collab, from, to)
    }

    pub fn unlink(&mut self, collab: &mut Collaborators, id: TetherId) -> Result<(), PhaseError> {
        self.graph.remove_tether(id)?;
        collab.renderer.unlink(id);
        Ok(())
    }

    /// Remove a node and its tethers. Nothing is refunded.
    pub fn remove(&mut self, collab: &mut Collaborators, node: NodeId) -> Result<(), PhaseError> {
        let removed = self.graph.remove_node(node)?;
        for tether in removed.tethers {
            collab.renderer.unlink(tether);
        }
        collab.renderer.despawn_node(node);
        self.pending
            .cancel_where(|a| *a == PendingAction::Link { from: node });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Saving
    // -----------------------------------------------------------------------

    pub fn layout_report(&self) -> LayoutReport {
        self.graph.layout_report(self.max_hub_distance)
    }

    /// Validate, encode and store the layout along with the balance.
    pub fn save(&mut self, collab: &mut Collaborators) -> Result<(), PhaseError> {
        let report = self.layout_report();
        if !report.is_valid() {
            warn!(
                unreachable = report.unreachable.len(),
                too_far = report.too_far.len(),
                "layout not saved"
            );
            collab.overlay.notice("every node must be near a hub");
            return Err(PhaseError::InvalidLayout {
                unreachable: report.unreachable.len(),
                too_far: report.too_far.len(),
            });
        }
        let text = SavedLayout::from_graph(&self.graph, &self.background).encode(self.encoding)?;
        collab.store.save_layout(&text)?;
        collab.store.save_currency(self.ledger.balance())?;
        collab.overlay.notice("layout saved");
        info!(nodes = self.graph.node_count(), "layout saved");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// One logic tick: collect income.
    pub fn tick(&mut self, collab: &mut Collaborators) {
        self.ledger.credit(self.graph.income(Allegiance::Friendly));
        collab.overlay.show_currency(self.ledger.balance());
    }

    /// Hand over an action table so ids from earlier phases stay stale.
    pub(crate) fn adopt_pending(&mut self, pending: PendingActions) {
        self.pending = pending;
    }

    /// Credit the sub-unit balance the previous phase could not persist.
    pub(crate) fn adopt_carry(&mut self, carry: Fixed64, collab: &mut Collaborators) {
        self.ledger.credit(carry);
        collab.overlay.show_currency(self.ledger.balance());
    }

    /// Returns the emptied action table for the next phase.
    pub(crate) fn teardown(mut self, collab: &mut Collaborators) -> PendingActions {
        self.pending.cancel_all();
        if let Err(err) = collab.store.save_currency(self.ledger.balance()) {
            warn!(%err, "balance not persisted");
        }
        self.graph.clear();
        debug!("build phase torn down");
        self.pending
    }
}

/// Place the registry's first hub type at the origin.
fn seed_hub(graph: &mut EntityGraph) -> Result<(), PhaseError> {
    let hub = graph
        .registry()
        .node_types()
        .find(|(_, def)| def.kind == NodeKind::Hub)
        .map(|(id, _)| id);
    match hub {
        Some(hub) => {
            graph.create_node(hub, Position::ORIGIN)?;
        }
        None => warn!("no hub type registered, starting empty"),
    }
    Ok(())
}
