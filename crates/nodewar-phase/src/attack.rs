//! A battle between the player's layout and one opponent's.
//!
//! Both layouts are loaded into a single graph, friendly and enemy, and
//! handed to a [`CombatEngine`]. Enemy defenses arm themselves with their
//! default attacks; the player links across and assigns attackers.

use std::sync::Arc;

use nodewar_core::combat::{AssignOutcome, CombatEngine, CombatError, CombatEvent, CombatReport};
use nodewar_core::fixed::{Fixed64, Seconds};
use nodewar_core::graph::{EntityGraph, GraphError};
use nodewar_core::id::{Allegiance, AttackId, AttackTypeId, NodeId, TetherId};
use nodewar_core::layout::SavedLayout;
use nodewar_core::registry::Registry;
use nodewar_core::targeting::TargetingStrategy;
use nodewar_data::GameSettings;
use tracing::{debug, info, warn};

use crate::collab::Collaborators;
use crate::error::PhaseError;
use crate::ledger::CurrencyLedger;
use crate::pending::{ActionId, PendingAction, PendingActions};

/// How the battle stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BattleStatus {
    #[default]
    Ongoing,
    /// Every enemy non-hub node has been captured.
    Won,
    /// Every friendly non-hub node has been captured.
    Lost,
}

#[derive(Debug)]
pub struct AttackPhase {
    engine: CombatEngine,
    ledger: CurrencyLedger,
    pending: PendingActions,
    opponent: String,
    status: BattleStatus,
}

impl AttackPhase {
    pub fn new(
        registry: Arc<Registry>,
        settings: &GameSettings,
        collab: &mut Collaborators,
        opponent: &str,
    ) -> Result<Self, PhaseError> {
        let ours = collab
            .store
            .load_layout()?
            .ok_or_else(|| PhaseError::MissingLayout("own layout".to_string()))?;
        let theirs = collab
            .store
            .load_opponent(opponent)?
            .ok_or_else(|| PhaseError::MissingLayout(opponent.to_string()))?;

        let mut graph = EntityGraph::new(registry);
        SavedLayout::decode(&ours)?.load_into(&mut graph, Allegiance::Friendly)?;
        SavedLayout::decode(&theirs)?.load_into(&mut graph, Allegiance::Enemy)?;

        let mut engine = CombatEngine::from_graph(graph, settings.combat);
        let armed = engine.auto_arm(Allegiance::Enemy, TargetingStrategy::default());
        let ledger = CurrencyLedger::new(
            collab
                .store
                .load_currency()?
                .unwrap_or(settings.starting_currency),
        );

        collab.show_graph(engine.graph());
        collab.overlay.show_currency(ledger.balance());
        collab.overlay.notice(&format!("attacking {opponent}"));
        info!(
            opponent,
            friendly = engine.side_strength(Allegiance::Friendly),
            enemy = engine.side_strength(Allegiance::Enemy),
            armed = armed.len(),
            "attack phase ready"
        );
        let mut phase = Self {
            engine,
            ledger,
            pending: PendingActions::new(),
            opponent: opponent.to_string(),
            status: BattleStatus::Ongoing,
        };
        phase.status = phase.evaluate();
        Ok(phase)
    }

    pub fn engine(&self) -> &CombatEngine {
        &self.engine
    }

    pub fn ledger(&self) -> &CurrencyLedger {
        &self.ledger
    }

    pub fn pending(&self) -> &PendingActions {
        &self.pending
    }

    pub fn opponent(&self) -> &str {
        &self.opponent
    }

    pub fn status(&self) -> BattleStatus {
        self.status
    }

    fn require_side(&self, node: NodeId, expected: Allegiance) -> Result<(), PhaseError> {
        let data = self
            .engine
            .graph()
            .get_node(node)
            .ok_or(GraphError::NodeNotFound(node))?;
        if data.allegiance != expected {
            return Err(PhaseError::WrongSide { node, expected });
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Player actions
    // -----------------------------------------------------------------------

    /// Tether a friendly node to an enemy node.
    pub fn link(
        &mut self,
        collab: &mut Collaborators,
        ours: NodeId,
        theirs: NodeId,
    ) -> Result<TetherId, PhaseError> {
        self.require_side(ours, Allegiance::Friendly)?;
        self.require_side(theirs, Allegiance::Enemy)?;
        let id = self.engine.tether(ours, theirs)?;
        if let Some(data) = self.engine.graph().get_tether(id) {
            collab.renderer.link(id, data);
        }
        Ok(id)
    }

    pub fn begin_link(
        &mut self,
        collab: &mut Collaborators,
        from: NodeId,
    ) -> Result<ActionId, PhaseError> {
        self.require_side(from, Allegiance::Friendly)?;
        collab.overlay.select(Some(from));
        Ok(self.pending.begin(PendingAction::Link { from }))
    }

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

    /// Put an attack on a friendly node. Resource limits come back as the
    /// outcome and are shown on the overlay.
    pub fn assign(
        &mut self,
        collab: &mut Collaborators,
        node: NodeId,
        attack_type: AttackTypeId,
        strategy: TargetingStrategy,
    ) -> Result<AssignOutcome, PhaseError> {
        self.require_side(node, Allegiance::Friendly)?;
        let outcome = self.engine.add_attacker(node, attack_type, strategy)?;
        match outcome {
            AssignOutcome::Added(_) => {}
            AssignOutcome::SlotsFull => collab.overlay.notice("no free attacker slot"),
            AssignOutcome::PoolSaturated => collab.overlay.notice("too many attacks of that type"),
            AssignOutcome::Rejected => collab.overlay.notice("that node cannot use this attack"),
        }
        Ok(outcome)
    }

    pub fn remove_attacker(
        &mut self,
        node: NodeId,
        index: usize,
    ) -> Result<Option<AttackId>, PhaseError> {
        self.require_side(node, Allegiance::Friendly)?;
        Ok(self.engine.remove_attacker(node, index)?)
    }

    /// First click of a focus order for `attack`.
    pub fn begin_target(
        &mut self,
        collab: &mut Collaborators,
        attack: AttackId,
    ) -> Result<ActionId, PhaseError> {
        let origin = self
            .engine
            .attack(attack)
            .map(|a| a.origin)
            .ok_or(CombatError::AttackNotFound(attack))?;
        collab.overlay.select(Some(origin));
        Ok(self.pending.begin(PendingAction::Target { attack }))
    }

    /// Second click: pin the attack on `target`.
    pub fn finish_target(
        &mut self,
        collab: &mut Collaborators,
        action: ActionId,
        target: NodeId,
    ) -> Result<(), PhaseError> {
        let PendingAction::Target { attack } = self
            .pending
            .resolve_if(action, |a| matches!(a, PendingAction::Target { .. }))?
        else {
            return Err(PhaseError::MismatchedAction(action));
        };
        collab.overlay.select(None);
        self.require_side(target, Allegiance::Enemy)?;
        self.engine.focus(attack, Some(target))?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Run combat for one frame and mirror the result to the collaborators.
    /// Nothing moves once the battle is decided.
    pub fn update(&mut self, collab: &mut Collaborators, delta: Seconds) -> CombatReport {
        if self.status != BattleStatus::Ongoing {
            return CombatReport::default();
        }
        let report = self.engine.update(delta);
        for event in &report.events {
            if let CombatEvent::NodeCaptured { node, now } = *event {
                collab.renderer.set_allegiance(node, now);
                let message = match now {
                    Allegiance::Friendly => "node captured",
                    Allegiance::Enemy => "node lost",
                };
                collab.overlay.notice(message);
                self.pending.cancel_where(|a| *a == PendingAction::Link { from: node });
            }
        }
        // Captures halt attacks, so targets pinned by stale actions are gone.
        let engine = &self.engine;
        self.pending.cancel_where(|a| match *a {
            PendingAction::Target { attack } => engine.attack(attack).is_none(),
            PendingAction::Link { .. } => false,
        });
        for (attack_type, pool) in self.engine.pools() {
            collab.renderer.sync_pool(attack_type, pool.visible_slots());
        }

        let status = self.evaluate();
        if status != self.status {
            self.status = status;
            info!(?status, opponent = %self.opponent, "battle decided");
            collab.overlay.notice(match status {
                BattleStatus::Won => "victory",
                BattleStatus::Lost => "defeat",
                BattleStatus::Ongoing => "battle resumed",
            });
        }
        report
    }

    fn evaluate(&self) -> BattleStatus {
        if self.engine.side_strength(Allegiance::Enemy) == 0 {
            BattleStatus::Won
        } else if self.engine.side_strength(Allegiance::Friendly) == 0 {
            BattleStatus::Lost
        } else {
            BattleStatus::Ongoing
        }
    }

    /// One logic tick: collect income from friendly mines, captured ones
    /// included.
    pub fn tick(&mut self, collab: &mut Collaborators) {
        self.ledger.credit(self.engine.income(Allegiance::Friendly));
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
        self.engine.teardown();
        debug!("attack phase torn down");
        self.pending
    }
}
