//! The Select / Build / Attack state machine.
//!
//! Transitions are explicit calls. Each one tears the current phase down
//! (pending actions cancelled, graph cleared, beams released, collaborators
//! cleared) before the next phase is built from the shared registry,
//! settings and collaborators. [`PhaseController::update`] drives the
//! per-frame collaborators and a fixed-interval logic tick.

use std::sync::Arc;

use nodewar_core::combat::{AssignOutcome, CombatReport};
use nodewar_core::fixed::{Fixed64, Seconds};
use nodewar_core::id::{AttackId, AttackTypeId, NodeId, NodeTypeId, Position, TetherId};
use nodewar_core::registry::Registry;
use nodewar_core::sim::TickClock;
use nodewar_core::targeting::TargetingStrategy;
use nodewar_data::{GameData, GameSettings};
use tracing::{info, warn};

use crate::attack::{AttackPhase, BattleStatus};
use crate::build::BuildPhase;
use crate::collab::Collaborators;
use crate::error::PhaseError;
use crate::pending::{ActionId, PendingActions};
use crate::select::SelectPhase;

/// Which phase is current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    Select,
    Build,
    Attack,
}

#[derive(Debug)]
pub enum Phase {
    Select(SelectPhase),
    Build(BuildPhase),
    Attack(AttackPhase),
}

impl Phase {
    pub fn kind(&self) -> PhaseKind {
        match self {
            Phase::Select(_) => PhaseKind::Select,
            Phase::Build(_) => PhaseKind::Build,
            Phase::Attack(_) => PhaseKind::Attack,
        }
    }
}

#[derive(Debug)]
pub struct PhaseController {
    registry: Arc<Registry>,
    settings: GameSettings,
    collab: Collaborators,
    clock: TickClock,
    /// Action table handed from phase to phase. Cancelled entries never
    /// resolve again, whichever phase is current.
    pending: PendingActions,
    /// Sub-unit currency the store's whole-unit balance cannot hold, passed
    /// on to the next phase with a ledger.
    carry: Fixed64,
    phase: Phase,
}

impl PhaseController {
    /// Start in the Select phase.
    pub fn new(registry: Arc<Registry>, settings: GameSettings, mut collab: Collaborators) -> Self {
        let select = SelectPhase::new(&mut collab);
        let clock = TickClock::new(settings.tick_interval);
        info!(phase = ?PhaseKind::Select, "phase controller started");
        Self {
            registry,
            settings,
            collab,
            clock,
            pending: PendingActions::new(),
            carry: Fixed64::ZERO,
            phase: Phase::Select(select),
        }
    }

    pub fn from_game_data(data: GameData, collab: Collaborators) -> Self {
        Self::new(data.registry, data.settings, collab)
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn kind(&self) -> PhaseKind {
        self.phase.kind()
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn settings(&self) -> &GameSettings {
        &self.settings
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collab
    }

    pub fn clock(&self) -> &TickClock {
        &self.clock
    }

    pub fn select(&self) -> Option<&SelectPhase> {
        match &self.phase {
            Phase::Select(select) => Some(select),
            _ => None,
        }
    }

    pub fn build(&self) -> Option<&BuildPhase> {
        match &self.phase {
            Phase::Build(build) => Some(build),
            _ => None,
        }
    }

    pub fn attack(&self) -> Option<&AttackPhase> {
        match &self.phase {
            Phase::Attack(attack) => Some(attack),
            _ => None,
        }
    }

    fn wrong_phase(&self, expected: PhaseKind) -> PhaseError {
        PhaseError::WrongPhase {
            expected,
            actual: self.phase.kind(),
        }
    }

    fn build_parts(&mut self) -> Result<(&mut BuildPhase, &mut Collaborators), PhaseError> {
        let actual = self.phase.kind();
        match &mut self.phase {
            Phase::Build(build) => Ok((build, &mut self.collab)),
            _ => Err(PhaseError::WrongPhase {
                expected: PhaseKind::Build,
                actual,
            }),
        }
    }

    fn attack_parts(&mut self) -> Result<(&mut AttackPhase, &mut Collaborators), PhaseError> {
        let actual = self.phase.kind();
        match &mut self.phase {
            Phase::Attack(attack) => Ok((attack, &mut self.collab)),
            _ => Err(PhaseError::WrongPhase {
                expected: PhaseKind::Attack,
                actual,
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    pub fn enter_select(&mut self) {
        let from = self.teardown();
        self.phase = Phase::Select(SelectPhase::new(&mut self.collab));
        info!(?from, to = ?PhaseKind::Select, "phase transition");
    }

    /// On failure the controller falls back to the Select phase.
    pub fn enter_build(&mut self) -> Result<(), PhaseError> {
        let from = self.teardown();
        match BuildPhase::new(self.registry.clone(), &self.settings, &mut self.collab) {
            Ok(mut build) => {
                build.adopt_pending(std::mem::take(&mut self.pending));
                if self.carry > Fixed64::ZERO {
                    let carry = std::mem::replace(&mut self.carry, Fixed64::ZERO);
                    build.adopt_carry(carry, &mut self.collab);
                }
                self.phase = Phase::Build(build);
                info!(?from, to = ?PhaseKind::Build, "phase transition");
                Ok(())
            }
            Err(err) => Err(self.fall_back(err)),
        }
    }

    /// On failure the controller falls back to the Select phase.
    pub fn enter_attack(&mut self, opponent: &str) -> Result<(), PhaseError> {
        let from = self.teardown();
        match AttackPhase::new(
            self.registry.clone(),
            &self.settings,
            &mut self.collab,
            opponent,
        ) {
            Ok(mut attack) => {
                attack.adopt_pending(std::mem::take(&mut self.pending));
                if self.carry > Fixed64::ZERO {
                    let carry = std::mem::replace(&mut self.carry, Fixed64::ZERO);
                    attack.adopt_carry(carry, &mut self.collab);
                }
                self.phase = Phase::Attack(attack);
                info!(?from, to = ?PhaseKind::Attack, opponent, "phase transition");
                Ok(())
            }
            Err(err) => Err(self.fall_back(err)),
        }
    }

    fn fall_back(&mut self, err: PhaseError) -> PhaseError {
        warn!(%err, "phase construction failed, returning to select");
        self.collab.clear();
        self.phase = Phase::Select(SelectPhase::new(&mut self.collab));
        err
    }

    /// Tear the current phase down, leaving an empty Select phase in its
    /// place. Returns the kind torn down.
    fn teardown(&mut self) -> PhaseKind {
        let old = std::mem::replace(&mut self.phase, Phase::Select(SelectPhase::default()));
        let kind = old.kind();
        match old {
            Phase::Select(_) => {}
            Phase::Build(build) => {
                self.carry = build.ledger().fraction();
                self.pending = build.teardown(&mut self.collab);
            }
            Phase::Attack(attack) => {
                self.carry = attack.ledger().fraction();
                self.pending = attack.teardown(&mut self.collab);
            }
        }
        self.collab.clear();
        self.clock.reset();
        kind
    }

    // -----------------------------------------------------------------------
    // Frame and tick
    // -----------------------------------------------------------------------

    /// Advance one frame: per-frame collaborators, combat when attacking,
    /// then as many logic ticks as the accumulated time allows.
    pub fn update(&mut self, delta: Seconds) -> CombatReport {
        self.collab.renderer.animate(delta);
        self.collab.overlay.reposition(delta);
        let report = match &mut self.phase {
            Phase::Attack(attack) => attack.update(&mut self.collab, delta),
            _ => CombatReport::default(),
        };
        let due = self.clock.advance(delta);
        for _ in 0..due {
            self.tick();
        }
        report
    }

    fn tick(&mut self) {
        match &mut self.phase {
            Phase::Select(_) => {}
            Phase::Build(build) => build.tick(&mut self.collab),
            Phase::Attack(attack) => attack.tick(&mut self.collab),
        }
        self.collab.renderer.idle_drift(self.clock.interval());
    }

    // -----------------------------------------------------------------------
    // Select phase
    // -----------------------------------------------------------------------

    /// Remember the opponent to attack. Returns `false` for unknown names.
    pub fn choose_opponent(&mut self, name: &str) -> Result<bool, PhaseError> {
        match &mut self.phase {
            Phase::Select(select) => Ok(select.choose(name)),
            _ => Err(self.wrong_phase(PhaseKind::Select)),
        }
    }

    /// Enter the Attack phase against the chosen opponent.
    pub fn attack_chosen(&mut self) -> Result<(), PhaseError> {
        let opponent = match &self.phase {
            Phase::Select(select) => select
                .chosen()
                .map(str::to_string)
                .ok_or_else(|| PhaseError::MissingLayout("no opponent chosen".to_string()))?,
            _ => return Err(self.wrong_phase(PhaseKind::Select)),
        };
        self.enter_attack(&opponent)
    }

    // -----------------------------------------------------------------------
    // Build phase
    // -----------------------------------------------------------------------

    pub fn place(
        &mut self,
        node_type: NodeTypeId,
        position: Position,
    ) -> Result<Option<NodeId>, PhaseError> {
        let (build, collab) = self.build_parts()?;
        build.place(collab, node_type, position)
    }

    pub fn remove_node(&mut self, node: NodeId) -> Result<(), PhaseError> {
        let (build, collab) = self.build_parts()?;
        build.remove(collab, node)
    }

    pub fn unlink(&mut self, tether: TetherId) -> Result<(), PhaseError> {
        let (build, collab) = self.build_parts()?;
        build.unlink(collab, tether)
    }

    pub fn save_layout(&mut self) -> Result<(), PhaseError> {
        let (build, collab) = self.build_parts()?;
        build.save(collab)
    }

    // -----------------------------------------------------------------------
    // Build and Attack phases
    // -----------------------------------------------------------------------

    /// Tether two nodes. In the Attack phase `a` must be friendly and `b`
    /// an enemy.
    pub fn link(&mut self, a: NodeId, b: NodeId) -> Result<TetherId, PhaseError> {
        match &mut self.phase {
            Phase::Build(build) => build.link(&mut self.collab, a, b),
            Phase::Attack(attack) => attack.link(&mut self.collab, a, b),
            Phase::Select(_) => Err(self.wrong_phase(PhaseKind::Build)),
        }
    }

    pub fn begin_link(&mut self, from: NodeId) -> Result<ActionId, PhaseError> {
        match &mut self.phase {
            Phase::Build(build) => build.begin_link(&mut self.collab, from),
            Phase::Attack(attack) => attack.begin_link(&mut self.collab, from),
            Phase::Select(_) => Err(self.wrong_phase(PhaseKind::Build)),
        }
    }

    /// Fails with [`PhaseError::ActionCancelled`] when a transition came in
    /// between.
    pub fn finish_link(&mut self, action: ActionId, to: NodeId) -> Result<TetherId, PhaseError> {
        match &mut self.phase {
            Phase::Build(build) => build.finish_link(&mut self.collab, action, to),
            Phase::Attack(attack) => attack.finish_link(&mut self.collab, action, to),
            Phase::Select(_) => Err(PhaseError::ActionCancelled(action)),
        }
    }

    // -----------------------------------------------------------------------
    // Attack phase
    // -----------------------------------------------------------------------

    pub fn assign_attacker(
        &mut self,
        node: NodeId,
        attack_type: AttackTypeId,
        strategy: TargetingStrategy,
    ) -> Result<AssignOutcome, PhaseError> {
        let (attack, collab) = self.attack_parts()?;
        attack.assign(collab, node, attack_type, strategy)
    }

    pub fn remove_attacker(
        &mut self,
        node: NodeId,
        index: usize,
    ) -> Result<Option<AttackId>, PhaseError> {
        let (attack, _) = self.attack_parts()?;
        attack.remove_attacker(node, index)
    }

    pub fn begin_target(&mut self, attack_id: AttackId) -> Result<ActionId, PhaseError> {
        let (attack, collab) = self.attack_parts()?;
        attack.begin_target(collab, attack_id)
    }

    pub fn finish_target(&mut self, action: ActionId, target: NodeId) -> Result<(), PhaseError> {
        match &mut self.phase {
            Phase::Attack(attack) => attack.finish_target(&mut self.collab, action, target),
            _ => Err(PhaseError::ActionCancelled(action)),
        }
    }

    pub fn battle_status(&self) -> Option<BattleStatus> {
        self.attack().map(AttackPhase::status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collab::MemoryStore;
    use crate::test_utils::*;
    use nodewar_core::test_utils::*;

    fn controller(store: MemoryStore) -> PhaseController {
        PhaseController::new(
            standard_registry(),
            GameSettings::default(),
            recording_collaborators(store),
        )
    }

    #[test]
    fn starts_in_select() {
        let ctl = controller(skirmish_store());
        assert_eq!(ctl.kind(), PhaseKind::Select);
        assert_eq!(ctl.select().unwrap().opponents(), [RIVAL]);
        assert!(ctl.build().is_none());
        assert_eq!(ctl.battle_status(), None);
    }

    #[test]
    fn wrong_phase_operations_fail() {
        let mut ctl = controller(skirmish_store());
        let err = ctl.place(base_type(), Position::ORIGIN).unwrap_err();
        assert!(matches!(
            err,
            PhaseError::WrongPhase {
                expected: PhaseKind::Build,
                actual: PhaseKind::Select
            }
        ));
        ctl.enter_build().unwrap();
        assert!(matches!(
            ctl.choose_opponent(RIVAL),
            Err(PhaseError::WrongPhase { .. })
        ));
    }

    #[test]
    fn transitions_tear_down_and_rebuild() {
        let mut ctl = controller(skirmish_store());
        ctl.enter_build().unwrap();
        assert_eq!(rendered(ctl.collaborators()).nodes.len(), 3);

        ctl.enter_attack(RIVAL).unwrap();
        assert_eq!(ctl.kind(), PhaseKind::Attack);
        assert_eq!(rendered(ctl.collaborators()).nodes.len(), 6);
        assert_eq!(rendered(ctl.collaborators()).clears, 2);

        ctl.enter_select();
        assert!(rendered(ctl.collaborators()).nodes.is_empty());
        assert_eq!(overlay(ctl.collaborators()).clears, 3);
    }

    #[test]
    fn transition_cancels_pending_actions() {
        let mut ctl = controller(skirmish_store());
        ctl.enter_build().unwrap();
        let hub = ctl.build().unwrap().graph().hubs().next().unwrap();
        let action = ctl.begin_link(hub).unwrap();

        ctl.enter_attack(RIVAL).unwrap();
        let ours = ctl
            .attack()
            .unwrap()
            .engine()
            .graph()
            .hubs()
            .next()
            .unwrap();
        assert!(matches!(
            ctl.finish_link(action, ours),
            Err(PhaseError::ActionCancelled(id)) if id == action
        ));
    }

    #[test]
    fn failed_attack_falls_back_to_select() {
        let mut ctl = controller(MemoryStore::new().with_opponent(RIVAL, rival_layout()));
        let err = ctl.enter_attack(RIVAL).unwrap_err();
        assert!(matches!(err, PhaseError::MissingLayout(_)));
        assert_eq!(ctl.kind(), PhaseKind::Select);
        assert_eq!(ctl.select().unwrap().opponents(), [RIVAL]);
    }

    #[test]
    fn chosen_opponent_is_attacked() {
        let mut ctl = controller(skirmish_store());
        assert!(matches!(
            ctl.attack_chosen(),
            Err(PhaseError::MissingLayout(_))
        ));
        assert!(!ctl.choose_opponent("nobody").unwrap());
        assert!(ctl.choose_opponent(RIVAL).unwrap());
        ctl.attack_chosen().unwrap();
        assert_eq!(ctl.attack().unwrap().opponent(), RIVAL);
        assert_eq!(ctl.battle_status(), Some(BattleStatus::Ongoing));
    }

    #[test]
    fn update_runs_fixed_ticks() {
        let settings = GameSettings {
            tick_interval: fixed(0.125),
            ..GameSettings::default()
        };
        let mut ctl = PhaseController::new(
            standard_registry(),
            settings,
            recording_collaborators(skirmish_store()),
        );
        ctl.enter_build().unwrap();
        ctl.place(mine_type(), Position::ORIGIN).unwrap().unwrap();
        assert_eq!(ctl.build().unwrap().ledger().balance(), 450);

        // Ten frames of 0.25s at a 0.125s tick: 20 ticks.
        for _ in 0..10 {
            ctl.update(fixed(0.25));
        }
        assert_eq!(ctl.clock().ticks(), 20);
        assert_eq!(ctl.build().unwrap().ledger().balance(), 470);
        let renderer = rendered(ctl.collaborators());
        assert_eq!(renderer.frames, 10);
        assert_eq!(renderer.drifts, 20);
    }

    #[test]
    fn balance_survives_phase_changes() {
        let mut ctl = controller(skirmish_store());
        ctl.enter_build().unwrap();
        ctl.place(base_type(), Position::ORIGIN).unwrap().unwrap();
        ctl.enter_select();
        assert_eq!(stored(ctl.collaborators()).currency(), Some(400));

        ctl.enter_attack(RIVAL).unwrap();
        assert_eq!(ctl.attack().unwrap().ledger().balance(), 400);
    }

    #[test]
    fn fractional_income_survives_phase_changes() {
        let mut builder = standard_builder();
        builder
            .mutate_node_type("mine", |def| def.income = fixed(0.25))
            .unwrap();
        let settings = GameSettings {
            tick_interval: fixed(0.125),
            ..GameSettings::default()
        };
        let mut ctl = PhaseController::new(
            Arc::new(builder.build().unwrap()),
            settings,
            recording_collaborators(skirmish_store()),
        );
        ctl.enter_build().unwrap();
        ctl.place(mine_type(), Position::ORIGIN).unwrap().unwrap();
        // Six ticks at a quarter unit each.
        ctl.update(fixed(0.75));
        assert_eq!(ctl.build().unwrap().ledger().exact(), fixed(451.5));

        ctl.enter_select();
        assert_eq!(stored(ctl.collaborators()).currency(), Some(451));

        ctl.enter_build().unwrap();
        assert_eq!(ctl.build().unwrap().ledger().exact(), fixed(451.5));
        ctl.enter_attack(RIVAL).unwrap();
        assert_eq!(ctl.attack().unwrap().ledger().exact(), fixed(451.5));
    }
}
