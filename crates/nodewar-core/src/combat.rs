//! Combat resolution over an [`EntityGraph`].
//!
//! The engine keeps per-node combat state (vitals, attacker slots, status
//! timer) in `SecondaryMap`s keyed by [`NodeId`], one [`InstancePool`] of
//! beams per attack type, and an arena of [`AttackInstance`]s binding a pool
//! slot to an attacking node.
//!
//! # Update order
//!
//! Each [`CombatEngine::update`] runs, strictly in sequence:
//!
//! 1. **Status** -- tick every node's status timer and apply expiry actions.
//! 2. **Targeting** -- advance cooldowns, drop invalid targets, acquire new
//!    targets and launch beams.
//! 3. **Animation** -- tick every pool; finished beams mark their attack
//!    resolved.
//! 4. **Resolution** -- in completion order: apply damage and secondary
//!    effects, capture dead nodes, start cooldowns.

use crate::fixed::{Fixed64, Seconds, halve};
use crate::graph::{EntityGraph, GraphError, RemovedNode};
use crate::health::Vitals;
use crate::id::*;
use crate::pool::{InstancePool, PoolError, SlotTransform};
use crate::registry::{AttackEffect, NodeKind, Registry};
use crate::sim::StateHash;
use crate::slots::{AttackerSlot, AttackerSlots};
use crate::status::{Expired, OverridePolicy, StatusEffect, StatusTimer};
use crate::targeting::{TargetCandidate, TargetingStrategy};
use serde::{Deserialize, Serialize};
use slotmap::{Key, SecondaryMap, SlotMap};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CombatError {
    #[error(transparent)]
    Graph(#[from] GraphError),
    #[error(transparent)]
    Pool(#[from] PoolError),
    #[error("unknown attack type: {0:?}")]
    UnknownAttackType(AttackTypeId),
    #[error("attack not found: {0:?}")]
    AttackNotFound(AttackId),
}

// ---------------------------------------------------------------------------
// Configuration and state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CombatConfig {
    /// Leave disabled nodes out of target selection.
    pub skip_disabled_targets: bool,
}

/// Where an attack is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttackState {
    Idle,
    Targeting,
    Animating,
    Resolved,
    Cooldown { remaining: Seconds },
}

/// One pool slot bound to an attacking node.
#[derive(Debug, Clone)]
pub struct AttackInstance {
    pub origin: NodeId,
    pub target: Option<NodeId>,
    pub attack_type: AttackTypeId,
    pub slot: SlotId,
    pub damage: Fixed64,
    pub cooldown: Seconds,
    pub strategy: TargetingStrategy,
    /// Preferred target, used while it stays attackable.
    pub focus: Option<NodeId>,
    /// Inactive attacks hold their slot but never target.
    pub active: bool,
    pub state: AttackState,
}

/// Actions a status timer can carry to its expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpiryAction {
    /// Remove up to this much shield.
    StripShield(Fixed64),
}

/// Result of [`CombatEngine::add_attacker`]. Only `Added` changes state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOutcome {
    Added(AttackId),
    /// The node's slot array is full.
    SlotsFull,
    /// Every beam of this attack type is in use.
    PoolSaturated,
    /// The node is dead or its type does not accept this attack type.
    Rejected,
}

impl AssignOutcome {
    pub fn attack(self) -> Option<AttackId> {
        match self {
            AssignOutcome::Added(id) => Some(id),
            _ => None,
        }
    }
}

/// Something that happened during an update, for the overlay and tests.
#[derive(Debug, Clone, PartialEq)]
pub enum CombatEvent {
    AttackLaunched {
        attack: AttackId,
        origin: NodeId,
        target: NodeId,
    },
    AttackLanded {
        attack: AttackId,
        origin: NodeId,
        target: NodeId,
        damage: Fixed64,
        overkill: Fixed64,
    },
    /// A node took effect damage from a splash.
    SplashHit { node: NodeId, damage: Fixed64 },
    Healed { node: NodeId, amount: Fixed64 },
    StatusApplied {
        node: NodeId,
        effect: StatusEffect,
        duration: Seconds,
    },
    StatusExpired { node: NodeId, effect: StatusEffect },
    /// A node died and changed sides.
    NodeCaptured { node: NodeId, now: Allegiance },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CombatReport {
    pub events: Vec<CombatEvent>,
}

impl CombatReport {
    pub fn captures(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.events.iter().filter_map(|e| match e {
            CombatEvent::NodeCaptured { node, .. } => Some(*node),
            _ => None,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

// ---------------------------------------------------------------------------
// CombatEngine
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CombatEngine {
    graph: EntityGraph,
    config: CombatConfig,
    pools: BTreeMap<AttackTypeId, InstancePool>,
    /// Which attack holds each allocated pool slot.
    owners: BTreeMap<(AttackTypeId, SlotId), AttackId>,
    attacks: SlotMap<AttackId, AttackInstance>,
    vitals: SecondaryMap<NodeId, Vitals>,
    slots: SecondaryMap<NodeId, AttackerSlots>,
    status: SecondaryMap<NodeId, StatusTimer<ExpiryAction>>,
}

impl CombatEngine {
    /// An engine over an empty graph, with one pool per registered attack
    /// type.
    pub fn new(registry: Arc<Registry>, config: CombatConfig) -> Self {
        Self::from_graph(EntityGraph::new(registry), config)
    }

    /// Take over an existing graph, giving every node full vitals and empty
    /// slots.
    pub fn from_graph(graph: EntityGraph, config: CombatConfig) -> Self {
        let pools = graph
            .registry()
            .attack_types()
            .map(|(id, def)| (id, InstancePool::for_attack(def)))
            .collect();
        let mut engine = Self {
            graph,
            config,
            pools,
            owners: BTreeMap::new(),
            attacks: SlotMap::with_key(),
            vitals: SecondaryMap::new(),
            slots: SecondaryMap::new(),
            status: SecondaryMap::new(),
        };
        let ids: Vec<NodeId> = engine.graph.nodes().map(|(id, _)| id).collect();
        for id in ids {
            engine.init_node(id);
        }
        engine
    }

    fn init_node(&mut self, id: NodeId) {
        let Some(def) = self.graph.node_type_def(id) else {
            return;
        };
        let vitals = Vitals::new(def.base_health, def.base_shield);
        let slots = AttackerSlots::new(def.attacker_slots);
        self.vitals.insert(id, vitals);
        self.slots.insert(id, slots);
        self.status.insert(id, StatusTimer::new());
    }

    pub fn graph(&self) -> &EntityGraph {
        &self.graph
    }

    pub fn registry(&self) -> &Arc<Registry> {
        self.graph.registry()
    }

    pub fn config(&self) -> CombatConfig {
        self.config
    }

    // -----------------------------------------------------------------------
    // Graph mutation
    // -----------------------------------------------------------------------

    pub fn create_node(
        &mut self,
        node_type: NodeTypeId,
        position: Position,
        allegiance: Allegiance,
    ) -> Result<NodeId, CombatError> {
        let id = self.graph.create_node_as(node_type, position, allegiance)?;
        self.init_node(id);
        Ok(id)
    }

    pub fn tether(&mut self, a: NodeId, b: NodeId) -> Result<TetherId, CombatError> {
        Ok(self.graph.tether(a, b)?)
    }

    /// Attacks across the removed tether lose their target on the next
    /// update.
    pub fn remove_tether(&mut self, id: TetherId) -> Result<(), CombatError> {
        self.graph.remove_tether(id)?;
        Ok(())
    }

    /// Remove a node, releasing its attacks and interrupting every attack
    /// aimed at it.
    pub fn remove_node(&mut self, id: NodeId) -> Result<RemovedNode, CombatError> {
        if !self.graph.contains_node(id) {
            return Err(GraphError::NodeNotFound(id).into());
        }
        self.halt_attacks_involving(id);
        self.vitals.remove(id);
        self.slots.remove(id);
        self.status.remove(id);
        Ok(self.graph.remove_node(id)?)
    }

    // -----------------------------------------------------------------------
    // Attackers
    // -----------------------------------------------------------------------

    /// Put an attack of `attack_type` into the next free slot of `node`.
    ///
    /// Resource limits are reported through [`AssignOutcome`]; only unknown
    /// ids are errors.
    pub fn add_attacker(
        &mut self,
        node: NodeId,
        attack_type: AttackTypeId,
        strategy: TargetingStrategy,
    ) -> Result<AssignOutcome, CombatError> {
        let node_def = self
            .graph
            .node_type_def(node)
            .ok_or(GraphError::NodeNotFound(node))?;
        let allowed = node_def.allows(attack_type);
        let registry = Arc::clone(self.graph.registry());
        let attack_def = registry
            .get_attack_type(attack_type)
            .ok_or(CombatError::UnknownAttackType(attack_type))?;

        if !allowed || !self.is_alive(node) {
            warn!(?node, ?attack_type, "attacker rejected");
            return Ok(AssignOutcome::Rejected);
        }
        if self.slots.get(node).is_some_and(|s| s.is_full()) {
            return Ok(AssignOutcome::SlotsFull);
        }
        let pool = self
            .pools
            .get_mut(&attack_type)
            .ok_or(CombatError::UnknownAttackType(attack_type))?;
        let Some(slot) = pool.allocate() else {
            debug!(?node, ?attack_type, "beam pool saturated");
            return Ok(AssignOutcome::PoolSaturated);
        };

        let id = self.attacks.insert(AttackInstance {
            origin: node,
            target: None,
            attack_type,
            slot,
            damage: attack_def.damage,
            cooldown: attack_def.cooldown,
            strategy,
            focus: None,
            active: true,
            state: AttackState::Idle,
        });
        let pushed = match self.slots.get_mut(node) {
            Some(slots) => slots.push(AttackerSlot {
                attack: id,
                attack_type,
            }),
            None => Err(AttackerSlot {
                attack: id,
                attack_type,
            }),
        };
        if pushed.is_err() {
            self.release_attack(id);
            return Ok(AssignOutcome::SlotsFull);
        }
        self.owners.insert((attack_type, slot), id);
        debug!(?node, attack = ?id, ?attack_type, "attacker added");
        Ok(AssignOutcome::Added(id))
    }

    /// Remove the attacker at `index` of `node`'s slots, releasing its beam.
    /// Later attackers shift down one place.
    pub fn remove_attacker(
        &mut self,
        node: NodeId,
        index: usize,
    ) -> Result<Option<AttackId>, CombatError> {
        let slots = self
            .slots
            .get_mut(node)
            .ok_or(GraphError::NodeNotFound(node))?;
        let Some(entry) = slots.pop(index) else {
            return Ok(None);
        };
        self.release_attack(entry.attack);
        debug!(?node, index, attack = ?entry.attack, "attacker removed");
        Ok(Some(entry.attack))
    }

    /// Release every attacker of `node`.
    pub fn clear_attackers(&mut self, node: NodeId) -> Result<usize, CombatError> {
        let slots = self
            .slots
            .get_mut(node)
            .ok_or(GraphError::NodeNotFound(node))?;
        let cleared = slots.clear();
        for entry in &cleared {
            self.release_attack(entry.attack);
        }
        Ok(cleared.len())
    }

    /// Pin an attack to `target`. The pin is dropped when the target is no
    /// longer attackable.
    pub fn focus(&mut self, attack: AttackId, target: Option<NodeId>) -> Result<(), CombatError> {
        let instance = self
            .attacks
            .get_mut(attack)
            .ok_or(CombatError::AttackNotFound(attack))?;
        instance.focus = target;
        Ok(())
    }

    /// Pause or resume an attack. Pausing stops a beam in flight.
    pub fn set_active(&mut self, attack: AttackId, active: bool) -> Result<(), CombatError> {
        let instance = self
            .attacks
            .get_mut(attack)
            .ok_or(CombatError::AttackNotFound(attack))?;
        instance.active = active;
        if !active {
            self.interrupt(attack);
            self.set_state(attack, AttackState::Idle);
        }
        Ok(())
    }

    /// Arm every unarmed node of `allegiance` with its type's default
    /// attack. Returns the attacks created.
    pub fn auto_arm(&mut self, allegiance: Allegiance, strategy: TargetingStrategy) -> Vec<AttackId> {
        let candidates: Vec<(NodeId, AttackTypeId)> = self
            .graph
            .nodes()
            .filter(|(_, data)| data.allegiance == allegiance)
            .filter_map(|(id, _)| {
                let def = self.graph.node_type_def(id)?;
                let attack = def.default_attack?;
                self.slots.get(id)?.is_empty().then_some((id, attack))
            })
            .collect();
        candidates
            .into_iter()
            .filter_map(|(node, attack_type)| {
                self.add_attacker(node, attack_type, strategy)
                    .ok()
                    .and_then(AssignOutcome::attack)
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Health and status
    // -----------------------------------------------------------------------

    /// Deal `value` damage outside the attack cycle. Captures the node if it
    /// dies.
    pub fn damage(&mut self, node: NodeId, value: Fixed64) -> Result<CombatReport, CombatError> {
        let vitals = self
            .vitals
            .get_mut(node)
            .ok_or(GraphError::NodeNotFound(node))?;
        vitals.apply_damage(value);
        let mut report = CombatReport::default();
        self.capture_if_dead(node, &mut report.events);
        Ok(report)
    }

    pub fn heal(&mut self, node: NodeId, value: Fixed64) -> Result<Fixed64, CombatError> {
        let vitals = self
            .vitals
            .get_mut(node)
            .ok_or(GraphError::NodeNotFound(node))?;
        Ok(vitals.apply_heal(value))
    }

    /// Start a status effect on `node`, replacing the current one. Returns
    /// the expiry events fired by the override, if any.
    pub fn apply_status(
        &mut self,
        node: NodeId,
        effect: StatusEffect,
        duration: Seconds,
        on_expire: Option<ExpiryAction>,
        policy: OverridePolicy,
    ) -> Result<Vec<CombatEvent>, CombatError> {
        let mut events = Vec::new();
        self.set_status(node, effect, duration, on_expire, policy, &mut events)?;
        Ok(events)
    }

    fn set_status(
        &mut self,
        node: NodeId,
        effect: StatusEffect,
        duration: Seconds,
        on_expire: Option<ExpiryAction>,
        policy: OverridePolicy,
        events: &mut Vec<CombatEvent>,
    ) -> Result<(), CombatError> {
        let timer = self
            .status
            .get_mut(node)
            .ok_or(GraphError::NodeNotFound(node))?;
        if let Some(fired) = timer.set(effect, duration, on_expire, policy) {
            self.run_expiry(node, fired, events);
        }
        debug!(?node, ?effect, "status applied");
        Ok(())
    }

    /// Grant `amount` shield for `duration`, stripped again on expiry.
    pub fn fortify(
        &mut self,
        node: NodeId,
        amount: Fixed64,
        duration: Seconds,
    ) -> Result<Vec<CombatEvent>, CombatError> {
        let events = self.apply_status(
            node,
            StatusEffect::Fortified,
            duration,
            Some(ExpiryAction::StripShield(amount)),
            OverridePolicy::FireExpiry,
        )?;
        if let Some(vitals) = self.vitals.get_mut(node) {
            vitals.apply_shield(amount);
        }
        Ok(events)
    }

    pub fn disable(
        &mut self,
        node: NodeId,
        duration: Seconds,
    ) -> Result<Vec<CombatEvent>, CombatError> {
        self.apply_status(
            node,
            StatusEffect::Disabled,
            duration,
            None,
            OverridePolicy::FireExpiry,
        )
    }

    fn run_expiry(&mut self, node: NodeId, expired: Expired<ExpiryAction>, events: &mut Vec<CombatEvent>) {
        if let Some(ExpiryAction::StripShield(amount)) = expired.action
            && let Some(vitals) = self.vitals.get_mut(node)
        {
            vitals.strip_shield(amount);
        }
        events.push(CombatEvent::StatusExpired {
            node,
            effect: expired.effect,
        });
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn vitals(&self, node: NodeId) -> Option<&Vitals> {
        self.vitals.get(node)
    }

    pub fn attacker_slots(&self, node: NodeId) -> Option<&AttackerSlots> {
        self.slots.get(node)
    }

    pub fn status(&self, node: NodeId) -> Option<&StatusTimer<ExpiryAction>> {
        self.status.get(node)
    }

    pub fn attack(&self, id: AttackId) -> Option<&AttackInstance> {
        self.attacks.get(id)
    }

    pub fn attacks(&self) -> impl Iterator<Item = (AttackId, &AttackInstance)> {
        self.attacks.iter()
    }

    pub fn attack_count(&self) -> usize {
        self.attacks.len()
    }

    pub fn pool(&self, attack_type: AttackTypeId) -> Option<&InstancePool> {
        self.pools.get(&attack_type)
    }

    pub fn pools(&self) -> impl Iterator<Item = (AttackTypeId, &InstancePool)> {
        self.pools.iter().map(|(&id, pool)| (id, pool))
    }

    pub fn is_alive(&self, node: NodeId) -> bool {
        self.vitals.get(node).is_some_and(|v| !v.is_dead())
    }

    pub fn is_disabled(&self, node: NodeId) -> bool {
        self.status
            .get(node)
            .is_some_and(|s| s.has(StatusEffect::Disabled))
    }

    /// Whether `origin` may currently shoot at `target`.
    pub fn can_attack(&self, origin: NodeId, target: NodeId) -> bool {
        let (Some(from), Some(to)) = (self.graph.get_node(origin), self.graph.get_node(target)) else {
            return false;
        };
        from.allegiance != to.allegiance
            && to.kind != NodeKind::Hub
            && self.is_alive(target)
            && !(self.config.skip_disabled_targets && self.is_disabled(target))
            && self.graph.is_neighbor(origin, target).is_some()
    }

    /// Neighbors of `node` it may attack, in id order.
    pub fn attackable_neighbors(&self, node: NodeId) -> Result<Vec<NodeId>, CombatError> {
        Ok(self
            .graph
            .neighbors(node)?
            .into_iter()
            .filter(|&n| self.can_attack(node, n))
            .collect())
    }

    /// Number of living, non-hub nodes fighting for `allegiance`.
    pub fn side_strength(&self, allegiance: Allegiance) -> usize {
        self.graph
            .nodes()
            .filter(|(id, data)| {
                data.allegiance == allegiance && data.kind != NodeKind::Hub && self.is_alive(*id)
            })
            .count()
    }

    /// Currency produced per logic tick by economy nodes of `allegiance`.
    /// Captured mines pay their new owner.
    pub fn income(&self, allegiance: Allegiance) -> Fixed64 {
        self.graph.income(allegiance)
    }

    /// Hash of everything the combat outcome depends on.
    pub fn state_hash(&self) -> u64 {
        let mut h = StateHash::new();
        for (id, data) in self.graph.nodes() {
            h.write_u64(id.data().as_ffi());
            h.write_u32(data.node_type.0);
            h.write_u32(data.allegiance as u32);
            if let Some(v) = self.vitals.get(id) {
                h.write_fixed64(v.health());
                h.write_fixed64(v.shield());
            }
        }
        for (id, attack) in &self.attacks {
            h.write_u64(id.data().as_ffi());
            h.write_u64(attack.target.map_or(0, |t| t.data().as_ffi()));
            match attack.state {
                AttackState::Idle => h.write_u32(0),
                AttackState::Targeting => h.write_u32(1),
                AttackState::Animating => h.write_u32(2),
                AttackState::Resolved => h.write_u32(3),
                AttackState::Cooldown { remaining } => {
                    h.write_u32(4);
                    h.write_fixed64(remaining);
                }
            }
        }
        h.finish()
    }

    // -----------------------------------------------------------------------
    // Update
    // -----------------------------------------------------------------------

    /// Advance combat by `delta`.
    pub fn update(&mut self, delta: Seconds) -> CombatReport {
        let mut events = Vec::new();

        // Phase 1: status timers.
        let nodes: Vec<NodeId> = self.status.keys().collect();
        for node in nodes {
            let expired = self.status.get_mut(node).and_then(|t| t.tick(delta));
            if let Some(expired) = expired {
                self.run_expiry(node, expired, &mut events);
            }
        }

        // Phase 2: cooldowns and targeting.
        let attacks: Vec<AttackId> = self.attacks.keys().collect();
        for &attack in &attacks {
            self.advance_attack(attack, delta, &mut events);
        }

        // Phase 3: animation.
        let mut finished = Vec::new();
        for (&attack_type, pool) in &mut self.pools {
            for slot in pool.tick_all(delta) {
                if let Some(&attack) = self.owners.get(&(attack_type, slot)) {
                    finished.push(attack);
                }
            }
        }
        for &attack in &finished {
            if self.attacks.get(attack).is_some_and(|a| a.state == AttackState::Animating) {
                self.set_state(attack, AttackState::Resolved);
            }
        }

        // Phase 4: resolution.
        for attack in finished {
            self.resolve(attack, &mut events);
        }

        CombatReport { events }
    }

    fn advance_attack(&mut self, id: AttackId, delta: Seconds, events: &mut Vec<CombatEvent>) {
        let Some((active, state)) = self.attacks.get(id).map(|a| (a.active, a.state)) else {
            return;
        };
        if !active {
            return;
        }
        match state {
            AttackState::Cooldown { remaining } => {
                let remaining = remaining - delta;
                if remaining > Fixed64::ZERO {
                    self.set_state(id, AttackState::Cooldown { remaining });
                    return;
                }
            }
            AttackState::Animating => {
                if self.target_still_valid(id) {
                    return;
                }
                self.interrupt(id);
            }
            AttackState::Idle | AttackState::Targeting | AttackState::Resolved => {}
        }
        self.set_state(id, AttackState::Targeting);
        self.acquire_target(id, events);
    }

    fn target_still_valid(&self, id: AttackId) -> bool {
        let Some(attack) = self.attacks.get(id) else {
            return false;
        };
        let Some(target) = attack.target else {
            return false;
        };
        self.is_alive(attack.origin)
            && !self.is_disabled(attack.origin)
            && self.can_attack(attack.origin, target)
    }

    fn acquire_target(&mut self, id: AttackId, events: &mut Vec<CombatEvent>) {
        let Some(attack) = self.attacks.get(id) else {
            return;
        };
        let (origin, attack_type, slot, strategy, focus) = (
            attack.origin,
            attack.attack_type,
            attack.slot,
            attack.strategy,
            attack.focus,
        );
        if !self.is_alive(origin) || self.is_disabled(origin) {
            return;
        }

        let candidates: Vec<TargetCandidate> = self
            .attackable_neighbors(origin)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|node| {
                let v = self.vitals.get(node)?;
                Some(TargetCandidate {
                    node,
                    health: v.health(),
                    shield: v.shield(),
                })
            })
            .collect();
        let Some(target) = focus
            .filter(|f| candidates.iter().any(|c| c.node == *f))
            .or_else(|| strategy.select(&candidates))
        else {
            return;
        };

        let speed = self
            .registry()
            .get_attack_type(attack_type)
            .map_or(Fixed64::ONE, |def| def.speed);
        let transform = SlotTransform {
            from: self.graph.get_node(origin).map_or(Position::ORIGIN, |n| n.position),
            to: self.graph.get_node(target).map_or(Position::ORIGIN, |n| n.position),
        };
        let Some(pool) = self.pools.get_mut(&attack_type) else {
            return;
        };
        let launched = pool
            .set_transform(slot, transform)
            .and_then(|()| pool.set_speed(slot, speed))
            .and_then(|()| pool.show(slot))
            .and_then(|()| pool.restart(slot));
        if let Err(err) = launched {
            warn!(attack = ?id, %err, "beam launch failed");
            return;
        }

        if let Some(attack) = self.attacks.get_mut(id) {
            attack.target = Some(target);
            attack.state = AttackState::Animating;
        }
        events.push(CombatEvent::AttackLaunched {
            attack: id,
            origin,
            target,
        });
    }

    fn resolve(&mut self, id: AttackId, events: &mut Vec<CombatEvent>) {
        let Some(attack) = self.attacks.get(id) else {
            return;
        };
        if attack.state != AttackState::Resolved {
            return;
        }
        let (origin, target, attack_type, damage, cooldown) = (
            attack.origin,
            attack.target,
            attack.attack_type,
            attack.damage,
            attack.cooldown,
        );
        let valid = self.target_still_valid(id);
        self.interrupt(id);
        let Some(target) = target.filter(|_| valid) else {
            self.set_state(id, AttackState::Targeting);
            return;
        };

        let effect = self
            .registry()
            .get_attack_type(attack_type)
            .map_or(AttackEffect::None, |def| def.effect);
        let splash_victims: Vec<NodeId> = match effect {
            AttackEffect::Splash { .. } => self.splash_victims(target),
            _ => Vec::new(),
        };

        let overkill = self
            .vitals
            .get_mut(target)
            .map_or(Fixed64::ZERO, |v| v.apply_damage(damage));
        events.push(CombatEvent::AttackLanded {
            attack: id,
            origin,
            target,
            damage,
            overkill,
        });

        match effect {
            AttackEffect::None => {}
            AttackEffect::Splash { ratio } => {
                let splash = overkill + damage * ratio;
                for node in &splash_victims {
                    if let Some(v) = self.vitals.get_mut(*node) {
                        v.apply_damage(splash);
                        events.push(CombatEvent::SplashHit {
                            node: *node,
                            damage: splash,
                        });
                    }
                }
            }
            AttackEffect::Disable { duration } => {
                if self.is_alive(target)
                    && self
                        .set_status(
                            target,
                            StatusEffect::Disabled,
                            duration,
                            None,
                            OverridePolicy::FireExpiry,
                            events,
                        )
                        .is_ok()
                {
                    events.push(CombatEvent::StatusApplied {
                        node: target,
                        effect: StatusEffect::Disabled,
                        duration,
                    });
                }
            }
            AttackEffect::Leech { ratio } => {
                let dealt = (damage - overkill).max(Fixed64::ZERO);
                if let Some(v) = self.vitals.get_mut(origin) {
                    let amount = v.apply_heal(dealt * ratio);
                    if amount > Fixed64::ZERO {
                        events.push(CombatEvent::Healed {
                            node: origin,
                            amount,
                        });
                    }
                }
            }
        }

        self.capture_if_dead(target, events);
        for node in splash_victims {
            self.capture_if_dead(node, events);
        }

        // The origin may itself have been captured by a splash above, which
        // releases this attack.
        if self.attacks.contains_key(id) {
            self.set_state(id, AttackState::Cooldown { remaining: cooldown });
        }
    }

    /// Living non-hub neighbors of `target` on the same side as it.
    fn splash_victims(&self, target: NodeId) -> Vec<NodeId> {
        let Some(side) = self.graph.get_node(target).map(|n| n.allegiance) else {
            return Vec::new();
        };
        self.graph
            .neighbors(target)
            .unwrap_or_default()
            .into_iter()
            .filter(|&n| {
                self.graph
                    .get_node(n)
                    .is_some_and(|d| d.allegiance == side && d.kind != NodeKind::Hub)
                    && self.is_alive(n)
            })
            .collect()
    }

    fn capture_if_dead(&mut self, node: NodeId, events: &mut Vec<CombatEvent>) {
        if !self.vitals.get(node).is_some_and(|v| v.is_dead()) {
            return;
        }
        let Some(data) = self.graph.get_node(node) else {
            return;
        };
        let now = data.allegiance.flipped();
        let base = self
            .graph
            .node_type_def(node)
            .map_or(Fixed64::ONE, |def| def.base_health);

        self.halt_attacks_involving(node);
        if let Some(timer) = self.status.get_mut(node) {
            timer.reset();
        }
        if let Some(v) = self.vitals.get_mut(node) {
            v.reset_to(match now {
                Allegiance::Friendly => halve(base),
                Allegiance::Enemy => base,
            });
        }
        // The node was just looked up, so this cannot miss.
        let _ = self.graph.set_allegiance(node, now);

        info!(?node, ?now, "node captured");
        events.push(CombatEvent::NodeCaptured { node, now });
    }

    /// Release every attack originating at `node` and interrupt every attack
    /// aimed at it.
    fn halt_attacks_involving(&mut self, node: NodeId) {
        if let Some(slots) = self.slots.get_mut(node) {
            for entry in slots.clear() {
                self.release_attack(entry.attack);
            }
        }
        let aimed: Vec<AttackId> = self
            .attacks
            .iter()
            .filter(|(_, a)| a.target == Some(node) || a.focus == Some(node))
            .map(|(id, _)| id)
            .collect();
        for id in aimed {
            self.interrupt(id);
            if let Some(attack) = self.attacks.get_mut(id) {
                if attack.focus == Some(node) {
                    attack.focus = None;
                }
                if attack.active {
                    attack.state = AttackState::Targeting;
                }
            }
        }
    }

    /// Stop and hide an attack's beam and forget its target.
    fn interrupt(&mut self, id: AttackId) {
        let Some(attack) = self.attacks.get_mut(id) else {
            return;
        };
        attack.target = None;
        let (attack_type, slot) = (attack.attack_type, attack.slot);
        if let Some(pool) = self.pools.get_mut(&attack_type) {
            let stopped = pool.stop(slot).and_then(|()| pool.hide(slot));
            if let Err(err) = stopped {
                warn!(attack = ?id, %err, "beam interrupt failed");
            }
        }
    }

    fn release_attack(&mut self, id: AttackId) {
        let Some(attack) = self.attacks.remove(id) else {
            return;
        };
        self.owners.remove(&(attack.attack_type, attack.slot));
        if let Some(pool) = self.pools.get_mut(&attack.attack_type)
            && let Err(err) = pool.release(attack.slot)
        {
            warn!(attack = ?id, %err, "beam release failed");
        }
    }

    fn set_state(&mut self, id: AttackId, state: AttackState) {
        if let Some(attack) = self.attacks.get_mut(id) {
            attack.state = state;
        }
    }

    // -----------------------------------------------------------------------
    // Teardown
    // -----------------------------------------------------------------------

    /// Release every beam and drop all nodes, tethers and combat state.
    /// The pools survive, empty, so the engine can be reused.
    pub fn teardown(&mut self) {
        for pool in self.pools.values_mut() {
            pool.release_all();
        }
        self.owners.clear();
        self.attacks.clear();
        self.vitals.clear();
        self.slots.clear();
        self.status.clear();
        self.graph.clear();
        debug!("combat torn down");
    }
}
