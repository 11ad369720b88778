use crate::fixed::{Fixed64, Seconds};
use crate::id::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// The broad category of a node type. Hubs anchor layout connectivity and
/// are never attacked; economy nodes produce currency on the logic tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Base,
    Defense,
    Economy,
    Hub,
}

/// A node type definition.
#[derive(Debug, Clone)]
pub struct NodeTypeDef {
    pub name: String,
    pub kind: NodeKind,
    /// Maximum number of tethers a node of this type may hold. `None` is
    /// unlimited.
    pub max_adjacency: Option<u32>,
    /// Length of the attacker slot array.
    pub attacker_slots: usize,
    pub base_health: Fixed64,
    pub base_shield: Fixed64,
    /// Currency produced per logic tick while friendly.
    pub income: Fixed64,
    /// Currency spent to place one node of this type in the build phase.
    pub cost: u32,
    /// Attack types that may occupy this node's slots. Empty allows all.
    pub allowed_attacks: Vec<AttackTypeId>,
    /// Attack type used when the node is armed automatically.
    pub default_attack: Option<AttackTypeId>,
}

impl NodeTypeDef {
    /// A definition with no slots, no adjacency cap, 100 health and no cost.
    pub fn new(name: &str, kind: NodeKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            max_adjacency: None,
            attacker_slots: 0,
            base_health: Fixed64::from_num(100),
            base_shield: Fixed64::ZERO,
            income: Fixed64::ZERO,
            cost: 0,
            allowed_attacks: Vec::new(),
            default_attack: None,
        }
    }

    /// Whether `attack` may be placed in this type's slots.
    pub fn allows(&self, attack: AttackTypeId) -> bool {
        self.allowed_attacks.is_empty() || self.allowed_attacks.contains(&attack)
    }
}

/// Secondary effect applied when an attack of a given type lands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AttackEffect {
    #[default]
    None,
    /// Overkill plus `ratio * damage` hits every neighbor of the target that
    /// fights on the target's side.
    Splash { ratio: Fixed64 },
    /// Disables the target for `duration`.
    Disable { duration: Seconds },
    /// Heals the origin by `ratio` of the damage dealt.
    Leech { ratio: Fixed64 },
}

/// An attack type definition: gameplay numbers plus the shape of its
/// visual-effect pool.
#[derive(Debug, Clone)]
pub struct AttackTypeDef {
    pub name: String,
    pub damage: Fixed64,
    pub cooldown: Seconds,
    /// Animation speed multiplier applied to the beam.
    pub speed: Fixed64,
    pub effect: AttackEffect,
    /// Number of beam instances the pool for this type can show at once.
    pub pool_capacity: usize,
    pub frame_count: u32,
    pub frame_interval: Seconds,
}

impl AttackTypeDef {
    /// A plain damage beam: 10 damage, 1s cooldown, 8 frames at 1/16s.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            damage: Fixed64::from_num(10),
            cooldown: Fixed64::ONE,
            speed: Fixed64::ONE,
            effect: AttackEffect::None,
            pool_capacity: 32,
            frame_count: 8,
            frame_interval: Fixed64::from_num(1) / Fixed64::from_num(16),
        }
    }
}

/// Builder for constructing an immutable Registry.
/// Three-phase lifecycle: registration -> mutation -> finalization.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    node_types: Vec<NodeTypeDef>,
    attack_types: Vec<AttackTypeDef>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Phase 1: Register an attack type. Returns its ID.
    pub fn register_attack_type(&mut self, def: AttackTypeDef) -> AttackTypeId {
        let id = AttackTypeId(self.attack_types.len() as u32);
        self.attack_types.push(def);
        id
    }

    /// Phase 1: Register a node type. Returns its ID.
    pub fn register_node_type(&mut self, def: NodeTypeDef) -> NodeTypeId {
        let id = NodeTypeId(self.node_types.len() as u32);
        self.node_types.push(def);
        id
    }

    /// Phase 2: Mutate an existing node type by name.
    pub fn mutate_node_type<F>(&mut self, name: &str, f: F) -> Result<(), RegistryError>
    where
        F: FnOnce(&mut NodeTypeDef),
    {
        let def = self
            .node_types
            .iter_mut()
            .find(|d| d.name == name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        f(def);
        Ok(())
    }

    /// Phase 2: Mutate an existing attack type by name.
    pub fn mutate_attack_type<F>(&mut self, name: &str, f: F) -> Result<(), RegistryError>
    where
        F: FnOnce(&mut AttackTypeDef),
    {
        let def = self
            .attack_types
            .iter_mut()
            .find(|d| d.name == name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        f(def);
        Ok(())
    }

    /// Lookup attack type ID by name.
    pub fn attack_type_id(&self, name: &str) -> Option<AttackTypeId> {
        self.attack_types
            .iter()
            .position(|d| d.name == name)
            .map(|i| AttackTypeId(i as u32))
    }

    /// Phase 3: Finalize and build the immutable registry.
    pub fn build(self) -> Result<Registry, RegistryError> {
        let mut attack_name_to_id = HashMap::with_capacity(self.attack_types.len());
        for (i, def) in self.attack_types.iter().enumerate() {
            if def.frame_count == 0 {
                return Err(RegistryError::InvalidAttack {
                    name: def.name.clone(),
                    detail: "frame_count must be at least 1",
                });
            }
            if def.frame_interval <= Fixed64::ZERO {
                return Err(RegistryError::InvalidAttack {
                    name: def.name.clone(),
                    detail: "frame_interval must be positive",
                });
            }
            if def.pool_capacity == 0 {
                return Err(RegistryError::InvalidAttack {
                    name: def.name.clone(),
                    detail: "pool_capacity must be at least 1",
                });
            }
            if def.cooldown < Fixed64::ZERO || def.speed <= Fixed64::ZERO {
                return Err(RegistryError::InvalidAttack {
                    name: def.name.clone(),
                    detail: "cooldown must be non-negative and speed positive",
                });
            }
            if attack_name_to_id
                .insert(def.name.clone(), AttackTypeId(i as u32))
                .is_some()
            {
                return Err(RegistryError::DuplicateName(def.name.clone()));
            }
        }

        let attack_count = self.attack_types.len() as u32;
        let mut node_name_to_id = HashMap::with_capacity(self.node_types.len());
        for (i, def) in self.node_types.iter().enumerate() {
            for attack in def.allowed_attacks.iter().chain(def.default_attack.iter()) {
                if attack.0 >= attack_count {
                    return Err(RegistryError::InvalidAttackRef(*attack));
                }
            }
            if def.base_health <= Fixed64::ZERO {
                return Err(RegistryError::InvalidNode {
                    name: def.name.clone(),
                    detail: "base_health must be positive",
                });
            }
            if node_name_to_id
                .insert(def.name.clone(), NodeTypeId(i as u32))
                .is_some()
            {
                return Err(RegistryError::DuplicateName(def.name.clone()));
            }
        }

        Ok(Registry {
            node_types: self.node_types,
            node_name_to_id,
            attack_types: self.attack_types,
            attack_name_to_id,
        })
    }
}

/// Immutable registry of node and attack types. Frozen after build() and
/// shared between phases behind an `Arc`.
#[derive(Debug)]
pub struct Registry {
    node_types: Vec<NodeTypeDef>,
    node_name_to_id: HashMap<String, NodeTypeId>,
    attack_types: Vec<AttackTypeDef>,
    attack_name_to_id: HashMap<String, AttackTypeId>,
}

impl Registry {
    pub fn get_node_type(&self, id: NodeTypeId) -> Option<&NodeTypeDef> {
        self.node_types.get(id.0 as usize)
    }

    pub fn get_attack_type(&self, id: AttackTypeId) -> Option<&AttackTypeDef> {
        self.attack_types.get(id.0 as usize)
    }

    pub fn node_type_id(&self, name: &str) -> Option<NodeTypeId> {
        self.node_name_to_id.get(name).copied()
    }

    pub fn attack_type_id(&self, name: &str) -> Option<AttackTypeId> {
        self.attack_name_to_id.get(name).copied()
    }

    pub fn node_type_count(&self) -> usize {
        self.node_types.len()
    }

    pub fn attack_type_count(&self) -> usize {
        self.attack_types.len()
    }

    /// Iterate over all node types with their IDs.
    pub fn node_types(&self) -> impl Iterator<Item = (NodeTypeId, &NodeTypeDef)> {
        self.node_types
            .iter()
            .enumerate()
            .map(|(i, d)| (NodeTypeId(i as u32), d))
    }

    /// Iterate over all attack types with their IDs.
    pub fn attack_types(&self) -> impl Iterator<Item = (AttackTypeId, &AttackTypeDef)> {
        self.attack_types
            .iter()
            .enumerate()
            .map(|(i, d)| (AttackTypeId(i as u32), d))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("duplicate name: {0}")]
    DuplicateName(String),
    #[error("invalid attack type reference: {0:?}")]
    InvalidAttackRef(AttackTypeId),
    #[error("invalid attack type '{name}': {detail}")]
    InvalidAttack { name: String, detail: &'static str },
    #[error("invalid node type '{name}': {detail}")]
    InvalidNode { name: String, detail: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup_builder() -> RegistryBuilder {
        let mut b = RegistryBuilder::new();
        let laser = b.register_attack_type(AttackTypeDef::new("laser"));
        b.register_node_type(NodeTypeDef::new("hub", NodeKind::Hub));
        b.register_node_type(NodeTypeDef {
            attacker_slots: 2,
            default_attack: Some(laser),
            ..NodeTypeDef::new("turret", NodeKind::Defense)
        });
        b
    }

    #[test]
    fn register_and_build() {
        let reg = setup_builder().build().unwrap();
        assert_eq!(reg.node_type_count(), 2);
        assert_eq!(reg.attack_type_count(), 1);
    }

    #[test]
    fn lookup_by_name() {
        let reg = setup_builder().build().unwrap();
        let turret = reg.node_type_id("turret").unwrap();
        assert_eq!(reg.get_node_type(turret).unwrap().kind, NodeKind::Defense);
        assert!(reg.node_type_id("nonexistent").is_none());
        assert_eq!(reg.attack_type_id("laser"), Some(AttackTypeId(0)));
    }

    #[test]
    fn mutate_node_type() {
        let mut builder = setup_builder();
        builder
            .mutate_node_type("turret", |def| def.max_adjacency = Some(3))
            .unwrap();
        let reg = builder.build().unwrap();
        let turret = reg.get_node_type(reg.node_type_id("turret").unwrap()).unwrap();
        assert_eq!(turret.max_adjacency, Some(3));
    }

    #[test]
    fn mutate_nonexistent_fails() {
        let mut builder = setup_builder();
        match builder.mutate_attack_type("nonexistent", |_| {}) {
            Err(RegistryError::NotFound(name)) => assert_eq!(name, "nonexistent"),
            other => panic!("expected NotFound, got: {other:?}"),
        }
    }

    #[test]
    fn invalid_attack_ref_fails() {
        let mut b = RegistryBuilder::new();
        b.register_node_type(NodeTypeDef {
            default_attack: Some(AttackTypeId(9)),
            ..NodeTypeDef::new("broken", NodeKind::Base)
        });
        assert!(matches!(
            b.build(),
            Err(RegistryError::InvalidAttackRef(AttackTypeId(9)))
        ));
    }

    #[test]
    fn duplicate_names_rejected() {
        let mut b = setup_builder();
        b.register_node_type(NodeTypeDef::new("hub", NodeKind::Hub));
        assert!(matches!(b.build(), Err(RegistryError::DuplicateName(n)) if n == "hub"));
    }

    #[test]
    fn zero_frame_attack_rejected() {
        let mut b = RegistryBuilder::new();
        b.register_attack_type(AttackTypeDef {
            frame_count: 0,
            ..AttackTypeDef::new("blank")
        });
        let err = b.build().unwrap_err();
        assert!(err.to_string().contains("frame_count"), "got: {err}");
    }

    #[test]
    fn allows_respects_allow_list() {
        let mut def = NodeTypeDef::new("base", NodeKind::Base);
        assert!(def.allows(AttackTypeId(3)));
        def.allowed_attacks = vec![AttackTypeId(1)];
        assert!(def.allows(AttackTypeId(1)));
        assert!(!def.allows(AttackTypeId(3)));
    }

    #[test]
    fn empty_registry_builds_successfully() {
        let reg = RegistryBuilder::new().build().unwrap();
        assert_eq!(reg.node_type_count(), 0);
        assert!(reg.get_node_type(NodeTypeId(0)).is_none());
    }
}
