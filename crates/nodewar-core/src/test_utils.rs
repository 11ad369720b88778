//! Shared test helpers for unit tests, integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so downstream
//! crates can pull the same fixtures in through the `test-utils` feature.

use crate::combat::{CombatConfig, CombatEngine};
use crate::fixed::Fixed64;
use crate::graph::EntityGraph;
use crate::id::*;
use crate::registry::*;
use std::sync::Arc;

// ===========================================================================
// Fixed-point helper
// ===========================================================================

pub fn fixed(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

// ===========================================================================
// Standard registry ids
// ===========================================================================

pub fn hub_type() -> NodeTypeId {
    NodeTypeId(0)
}
pub fn base_type() -> NodeTypeId {
    NodeTypeId(1)
}
pub fn turret_type() -> NodeTypeId {
    NodeTypeId(2)
}
pub fn mine_type() -> NodeTypeId {
    NodeTypeId(3)
}

pub fn laser() -> AttackTypeId {
    AttackTypeId(0)
}
pub fn mortar() -> AttackTypeId {
    AttackTypeId(1)
}
pub fn emp() -> AttackTypeId {
    AttackTypeId(2)
}
pub fn leech() -> AttackTypeId {
    AttackTypeId(3)
}

// ===========================================================================
// Registry construction
// ===========================================================================

/// The standard node and attack types, not yet built, so tests can mutate
/// them first.
///
/// Every attack animates over 8 frames at 1/16s, so a beam lands half a
/// second after launch.
pub fn standard_builder() -> RegistryBuilder {
    let mut b = RegistryBuilder::new();

    let laser = b.register_attack_type(AttackTypeDef::new("laser"));
    let mortar = b.register_attack_type(AttackTypeDef {
        damage: fixed(20.0),
        cooldown: fixed(2.0),
        effect: AttackEffect::Splash { ratio: fixed(0.5) },
        pool_capacity: 16,
        ..AttackTypeDef::new("mortar")
    });
    b.register_attack_type(AttackTypeDef {
        damage: fixed(5.0),
        cooldown: fixed(4.0),
        effect: AttackEffect::Disable {
            duration: fixed(3.0),
        },
        pool_capacity: 8,
        ..AttackTypeDef::new("emp")
    });
    b.register_attack_type(AttackTypeDef {
        effect: AttackEffect::Leech { ratio: fixed(0.5) },
        pool_capacity: 8,
        ..AttackTypeDef::new("leech")
    });

    b.register_node_type(NodeTypeDef::new("hub", NodeKind::Hub));
    b.register_node_type(NodeTypeDef {
        attacker_slots: 3,
        cost: 100,
        ..NodeTypeDef::new("base", NodeKind::Base)
    });
    b.register_node_type(NodeTypeDef {
        attacker_slots: 2,
        base_health: fixed(60.0),
        base_shield: fixed(20.0),
        cost: 75,
        allowed_attacks: vec![laser, mortar],
        default_attack: Some(laser),
        ..NodeTypeDef::new("turret", NodeKind::Defense)
    });
    b.register_node_type(NodeTypeDef {
        max_adjacency: Some(2),
        base_health: fixed(40.0),
        income: fixed(1.0),
        cost: 50,
        ..NodeTypeDef::new("mine", NodeKind::Economy)
    });
    b
}

pub fn standard_registry() -> Arc<Registry> {
    Arc::new(
        standard_builder()
            .build()
            .expect("standard registry is valid"),
    )
}

// ===========================================================================
// Graph and engine construction
// ===========================================================================

/// A hub with a chain of `len` bases hanging off it.
pub fn hub_chain(len: usize) -> (EntityGraph, NodeId, Vec<NodeId>) {
    let mut graph = EntityGraph::new(standard_registry());
    let hub = graph
        .create_node(hub_type(), Position::ORIGIN)
        .expect("hub type is registered");
    let mut prev = hub;
    let mut chain = Vec::with_capacity(len);
    for i in 0..len {
        let node = graph
            .create_node(base_type(), Position::new(i as f64 + 1.0, 0.0, 0.0))
            .expect("base type is registered");
        graph.tether(prev, node).expect("fresh chain link");
        chain.push(node);
        prev = node;
    }
    (graph, hub, chain)
}

/// Two rows of `width` bases facing each other, every friendly node
/// tethered to the enemy node opposite it.
pub fn battle_line(width: usize) -> (CombatEngine, Vec<NodeId>, Vec<NodeId>) {
    let mut engine = CombatEngine::new(standard_registry(), CombatConfig::default());
    let mut friendly = Vec::with_capacity(width);
    let mut enemy = Vec::with_capacity(width);
    for i in 0..width {
        let x = i as f64;
        let ours = engine
            .create_node(base_type(), Position::new(x, 0.0, 0.0), Allegiance::Friendly)
            .expect("base type is registered");
        let theirs = engine
            .create_node(base_type(), Position::new(x, 5.0, 0.0), Allegiance::Enemy)
            .expect("base type is registered");
        engine.tether(ours, theirs).expect("fresh pair");
        friendly.push(ours);
        enemy.push(theirs);
    }
    (engine, friendly, enemy)
}
