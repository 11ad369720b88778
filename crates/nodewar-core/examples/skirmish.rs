//! Skirmish: two small layouts linked by a bridge, fought to the end.
//!
//! Demonstrates:
//! - Building a layout, saving it and loading it for both sides
//! - Assigning attackers and auto-arming defenses
//! - Driving `CombatEngine::update` at a fixed frame rate
//!
//! Run with `RUST_LOG=debug` to see the engine's own logging.

use nodewar_core::combat::{CombatConfig, CombatEngine, CombatEvent};
use nodewar_core::fixed::fixed64_to_f64;
use nodewar_core::graph::EntityGraph;
use nodewar_core::id::*;
use nodewar_core::layout::SavedLayout;
use nodewar_core::targeting::TargetingStrategy;
use nodewar_core::test_utils::*;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // A hub, two bases and a turret on the front line.
    let mut design = EntityGraph::new(standard_registry());
    let hub = design.create_node(hub_type(), Position::ORIGIN).unwrap();
    let left = design.create_node(base_type(), Position::new(-1.0, 1.0, 0.0)).unwrap();
    let right = design.create_node(base_type(), Position::new(1.0, 1.0, 0.0)).unwrap();
    let front = design.create_node(turret_type(), Position::new(0.0, 2.0, 0.0)).unwrap();
    design.tether(hub, left).unwrap();
    design.tether(hub, right).unwrap();
    design.tether(left, front).unwrap();
    design.tether(right, front).unwrap();
    assert!(design.validate_layout(2));
    let saved = SavedLayout::from_graph(&design, "nebula");

    let mut battlefield = EntityGraph::new(standard_registry());
    let ours = saved.load_into(&mut battlefield, Allegiance::Friendly).unwrap();
    let theirs = saved.load_into(&mut battlefield, Allegiance::Enemy).unwrap();
    for i in 1..ours.len() {
        battlefield.tether(ours[i], theirs[i]).unwrap();
    }

    let mut engine = CombatEngine::from_graph(battlefield, CombatConfig::default());
    for &node in &ours[1..3] {
        engine.add_attacker(node, laser(), TargetingStrategy::default()).unwrap();
        engine.add_attacker(node, mortar(), TargetingStrategy::HighestTotalHealth).unwrap();
    }
    engine.auto_arm(Allegiance::Enemy, TargetingStrategy::default());

    let frame = fixed(1.0 / 30.0);
    for tick in 0..30 * 120 {
        for event in engine.update(frame).events {
            if let CombatEvent::NodeCaptured { node, now } = event {
                println!("t={:>6.2}s  {node:?} captured, now {now:?}", tick as f64 / 30.0);
            }
        }
        if engine.side_strength(Allegiance::Enemy) == 0 || engine.side_strength(Allegiance::Friendly) == 0 {
            break;
        }
    }

    for (side, nodes) in [("ours", &ours), ("theirs", &theirs)] {
        for &node in nodes.iter() {
            let data = engine.graph().get_node(node).unwrap();
            let vitals = engine.vitals(node).unwrap();
            println!(
                "{side:>6} {node:?}: {:?} {:.1} hp, {:.1} shield",
                data.allegiance,
                fixed64_to_f64(vitals.health()),
                fixed64_to_f64(vitals.shield()),
            );
        }
    }
    println!("state hash: {:#018x}", engine.state_hash());
}
