#![no_main]
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use nodewar_core::combat::{CombatConfig, CombatEngine};
use nodewar_core::id::*;
use nodewar_core::targeting::TargetingStrategy;
use nodewar_core::test_utils::*;

/// A structured mutation operation for fuzzing.
#[derive(Arbitrary, Debug)]
enum FuzzOp {
    AddNode { kind: u8, enemy: bool },
    RemoveNode { index: u8 },
    Tether { a: u8, b: u8 },
    Untether { index: u8 },
    AddAttacker { node: u8, attack: u8 },
    RemoveAttacker { node: u8, slot: u8 },
    Update { sixteenths: u8 },
}

/// Top-level fuzz input: a sequence of operations.
#[derive(Arbitrary, Debug)]
struct FuzzInput {
    ops: Vec<FuzzOp>,
}

fuzz_target!(|input: FuzzInput| {
    let mut engine = CombatEngine::new(standard_registry(), CombatConfig::default());
    let mut nodes: Vec<NodeId> = Vec::new();

    // Limit operations to prevent timeouts.
    let max_ops = input.ops.len().min(200);

    for op in &input.ops[..max_ops] {
        match *op {
            FuzzOp::AddNode { kind, enemy } => {
                let allegiance = if enemy { Allegiance::Enemy } else { Allegiance::Friendly };
                let node_type = NodeTypeId(u32::from(kind % 4));
                nodes.push(engine.create_node(node_type, Position::ORIGIN, allegiance).unwrap());
            }
            FuzzOp::RemoveNode { index } if !nodes.is_empty() => {
                let node = nodes.remove(index as usize % nodes.len());
                engine.remove_node(node).unwrap();
            }
            FuzzOp::Tether { a, b } if !nodes.is_empty() => {
                let a = nodes[a as usize % nodes.len()];
                let b = nodes[b as usize % nodes.len()];
                let _ = engine.tether(a, b);
            }
            FuzzOp::Untether { index } => {
                let tethers: Vec<TetherId> = engine.graph().tethers().map(|(id, _)| id).collect();
                if !tethers.is_empty() {
                    engine.remove_tether(tethers[index as usize % tethers.len()]).unwrap();
                }
            }
            FuzzOp::AddAttacker { node, attack } if !nodes.is_empty() => {
                let node = nodes[node as usize % nodes.len()];
                let attack = AttackTypeId(u32::from(attack % 4));
                engine.add_attacker(node, attack, TargetingStrategy::default()).unwrap();
            }
            FuzzOp::RemoveAttacker { node, slot } if !nodes.is_empty() => {
                let node = nodes[node as usize % nodes.len()];
                engine.remove_attacker(node, slot as usize).unwrap();
            }
            FuzzOp::Update { sixteenths } => {
                engine.update(fixed(f64::from(sixteenths) / 16.0));
            }
            _ => {}
        }

        let allocated: usize = engine.pools().map(|(_, p)| p.allocated_count()).sum();
        assert_eq!(allocated, engine.attack_count());
        for (_, pool) in engine.pools() {
            assert!(pool.is_consistent());
        }
    }
});
