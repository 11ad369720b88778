//! Headless campaign: loads the bundled data, builds a layout, then attacks
//! a stored rival until the battle is decided or time runs out.
//!
//! Run with: `cargo run --package nodewar-phase --example headless_campaign`
//! (add `RUST_LOG=info` for phase transitions and captures).

use std::path::Path;

use nodewar_core::fixed::Fixed64;
use nodewar_core::id::{Allegiance, Position};
use nodewar_core::targeting::TargetingStrategy;
use nodewar_data::load_game_data;
use nodewar_phase::test_utils::rival_layout;
use nodewar_phase::{Collaborators, MemoryStore, PhaseController};

const FRAME: f64 = 1.0 / 60.0;
const MAX_FRAMES: u32 = 60 * 120;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let data_dir = Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/../nodewar-data/data"));
    let data = load_game_data(data_dir).expect("bundled data loads");
    let registry = data.registry.clone();
    let store = MemoryStore::new().with_opponent("rival", rival_layout());
    let mut ctl = PhaseController::from_game_data(data, Collaborators::headless(store));

    // Build: hub -> base -> base, with a mine off the hub.
    ctl.enter_build().expect("build phase");
    let base = registry.node_type_id("base").expect("base type");
    let mine = registry.node_type_id("mine").expect("mine type");
    let hub = ctl
        .build()
        .and_then(|b| b.graph().hubs().next())
        .expect("seeded hub");
    let a = ctl.place(base, Position::new(1.0, 0.0, 0.0)).unwrap().unwrap();
    let b = ctl.place(base, Position::new(2.0, 0.0, 0.0)).unwrap().unwrap();
    let m = ctl.place(mine, Position::new(0.0, 1.0, 0.0)).unwrap().unwrap();
    ctl.link(hub, a).unwrap();
    ctl.link(a, b).unwrap();
    ctl.link(hub, m).unwrap();
    ctl.save_layout().expect("layout is valid");
    println!(
        "Built {} nodes, balance {}",
        ctl.build().map_or(0, |b| b.graph().node_count()),
        ctl.build().map_or(0, |b| b.ledger().balance())
    );

    // Attack: bridge our front base to their base and load it with lasers.
    ctl.enter_attack("rival").expect("attack phase");
    let laser = registry.attack_type_id("laser").expect("laser type");
    let (ours, theirs) = {
        let graph = ctl.attack().expect("attacking").engine().graph();
        let front = |side| {
            graph
                .nodes()
                .filter(|(_, d)| d.allegiance == side && d.node_type == base)
                .map(|(id, _)| id)
                .last()
                .expect("a base on each side")
        };
        (front(Allegiance::Friendly), front(Allegiance::Enemy))
    };
    ctl.link(ours, theirs).unwrap();
    for _ in 0..3 {
        ctl.assign_attacker(ours, laser, TargetingStrategy::default())
            .unwrap();
    }

    let frame = Fixed64::from_num(FRAME);
    let mut captures = 0;
    for n in 0..MAX_FRAMES {
        captures += ctl.update(frame).captures().count();
        if let Some(status) = ctl.battle_status()
            && status != nodewar_phase::BattleStatus::Ongoing
        {
            println!("Battle {status:?} after {:.1}s", f64::from(n) * FRAME);
            break;
        }
    }
    let attack = ctl.attack().expect("attacking");
    println!(
        "{captures} captures, friendly {} vs enemy {}, balance {}, state hash {:#018x}",
        attack.engine().side_strength(Allegiance::Friendly),
        attack.engine().side_strength(Allegiance::Enemy),
        attack.ledger().balance(),
        attack.engine().state_hash()
    );

    ctl.enter_select();
}
