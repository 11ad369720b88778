//! Loads the bundled `data/` directory and checks it against the core test
//! fixtures, then exercises the same content in the other two formats.

use nodewar_core::combat::CombatEngine;
use nodewar_core::id::{Allegiance, Position};
use nodewar_core::registry::Registry;
use nodewar_core::targeting::TargetingStrategy;
use nodewar_core::test_utils::*;
use nodewar_data::{DataLoadError, GameSettings, load_game_data};
use std::fs;
use std::path::{Path, PathBuf};

fn bundled_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("data")
}

fn scratch_dir(suffix: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "nodewar_data_it_{suffix}_{}",
        std::process::id()
    ));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn assert_same_content(loaded: &Registry, expected: &Registry) {
    assert_eq!(loaded.node_type_count(), expected.node_type_count());
    assert_eq!(loaded.attack_type_count(), expected.attack_type_count());

    for (id, want) in expected.attack_types() {
        let got = loaded.get_attack_type(id).unwrap();
        assert_eq!(got.name, want.name);
        assert_eq!(got.damage, want.damage, "{}", want.name);
        assert_eq!(got.cooldown, want.cooldown, "{}", want.name);
        assert_eq!(got.effect, want.effect, "{}", want.name);
        assert_eq!(got.pool_capacity, want.pool_capacity, "{}", want.name);
        assert_eq!(got.frame_count, want.frame_count, "{}", want.name);
        assert_eq!(got.frame_interval, want.frame_interval, "{}", want.name);
    }
    for (id, want) in expected.node_types() {
        let got = loaded.get_node_type(id).unwrap();
        assert_eq!(got.name, want.name);
        assert_eq!(got.kind, want.kind, "{}", want.name);
        assert_eq!(got.max_adjacency, want.max_adjacency, "{}", want.name);
        assert_eq!(got.attacker_slots, want.attacker_slots, "{}", want.name);
        assert_eq!(got.base_health, want.base_health, "{}", want.name);
        assert_eq!(got.base_shield, want.base_shield, "{}", want.name);
        assert_eq!(got.income, want.income, "{}", want.name);
        assert_eq!(got.cost, want.cost, "{}", want.name);
        assert_eq!(got.allowed_attacks, want.allowed_attacks, "{}", want.name);
        assert_eq!(got.default_attack, want.default_attack, "{}", want.name);
    }
}

#[test]
fn bundled_data_matches_standard_fixtures() {
    let data = load_game_data(&bundled_dir()).unwrap();
    assert_same_content(&data.registry, &standard_registry());
    assert_eq!(data.settings, GameSettings::default());
}

#[test]
fn bundled_data_drives_a_fight() {
    let data = load_game_data(&bundled_dir()).unwrap();
    let base = data.registry.node_type_id("base").unwrap();
    let laser = data.registry.attack_type_id("laser").unwrap();

    let mut engine = CombatEngine::new(data.registry.clone(), data.settings.combat);
    let ours = engine
        .create_node(base, Position::ORIGIN, Allegiance::Friendly)
        .unwrap();
    let theirs = engine
        .create_node(base, Position::new(0.0, 5.0, 0.0), Allegiance::Enemy)
        .unwrap();
    engine.tether(ours, theirs).unwrap();
    engine
        .add_attacker(ours, laser, TargetingStrategy::default())
        .unwrap();

    engine.update(fixed(0.0));
    engine.update(fixed(0.5));
    assert_eq!(engine.vitals(theirs).unwrap().health(), fixed(90.0));
}

#[test]
fn same_content_in_json_and_toml() {
    let dir = scratch_dir("formats");
    fs::write(
        dir.join("attack_types.json"),
        r#"[
            {"name": "laser", "damage": 10, "cooldown": 1},
            {"name": "mortar", "damage": 20, "cooldown": 2,
             "effect": {"splash": {"ratio": 0.5}}, "pool_capacity": 16}
        ]"#,
    )
    .unwrap();
    fs::write(
        dir.join("node_types.toml"),
        r#"
[[node_types]]
name = "hub"
kind = "hub"

[[node_types]]
name = "turret"
kind = "defense"
attacker_slots = 2
allowed_attacks = ["mortar"]
default_attack = "mortar"
"#,
    )
    .unwrap();
    fs::write(dir.join("settings.json"), r#"{"max_hub_distance": 5}"#).unwrap();

    let data = load_game_data(&dir).unwrap();
    let turret = data
        .registry
        .get_node_type(data.registry.node_type_id("turret").unwrap())
        .unwrap();
    assert_eq!(turret.default_attack, data.registry.attack_type_id("mortar"));
    assert_eq!(data.settings.max_hub_distance, 5);
    assert_eq!(data.settings.starting_currency, 500);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn missing_node_types_is_reported() {
    let dir = scratch_dir("missing");
    fs::write(dir.join("attack_types.ron"), "[]").unwrap();

    let err = load_game_data(&dir).unwrap_err();
    assert!(matches!(
        err,
        DataLoadError::MissingRequired { ref file, .. } if file == "node_types"
    ));

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn conflicting_settings_files_are_reported() {
    let dir = scratch_dir("conflict");
    fs::write(dir.join("attack_types.ron"), "[]").unwrap();
    fs::write(dir.join("node_types.ron"), "[]").unwrap();
    fs::write(dir.join("settings.ron"), "()").unwrap();
    fs::write(dir.join("settings.toml"), "").unwrap();

    assert!(matches!(
        load_game_data(&dir),
        Err(DataLoadError::ConflictingFormats { .. })
    ));

    let _ = fs::remove_dir_all(&dir);
}
