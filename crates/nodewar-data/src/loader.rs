//! Resolution pipeline: reads data files, resolves cross-references, builds
//! the registry.
//!
//! A data directory holds `attack_types`, `node_types` and an optional
//! `settings` file, each in RON, TOML or JSON (one format per file).

use nodewar_core::fixed::{Fixed64, checked_f64_to_fixed64};
use nodewar_core::id::AttackTypeId;
use nodewar_core::registry::{
    AttackEffect, AttackTypeDef, NodeTypeDef, Registry, RegistryBuilder, RegistryError,
};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::schema::{AttackTypeData, EffectData, NodeTypeData, SettingsData};
use crate::settings::GameSettings;

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// A required data file was not found in the given directory.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A numeric field holds a value the simulation cannot represent or use.
    #[error("field '{field}' in {file} is out of range: {value}")]
    OutOfRange {
        file: PathBuf,
        field: String,
        value: f64,
    },

    /// A name reference could not be resolved.
    #[error("unresolved {expected_kind} reference '{name}' in {file}")]
    UnresolvedRef {
        file: PathBuf,
        name: String,
        expected_kind: &'static str,
    },

    /// A duplicate name was found.
    #[error("duplicate name '{name}' in {file}")]
    DuplicateName { file: PathBuf, name: String },

    /// The resolved definitions failed registry validation.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Scan a directory for a data file with the given base name (without extension).
///
/// Looks for `{base_name}.ron`, `{base_name}.toml`, and `{base_name}.json`.
/// Returns `Ok(None)` if no file is found, or `Err(ConflictingFormats)` if
/// multiple formats exist for the same base name.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let extensions = ["ron", "toml", "json"];
    let mut found: Option<PathBuf> = None;

    for ext in &extensions {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if candidate.exists() {
            if let Some(ref existing) = found {
                return Err(DataLoadError::ConflictingFormats {
                    a: existing.clone(),
                    b: candidate,
                });
            }
            found = Some(candidate);
        }
    }

    Ok(found)
}

/// Like [`find_data_file`], but returns an error if no file is found.
pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

/// Read a file and deserialize it according to its format (detected from extension).
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;

    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| DataLoadError::Parse {
            file: path.to_path_buf(),
            detail: e.to_string(),
        }),
        Format::Json => serde_json::from_str(&content).map_err(|e| DataLoadError::Parse {
            file: path.to_path_buf(),
            detail: e.to_string(),
        }),
        Format::Toml => toml::from_str(&content).map_err(|e| DataLoadError::Parse {
            file: path.to_path_buf(),
            detail: e.to_string(),
        }),
    }
}

/// Deserialize a list from a file. For TOML files, extracts the array at the
/// given `toml_key` from a top-level table. For RON and JSON, deserializes
/// directly as `Vec<T>`.
pub fn deserialize_list<T: DeserializeOwned>(
    path: &Path,
    toml_key: &str,
) -> Result<Vec<T>, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;

    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| DataLoadError::Parse {
            file: path.to_path_buf(),
            detail: e.to_string(),
        }),
        Format::Json => serde_json::from_str(&content).map_err(|e| DataLoadError::Parse {
            file: path.to_path_buf(),
            detail: e.to_string(),
        }),
        Format::Toml => {
            let table: toml::Value =
                toml::from_str(&content).map_err(|e| DataLoadError::Parse {
                    file: path.to_path_buf(),
                    detail: e.to_string(),
                })?;
            let array = table
                .get(toml_key)
                .ok_or_else(|| DataLoadError::Parse {
                    file: path.to_path_buf(),
                    detail: format!("missing key '{toml_key}' in TOML file"),
                })?
                .clone();
            // Deserialize the array value into Vec<T>.
            array
                .try_into()
                .map_err(|e: toml::de::Error| DataLoadError::Parse {
                    file: path.to_path_buf(),
                    detail: e.to_string(),
                })
        }
    }
}

// ===========================================================================
// Name resolution helpers
// ===========================================================================

/// Look up a name in a map, returning an `UnresolvedRef` error if not found.
pub fn resolve_name<'a, V>(
    map: &'a HashMap<String, V>,
    name: &str,
    file: &Path,
    expected_kind: &'static str,
) -> Result<&'a V, DataLoadError> {
    map.get(name).ok_or_else(|| DataLoadError::UnresolvedRef {
        file: file.to_path_buf(),
        name: name.to_string(),
        expected_kind,
    })
}

/// Check whether a name already exists in a map, returning a `DuplicateName`
/// error if so.
pub fn check_duplicate<V>(
    map: &HashMap<String, V>,
    name: &str,
    file: &Path,
) -> Result<(), DataLoadError> {
    if map.contains_key(name) {
        Err(DataLoadError::DuplicateName {
            file: file.to_path_buf(),
            name: name.to_string(),
        })
    } else {
        Ok(())
    }
}

// ===========================================================================
// Loading pipeline
// ===========================================================================

/// Everything a game session needs from its data directory.
#[derive(Debug, Clone)]
pub struct GameData {
    pub registry: Arc<Registry>,
    pub settings: GameSettings,
}

/// Load and resolve the data files in `dir`.
pub fn load_game_data(dir: &Path) -> Result<GameData, DataLoadError> {
    let attack_path = require_data_file(dir, "attack_types")?;
    let node_path = require_data_file(dir, "node_types")?;

    let mut builder = RegistryBuilder::new();
    let mut attack_ids: HashMap<String, AttackTypeId> = HashMap::new();
    let attacks: Vec<AttackTypeData> = deserialize_list(&attack_path, "attack_types")?;
    for data in attacks {
        check_duplicate(&attack_ids, &data.name, &attack_path)?;
        let name = data.name.clone();
        let id = builder.register_attack_type(attack_def(data, &attack_path)?);
        attack_ids.insert(name, id);
    }

    let mut node_names: HashMap<String, ()> = HashMap::new();
    let nodes: Vec<NodeTypeData> = deserialize_list(&node_path, "node_types")?;
    for data in nodes {
        check_duplicate(&node_names, &data.name, &node_path)?;
        node_names.insert(data.name.clone(), ());
        let def = node_def(data, &attack_ids, &node_path)?;
        builder.register_node_type(def);
    }

    let settings = match find_data_file(dir, "settings")? {
        Some(path) => GameSettings::from_data(deserialize_file::<SettingsData>(&path)?, &path)?,
        None => {
            debug!(dir = %dir.display(), "no settings file, using defaults");
            GameSettings::default()
        }
    };

    let registry = builder.build()?;
    info!(
        attack_types = registry.attack_type_count(),
        node_types = registry.node_type_count(),
        dir = %dir.display(),
        "game data loaded"
    );
    Ok(GameData {
        registry: Arc::new(registry),
        settings,
    })
}

/// Convert a quantity read from `file`, rejecting values fixed point cannot
/// hold.
pub(crate) fn quantity(
    value: f64,
    owner: &str,
    field: &str,
    file: &Path,
) -> Result<Fixed64, DataLoadError> {
    checked_f64_to_fixed64(value).ok_or_else(|| DataLoadError::OutOfRange {
        file: file.to_path_buf(),
        field: format!("{owner}.{field}"),
        value,
    })
}

fn attack_def(data: AttackTypeData, file: &Path) -> Result<AttackTypeDef, DataLoadError> {
    let name = data.name.as_str();
    let effect = match data.effect {
        EffectData::None => AttackEffect::None,
        EffectData::Splash { ratio } => AttackEffect::Splash {
            ratio: quantity(ratio, name, "effect.ratio", file)?,
        },
        EffectData::Disable { duration } => AttackEffect::Disable {
            duration: quantity(duration, name, "effect.duration", file)?,
        },
        EffectData::Leech { ratio } => AttackEffect::Leech {
            ratio: quantity(ratio, name, "effect.ratio", file)?,
        },
    };
    Ok(AttackTypeDef {
        damage: quantity(data.damage, name, "damage", file)?,
        cooldown: quantity(data.cooldown, name, "cooldown", file)?,
        speed: quantity(data.speed, name, "speed", file)?,
        effect,
        pool_capacity: data.pool_capacity,
        frame_count: data.frame_count,
        frame_interval: quantity(data.frame_interval, name, "frame_interval", file)?,
        name: data.name,
    })
}

fn node_def(
    data: NodeTypeData,
    attack_ids: &HashMap<String, AttackTypeId>,
    file: &Path,
) -> Result<NodeTypeDef, DataLoadError> {
    let allowed_attacks = data
        .allowed_attacks
        .iter()
        .map(|name| resolve_name(attack_ids, name, file, "attack type").copied())
        .collect::<Result<Vec<_>, _>>()?;
    let default_attack = data
        .default_attack
        .as_deref()
        .map(|name| resolve_name(attack_ids, name, file, "attack type").copied())
        .transpose()?;
    let name = data.name.as_str();
    Ok(NodeTypeDef {
        base_health: quantity(data.base_health, name, "base_health", file)?,
        base_shield: quantity(data.base_shield, name, "base_shield", file)?,
        income: quantity(data.income, name, "income", file)?,
        name: data.name,
        kind: data.kind,
        max_adjacency: data.max_adjacency,
        attacker_slots: data.attacker_slots,
        cost: data.cost,
        allowed_attacks,
        default_attack,
    })
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use nodewar_core::registry::NodeKind;
    use std::fs;

    /// Create a temporary directory with a unique name for test isolation.
    fn make_test_dir(suffix: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "nodewar_data_test_{suffix}_{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// Clean up a test directory.
    fn cleanup(dir: &Path) {
        let _ = fs::remove_dir_all(dir);
    }

    const ATTACKS_RON: &str = r#"[
        (name: "laser", damage: 10.0, cooldown: 1.0),
        (name: "mortar", damage: 20.0, cooldown: 2.0, effect: splash(ratio: 0.5)),
    ]"#;

    const NODES_RON: &str = r#"[
        (name: "hub", kind: hub),
        (name: "turret", kind: defense, attacker_slots: 2,
         allowed_attacks: ["laser", "mortar"], default_attack: Some("laser")),
    ]"#;

    // -----------------------------------------------------------------------
    // detect_format
    // -----------------------------------------------------------------------

    #[test]
    fn detect_format_by_extension() {
        assert_eq!(
            detect_format(Path::new("node_types.ron")).unwrap(),
            Format::Ron
        );
        assert_eq!(
            detect_format(Path::new("node_types.toml")).unwrap(),
            Format::Toml
        );
        assert_eq!(
            detect_format(Path::new("node_types.json")).unwrap(),
            Format::Json
        );
    }

    #[test]
    fn detect_format_unsupported() {
        for name in ["node_types.yaml", "node_types"] {
            assert!(matches!(
                detect_format(Path::new(name)),
                Err(DataLoadError::UnsupportedFormat { .. })
            ));
        }
    }

    // -----------------------------------------------------------------------
    // find_data_file
    // -----------------------------------------------------------------------

    #[test]
    fn find_data_file_found_and_missing() {
        let dir = make_test_dir("find");
        fs::write(dir.join("settings.toml"), "").unwrap();

        assert_eq!(
            find_data_file(&dir, "settings").unwrap(),
            Some(dir.join("settings.toml"))
        );
        assert_eq!(find_data_file(&dir, "node_types").unwrap(), None);

        cleanup(&dir);
    }

    #[test]
    fn find_data_file_conflict() {
        let dir = make_test_dir("find_conflict");
        fs::write(dir.join("node_types.ron"), "[]").unwrap();
        fs::write(dir.join("node_types.json"), "[]").unwrap();

        let result = find_data_file(&dir, "node_types");
        assert!(matches!(
            result,
            Err(DataLoadError::ConflictingFormats { .. })
        ));

        cleanup(&dir);
    }

    #[test]
    fn require_data_file_missing() {
        let dir = make_test_dir("require_missing");
        let result = require_data_file(&dir, "attack_types");
        assert!(matches!(
            result,
            Err(DataLoadError::MissingRequired { ref file, .. }) if file == "attack_types"
        ));
        cleanup(&dir);
    }

    // -----------------------------------------------------------------------
    // deserialize_file / deserialize_list
    // -----------------------------------------------------------------------

    #[test]
    fn deserialize_list_each_format() {
        let dir = make_test_dir("list_formats");

        let ron = dir.join("a.ron");
        fs::write(&ron, ATTACKS_RON).unwrap();
        let json = dir.join("a.json");
        fs::write(
            &json,
            r#"[{"name": "laser", "damage": 10, "cooldown": 1}]"#,
        )
        .unwrap();
        let toml = dir.join("a.toml");
        fs::write(
            &toml,
            r#"
[[attack_types]]
name = "laser"
damage = 10.0
cooldown = 1.0
"#,
        )
        .unwrap();

        for path in [&ron, &json, &toml] {
            let list: Vec<AttackTypeData> = deserialize_list(path, "attack_types").unwrap();
            assert_eq!(list[0].name, "laser");
        }

        cleanup(&dir);
    }

    #[test]
    fn deserialize_list_toml_missing_key() {
        let dir = make_test_dir("list_toml_missing");
        let path = dir.join("node_types.toml");
        fs::write(&path, r#"foo = "bar""#).unwrap();

        let result: Result<Vec<NodeTypeData>, _> = deserialize_list(&path, "node_types");
        assert!(matches!(result, Err(DataLoadError::Parse { .. })));

        cleanup(&dir);
    }

    #[test]
    fn deserialize_file_parse_error() {
        let dir = make_test_dir("deser_parse_err");
        let path = dir.join("settings.ron");
        fs::write(&path, "this is not valid RON {{{").unwrap();

        let result: Result<SettingsData, _> = deserialize_file(&path);
        assert!(matches!(result, Err(DataLoadError::Parse { .. })));

        cleanup(&dir);
    }

    // -----------------------------------------------------------------------
    // resolve_name / check_duplicate
    // -----------------------------------------------------------------------

    #[test]
    fn resolve_name_missing() {
        let map: HashMap<String, u32> = HashMap::new();

        let result = resolve_name(&map, "laser", Path::new("node_types.ron"), "attack type");
        assert!(matches!(
            result,
            Err(DataLoadError::UnresolvedRef { ref name, expected_kind: "attack type", .. }) if name == "laser"
        ));
    }

    #[test]
    fn check_duplicate_has_dup() {
        let mut map = HashMap::new();
        map.insert("laser".to_string(), 42u32);

        assert!(check_duplicate(&map, "mortar", Path::new("a.ron")).is_ok());
        let result = check_duplicate(&map, "laser", Path::new("a.ron"));
        assert!(matches!(
            result,
            Err(DataLoadError::DuplicateName { ref name, .. }) if name == "laser"
        ));
    }

    // -----------------------------------------------------------------------
    // load_game_data
    // -----------------------------------------------------------------------

    #[test]
    fn load_resolves_names() {
        let dir = make_test_dir("load_ok");
        fs::write(dir.join("attack_types.ron"), ATTACKS_RON).unwrap();
        fs::write(dir.join("node_types.ron"), NODES_RON).unwrap();
        fs::write(dir.join("settings.toml"), "starting_currency = 250\n").unwrap();

        let data = load_game_data(&dir).unwrap();
        let reg = &data.registry;
        let turret = reg.get_node_type(reg.node_type_id("turret").unwrap()).unwrap();
        assert_eq!(turret.kind, NodeKind::Defense);
        assert_eq!(turret.allowed_attacks, vec![AttackTypeId(0), AttackTypeId(1)]);
        assert_eq!(turret.default_attack, Some(AttackTypeId(0)));

        let mortar = reg.get_attack_type(AttackTypeId(1)).unwrap();
        assert_eq!(
            mortar.effect,
            AttackEffect::Splash {
                ratio: Fixed64::from_num(0.5)
            }
        );
        assert_eq!(data.settings.starting_currency, 250);
        assert_eq!(data.settings.max_hub_distance, 3);

        cleanup(&dir);
    }

    #[test]
    fn load_without_settings_uses_defaults() {
        let dir = make_test_dir("load_defaults");
        fs::write(dir.join("attack_types.ron"), ATTACKS_RON).unwrap();
        fs::write(dir.join("node_types.ron"), NODES_RON).unwrap();

        let data = load_game_data(&dir).unwrap();
        assert_eq!(data.settings, GameSettings::default());

        cleanup(&dir);
    }

    #[test]
    fn load_rejects_unknown_attack_reference() {
        let dir = make_test_dir("load_unresolved");
        fs::write(dir.join("attack_types.ron"), ATTACKS_RON).unwrap();
        fs::write(
            dir.join("node_types.ron"),
            r#"[(name: "tower", kind: defense, default_attack: Some("railgun"))]"#,
        )
        .unwrap();

        let result = load_game_data(&dir);
        assert!(matches!(
            result,
            Err(DataLoadError::UnresolvedRef { ref name, .. }) if name == "railgun"
        ));

        cleanup(&dir);
    }

    #[test]
    fn load_rejects_duplicate_node_names() {
        let dir = make_test_dir("load_dup");
        fs::write(dir.join("attack_types.ron"), ATTACKS_RON).unwrap();
        fs::write(
            dir.join("node_types.ron"),
            r#"[(name: "hub", kind: hub), (name: "hub", kind: hub)]"#,
        )
        .unwrap();

        assert!(matches!(
            load_game_data(&dir),
            Err(DataLoadError::DuplicateName { ref name, .. }) if name == "hub"
        ));

        cleanup(&dir);
    }

    #[test]
    fn load_surfaces_registry_validation() {
        let dir = make_test_dir("load_invalid");
        fs::write(
            dir.join("attack_types.ron"),
            r#"[(name: "blank", damage: 1.0, cooldown: 1.0, frame_count: 0)]"#,
        )
        .unwrap();
        fs::write(dir.join("node_types.ron"), "[]").unwrap();

        assert!(matches!(
            load_game_data(&dir),
            Err(DataLoadError::Registry(RegistryError::InvalidAttack { .. }))
        ));

        cleanup(&dir);
    }

    #[test]
    fn load_rejects_zero_tick_interval() {
        let dir = make_test_dir("load_zero_tick");
        fs::write(dir.join("attack_types.ron"), ATTACKS_RON).unwrap();
        fs::write(dir.join("node_types.ron"), NODES_RON).unwrap();
        fs::write(dir.join("settings.toml"), "tick_interval = 0.0\n").unwrap();

        let err = load_game_data(&dir).unwrap_err();
        match err {
            DataLoadError::OutOfRange { file, field, value } => {
                assert_eq!(file, dir.join("settings.toml"));
                assert_eq!(field, "settings.tick_interval");
                assert_eq!(value, 0.0);
            }
            other => panic!("expected OutOfRange, got {other}"),
        }

        cleanup(&dir);
    }

    #[test]
    fn load_rejects_damage_beyond_fixed_range() {
        let dir = make_test_dir("load_huge_damage");
        fs::write(
            dir.join("attack_types.ron"),
            r#"[(name: "laser", damage: 1e10, cooldown: 1.0)]"#,
        )
        .unwrap();
        fs::write(dir.join("node_types.ron"), "[]").unwrap();

        assert!(matches!(
            load_game_data(&dir),
            Err(DataLoadError::OutOfRange { ref field, .. }) if field == "laser.damage"
        ));

        cleanup(&dir);
    }

    #[test]
    fn load_rejects_non_finite_node_quantities() {
        let dir = make_test_dir("load_non_finite");
        fs::write(dir.join("attack_types.ron"), ATTACKS_RON).unwrap();
        fs::write(
            dir.join("node_types.ron"),
            r#"[(name: "tower", kind: defense, base_shield: NaN)]"#,
        )
        .unwrap();

        assert!(matches!(
            load_game_data(&dir),
            Err(DataLoadError::OutOfRange { ref field, .. }) if field == "tower.base_shield"
        ));

        cleanup(&dir);
    }

    // -----------------------------------------------------------------------
    // Error display messages
    // -----------------------------------------------------------------------

    #[test]
    fn error_display_messages() {
        let e = DataLoadError::MissingRequired {
            file: "node_types".to_string(),
            dir: PathBuf::from("/data"),
        };
        assert!(format!("{e}").contains("node_types"));
        assert!(format!("{e}").contains("/data"));

        let e = DataLoadError::UnresolvedRef {
            file: PathBuf::from("node_types.ron"),
            name: "railgun".to_string(),
            expected_kind: "attack type",
        };
        let msg = format!("{e}");
        assert!(msg.contains("railgun"));
        assert!(msg.contains("attack type"));
    }

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let data_err: DataLoadError = io_err.into();
        assert!(matches!(data_err, DataLoadError::Io(_)));
        assert!(format!("{data_err}").contains("file not found"));
    }
}
