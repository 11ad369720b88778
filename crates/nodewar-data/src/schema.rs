//! Serde data file structs for game content definitions.
//!
//! These structs define the on-disk format for node types, attack types and
//! settings. Quantities are plain floats on disk and converted to fixed-point
//! by the loader; cross-references are by name.

use nodewar_core::combat::CombatConfig;
use nodewar_core::layout::LayoutEncoding;
use nodewar_core::registry::NodeKind;
use serde::Deserialize;

// ===========================================================================
// Attack types
// ===========================================================================

/// An attack type definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct AttackTypeData {
    pub name: String,
    pub damage: f64,
    pub cooldown: f64,
    #[serde(default = "default_speed")]
    pub speed: f64,
    #[serde(default)]
    pub effect: EffectData,
    #[serde(default = "default_pool_capacity")]
    pub pool_capacity: usize,
    #[serde(default = "default_frame_count")]
    pub frame_count: u32,
    #[serde(default = "default_frame_interval")]
    pub frame_interval: f64,
}

fn default_speed() -> f64 {
    1.0
}

fn default_pool_capacity() -> usize {
    32
}

fn default_frame_count() -> u32 {
    8
}

fn default_frame_interval() -> f64 {
    1.0 / 16.0
}

/// Secondary effect of an attack.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectData {
    #[default]
    None,
    Splash {
        ratio: f64,
    },
    Disable {
        duration: f64,
    },
    Leech {
        ratio: f64,
    },
}

// ===========================================================================
// Node types
// ===========================================================================

/// A node type definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeTypeData {
    pub name: String,
    pub kind: NodeKind,
    #[serde(default)]
    pub max_adjacency: Option<u32>,
    #[serde(default)]
    pub attacker_slots: usize,
    #[serde(default = "default_health")]
    pub base_health: f64,
    #[serde(default)]
    pub base_shield: f64,
    #[serde(default)]
    pub income: f64,
    #[serde(default)]
    pub cost: u32,
    /// Attack type names. Empty allows every attack type.
    #[serde(default)]
    pub allowed_attacks: Vec<String>,
    #[serde(default)]
    pub default_attack: Option<String>,
}

fn default_health() -> f64 {
    100.0
}

// ===========================================================================
// Settings
// ===========================================================================

/// Game settings in a data file. Every field is optional.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SettingsData {
    pub tick_interval: f64,
    pub max_hub_distance: u32,
    pub starting_currency: u32,
    pub layout_encoding: LayoutEncoding,
    pub combat: CombatConfig,
    pub background: String,
}

impl Default for SettingsData {
    fn default() -> Self {
        Self {
            tick_interval: 0.1,
            max_hub_distance: 3,
            starting_currency: 500,
            layout_encoding: LayoutEncoding::Json,
            combat: CombatConfig::default(),
            background: String::from("default"),
        }
    }
}
