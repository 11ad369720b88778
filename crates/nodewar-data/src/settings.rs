//! Resolved game settings shared by every phase.

use std::path::Path;

use nodewar_core::combat::CombatConfig;
use nodewar_core::fixed::{Fixed64, Seconds, f64_to_fixed64};
use nodewar_core::layout::LayoutEncoding;

use crate::loader::{DataLoadError, quantity};
use crate::schema::SettingsData;

#[derive(Debug, Clone, PartialEq)]
pub struct GameSettings {
    /// Length of one logic tick (income, idle drift).
    pub tick_interval: Seconds,
    /// Furthest any node may sit from its nearest hub for a layout to save.
    pub max_hub_distance: u32,
    pub starting_currency: u32,
    /// Wrapping used when saving layouts.
    pub layout_encoding: LayoutEncoding,
    pub combat: CombatConfig,
    /// Background name written into saved layouts.
    pub background: String,
}

impl GameSettings {
    /// Resolve settings read from `file`. The tick interval must be a
    /// positive duration.
    pub fn from_data(data: SettingsData, file: &Path) -> Result<Self, DataLoadError> {
        let tick_interval = quantity(data.tick_interval, "settings", "tick_interval", file)?;
        if tick_interval <= Fixed64::ZERO {
            return Err(DataLoadError::OutOfRange {
                file: file.to_path_buf(),
                field: String::from("settings.tick_interval"),
                value: data.tick_interval,
            });
        }
        Ok(Self::with_tick(data, tick_interval))
    }

    fn with_tick(data: SettingsData, tick_interval: Seconds) -> Self {
        Self {
            tick_interval,
            max_hub_distance: data.max_hub_distance,
            starting_currency: data.starting_currency,
            layout_encoding: data.layout_encoding,
            combat: data.combat,
            background: data.background,
        }
    }
}

impl Default for GameSettings {
    fn default() -> Self {
        let data = SettingsData::default();
        let tick = f64_to_fixed64(data.tick_interval);
        Self::with_tick(data, tick)
    }
}
