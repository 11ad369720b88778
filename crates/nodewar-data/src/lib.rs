//! Data-driven game configuration: node types, attack types and settings
//! loaded from RON, TOML or JSON files.

pub mod loader;
pub mod schema;
pub mod settings;

pub use loader::{DataLoadError, GameData, load_game_data};
pub use settings::GameSettings;
