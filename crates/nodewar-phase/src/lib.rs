//! Phase state machine for nodewar.
//!
//! The player moves between three phases: **Select** (pick an opponent),
//! **Build** (edit and save a layout) and **Attack** (fight the chosen
//! opponent's layout). [`PhaseController`] owns the current phase, tears it
//! down on every transition and builds the next one from the shared
//! registry, settings and [`Collaborators`].
//!
//! # Usage
//!
//! ```rust,ignore
//! use nodewar_phase::{Collaborators, MemoryStore, PhaseController};
//!
//! let data = nodewar_data::load_game_data(Path::new("data"))?;
//! let mut ctl = PhaseController::from_game_data(data, Collaborators::headless(MemoryStore::new()));
//! ctl.enter_build()?;
//! ctl.update(frame_delta);
//! ```

pub mod attack;
pub mod build;
pub mod collab;
pub mod controller;
pub mod error;
pub mod ledger;
pub mod pending;
pub mod select;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use attack::{AttackPhase, BattleStatus};
pub use build::BuildPhase;
pub use collab::{Collaborators, LayoutStore, MemoryStore, Overlay, SceneRenderer, StoreError};
pub use controller::{Phase, PhaseController, PhaseKind};
pub use error::PhaseError;
pub use ledger::CurrencyLedger;
pub use pending::{ActionId, PendingAction, PendingActions};
pub use select::SelectPhase;
