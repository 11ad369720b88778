//! Nodewar Core -- the entity graph and combat simulation behind the build
//! and attack phases.
//!
//! This crate provides the node/tether graph, the fixed-capacity beam pool,
//! per-node health, attacker slots and status effects, and the combat
//! engine that ties them together, all on deterministic fixed-point math.
//!
//! # Ownership
//!
//! Nodes, tethers and attacks live in `slotmap` arenas and refer to each
//! other by key only. Per-node combat state sits in `SecondaryMap`s keyed by
//! [`id::NodeId`], so removing a node never leaves a dangling reference:
//!
//! ```rust
//! use nodewar_core::combat::{CombatConfig, CombatEngine};
//! use nodewar_core::id::{Allegiance, Position};
//! use nodewar_core::targeting::TargetingStrategy;
//! use nodewar_core::test_utils::*;
//!
//! let mut engine = CombatEngine::new(standard_registry(), CombatConfig::default());
//! let ours = engine.create_node(base_type(), Position::ORIGIN, Allegiance::Friendly).unwrap();
//! let theirs = engine.create_node(base_type(), Position::ORIGIN, Allegiance::Enemy).unwrap();
//! engine.tether(ours, theirs).unwrap();
//! engine.add_attacker(ours, laser(), TargetingStrategy::default()).unwrap();
//!
//! engine.update(fixed(0.0));
//! engine.update(fixed(0.5));
//! assert!(engine.vitals(theirs).unwrap().health() < fixed(100.0));
//! ```
//!
//! # Key Types
//!
//! - [`graph::EntityGraph`] -- Nodes and undirected tethers with adjacency
//!   limits and hub-distance queries.
//! - [`pool::InstancePool`] -- Fixed-capacity pool of animated beams with a
//!   contiguous visible prefix.
//! - [`combat::CombatEngine`] -- Targeting, animation and damage resolution.
//! - [`layout::SavedLayout`] -- The persisted layout document.
//! - [`registry::Registry`] -- Immutable node and attack type definitions.
//! - [`sim::TickClock`] -- Fixed-interval logic tick accumulator.
//! - [`fixed::Fixed64`] -- Q32.32 fixed-point type for deterministic math.

pub mod combat;
pub mod fixed;
pub mod graph;
pub mod health;
pub mod id;
pub mod layout;
pub mod pool;
pub mod registry;
pub mod sim;
pub mod slots;
pub mod status;
pub mod targeting;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
