//! minres core -- the data model and arithmetic behind minimum-resource
//! game plans.
//!
//! Everything here is synchronous and free of I/O. Game data is frozen into
//! a [`registry::GameData`] once; every later computation reads it and
//! mutates at most one [`state::SimulationState`].
//!
//! # Key Types
//!
//! - [`registry::GameData`] -- Immutable items, recipes, technologies,
//!   modules and machine specs, built through [`registry::GameDataBuilder`].
//! - [`inventory::Inventory`] -- Slot- and stack-limited item storage.
//! - [`machine::Machine`] -- Assembler, furnace, lab or boiler with named
//!   inventory slots and a crafting cycle.
//! - [`resolver::resolve`] -- Dependency graph resolution of item requests
//!   into exact per-item amounts.
//! - [`recipe`] -- Recipe cost, hand crafting and batch sizing.
//! - [`energy`] -- Fuel and energy accounting.
//! - [`state::SimulationState`] -- Player inventory, research and placed
//!   machines.

pub mod config;
pub mod energy;
pub mod inventory;
pub mod machine;
pub mod module;
pub mod recipe;
pub mod registry;
pub mod resolver;
pub mod state;
pub mod tech;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
