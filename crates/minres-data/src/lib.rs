//! Data-file loading for the minres planner.
//!
//! Reads the game's raw data dump (JSON, RON or TOML) into a frozen
//! [`GameData`] registry, and planner configuration into a
//! [`PlannerConfig`](minres_core::config::PlannerConfig).

pub mod loader;
pub mod schema;

pub use loader::{
    DataLoadError, build_game_data, load_config, load_game_data, parse_game_data_json,
};
pub use minres_core::registry::GameData;
