//! Plan building for the minres planner.
//!
//! Turns "make these items" or "research this technology" into a linear list
//! of player actions that uses as few raw resources as possible, and checks
//! such a list against a simulated game.
//!
//! # Overview
//!
//! A plan starts as a [`Task`] tree built with [`Task::craft`] or
//! [`Task::research`]. [`optimize`] then shrinks it by what the player
//! already holds and expands every abstract craft into hand crafting or
//! machine runs. [`export`] flattens the tree into [`PlanStep`] records with
//! stable ids, and [`verify`] replays those records step by step.
//!
//! ```text
//! Task::craft ──> optimize ──> export ──> verify
//!                 (pass 1,     (ids,      (prerequisite order,
//!                  pass 2)      records)   state transitions)
//! ```
//!
//! # Batches
//!
//! Machine runs are split so that every load fits in one stack of each
//! ingredient and one stack of the product. Burner machines get their fuel
//! mined and loaded before each batch; the unburned fraction of the last
//! fuel item carries into the next batch on the same machine.

pub mod export;
pub mod optimize;
pub mod smelt;
pub mod task;
pub mod verify;

pub use export::{PlanStep, export};
pub use optimize::{OptimizeError, concretize, optimize, reduce_quantities};
pub use smelt::{fuel_machine, machine_craft, mine_and_smelt, mine_fuel_and_smelt};
pub use task::{MineTarget, PlanBuildError, Task, TaskIdGen, TaskKind};
pub use verify::{PlanError, verify, verify_from, verify_prerequisites};
