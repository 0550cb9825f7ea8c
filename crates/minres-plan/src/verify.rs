//! Replays exported plan steps against a simulated game state.
//!
//! Verification is two checks in emission order: every prerequisite id must
//! already have been emitted, then every step must be a legal transition of
//! the [`SimulationState`]. The first failure is returned; the state keeps
//! every step before it.

use std::collections::BTreeSet;

use minres_core::config::PlannerConfig;
use minres_core::inventory::{InventoryError, add_count, check_add, sub_count, try_add_count};
use minres_core::machine::{CraftStatus, InventorySlot, Machine, TransferError};
use minres_core::recipe::{CraftError, handcraft};
use minres_core::registry::GameData;
use minres_core::state::{SimulationState, StateError};
use minres_core::tech::tech_cost;
use tracing::{debug, warn};

use crate::export::PlanStep;
use crate::task::{MineTarget, TaskKind};

#[derive(Debug, thiserror::Error)]
pub enum PlanError {
    #[error("step {index}: prerequisite '{id}' has not been emitted yet")]
    UnknownPrerequisite { index: usize, id: String },
    #[error("step {index}: unknown technology '{tech}'")]
    UnknownTechnology { index: usize, tech: String },
    #[error("step {index}: '{tech}' is already researched")]
    AlreadyResearched { index: usize, tech: String },
    #[error("step {index}: '{tech}' needs '{missing}' researched first")]
    PrerequisiteNotResearched {
        index: usize,
        tech: String,
        missing: String,
    },
    #[error("step {index}: need {wanted} '{item}', have {available}")]
    InsufficientItems {
        index: usize,
        item: String,
        wanted: u32,
        available: u32,
    },
    #[error("step {index}: no '{entity}' in the inventory to build")]
    NothingToBuild { index: usize, entity: String },
    #[error("step {index}: cannot build '{entity}' while '{existing}' is placed")]
    MachineKindOccupied {
        index: usize,
        entity: String,
        existing: String,
    },
    #[error("step {index}: '{entity}' is not placed")]
    BuildingNotPlaced { index: usize, entity: String },
    #[error("step {index}: '{entity}' has no {slot} inventory")]
    InventoryNotFound {
        index: usize,
        entity: String,
        slot: InventorySlot,
    },
    #[error("step {index}: transfer failed")]
    Transfer {
        index: usize,
        #[source]
        source: TransferError,
    },
    #[error("step {index}: unknown recipe '{name}'")]
    UnknownRecipe { index: usize, name: String },
    #[error("step {index}: crafting failed")]
    Craft {
        index: usize,
        #[source]
        source: CraftError,
    },
    #[error("step {index}: '{entity}' cannot run recipe '{recipe}'")]
    CannotSetRecipe {
        index: usize,
        entity: String,
        recipe: String,
    },
    #[error("step {index}: waited for {wanted} '{item}' in '{entity}', only {available} arrived")]
    WaitUnsatisfied {
        index: usize,
        entity: String,
        item: String,
        wanted: u32,
        available: u32,
    },
    #[error("step {index}: player inventory count overflow")]
    CountOverflow {
        index: usize,
        #[source]
        source: InventoryError,
    },
}

impl PlanError {
    /// Position of the failing step.
    pub fn index(&self) -> usize {
        match self {
            PlanError::UnknownPrerequisite { index, .. }
            | PlanError::UnknownTechnology { index, .. }
            | PlanError::AlreadyResearched { index, .. }
            | PlanError::PrerequisiteNotResearched { index, .. }
            | PlanError::InsufficientItems { index, .. }
            | PlanError::NothingToBuild { index, .. }
            | PlanError::MachineKindOccupied { index, .. }
            | PlanError::BuildingNotPlaced { index, .. }
            | PlanError::InventoryNotFound { index, .. }
            | PlanError::Transfer { index, .. }
            | PlanError::UnknownRecipe { index, .. }
            | PlanError::Craft { index, .. }
            | PlanError::CannotSetRecipe { index, .. }
            | PlanError::WaitUnsatisfied { index, .. }
            | PlanError::CountOverflow { index, .. } => *index,
        }
    }
}

/// Every prerequisite must name a step emitted earlier.
pub fn verify_prerequisites(steps: &[PlanStep]) -> Result<(), PlanError> {
    let mut seen = BTreeSet::new();
    for (index, step) in steps.iter().enumerate() {
        if let Some(id) = step.prerequisites.iter().find(|id| !seen.contains(id.as_str())) {
            return Err(PlanError::UnknownPrerequisite {
                index,
                id: id.clone(),
            });
        }
        seen.insert(step.id.as_str());
    }
    Ok(())
}

/// Check `steps` from a fresh game. Returns the final state.
pub fn verify(
    data: &GameData,
    config: &PlannerConfig,
    steps: &[PlanStep],
) -> Result<SimulationState, PlanError> {
    let mut state = SimulationState::new(config);
    verify_from(data, &mut state, steps)?;
    Ok(state)
}

/// Check `steps` starting from `state`, leaving it at the last legal step.
pub fn verify_from(
    data: &GameData,
    state: &mut SimulationState,
    steps: &[PlanStep],
) -> Result<(), PlanError> {
    verify_prerequisites(steps).inspect_err(|e| warn!(index = e.index(), error = %e, "plan rejected"))?;

    for (index, step) in steps.iter().enumerate() {
        if let Err(e) = apply(data, state, index, &step.kind) {
            warn!(index, id = %step.id, error = %e, "plan rejected");
            return Err(e);
        }
    }
    debug!(steps = steps.len(), "plan verified");
    Ok(())
}

fn held(state: &SimulationState, item: &str) -> u32 {
    state.inventory.get(item).copied().unwrap_or(0)
}

fn overflow(index: usize) -> impl FnOnce(InventoryError) -> PlanError {
    move |source| PlanError::CountOverflow { index, source }
}

/// Apply one step. On error the state is unchanged.
fn apply(data: &GameData, state: &mut SimulationState, index: usize, kind: &TaskKind) -> Result<(), PlanError> {
    match kind {
        TaskKind::Research { tech } => research(data, state, index, tech),
        TaskKind::Build { entity } => {
            if held(state, entity) == 0 {
                return Err(PlanError::NothingToBuild {
                    index,
                    entity: entity.clone(),
                });
            }
            state.construct(data, entity).map_err(|e| match e {
                StateError::RoleOccupied { existing, .. } => PlanError::MachineKindOccupied {
                    index,
                    entity: entity.clone(),
                    existing,
                },
            })?;
            sub_count(&mut state.inventory, entity, 1);
            Ok(())
        }
        TaskKind::Mine {
            target: MineTarget::Resource(resource),
            amount,
        } => try_add_count(&mut state.inventory, resource, *amount).map_err(overflow(index)),
        TaskKind::Mine {
            target: MineTarget::Entity(entity),
            ..
        } => {
            check_add(&state.inventory, entity, 1).map_err(overflow(index))?;
            let contents = state
                .mine_building(entity)
                .ok_or_else(|| PlanError::BuildingNotPlaced {
                    index,
                    entity: entity.clone(),
                })?;
            add_count(&mut state.inventory, entity, 1);
            for (item, n) in contents {
                add_count(&mut state.inventory, &item, n);
            }
            Ok(())
        }
        TaskKind::Put {
            entity,
            slot,
            item,
            amount,
        } => put(data, state, index, entity, *slot, item, *amount),
        TaskKind::Take {
            entity,
            slot,
            item,
            amount,
        } => {
            check_add(&state.inventory, item, *amount).map_err(overflow(index))?;
            let machine = machine_slot(state, index, entity, *slot)?;
            machine
                .transfer_out(*slot, item, *amount)
                .map_err(|source| PlanError::Transfer { index, source })?;
            add_count(&mut state.inventory, item, *amount);
            Ok(())
        }
        TaskKind::Handcraft { recipe, count } => {
            let def = data.recipe(recipe).ok_or_else(|| PlanError::UnknownRecipe {
                index,
                name: recipe.clone(),
            })?;
            let items = count.checked_mul(def.primary_count()).ok_or_else(|| PlanError::Craft {
                index,
                source: CraftError::CountOverflow {
                    item: recipe.clone(),
                },
            })?;
            state.inventory = handcraft(data, &state.inventory, def, items)
                .map_err(|source| PlanError::Craft { index, source })?;
            Ok(())
        }
        TaskKind::Craft { item, amount } => {
            let def = data.recipe_for(item).ok_or_else(|| PlanError::UnknownRecipe {
                index,
                name: item.clone(),
            })?;
            state.inventory = handcraft(data, &state.inventory, def, *amount)
                .map_err(|source| PlanError::Craft { index, source })?;
            Ok(())
        }
        TaskKind::SetRecipe { entity, recipe } => {
            let def = data.recipe(recipe).ok_or_else(|| PlanError::UnknownRecipe {
                index,
                name: recipe.clone(),
            })?;
            let machine = state
                .machine_mut(entity)
                .ok_or_else(|| PlanError::BuildingNotPlaced {
                    index,
                    entity: entity.clone(),
                })?;
            let previous = machine.set_recipe(def).ok_or_else(|| PlanError::CannotSetRecipe {
                index,
                entity: entity.clone(),
                recipe: recipe.clone(),
            })?;
            for (item, n) in previous {
                add_count(&mut state.inventory, &item, n);
            }
            Ok(())
        }
        TaskKind::Wait {
            entity,
            slot,
            item,
            amount,
        } => {
            let machine = machine_slot(state, index, entity, *slot)?;
            let available = machine.inventory(*slot).map_or(0, |inv| inv.count(item));
            if available < *amount {
                return Err(PlanError::WaitUnsatisfied {
                    index,
                    entity: entity.clone(),
                    item: item.clone(),
                    wanted: *amount,
                    available,
                });
            }
            Ok(())
        }
        TaskKind::Speed { .. } | TaskKind::Launch | TaskKind::Meta => Ok(()),
    }
}

fn research(data: &GameData, state: &mut SimulationState, index: usize, tech: &str) -> Result<(), PlanError> {
    let def = data
        .technology(tech)
        .ok_or_else(|| PlanError::UnknownTechnology {
            index,
            tech: tech.to_string(),
        })?;
    if state.is_researched(tech) {
        return Err(PlanError::AlreadyResearched {
            index,
            tech: tech.to_string(),
        });
    }
    if let Some(missing) = def.prerequisites.iter().find(|p| !state.is_researched(p)) {
        return Err(PlanError::PrerequisiteNotResearched {
            index,
            tech: tech.to_string(),
            missing: missing.clone(),
        });
    }

    let cost = tech_cost(data, tech).unwrap_or_default();
    for (pack, &wanted) in &cost {
        let available = held(state, pack);
        if available < wanted {
            return Err(PlanError::InsufficientItems {
                index,
                item: pack.clone(),
                wanted,
                available,
            });
        }
    }
    for (pack, n) in cost {
        sub_count(&mut state.inventory, &pack, n);
    }
    state.researched.insert(tech.to_string());
    Ok(())
}

/// The placed machine `entity`, if it exposes `slot`.
fn machine_slot<'a>(
    state: &'a mut SimulationState,
    index: usize,
    entity: &str,
    slot: InventorySlot,
) -> Result<&'a mut Machine, PlanError> {
    let placed = state.is_placed(entity);
    let machine = state.machine_mut(entity).ok_or_else(|| {
        if placed {
            PlanError::InventoryNotFound {
                index,
                entity: entity.to_string(),
                slot,
            }
        } else {
            PlanError::BuildingNotPlaced {
                index,
                entity: entity.to_string(),
            }
        }
    })?;
    if !machine.slots().contains(&slot) {
        return Err(PlanError::InventoryNotFound {
            index,
            entity: entity.to_string(),
            slot,
        });
    }
    Ok(machine)
}

fn put(
    data: &GameData,
    state: &mut SimulationState,
    index: usize,
    entity: &str,
    slot: InventorySlot,
    item: &str,
    amount: u32,
) -> Result<(), PlanError> {
    let available = held(state, item);
    if available < amount {
        return Err(PlanError::InsufficientItems {
            index,
            item: item.to_string(),
            wanted: amount,
            available,
        });
    }

    let machine = machine_slot(state, index, entity, slot)?;
    machine
        .transfer_in(data, slot, item, amount)
        .map_err(|source| PlanError::Transfer { index, source })?;

    let mut cycles = 0u32;
    while machine.craft_cycle(data) == CraftStatus::Running {
        cycles += 1;
    }
    // Fuel burns and labs consume packs as soon as they are loaded.
    for burned in [InventorySlot::Fuel, InventorySlot::LabInput] {
        if let Some(inv) = machine.inventory_mut(burned) {
            inv.drain();
        }
    }
    if cycles > 0 {
        debug!(index, entity, cycles, "machine ran");
    }

    sub_count(&mut state.inventory, item, amount);
    Ok(())
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::export;
    use crate::task::{Task, TaskIdGen};
    use minres_core::inventory::ItemCounts;
    use minres_core::test_utils::vanilla;

    fn counts(pairs: &[(&str, u32)]) -> ItemCounts {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn steps(tasks: Vec<Task>) -> Vec<PlanStep> {
        export(&mut Task::group(tasks), &mut TaskIdGen::new())
    }

    fn state_with(pairs: &[(&str, u32)]) -> SimulationState {
        let mut state = SimulationState::default();
        state.inventory = counts(pairs);
        state
    }

    // -----------------------------------------------------------------------
    // Prerequisite ordering
    // -----------------------------------------------------------------------

    #[test]
    fn exported_plans_are_ordered() {
        let data = vanilla();
        let mut root = Task::research(&data, "fast-inserter").unwrap();
        let plan = export(&mut root, &mut TaskIdGen::new());
        assert!(verify_prerequisites(&plan).is_ok());
    }

    #[test]
    fn forward_reference_is_rejected() {
        let data = vanilla();
        let mut plan = steps(vec![Task::mine(&data, "coal", 1), Task::launch()]);
        let later = plan[1].id.clone();
        plan[0].prerequisites.push(later);
        let err = verify_prerequisites(&plan).unwrap_err();
        assert!(matches!(&err, PlanError::UnknownPrerequisite { index: 0, id } if id == "task_launch_0"));
    }

    // -----------------------------------------------------------------------
    // Machines
    // -----------------------------------------------------------------------

    #[test]
    fn furnace_smelts_on_put() {
        let data = vanilla();
        let mut state = state_with(&[("stone-furnace", 1), ("coal", 1)]);
        let plan = steps(vec![
            Task::build("stone-furnace"),
            Task::mine(&data, "iron-ore", 10),
            Task::put("stone-furnace", InventorySlot::Fuel, "coal", 1),
            Task::put("stone-furnace", InventorySlot::FurnaceSource, "iron-ore", 10),
            Task::wait("stone-furnace", InventorySlot::FurnaceResult, "iron-plate", 10),
            Task::take("stone-furnace", InventorySlot::FurnaceResult, "iron-plate", 10),
        ]);
        verify_from(&data, &mut state, &plan).unwrap();
        assert_eq!(state.inventory, counts(&[("iron-plate", 10)]));
    }

    #[test]
    fn set_recipe_returns_contents() {
        let data = vanilla();
        let mut state = state_with(&[("assembling-machine-1", 1), ("iron-plate", 4)]);
        let plan = steps(vec![
            Task::build("assembling-machine-1"),
            Task::set_recipe("assembling-machine-1", "iron-gear-wheel"),
            Task::put("assembling-machine-1", InventorySlot::AssemblingMachineInput, "iron-plate", 3),
            Task::set_recipe("assembling-machine-1", "pipe"),
        ]);
        verify_from(&data, &mut state, &plan).unwrap();
        // One gear was made from two plates, the third plate came back.
        assert_eq!(state.inventory, counts(&[("iron-gear-wheel", 1), ("iron-plate", 2)]));
    }

    #[test]
    fn mining_a_machine_returns_it() {
        let data = vanilla();
        let mut state = state_with(&[("stone-furnace", 1), ("iron-ore", 3)]);
        let plan = steps(vec![
            Task::build("stone-furnace"),
            Task::put("stone-furnace", InventorySlot::FurnaceSource, "iron-ore", 3),
            Task::mine(&data, "stone-furnace", 1),
        ]);
        verify_from(&data, &mut state, &plan).unwrap();
        assert_eq!(state.inventory, counts(&[("iron-plate", 3), ("stone-furnace", 1)]));
        assert!(!state.is_placed("stone-furnace"));
    }

    #[test]
    fn handcraft_counts_invocations() {
        let data = vanilla();
        let mut state = state_with(&[("copper-plate", 3)]);
        let plan = steps(vec![Task::new(TaskKind::Handcraft {
            recipe: "copper-cable".to_string(),
            count: 3,
        })]);
        verify_from(&data, &mut state, &plan).unwrap();
        assert_eq!(state.inventory, counts(&[("copper-cable", 6)]));
    }

    #[test]
    fn research_consumes_packs() {
        let data = vanilla();
        let mut state = state_with(&[("automation-science-pack", 12)]);
        let plan = steps(vec![Task::new(TaskKind::Research {
            tech: "automation".to_string(),
        })]);
        verify_from(&data, &mut state, &plan).unwrap();
        assert!(state.is_researched("automation"));
        assert_eq!(state.inventory, counts(&[("automation-science-pack", 2)]));
    }

    // -----------------------------------------------------------------------
    // Error path tests
    // -----------------------------------------------------------------------

    #[test]
    fn repeated_research_leaves_state_alone() {
        let data = vanilla();
        let mut state = state_with(&[("automation-science-pack", 20)]);
        let research = || {
            Task::new(TaskKind::Research {
                tech: "automation".to_string(),
            })
        };
        let plan = steps(vec![research(), research()]);

        let err = verify_from(&data, &mut state, &plan).unwrap_err();
        assert!(matches!(&err, PlanError::AlreadyResearched { index: 1, tech } if tech == "automation"));
        assert_eq!(state.inventory, counts(&[("automation-science-pack", 10)]));
        assert_eq!(state.researched.len(), 1);
    }

    #[test]
    fn missing_prerequisite_is_named() {
        let data = vanilla();
        let mut state = state_with(&[("automation-science-pack", 100)]);
        let plan = steps(vec![Task::new(TaskKind::Research {
            tech: "electronics".to_string(),
        })]);
        let err = verify_from(&data, &mut state, &plan).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("'automation'"), "got: {msg}");
        assert!(state.researched.is_empty());
    }

    #[test]
    fn research_without_packs_fails() {
        let data = vanilla();
        let mut state = SimulationState::default();
        let plan = steps(vec![Task::new(TaskKind::Research {
            tech: "automation".to_string(),
        })]);
        let err = verify_from(&data, &mut state, &plan).unwrap_err();
        assert!(matches!(err, PlanError::InsufficientItems { wanted: 10, available: 0, .. }));
    }

    #[test]
    fn build_needs_the_item() {
        let data = vanilla();
        let err = verify_from(&data, &mut SimulationState::default(), &steps(vec![Task::build("lab")])).unwrap_err();
        assert!(matches!(err, PlanError::NothingToBuild { .. }));
    }

    #[test]
    fn second_furnace_is_rejected() {
        let data = vanilla();
        let mut state = state_with(&[("stone-furnace", 2)]);
        let plan = steps(vec![Task::build("stone-furnace"), Task::build("stone-furnace")]);
        let err = verify_from(&data, &mut state, &plan).unwrap_err();
        assert!(matches!(err, PlanError::MachineKindOccupied { index: 1, .. }));
        assert_eq!(state.inventory.get("stone-furnace"), Some(&1));
    }

    #[test]
    fn put_into_missing_building() {
        let data = vanilla();
        let mut state = state_with(&[("coal", 5)]);
        let plan = steps(vec![Task::put("stone-furnace", InventorySlot::Fuel, "coal", 5)]);
        let err = verify_from(&data, &mut state, &plan).unwrap_err();
        assert!(matches!(err, PlanError::BuildingNotPlaced { .. }));
        assert_eq!(state.inventory.get("coal"), Some(&5));
    }

    #[test]
    fn put_into_wrong_slot() {
        let data = vanilla();
        let mut state = state_with(&[("stone-furnace", 1), ("iron-ore", 5)]);
        let plan = steps(vec![
            Task::build("stone-furnace"),
            Task::put("stone-furnace", InventorySlot::LabInput, "iron-ore", 5),
        ]);
        let err = verify_from(&data, &mut state, &plan).unwrap_err();
        assert!(matches!(err, PlanError::InventoryNotFound { slot: InventorySlot::LabInput, .. }));
    }

    #[test]
    fn wait_for_more_than_made() {
        let data = vanilla();
        let mut state = state_with(&[("stone-furnace", 1), ("iron-ore", 5)]);
        let plan = steps(vec![
            Task::build("stone-furnace"),
            Task::put("stone-furnace", InventorySlot::FurnaceSource, "iron-ore", 5),
            Task::wait("stone-furnace", InventorySlot::FurnaceResult, "iron-plate", 6),
        ]);
        let err = verify_from(&data, &mut state, &plan).unwrap_err();
        assert!(matches!(err, PlanError::WaitUnsatisfied { wanted: 6, available: 5, .. }));
        assert_eq!(err.index(), 2);
    }

    #[test]
    fn handcraft_missing_ingredient() {
        let data = vanilla();
        let mut state = SimulationState::default();
        let plan = steps(vec![Task::new(TaskKind::Handcraft {
            recipe: "iron-gear-wheel".to_string(),
            count: 1,
        })]);
        let err = verify_from(&data, &mut state, &plan).unwrap_err();
        assert!(matches!(
            err,
            PlanError::Craft {
                source: CraftError::MissingIngredient { .. },
                ..
            }
        ));
    }

    #[test]
    fn furnace_cannot_take_a_recipe() {
        let data = vanilla();
        let mut state = state_with(&[("stone-furnace", 1)]);
        let plan = steps(vec![
            Task::build("stone-furnace"),
            Task::set_recipe("stone-furnace", "iron-plate"),
        ]);
        let err = verify_from(&data, &mut state, &plan).unwrap_err();
        assert!(matches!(err, PlanError::CannotSetRecipe { .. }));
    }

    #[test]
    fn mining_past_u32_is_rejected() {
        let data = vanilla();
        let mut state = SimulationState::default();
        let plan = steps(vec![
            Task::mine(&data, "iron-ore", 3_000_000_000),
            Task::mine(&data, "iron-ore", 3_000_000_000),
        ]);
        let err = verify_from(&data, &mut state, &plan).unwrap_err();
        assert_eq!(err.index(), 1);
        assert!(
            matches!(
                &err,
                PlanError::CountOverflow {
                    source: InventoryError::CountOverflow { item, .. },
                    ..
                } if item == "iron-ore"
            ),
            "got: {err}"
        );
        assert_eq!(state.inventory, counts(&[("iron-ore", 3_000_000_000)]));
    }

    #[test]
    fn take_overflow_leaves_the_machine_alone() {
        let data = vanilla();
        let mut state = state_with(&[
            ("stone-furnace", 1),
            ("coal", 1),
            ("iron-ore", 10),
            ("iron-plate", u32::MAX - 5),
        ]);
        let plan = steps(vec![
            Task::build("stone-furnace"),
            Task::put("stone-furnace", InventorySlot::Fuel, "coal", 1),
            Task::put("stone-furnace", InventorySlot::FurnaceSource, "iron-ore", 10),
            Task::take("stone-furnace", InventorySlot::FurnaceResult, "iron-plate", 10),
        ]);
        let err = verify_from(&data, &mut state, &plan).unwrap_err();
        assert_eq!(err.index(), 3);
        assert!(matches!(err, PlanError::CountOverflow { .. }), "got: {err}");

        let furnace = state.machine("stone-furnace").unwrap();
        assert_eq!(furnace.inventory(InventorySlot::FurnaceResult).unwrap().count("iron-plate"), 10);
        assert_eq!(state.inventory.get("iron-plate"), Some(&(u32::MAX - 5)));
    }
}
