//! Simulated player and factory state shared by the optimizer and verifier.

use crate::config::PlannerConfig;
use crate::inventory::ItemCounts;
use crate::machine::Machine;
use crate::registry::{GameData, MachineRole, Recipe};
use std::collections::{BTreeMap, BTreeSet};

/// Player inventory, research progress, and placed buildings. At most one
/// machine per [`MachineRole`] is live at a time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SimulationState {
    pub inventory: ItemCounts,
    pub researched: BTreeSet<String>,
    pub placed: BTreeSet<String>,
    machines: BTreeMap<MachineRole, Machine>,
}

impl SimulationState {
    /// Fresh game: the configured starting inventory and nothing else.
    pub fn new(config: &PlannerConfig) -> Self {
        Self {
            inventory: config.starting_inventory.clone(),
            ..Self::default()
        }
    }

    pub fn is_researched(&self, tech: &str) -> bool {
        self.researched.contains(tech)
    }

    pub fn is_placed(&self, building: &str) -> bool {
        self.placed.contains(building)
    }

    /// Place a building. Machines become live in their role; anything else
    /// (drills, chests) is only recorded as placed.
    pub fn construct(&mut self, data: &GameData, name: &str) -> Result<(), StateError> {
        if let Some(spec) = data.machine(name) {
            let role = spec.role();
            if let Some(existing) = self.machines.get(&role) {
                return Err(StateError::RoleOccupied {
                    role,
                    existing: existing.name().to_string(),
                });
            }
            self.machines.insert(role, Machine::new(spec));
        }
        self.placed.insert(name.to_string());
        tracing::debug!(building = name, "constructed");
        Ok(())
    }

    /// Pick a building back up. Returns whatever it held, or `None` if no
    /// such building is placed.
    pub fn mine_building(&mut self, name: &str) -> Option<ItemCounts> {
        if !self.placed.remove(name) {
            return None;
        }
        let role = self
            .machines
            .iter()
            .find(|(_, m)| m.name() == name)
            .map(|(role, _)| *role);
        let contents = match role.and_then(|r| self.machines.remove(&r)) {
            Some(mut machine) => machine.drain_all(),
            None => ItemCounts::new(),
        };
        tracing::debug!(building = name, "mined");
        Some(contents)
    }

    pub fn machine(&self, name: &str) -> Option<&Machine> {
        self.machines.values().find(|m| m.name() == name)
    }

    pub fn machine_mut(&mut self, name: &str) -> Option<&mut Machine> {
        self.machines.values_mut().find(|m| m.name() == name)
    }

    pub fn machine_for_role(&self, role: MachineRole) -> Option<&Machine> {
        self.machines.get(&role)
    }

    pub fn machines(&self) -> impl Iterator<Item = &Machine> {
        self.machines.values()
    }

    /// First live crafting machine that can run `recipe`.
    pub fn machine_for_recipe(&self, recipe: &Recipe) -> Option<&Machine> {
        MachineRole::CRAFTING
            .iter()
            .filter_map(|role| self.machines.get(role))
            .find(|m| m.can_craft(recipe))
    }

    /// Productivity bonus `recipe` would receive from the machine that
    /// would craft it.
    pub fn productivity_bonus(&self, recipe: &Recipe) -> f64 {
        self.machine_for_recipe(recipe)
            .map_or(0.0, |m| m.productivity_bonus(&recipe.name))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    #[error("a {role:?} is already placed ('{existing}')")]
    RoleOccupied { role: MachineRole, existing: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::InventorySlot;
    use crate::test_utils::vanilla;

    #[test]
    fn starts_with_config_inventory() {
        let state = SimulationState::new(&PlannerConfig::default());
        assert_eq!(state.inventory.get("iron-plate"), Some(&8));
        assert!(state.researched.is_empty());
        assert_eq!(state.machines().count(), 0);
    }

    #[test]
    fn one_machine_per_role() {
        let data = vanilla();
        let mut state = SimulationState::default();
        state.construct(&data, "assembling-machine-1").unwrap();
        let err = state.construct(&data, "assembling-machine-2").unwrap_err();
        assert_eq!(
            err,
            StateError::RoleOccupied {
                role: MachineRole::Assembler,
                existing: "assembling-machine-1".to_string(),
            }
        );
        state.construct(&data, "stone-furnace").unwrap();
        assert_eq!(state.machines().count(), 2);
    }

    #[test]
    fn non_machine_buildings_are_only_recorded() {
        let data = vanilla();
        let mut state = SimulationState::default();
        state.construct(&data, "burner-mining-drill").unwrap();
        assert!(state.is_placed("burner-mining-drill"));
        assert!(state.machine("burner-mining-drill").is_none());
        assert_eq!(state.mine_building("burner-mining-drill"), Some(ItemCounts::new()));
        assert_eq!(state.mine_building("burner-mining-drill"), None);
    }

    #[test]
    fn mining_returns_contents() {
        let data = vanilla();
        let mut state = SimulationState::default();
        state.construct(&data, "stone-furnace").unwrap();
        state
            .machine_mut("stone-furnace")
            .unwrap()
            .transfer_in(&data, InventorySlot::FurnaceSource, "iron-ore", 7)
            .unwrap();
        let contents = state.mine_building("stone-furnace").unwrap();
        assert_eq!(contents.get("iron-ore"), Some(&7));
        assert!(state.machine_for_role(MachineRole::Furnace).is_none());
    }

    #[test]
    fn machine_lookup_by_recipe() {
        let data = vanilla();
        let mut state = SimulationState::default();
        state.construct(&data, "stone-furnace").unwrap();
        state.construct(&data, "assembling-machine-2").unwrap();

        let plate = data.recipe("iron-plate").unwrap();
        let engine = data.recipe("engine-unit").unwrap();
        assert_eq!(state.machine_for_recipe(plate).unwrap().name(), "stone-furnace");
        assert_eq!(state.machine_for_recipe(engine).unwrap().name(), "assembling-machine-2");
    }

    #[test]
    fn productivity_from_crafting_machine() {
        let data = vanilla();
        let mut state = SimulationState::default();
        state.construct(&data, "assembling-machine-2").unwrap();
        state
            .machine_mut("assembling-machine-2")
            .unwrap()
            .transfer_in(&data, InventorySlot::AssemblingMachineModules, "productivity-module", 2)
            .unwrap();

        let gear = data.recipe("iron-gear-wheel").unwrap();
        assert!((state.productivity_bonus(gear) - 0.08).abs() < 1e-9);
        let plate = data.recipe("iron-plate").unwrap();
        assert_eq!(state.productivity_bonus(plate), 0.0);
    }
}
