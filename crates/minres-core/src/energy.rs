//! Energy and fuel accounting for burner machines, labs and boilers.
//!
//! Fuel amounts are fractional. Callers that turn them into mining tasks
//! round up and carry the unused remainder into the next batch.

use crate::registry::{EnergySource, FuelCategory, Item, MachineSpec, Recipe, Technology};

/// Rounding slack when fractional fuel is turned into whole items.
const FUEL_EPSILON: f64 = 1e-9;

/// Whole fuel items needed to release `energy` joules.
pub fn fuel_cost(fuel_value: f64, energy: f64) -> u32 {
    fuel_to_load(energy / fuel_value, &mut 0.0)
}

/// Whole fuel items to load so that `carry` plus the load covers `needed`.
/// `carry` is the unburned fraction already in the machine and is updated
/// to what remains after `needed` burns.
pub fn fuel_to_load(needed: f64, carry: &mut f64) -> u32 {
    let to_add = (needed - *carry - FUEL_EPSILON).max(0.0).ceil();
    *carry += to_add - needed;
    to_add as u32
}

/// Joules one invocation of `recipe` costs in `machine`.
pub fn energy_per_invocation(machine: &MachineSpec, recipe: &Recipe) -> f64 {
    recipe.crafting_time / machine.crafting_speed * machine.energy_usage
}

/// Fuel burned by `count` invocations. Zero for machines that do not burn
/// chemical fuel.
pub fn fuel_from_recipes(machine: &MachineSpec, recipe: &Recipe, fuel: &Item, count: u32) -> f64 {
    let EnergySource::Burner {
        fuel_category: FuelCategory::Chemical,
    } = machine.energy_source
    else {
        return 0.0;
    };
    f64::from(count) * energy_per_invocation(machine, recipe) / fuel.fuel_value
}

/// Invocations that `amount` of `fuel` can power.
pub fn recipes_from_fuel(machine: &MachineSpec, recipe: &Recipe, fuel: &Item, amount: f64) -> f64 {
    fuel.fuel_value * amount / energy_per_invocation(machine, recipe)
}

/// Joules a lab draws while researching `tech`.
pub fn tech_energy_cost(lab: &MachineSpec, tech: &Technology) -> f64 {
    tech.unit.time * f64::from(tech.unit.count) * lab.energy_usage
}

/// Fuel a boiler burns to produce `energy` joules. Boiler efficiency is
/// taken as 1.
pub fn boiler_fuel_cost(fuel: &Item, energy: f64) -> f64 {
    energy / fuel.fuel_value
}
