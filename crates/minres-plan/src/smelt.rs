//! Task generators for machine crafting and smelting runs.
//!
//! Each generator returns the tasks in execution order plus a fuel figure,
//! so callers can chain runs on the same machine and carry the fractional
//! fuel remainder between them.

use minres_core::energy::{fuel_from_recipes, fuel_to_load, recipes_from_fuel};
use minres_core::machine::{InventorySlot, Machine};
use minres_core::registry::{GameData, Item, Recipe};

use crate::optimize::OptimizeError;
use crate::task::Task;

fn io_slots(machine: &Machine) -> Result<(InventorySlot, InventorySlot), OptimizeError> {
    machine.io_slots().ok_or_else(|| OptimizeError::NotCrafting {
        machine: machine.name().to_string(),
    })
}

/// Run `invocations` of `recipe` on `machine`: set the recipe on
/// assemblers, load the solid ingredients, then wait for and collect every
/// solid product. Returns the tasks and the fuel the run burns.
pub fn machine_craft(
    recipe: &Recipe,
    machine: &Machine,
    invocations: u32,
    fuel: &Item,
) -> Result<(Vec<Task>, f64), OptimizeError> {
    let (input, output) = io_slots(machine)?;
    let name = machine.name();
    let mut tasks = Vec::new();

    if matches!(machine, Machine::Assembler(_)) {
        tasks.push(Task::set_recipe(name, &recipe.name));
    }
    for ing in recipe.ingredients.iter().filter(|i| !i.is_fluid) {
        tasks.push(Task::put(name, input, &ing.name, ing.amount * invocations));
    }
    for p in recipe.products.iter().filter(|p| !p.is_fluid) {
        let amount = p.amount * invocations;
        tasks.push(Task::wait(name, output, &p.name, amount));
        tasks.push(Task::take(name, output, &p.name, amount));
    }

    let used = fuel_from_recipes(machine.spec(), recipe, fuel, invocations);
    Ok((tasks, used))
}

/// Smelt `amount` of `ore` one stack at a time, mining the next stack while
/// the current one smelts. Ores that cannot be mined (iron plates for
/// steel) are assumed to be in the inventory already. Returns the tasks and
/// the fuel the whole run burns.
pub fn mine_and_smelt(
    data: &GameData,
    ore: &str,
    machine: &Machine,
    amount: u32,
    fuel: &Item,
) -> Result<(Vec<Task>, f64), OptimizeError> {
    let recipe = data
        .smelting_recipe_for(ore)
        .ok_or_else(|| OptimizeError::UnknownRecipe {
            item: ore.to_string(),
        })?;
    let batch_size = data.stack_size(ore).ok_or_else(|| OptimizeError::UnknownItem {
        item: ore.to_string(),
    })?;
    let (input, output) = io_slots(machine)?;
    let name = machine.name();

    let ore_per_run = recipe.ingredient_amount(ore).max(1);
    let product = recipe.primary_product().ok_or_else(|| OptimizeError::EmptyBatch {
        recipe: recipe.name.clone(),
    })?;
    let should_mine = data.is_minable(ore);

    let mut tasks = Vec::new();
    let mut remaining = amount;
    let mut batch = remaining.min(batch_size);
    if should_mine && batch > 0 {
        tasks.push(Task::mine(data, ore, batch));
    }

    while remaining > 0 {
        tasks.push(Task::put(name, input, ore, batch));

        remaining -= batch;
        let next = remaining.min(batch_size);
        if should_mine && next > 0 {
            tasks.push(Task::mine(data, ore, next));
        }

        // Stone bricks take two stone each.
        let made = batch / ore_per_run * product.amount;
        tasks.push(Task::wait(name, output, &product.name, made));
        tasks.push(Task::take(name, output, &product.name, made));

        batch = next;
    }

    let runs = amount / ore_per_run;
    let used = fuel_from_recipes(machine.spec(), recipe, fuel, runs);
    Ok((tasks, used))
}

/// Like [`mine_and_smelt`], but also mines and loads the fuel, in chunks of
/// as much ore as one stack of fuel can smelt. `extra_fuel` is fuel already
/// in the machine; the return value is what is left over afterwards.
pub fn mine_fuel_and_smelt(
    data: &GameData,
    ore: &str,
    fuel: &Item,
    machine: &Machine,
    amount: u32,
    extra_fuel: f64,
) -> Result<(Vec<Task>, f64), OptimizeError> {
    let recipe = data
        .smelting_recipe_for(ore)
        .ok_or_else(|| OptimizeError::UnknownRecipe {
            item: ore.to_string(),
        })?;
    let ore_per_run = recipe.ingredient_amount(ore).max(1);
    let runs_per_stack =
        recipes_from_fuel(machine.spec(), recipe, fuel, f64::from(fuel.stack_size)).floor() as u32;
    let chunk = (runs_per_stack * ore_per_run).max(ore_per_run);

    let mut tasks = Vec::new();
    let mut extra = extra_fuel;
    let mut remaining = amount;

    while remaining > 0 {
        let ore_now = remaining.min(chunk);
        let needed = fuel_from_recipes(machine.spec(), recipe, fuel, ore_now / ore_per_run);
        let mined = fuel_to_load(needed, &mut extra);
        if mined > 0 {
            tasks.extend(fuel_machine(data, &fuel.name, machine.name(), mined));
        }
        let (smelt, _) = mine_and_smelt(data, ore, machine, ore_now, fuel)?;
        tasks.extend(smelt);
        remaining -= ore_now;
    }
    Ok((tasks, extra))
}

/// Mine `amount` fuel and load it into `entity`.
pub fn fuel_machine(data: &GameData, fuel: &str, entity: &str, amount: u32) -> Vec<Task> {
    vec![
        Task::mine(data, fuel, amount),
        Task::put(entity, InventorySlot::Fuel, fuel, amount),
    ]
}
