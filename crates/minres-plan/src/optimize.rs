//! Two-pass plan optimizer.
//!
//! Pass 1 ([`reduce_quantities`]) walks the tree in execution order against a
//! simulated inventory. Items already held shrink the tasks that would make
//! them, and the ingredients those tasks no longer need are taken back out
//! of the earlier tasks that produced them. Research that is already done
//! is blanked.
//!
//! Pass 2 ([`concretize`]) turns every remaining abstract craft into
//! executable steps: a hand craft, or a machine run of set-recipe, fuel,
//! put, wait and take tasks in stack-sized batches.
//!
//! Both passes are followed by [`Task::prune`].

use std::collections::BTreeMap;

use minres_core::config::PlannerConfig;
use minres_core::energy::{boiler_fuel_cost, fuel_from_recipes, fuel_to_load, tech_energy_cost};
use minres_core::inventory::{ItemCounts, add_count, sub_count};
use minres_core::machine::{Machine, TransferError};
use minres_core::recipe::{CraftError, one_stack_recipe, recipe_cost};
use minres_core::registry::{GameData, Item, MachineRole, Recipe};
use minres_core::state::{SimulationState, StateError};
use minres_core::tech::tech_cost;
use tracing::{debug, trace};

use crate::smelt::fuel_machine;
use crate::task::{MineTarget, Task, TaskKind};

#[derive(Debug, thiserror::Error)]
pub enum OptimizeError {
    #[error("no recipe makes '{item}'")]
    UnknownRecipe { item: String },
    #[error("no placed machine can craft '{item}' (category '{category}')")]
    NoMachine { item: String, category: String },
    #[error("recipe '{recipe}' does not fit in one stack")]
    EmptyBatch { recipe: String },
    #[error("unknown item '{item}'")]
    UnknownItem { item: String },
    #[error("unknown technology '{tech}'")]
    UnknownTechnology { tech: String },
    #[error("machine '{machine}' does not craft")]
    NotCrafting { machine: String },
    #[error("'{entity}' is not placed")]
    MachineNotPlaced { entity: String },
    #[error(transparent)]
    Build(#[from] StateError),
    #[error(transparent)]
    Cost(#[from] CraftError),
    #[error("transfer into '{entity}' failed")]
    Transfer {
        entity: String,
        #[source]
        source: TransferError,
    },
}

/// Run both passes over a copy of `root`, starting from `initial`.
pub fn optimize(
    data: &GameData,
    config: &PlannerConfig,
    root: &Task,
    initial: &SimulationState,
) -> Result<Task, OptimizeError> {
    let mut plan = root.clone();
    let before = plan.task_count();

    reduce_quantities(data, &mut plan, &mut initial.clone())?;
    plan.prune();
    concretize(data, config, &mut plan, &mut initial.clone())?;
    plan.prune();

    debug!(before, after = plan.task_count(), "plan optimized");
    Ok(plan)
}

// ===========================================================================
// Pass 1
// ===========================================================================

/// Shrink crafts and mines by what `state` already holds. Amounts that
/// drop to zero are left for [`Task::prune`].
pub fn reduce_quantities(
    data: &GameData,
    root: &mut Task,
    state: &mut SimulationState,
) -> Result<(), OptimizeError> {
    let mut path = Vec::new();
    reduce_at(data, root, &mut path, state)
}

fn node_mut<'a>(root: &'a mut Task, path: &[usize]) -> &'a mut Task {
    path.iter().fold(root, |task, &i| &mut task.prerequisites[i])
}

fn held(state: &SimulationState, item: &str) -> u32 {
    state.inventory.get(item).copied().unwrap_or(0)
}

fn reduce_at(
    data: &GameData,
    root: &mut Task,
    path: &mut Vec<usize>,
    state: &mut SimulationState,
) -> Result<(), OptimizeError> {
    let kind = node_mut(root, path).kind.clone();

    if let TaskKind::Research { tech } = &kind {
        if tech.is_empty() {
            return Ok(());
        }
        if state.is_researched(tech) {
            trace!(tech = %tech, "already researched");
            if let TaskKind::Research { tech } = &mut node_mut(root, path).kind {
                tech.clear();
            }
            return Ok(());
        }
    }

    let children = node_mut(root, path).prerequisites.len();
    for i in 0..children {
        path.push(i);
        reduce_at(data, root, path, state)?;
        path.pop();
    }

    match kind {
        TaskKind::Research { tech } => {
            for (pack, n) in tech_cost(data, &tech).unwrap_or_default() {
                sub_count(&mut state.inventory, &pack, n);
            }
            state.researched.insert(tech);
        }
        TaskKind::Mine {
            target: MineTarget::Resource(resource),
            amount,
        } => {
            let amount = amount.saturating_sub(held(state, &resource));
            set_amount(node_mut(root, path), amount);
            add_count(&mut state.inventory, &resource, amount);
        }
        TaskKind::Mine {
            target: MineTarget::Entity(entity),
            ..
        } => {
            if let Some(contents) = state.mine_building(&entity) {
                for (item, n) in contents {
                    add_count(&mut state.inventory, &item, n);
                }
            }
            add_count(&mut state.inventory, &entity, 1);
        }
        TaskKind::Build { entity } => {
            sub_count(&mut state.inventory, &entity, 1);
            state.construct(data, &entity)?;
        }
        TaskKind::Put {
            entity,
            slot,
            item,
            amount,
        } => {
            if slot.is_modules() {
                with_machine(state, &entity, |m| m.transfer_in(data, slot, &item, amount))?;
            }
            sub_count(&mut state.inventory, &item, amount);
        }
        TaskKind::Take {
            entity,
            slot,
            item,
            amount,
        } => {
            if slot.is_modules() {
                with_machine(state, &entity, |m| m.transfer_out(slot, &item, amount))?;
            }
            add_count(&mut state.inventory, &item, amount);
        }
        TaskKind::Craft { item, amount } => {
            let recipe = data
                .recipe_for(&item)
                .ok_or_else(|| OptimizeError::UnknownRecipe { item: item.clone() })?;
            let bonus = state.productivity_bonus(recipe);

            let mut amount = amount;
            let have = held(state, &item);
            if have > 0 && amount > 0 {
                let reduced = amount.saturating_sub(have);
                let mut freed = ingredient_difference(recipe, amount, reduced, bonus)?;
                trace!(item = %item, from = amount, to = reduced, "craft reduced by inventory");
                set_amount(node_mut(root, path), reduced);
                absorb_before(data, root, path, &mut freed, state)?;
                amount = reduced;
            }

            let cost = recipe_cost(recipe, amount, bonus)?;
            for (ing, n) in &cost.ingredients {
                sub_count(&mut state.inventory, ing, *n);
            }
            for (product, n) in &cost.products {
                add_count(&mut state.inventory, product, *n);
            }
        }
        _ => {}
    }
    Ok(())
}

fn set_amount(task: &mut Task, value: u32) {
    if let TaskKind::Craft { amount, .. } | TaskKind::Mine { amount, .. } = &mut task.kind {
        *amount = value;
    }
}

fn with_machine<F>(state: &mut SimulationState, entity: &str, f: F) -> Result<(), OptimizeError>
where
    F: FnOnce(&mut Machine) -> Result<(), TransferError>,
{
    let machine = state
        .machine_mut(entity)
        .ok_or_else(|| OptimizeError::MachineNotPlaced {
            entity: entity.to_string(),
        })?;
    f(machine).map_err(|source| OptimizeError::Transfer {
        entity: entity.to_string(),
        source,
    })
}

/// Ingredients `from` items of `recipe` consume beyond what `to` items do.
fn ingredient_difference(recipe: &Recipe, from: u32, to: u32, bonus: f64) -> Result<ItemCounts, CraftError> {
    let mut diff = recipe_cost(recipe, from, bonus)?.ingredients;
    for (item, n) in recipe_cost(recipe, to, bonus)?.ingredients {
        sub_count(&mut diff, &item, n);
    }
    Ok(diff)
}

/// Take `excess` back out of the tasks that ran before the one at `path`,
/// latest first: its own prerequisites, then the earlier siblings of each
/// ancestor from the innermost outwards.
fn absorb_before(
    data: &GameData,
    root: &mut Task,
    path: &[usize],
    excess: &mut ItemCounts,
    state: &mut SimulationState,
) -> Result<(), CraftError> {
    for child in node_mut(root, path).prerequisites.iter_mut().rev() {
        if excess.is_empty() {
            return Ok(());
        }
        absorb_subtree(data, child, excess, state)?;
    }
    for depth in (0..path.len()).rev() {
        let index = path[depth];
        let parent = node_mut(root, &path[..depth]);
        for sibling in parent.prerequisites[..index].iter_mut().rev() {
            if excess.is_empty() {
                return Ok(());
            }
            absorb_subtree(data, sibling, excess, state)?;
        }
    }
    Ok(())
}

/// Reverse execution order within one subtree: the task itself ran last.
fn absorb_subtree(
    data: &GameData,
    task: &mut Task,
    excess: &mut ItemCounts,
    state: &mut SimulationState,
) -> Result<(), CraftError> {
    if matches!(&task.kind, TaskKind::Research { tech } if tech.is_empty()) {
        return Ok(());
    }
    absorb_into(data, task, excess, state)?;
    for child in task.prerequisites.iter_mut().rev() {
        if excess.is_empty() {
            return Ok(());
        }
        absorb_subtree(data, child, excess, state)?;
    }
    Ok(())
}

fn absorb_into(
    data: &GameData,
    task: &mut Task,
    excess: &mut ItemCounts,
    state: &mut SimulationState,
) -> Result<(), CraftError> {
    match &mut task.kind {
        TaskKind::Craft { item, amount } => {
            let Some(&want) = excess.get(item.as_str()) else {
                return Ok(());
            };
            let Some(recipe) = data.recipe_for(item) else {
                return Ok(());
            };
            let bonus = state.productivity_bonus(recipe);
            let cut = want.min(*amount);
            let freed = ingredient_difference(recipe, *amount, *amount - cut, bonus)?;

            *amount -= cut;
            sub_count(excess, item, cut);
            sub_count(&mut state.inventory, item, cut);
            for (ing, n) in freed {
                add_count(&mut state.inventory, &ing, n);
                add_count(excess, &ing, n);
            }
        }
        TaskKind::Mine {
            target: MineTarget::Resource(resource),
            amount,
        } => {
            let Some(&want) = excess.get(resource.as_str()) else {
                return Ok(());
            };
            let cut = want.min(*amount);
            *amount -= cut;
            sub_count(excess, resource, cut);
            sub_count(&mut state.inventory, resource, cut);
        }
        _ => {}
    }
    Ok(())
}

// ===========================================================================
// Pass 2
// ===========================================================================

/// Replace abstract crafts with hand crafts or machine runs, and fuel the
/// boiler for research.
pub fn concretize(
    data: &GameData,
    config: &PlannerConfig,
    root: &mut Task,
    state: &mut SimulationState,
) -> Result<(), OptimizeError> {
    let fuel = data
        .item(&config.preferred_fuel)
        .ok_or_else(|| OptimizeError::UnknownItem {
            item: config.preferred_fuel.clone(),
        })?;
    let mut pass = Concretize {
        data,
        fuel,
        state,
        fuel_carry: BTreeMap::new(),
        progress: BTreeMap::new(),
    };
    pass.visit(root)
}

struct Concretize<'a> {
    data: &'a GameData,
    fuel: &'a Item,
    state: &'a mut SimulationState,
    /// Fuel already loaded but not yet burned, per machine.
    fuel_carry: BTreeMap<String, f64>,
    /// Productivity bonus progress, per machine.
    progress: BTreeMap<String, f64>,
}

impl Concretize<'_> {
    fn visit(&mut self, task: &mut Task) -> Result<(), OptimizeError> {
        for child in &mut task.prerequisites {
            self.visit(child)?;
        }

        let data = self.data;
        match task.kind.clone() {
            TaskKind::Craft { item, amount } if amount > 0 => self.craft(task, &item, amount)?,
            TaskKind::Mine {
                target: MineTarget::Entity(entity),
                ..
            } => {
                self.state.mine_building(&entity);
                self.fuel_carry.remove(&entity);
                self.progress.remove(&entity);
            }
            TaskKind::Build { entity } => self.state.construct(data, &entity)?,
            TaskKind::SetRecipe { entity, recipe } => {
                let recipe = data
                    .recipe(&recipe)
                    .ok_or_else(|| OptimizeError::UnknownRecipe { item: recipe.clone() })?;
                if let Some(machine) = self.state.machine_mut(&entity) {
                    machine.set_recipe(recipe);
                }
                self.progress.insert(entity, 0.0);
            }
            TaskKind::Put {
                entity,
                slot,
                item,
                amount,
            } if slot.is_modules() => {
                with_machine(self.state, &entity, |m| m.transfer_in(data, slot, &item, amount))?;
            }
            TaskKind::Take {
                entity,
                slot,
                item,
                amount,
            } if slot.is_modules() => {
                with_machine(self.state, &entity, |m| m.transfer_out(slot, &item, amount))?;
            }
            TaskKind::Research { tech } if !tech.is_empty() => self.power_research(task, &tech)?,
            _ => {}
        }
        Ok(())
    }

    fn craft(&mut self, task: &mut Task, item: &str, amount: u32) -> Result<(), OptimizeError> {
        let data = self.data;
        let recipe = data
            .recipe_for(item)
            .ok_or_else(|| OptimizeError::UnknownRecipe { item: item.to_string() })?;
        let per_run = recipe.primary_count();

        if data.can_handcraft(recipe) {
            task.kind = TaskKind::Handcraft {
                recipe: recipe.name.clone(),
                count: amount.div_ceil(per_run),
            };
            return Ok(());
        }

        let machine = self
            .state
            .machine_for_recipe(recipe)
            .ok_or_else(|| OptimizeError::NoMachine {
                item: item.to_string(),
                category: recipe.category.clone(),
            })?;
        let name = machine.name().to_string();
        let (input, output) = machine
            .io_slots()
            .ok_or_else(|| OptimizeError::NotCrafting { machine: name.clone() })?;
        let spec = machine.spec().clone();
        let bonus = machine.productivity_bonus(&recipe.name);
        let start_progress = machine.bonus_progress();
        let needs_recipe = matches!(machine, Machine::Assembler(_))
            && machine.recipe().map(|r| r.name.as_str()) != Some(recipe.name.as_str());

        let batch_max = one_stack_recipe(data, recipe)
            .filter(|&n| n > 0)
            .ok_or_else(|| OptimizeError::EmptyBatch {
                recipe: recipe.name.clone(),
            })?;
        let primary = recipe.primary_product().ok_or_else(|| OptimizeError::EmptyBatch {
            recipe: recipe.name.clone(),
        })?;
        let stack = data.stack_size(&primary.name).unwrap_or(u32::MAX);

        let mut steps = Vec::new();
        if needs_recipe {
            steps.push(Task::set_recipe(&name, &recipe.name));
            if let Some(m) = self.state.machine_mut(&name) {
                m.set_recipe(recipe);
            }
            self.progress.insert(name.clone(), 0.0);
        }

        let mut progress = *self.progress.entry(name.clone()).or_insert(start_progress);
        let mut remaining = amount;
        while remaining > 0 {
            let mut runs = 0;
            let mut made = 0;
            while made < remaining && runs < batch_max {
                let doubled = progress + bonus >= 1.0;
                let yielded = if doubled { 2 * per_run } else { per_run };
                if runs > 0 && made + yielded > stack {
                    break;
                }
                progress = if doubled { progress + bonus - 1.0 } else { progress + bonus };
                made += yielded;
                runs += 1;
            }

            if spec.is_burner() {
                let needed = fuel_from_recipes(&spec, recipe, self.fuel, runs);
                let carry = self.fuel_carry.entry(name.clone()).or_insert(0.0);
                let to_add = fuel_to_load(needed, carry);
                if to_add > 0 {
                    steps.extend(fuel_machine(data, &self.fuel.name, &name, to_add));
                }
            }
            for ing in recipe.ingredients.iter().filter(|i| !i.is_fluid) {
                steps.push(Task::put(&name, input, &ing.name, ing.amount * runs));
            }
            steps.push(Task::wait(&name, output, &primary.name, made));
            steps.push(Task::take(&name, output, &primary.name, made));

            trace!(machine = %name, recipe = %recipe.name, runs, made, "batch");
            remaining = remaining.saturating_sub(made);
        }
        self.progress.insert(name, progress);

        task.kind = TaskKind::Meta;
        task.prerequisites.extend(steps);
        Ok(())
    }

    /// Load the boiler with the fuel the lab burns researching `tech`.
    fn power_research(&mut self, task: &mut Task, tech: &str) -> Result<(), OptimizeError> {
        let (Some(boiler), Some(lab)) = (
            self.state.machine_for_role(MachineRole::Boiler),
            self.state.machine_for_role(MachineRole::Lab),
        ) else {
            return Ok(());
        };
        let def = self
            .data
            .technology(tech)
            .ok_or_else(|| OptimizeError::UnknownTechnology { tech: tech.to_string() })?;

        let needed = boiler_fuel_cost(self.fuel, tech_energy_cost(lab.spec(), def));
        let boiler = boiler.name().to_string();
        let carry = self.fuel_carry.entry(boiler.clone()).or_insert(0.0);
        let to_add = fuel_to_load(needed, carry);

        if to_add > 0 {
            debug!(tech, boiler = %boiler, fuel = to_add, "fueling research");
            for step in fuel_machine(self.data, &self.fuel.name, &boiler, to_add) {
                task.add_prerequisite(step);
            }
        }
        Ok(())
    }
}

// ===========================================================================
// Tests
// ===========================================================================
