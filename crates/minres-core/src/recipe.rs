//! Recipe arithmetic: per-recipe cost, full base-resource cost, hand
//! crafting and single-stack batch sizes.

use crate::inventory::{ItemCounts, add_count, sub_count, try_add_count};
use crate::registry::{GameData, Recipe};
use crate::resolver::{ResolveError, resolve};
use crate::state::SimulationState;

/// Ingredients consumed and products made by a number of invocations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeCost {
    pub invocations: u32,
    pub ingredients: ItemCounts,
    pub products: ItemCounts,
}

/// Cost of making `amount` units of the recipe's primary product.
///
/// Products are reported against the requested amount, so a recipe that
/// makes two per invocation still reports exactly `amount` when asked for an
/// odd number.
///
/// Fails with [`CraftError::CountOverflow`] when a total does not fit in a
/// `u32`.
///
/// # Panics
///
/// Panics if `productivity_bonus` is negative.
pub fn recipe_cost(recipe: &Recipe, amount: u32, productivity_bonus: f64) -> Result<RecipeCost, CraftError> {
    assert!(productivity_bonus >= 0.0, "productivity bonus must be >= 0");

    let primary = recipe.primary_count();
    let bonus = 1.0 + productivity_bonus;
    let invocations = (f64::from(amount) / (f64::from(primary) * bonus)).ceil() as u32;

    let mut cost = RecipeCost {
        invocations,
        ..RecipeCost::default()
    };
    for i in &recipe.ingredients {
        let n = scaled(&i.name, i.amount, invocations)?;
        try_add_count(&mut cost.ingredients, &i.name, n).map_err(|_| overflow(&i.name))?;
    }
    for p in &recipe.products {
        let n = (u64::from(p.amount) * u64::from(amount)).div_ceil(u64::from(primary));
        let n = u32::try_from(n).map_err(|_| overflow(&p.name))?;
        try_add_count(&mut cost.products, &p.name, n).map_err(|_| overflow(&p.name))?;
    }
    Ok(cost)
}

/// [`recipe_cost`] for whichever recipe makes `item`. `Ok(None)` when
/// nothing makes it.
pub fn item_cost(
    data: &GameData,
    item: &str,
    amount: u32,
    productivity_bonus: f64,
) -> Result<Option<RecipeCost>, CraftError> {
    data.recipe_for(item)
        .map(|recipe| recipe_cost(recipe, amount, productivity_bonus))
        .transpose()
}

fn overflow(item: &str) -> CraftError {
    CraftError::CountOverflow { item: item.to_string() }
}

/// `per_run * runs` of `item`.
fn scaled(item: &str, per_run: u32, runs: u32) -> Result<u32, CraftError> {
    per_run.checked_mul(runs).ok_or_else(|| overflow(item))
}

/// Base resources needed for `invocations` runs of `recipe`, resolving every
/// intermediate through the dependency graph.
pub fn recipe_full_cost(
    data: &GameData,
    recipe: &Recipe,
    invocations: u32,
    state: Option<&SimulationState>,
) -> Result<RecipeCost, ResolveError> {
    let too_many = || ResolveError::AmountOverflow {
        item: recipe.name.clone(),
    };
    let mut wanted = ItemCounts::new();
    let requested = invocations.checked_mul(recipe.primary_count()).ok_or_else(too_many)?;
    add_count(&mut wanted, &recipe.name, requested);

    let mut cost = RecipeCost {
        invocations,
        ..RecipeCost::default()
    };
    for step in resolve(data, &wanted, state)? {
        if data.is_base_item(&step.name) {
            add_count(&mut cost.ingredients, &step.name, step.amount);
        }
    }
    for p in &recipe.products {
        let n = p.amount.checked_mul(invocations).ok_or_else(too_many)?;
        add_count(&mut cost.products, &p.name, n);
    }
    Ok(cost)
}

/// Craft `items` units of `recipe`'s primary product by hand, crafting
/// missing intermediates recursively. Returns the new inventory; the input
/// is untouched on error.
pub fn handcraft(
    data: &GameData,
    inventory: &ItemCounts,
    recipe: &Recipe,
    items: u32,
) -> Result<ItemCounts, CraftError> {
    let mut out = inventory.clone();
    handcraft_into(data, &mut out, recipe, items)?;
    Ok(out)
}

fn handcraft_into(
    data: &GameData,
    inventory: &mut ItemCounts,
    recipe: &Recipe,
    items: u32,
) -> Result<(), CraftError> {
    if !data.can_handcraft(recipe) {
        return Err(CraftError::CannotHandcraft {
            recipe: recipe.name.clone(),
        });
    }
    let invocations = items.div_ceil(recipe.primary_count());

    for ing in &recipe.ingredients {
        let needed = scaled(&ing.name, ing.amount, invocations)?;
        let held = inventory.get(&ing.name).copied().unwrap_or(0);
        if needed > held {
            let shortfall = needed - held;
            match data.recipe_for(&ing.name) {
                Some(sub) if data.can_handcraft(sub) => {
                    tracing::trace!(item = %ing.name, shortfall, "handcrafting intermediate");
                    handcraft_into(data, inventory, sub, shortfall)?;
                }
                _ => {
                    return Err(CraftError::MissingIngredient {
                        item: ing.name.clone(),
                        shortfall,
                    });
                }
            }
        }
        sub_count(inventory, &ing.name, needed);
    }

    for p in &recipe.products {
        let n = scaled(&p.name, p.amount, invocations)?;
        try_add_count(inventory, &p.name, n).map_err(|_| overflow(&p.name))?;
    }
    Ok(())
}

/// Invocations one stack of every solid ingredient supports without
/// overflowing one stack of the primary product. `None` if a stack size is
/// unknown.
pub fn one_stack_recipe(data: &GameData, recipe: &Recipe) -> Option<u32> {
    let mut count = u32::MAX;
    for ing in recipe.ingredients.iter().filter(|i| !i.is_fluid) {
        let stack = data.stack_size(&ing.name)?;
        count = count.min(stack / ing.amount.max(1));
    }
    let primary = recipe.primary_product()?;
    let stack = data.stack_size(&primary.name)?;
    Some(count.min(stack / recipe.primary_count()))
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CraftError {
    #[error("cannot handcraft recipe '{recipe}'")]
    CannotHandcraft { recipe: String },
    #[error("missing {shortfall} '{item}'")]
    MissingIngredient { item: String, shortfall: u32 },
    #[error("count of '{item}' does not fit in a u32")]
    CountOverflow { item: String },
}
