//! Immutable game data: items, recipes, technologies, modules and machines.
//!
//! Follows a register -> mutate -> build lifecycle. [`GameDataBuilder::build`]
//! resolves normal/expensive recipe variants once, normalizes products and
//! indexes recipes by product and by smelted ore. The resulting [`GameData`]
//! is never mutated afterwards and every lookup is a pure function.

use crate::config::PlannerConfig;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

/// Crafting time used when a recipe does not declare one.
pub const DEFAULT_CRAFTING_TIME: f64 = 0.5;

/// Recipe category run by furnaces.
pub const SMELTING_CATEGORY: &str = "smelting";

// ---------------------------------------------------------------------------
// Recipes
// ---------------------------------------------------------------------------

/// One ingredient of a recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub amount: u32,
    #[serde(default)]
    pub is_fluid: bool,
}

impl Ingredient {
    pub fn item(name: &str, amount: u32) -> Self {
        Self {
            name: name.to_string(),
            amount,
            is_fluid: false,
        }
    }

    pub fn fluid(name: &str, amount: u32) -> Self {
        Self {
            name: name.to_string(),
            amount,
            is_fluid: true,
        }
    }
}

/// One product of a recipe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    pub amount: u32,
    #[serde(default)]
    pub is_fluid: bool,
}

impl Product {
    pub fn item(name: &str, amount: u32) -> Self {
        Self {
            name: name.to_string(),
            amount,
            is_fluid: false,
        }
    }

    pub fn fluid(name: &str, amount: u32) -> Self {
        Self {
            name: name.to_string(),
            amount,
            is_fluid: true,
        }
    }
}

/// The ingredient/product half of a recipe. Raw data may carry a normal and
/// an expensive variant of the same recipe.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeVariant {
    pub ingredients: Vec<Ingredient>,
    pub products: Vec<Product>,
    /// Seconds. `None` falls back to [`DEFAULT_CRAFTING_TIME`].
    pub crafting_time: Option<f64>,
}

/// A recipe as registered, before the variant is chosen.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeDef {
    pub name: String,
    /// Empty string means "hand-craftable anywhere".
    pub category: String,
    pub subgroup: String,
    pub normal: RecipeVariant,
    pub expensive: Option<RecipeVariant>,
}

impl RecipeDef {
    pub fn new(name: &str, category: &str, variant: RecipeVariant) -> Self {
        Self {
            name: name.to_string(),
            category: category.to_string(),
            subgroup: String::new(),
            normal: variant,
            expensive: None,
        }
    }
}

/// A resolved recipe.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Recipe {
    pub name: String,
    pub category: String,
    pub subgroup: String,
    pub crafting_time: f64,
    pub ingredients: Vec<Ingredient>,
    pub products: Vec<Product>,
}

impl Recipe {
    /// How many of `item` one invocation produces. Zero if it is not a product.
    pub fn product_count(&self, item: &str) -> u32 {
        self.products
            .iter()
            .find(|p| p.name == item)
            .map_or(0, |p| p.amount)
    }

    /// How many of `item` one invocation consumes.
    pub fn ingredient_amount(&self, item: &str) -> u32 {
        self.ingredients
            .iter()
            .find(|i| i.name == item)
            .map_or(0, |i| i.amount)
    }

    /// The product named after the recipe, or the first declared product.
    pub fn primary_product(&self) -> Option<&Product> {
        self.products
            .iter()
            .find(|p| p.name == self.name)
            .or_else(|| self.products.first())
    }

    /// Units of the primary product per invocation (at least 1).
    pub fn primary_count(&self) -> u32 {
        self.primary_product().map_or(1, |p| p.amount.max(1))
    }
}

// ---------------------------------------------------------------------------
// Items, technologies, modules
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub name: String,
    pub stack_size: u32,
    /// Joules released when burned. Zero for non-fuel items.
    #[serde(default)]
    pub fuel_value: f64,
    #[serde(default)]
    pub subgroup: String,
}

impl Item {
    pub fn new(name: &str, stack_size: u32) -> Self {
        Self {
            name: name.to_string(),
            stack_size,
            fuel_value: 0.0,
            subgroup: String::new(),
        }
    }

    pub fn fuel(name: &str, stack_size: u32, fuel_value: f64) -> Self {
        Self {
            fuel_value,
            ..Self::new(name, stack_size)
        }
    }
}

/// Research cost of a technology: every ingredient is consumed `count` times.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TechUnit {
    pub count: u32,
    pub ingredients: Vec<Ingredient>,
    /// Seconds per unit.
    pub time: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Technology {
    pub name: String,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    pub unit: TechUnit,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleEffect {
    pub productivity: f64,
    pub speed: f64,
    pub consumption: f64,
    pub pollution: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Module {
    pub name: String,
    pub tier: u32,
    pub category: String,
    pub effect: ModuleEffect,
    limitation: HashSet<String>,
}

impl Module {
    pub fn new(name: &str, tier: u32, category: &str, effect: ModuleEffect) -> Self {
        Self {
            name: name.to_string(),
            tier,
            category: category.to_string(),
            effect,
            limitation: HashSet::new(),
        }
    }

    /// Restrict the module to the given recipe names.
    pub fn limited_to<I, S>(mut self, recipes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.limitation = recipes.into_iter().map(Into::into).collect();
        self
    }

    /// Whether the module's effect applies to `recipe`. An unrestricted
    /// module applies everywhere.
    pub fn applies_to(&self, recipe: &str) -> bool {
        self.limitation.is_empty() || self.limitation.contains(recipe)
    }

    pub fn productivity_bonus(&self) -> f64 {
        self.effect.productivity
    }
}

// ---------------------------------------------------------------------------
// Machines
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FuelCategory {
    Chemical,
    Nuclear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergySource {
    Burner { fuel_category: FuelCategory },
    Electric,
    Void,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MachineKind {
    Assembler,
    Furnace,
    Lab,
    Boiler,
}

/// The simulation tracks at most one live machine per role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MachineRole {
    Furnace,
    Assembler,
    ChemicalPlant,
    Refinery,
    Lab,
    Boiler,
}

impl MachineRole {
    /// Order in which crafting roles are consulted for a recipe.
    pub const CRAFTING: [MachineRole; 4] = [
        MachineRole::Furnace,
        MachineRole::Assembler,
        MachineRole::ChemicalPlant,
        MachineRole::Refinery,
    ];
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineSpec {
    pub name: String,
    pub kind: MachineKind,
    #[serde(default)]
    pub crafting_categories: Vec<String>,
    #[serde(default = "default_speed")]
    pub crafting_speed: f64,
    /// Watts.
    pub energy_usage: f64,
    pub energy_source: EnergySource,
    #[serde(default)]
    pub module_slots: u32,
    /// Module names the machine accepts. Empty accepts any module.
    #[serde(default)]
    pub allowed_modules: Vec<String>,
    /// Science packs a lab accepts.
    #[serde(default)]
    pub inputs: Vec<String>,
}

fn default_speed() -> f64 {
    1.0
}

impl MachineSpec {
    pub fn new(name: &str, kind: MachineKind, energy_usage: f64, energy_source: EnergySource) -> Self {
        Self {
            name: name.to_string(),
            kind,
            crafting_categories: Vec::new(),
            crafting_speed: 1.0,
            energy_usage,
            energy_source,
            module_slots: 0,
            allowed_modules: Vec::new(),
            inputs: Vec::new(),
        }
    }

    pub fn role(&self) -> MachineRole {
        match self.kind {
            MachineKind::Furnace => MachineRole::Furnace,
            MachineKind::Lab => MachineRole::Lab,
            MachineKind::Boiler => MachineRole::Boiler,
            MachineKind::Assembler => {
                if self.crafting_categories.iter().any(|c| c == "oil-processing") {
                    MachineRole::Refinery
                } else if self.crafting_categories.iter().any(|c| c == "chemistry") {
                    MachineRole::ChemicalPlant
                } else {
                    MachineRole::Assembler
                }
            }
        }
    }

    /// Assemblers also run uncategorized recipes; furnaces only their own.
    pub fn can_craft(&self, recipe: &Recipe) -> bool {
        match self.kind {
            MachineKind::Assembler => {
                recipe.category.is_empty()
                    || self.crafting_categories.iter().any(|c| *c == recipe.category)
            }
            MachineKind::Furnace => self.crafting_categories.iter().any(|c| *c == recipe.category),
            MachineKind::Lab | MachineKind::Boiler => false,
        }
    }

    pub fn is_burner(&self) -> bool {
        matches!(
            self.energy_source,
            EnergySource::Burner {
                fuel_category: FuelCategory::Chemical
            }
        )
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Builder for an immutable [`GameData`].
#[derive(Debug)]
pub struct GameDataBuilder {
    use_expensive: bool,
    base_items: BTreeSet<String>,
    minable_resources: BTreeSet<String>,
    handcraft_categories: Vec<String>,
    items: HashMap<String, Item>,
    recipes: BTreeMap<String, RecipeDef>,
    technologies: HashMap<String, Technology>,
    modules: HashMap<String, Module>,
    machines: HashMap<String, MachineSpec>,
}

impl GameDataBuilder {
    pub fn new(config: &PlannerConfig) -> Self {
        Self {
            use_expensive: config.use_expensive,
            base_items: config.base_items.clone(),
            minable_resources: config.minable_resources.clone(),
            handcraft_categories: vec!["crafting".to_string()],
            items: HashMap::new(),
            recipes: BTreeMap::new(),
            technologies: HashMap::new(),
            modules: HashMap::new(),
            machines: HashMap::new(),
        }
    }

    /// Categories the player character can craft by hand, besides `""`.
    pub fn handcraft_categories<I, S>(&mut self, categories: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.handcraft_categories = categories.into_iter().map(Into::into).collect();
        self
    }

    pub fn register_item(&mut self, item: Item) -> Result<(), RegistryError> {
        insert_unique(&mut self.items, item.name.clone(), item, "item")
    }

    pub fn register_recipe(&mut self, recipe: RecipeDef) -> Result<(), RegistryError> {
        if self.recipes.contains_key(&recipe.name) {
            return Err(RegistryError::DuplicateName {
                kind: "recipe",
                name: recipe.name,
            });
        }
        self.recipes.insert(recipe.name.clone(), recipe);
        Ok(())
    }

    pub fn register_technology(&mut self, tech: Technology) -> Result<(), RegistryError> {
        insert_unique(&mut self.technologies, tech.name.clone(), tech, "technology")
    }

    pub fn register_module(&mut self, module: Module) -> Result<(), RegistryError> {
        insert_unique(&mut self.modules, module.name.clone(), module, "module")
    }

    pub fn register_machine(&mut self, spec: MachineSpec) -> Result<(), RegistryError> {
        insert_unique(&mut self.machines, spec.name.clone(), spec, "machine")
    }

    /// Mutate a registered recipe by name.
    pub fn mutate_recipe<F>(&mut self, name: &str, f: F) -> Result<(), RegistryError>
    where
        F: FnOnce(&mut RecipeDef),
    {
        let recipe = self
            .recipes
            .get_mut(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;
        f(recipe);
        Ok(())
    }

    /// Resolve variants, validate, and freeze.
    pub fn build(self) -> Result<GameData, RegistryError> {
        let mut recipes = HashMap::with_capacity(self.recipes.len());
        let mut by_product: HashMap<String, String> = HashMap::new();
        let mut smelting: HashMap<String, String> = HashMap::new();

        // BTreeMap iteration keeps the product index deterministic: the
        // alphabetically first recipe wins when several produce an item.
        for (name, def) in self.recipes {
            let variant = match def.expensive {
                Some(expensive) if self.use_expensive => expensive,
                _ => def.normal,
            };
            if variant.products.is_empty() {
                return Err(RegistryError::NoProducts(name));
            }
            let products = variant
                .products
                .into_iter()
                .map(|p| Product {
                    amount: p.amount.max(1),
                    ..p
                })
                .collect::<Vec<_>>();

            let recipe = Recipe {
                name: name.clone(),
                category: def.category,
                subgroup: def.subgroup,
                crafting_time: variant.crafting_time.unwrap_or(DEFAULT_CRAFTING_TIME),
                ingredients: variant.ingredients,
                products,
            };

            // Barrel recipes fill and empty containers in a loop.
            if !recipe.subgroup.ends_with("-barrel") {
                for p in &recipe.products {
                    by_product.entry(p.name.clone()).or_insert_with(|| name.clone());
                }
                if recipe.category == SMELTING_CATEGORY && recipe.ingredients.len() == 1 {
                    smelting
                        .entry(recipe.ingredients[0].name.clone())
                        .or_insert_with(|| name.clone());
                }
            }
            recipes.insert(name, recipe);
        }

        // A recipe named after an item is the canonical way to make it.
        for recipe in recipes.values() {
            if !recipe.subgroup.ends_with("-barrel") && recipe.product_count(&recipe.name) > 0 {
                by_product.insert(recipe.name.clone(), recipe.name.clone());
            }
        }

        for tech in self.technologies.values() {
            for prereq in &tech.prerequisites {
                if !self.technologies.contains_key(prereq) {
                    return Err(RegistryError::UnknownPrerequisite {
                        tech: tech.name.clone(),
                        prerequisite: prereq.clone(),
                    });
                }
            }
        }

        Ok(GameData {
            handcraft_categories: self.handcraft_categories,
            base_items: self.base_items,
            minable_resources: self.minable_resources,
            items: self.items,
            recipes,
            by_product,
            smelting,
            technologies: self.technologies,
            modules: self.modules,
            machines: self.machines,
        })
    }
}

fn insert_unique<V>(
    map: &mut HashMap<String, V>,
    name: String,
    value: V,
    kind: &'static str,
) -> Result<(), RegistryError> {
    if map.contains_key(&name) {
        return Err(RegistryError::DuplicateName { kind, name });
    }
    map.insert(name, value);
    Ok(())
}

// ---------------------------------------------------------------------------
// GameData
// ---------------------------------------------------------------------------

/// Immutable game data. Frozen after [`GameDataBuilder::build`].
#[derive(Debug, Clone)]
pub struct GameData {
    handcraft_categories: Vec<String>,
    base_items: BTreeSet<String>,
    minable_resources: BTreeSet<String>,
    items: HashMap<String, Item>,
    recipes: HashMap<String, Recipe>,
    by_product: HashMap<String, String>,
    smelting: HashMap<String, String>,
    technologies: HashMap<String, Technology>,
    modules: HashMap<String, Module>,
    machines: HashMap<String, MachineSpec>,
}

impl GameData {
    pub fn item(&self, name: &str) -> Option<&Item> {
        self.items.get(name)
    }

    pub fn stack_size(&self, name: &str) -> Option<u32> {
        self.items.get(name).map(|i| i.stack_size)
    }

    /// Recipe by its own name.
    pub fn recipe(&self, name: &str) -> Option<&Recipe> {
        self.recipes.get(name)
    }

    /// The recipe used to make `item`.
    pub fn recipe_for(&self, item: &str) -> Option<&Recipe> {
        self.by_product
            .get(item)
            .and_then(|name| self.recipes.get(name))
    }

    /// The single-ingredient smelting recipe that consumes `ore`.
    pub fn smelting_recipe_for(&self, ore: &str) -> Option<&Recipe> {
        self.smelting.get(ore).and_then(|name| self.recipes.get(name))
    }

    pub fn technology(&self, name: &str) -> Option<&Technology> {
        self.technologies.get(name)
    }

    pub fn module(&self, name: &str) -> Option<&Module> {
        self.modules.get(name)
    }

    pub fn machine(&self, name: &str) -> Option<&MachineSpec> {
        self.machines.get(name)
    }

    pub fn can_handcraft(&self, recipe: &Recipe) -> bool {
        recipe.category.is_empty() || self.handcraft_categories.contains(&recipe.category)
    }

    /// Base items are terminal: mined, or too ambiguous to expand.
    pub fn is_base_item(&self, name: &str) -> bool {
        self.base_items.contains(name)
    }

    /// Items with a resource patch that the player can mine directly.
    pub fn is_minable(&self, name: &str) -> bool {
        self.minable_resources.contains(name)
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn recipe_count(&self) -> usize {
        self.recipes.len()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("duplicate {kind} name '{name}'")]
    DuplicateName { kind: &'static str, name: String },
    #[error("recipe '{0}' has no products")]
    NoProducts(String),
    #[error("technology '{tech}' requires unknown technology '{prerequisite}'")]
    UnknownPrerequisite { tech: String, prerequisite: String },
}
