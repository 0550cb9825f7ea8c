//! Serde mirror of the game's raw data dump.
//!
//! The dump is one object of keyed tables (`item`, `recipe`, `technology`,
//! ...), each mapping a prototype name to its definition. Only the fields
//! the planner reads are declared; everything else is ignored.

use serde::Deserialize;
use std::collections::BTreeMap;

// ===========================================================================
// Top level
// ===========================================================================

/// The tables of a data dump the planner understands.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawData {
    pub item: BTreeMap<String, ItemData>,
    /// Science packs and other durable items. Loaded as plain items.
    pub tool: BTreeMap<String, ItemData>,
    pub module: BTreeMap<String, ModuleData>,
    pub recipe: BTreeMap<String, RecipeData>,
    pub technology: BTreeMap<String, TechnologyData>,
    #[serde(rename = "assembling-machine")]
    pub assembling_machine: BTreeMap<String, CraftingMachineData>,
    pub furnace: BTreeMap<String, CraftingMachineData>,
    pub lab: BTreeMap<String, LabData>,
    pub boiler: BTreeMap<String, BoilerData>,
    pub character: BTreeMap<String, CharacterData>,
}

// ===========================================================================
// Energy strings
// ===========================================================================

/// An energy or power amount in joules or watts.
///
/// Accepts a bare number or a string such as `"90kW"`, `"4MJ"` or
/// `"1.8MW"`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(try_from = "EnergyRepr")]
pub struct Energy(pub f64);

#[derive(Deserialize)]
#[serde(untagged)]
enum EnergyRepr {
    Number(f64),
    Text(String),
}

impl TryFrom<EnergyRepr> for Energy {
    type Error = String;

    fn try_from(repr: EnergyRepr) -> Result<Self, Self::Error> {
        match repr {
            EnergyRepr::Number(n) => Ok(Energy(n)),
            EnergyRepr::Text(s) => parse_energy(&s).map(Energy),
        }
    }
}

/// Parse `"<number><prefix?><W|J>"` into base units.
pub fn parse_energy(text: &str) -> Result<f64, String> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_suffix('W')
        .or_else(|| trimmed.strip_suffix('J'))
        .ok_or_else(|| format!("energy '{text}' must end in W or J"))?;

    let (number, scale) = match body.chars().last() {
        Some('k') => (&body[..body.len() - 1], 1e3),
        Some('M') => (&body[..body.len() - 1], 1e6),
        Some('G') => (&body[..body.len() - 1], 1e9),
        Some('T') => (&body[..body.len() - 1], 1e12),
        _ => (body, 1.0),
    };
    let value: f64 = number
        .parse()
        .map_err(|_| format!("energy '{text}' has no valid number"))?;
    Ok(value * scale)
}

// ===========================================================================
// Items
// ===========================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ItemData {
    pub name: String,
    #[serde(default = "default_stack")]
    pub stack_size: u32,
    #[serde(default)]
    pub fuel_value: Option<Energy>,
    #[serde(default)]
    pub subgroup: String,
}

fn default_stack() -> u32 {
    50
}

// ===========================================================================
// Recipes
// ===========================================================================

/// An ingredient or product in either of the dump's encodings.
///
/// Short form is `["iron-plate", 2]`; full form is
/// `{"name": "water", "amount": 50, "type": "fluid"}`.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IngredientData {
    Short(String, u32),
    Full {
        name: String,
        #[serde(default = "default_amount")]
        amount: u32,
        #[serde(default, rename = "type")]
        kind: Option<String>,
    },
}

fn default_amount() -> u32 {
    1
}

impl IngredientData {
    pub fn name(&self) -> &str {
        match self {
            IngredientData::Short(name, _) | IngredientData::Full { name, .. } => name,
        }
    }

    pub fn amount(&self) -> u32 {
        match self {
            IngredientData::Short(_, amount) | IngredientData::Full { amount, .. } => *amount,
        }
    }

    pub fn is_fluid(&self) -> bool {
        matches!(self, IngredientData::Full { kind: Some(k), .. } if k == "fluid")
    }
}

/// Fields shared by a recipe and its `normal`/`expensive` variants.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RecipeBody {
    pub ingredients: Vec<IngredientData>,
    pub result: Option<String>,
    pub result_count: Option<u32>,
    pub results: Vec<IngredientData>,
    pub energy_required: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecipeData {
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub subgroup: String,
    #[serde(default)]
    pub ingredients: Vec<IngredientData>,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub result_count: Option<u32>,
    #[serde(default)]
    pub results: Vec<IngredientData>,
    #[serde(default)]
    pub energy_required: Option<f64>,
    #[serde(default)]
    pub normal: Option<RecipeBody>,
    #[serde(default)]
    pub expensive: Option<RecipeBody>,
}

impl RecipeData {
    /// The top-level fields, used when no `normal` variant is given.
    pub fn body(&self) -> RecipeBody {
        RecipeBody {
            ingredients: self.ingredients.clone(),
            result: self.result.clone(),
            result_count: self.result_count,
            results: self.results.clone(),
            energy_required: self.energy_required,
        }
    }
}

// ===========================================================================
// Technologies
// ===========================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct TechnologyData {
    pub name: String,
    #[serde(default)]
    pub prerequisites: Vec<String>,
    pub unit: TechUnitData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TechUnitData {
    #[serde(default)]
    pub count: u32,
    pub ingredients: Vec<IngredientData>,
    #[serde(default)]
    pub time: f64,
}

// ===========================================================================
// Modules
// ===========================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct ModuleData {
    pub name: String,
    #[serde(default = "default_stack")]
    pub stack_size: u32,
    #[serde(default)]
    pub tier: u32,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub effect: ModuleEffectData,
    #[serde(default)]
    pub limitation: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ModuleEffectData {
    pub productivity: Option<Bonus>,
    pub speed: Option<Bonus>,
    pub consumption: Option<Bonus>,
    pub pollution: Option<Bonus>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Bonus {
    #[serde(default)]
    pub bonus: f64,
}

impl ModuleEffectData {
    /// Names of the effects with a non-zero bonus.
    pub fn present(&self) -> Vec<&'static str> {
        [
            ("productivity", self.productivity),
            ("speed", self.speed),
            ("consumption", self.consumption),
            ("pollution", self.pollution),
        ]
        .into_iter()
        .filter(|(_, b)| b.is_some_and(|b| b.bonus != 0.0))
        .map(|(name, _)| name)
        .collect()
    }
}

// ===========================================================================
// Machines
// ===========================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct EnergySourceData {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub fuel_category: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ModuleSpecificationData {
    #[serde(default)]
    pub module_slots: u32,
}

/// An `assembling-machine` or `furnace` prototype.
#[derive(Debug, Clone, Deserialize)]
pub struct CraftingMachineData {
    pub name: String,
    #[serde(default)]
    pub crafting_categories: Vec<String>,
    #[serde(default = "default_speed")]
    pub crafting_speed: f64,
    pub energy_usage: Energy,
    pub energy_source: EnergySourceData,
    #[serde(default)]
    pub module_specification: Option<ModuleSpecificationData>,
    /// Absent means every effect is allowed.
    #[serde(default)]
    pub allowed_effects: Option<Vec<String>>,
}

fn default_speed() -> f64 {
    1.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct LabData {
    pub name: String,
    pub energy_usage: Energy,
    pub energy_source: EnergySourceData,
    #[serde(default)]
    pub inputs: Vec<String>,
    #[serde(default)]
    pub module_specification: Option<ModuleSpecificationData>,
    #[serde(default)]
    pub allowed_effects: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BoilerData {
    pub name: String,
    pub energy_consumption: Energy,
    pub energy_source: EnergySourceData,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CharacterData {
    #[serde(default)]
    pub crafting_categories: Vec<String>,
}

// ===========================================================================
// Tests
// ===========================================================================
