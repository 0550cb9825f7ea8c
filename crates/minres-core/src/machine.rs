//! Live machines: assemblers, furnaces, labs and boilers.
//!
//! A [`Machine`] owns its named inventory slots and runs crafting cycles on
//! demand. There is no clock; the verifier runs cycles until the machine
//! stalls, which models "wait long enough".

use crate::inventory::{ItemCounts, Inventory, InventoryError, add_count};
use crate::module::{ModuleError, ModuleSlots};
use crate::registry::{GameData, MachineKind, MachineRole, MachineSpec, Recipe};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ---------------------------------------------------------------------------
// Inventory slots
// ---------------------------------------------------------------------------

/// Named inventory of a machine, as the game addresses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InventorySlot {
    Fuel,
    FurnaceSource,
    FurnaceResult,
    FurnaceModules,
    AssemblingMachineInput,
    AssemblingMachineOutput,
    AssemblingMachineModules,
    LabInput,
    LabModules,
}

impl InventorySlot {
    pub const ALL: [InventorySlot; 9] = [
        InventorySlot::Fuel,
        InventorySlot::FurnaceSource,
        InventorySlot::FurnaceResult,
        InventorySlot::FurnaceModules,
        InventorySlot::AssemblingMachineInput,
        InventorySlot::AssemblingMachineOutput,
        InventorySlot::AssemblingMachineModules,
        InventorySlot::LabInput,
        InventorySlot::LabModules,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            InventorySlot::Fuel => "fuel",
            InventorySlot::FurnaceSource => "furnace_source",
            InventorySlot::FurnaceResult => "furnace_result",
            InventorySlot::FurnaceModules => "furnace_modules",
            InventorySlot::AssemblingMachineInput => "assembling_machine_input",
            InventorySlot::AssemblingMachineOutput => "assembling_machine_output",
            InventorySlot::AssemblingMachineModules => "assembling_machine_modules",
            InventorySlot::LabInput => "lab_input",
            InventorySlot::LabModules => "lab_modules",
        }
    }

    pub fn is_modules(self) -> bool {
        matches!(
            self,
            InventorySlot::FurnaceModules
                | InventorySlot::AssemblingMachineModules
                | InventorySlot::LabModules
        )
    }
}

impl fmt::Display for InventorySlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "defines.inventory.{}", self.as_str())
    }
}

impl FromStr for InventorySlot {
    type Err = String;

    /// Accepts both `fuel` and `defines.inventory.fuel`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let short = s.strip_prefix("defines.inventory.").unwrap_or(s);
        InventorySlot::ALL
            .into_iter()
            .find(|slot| slot.as_str() == short)
            .ok_or_else(|| format!("unknown inventory slot '{s}'"))
    }
}

// ---------------------------------------------------------------------------
// Crafting status
// ---------------------------------------------------------------------------

/// Why a machine cannot run another cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StallReason {
    MissingInputs,
    OutputFull,
    NoRecipe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CraftStatus {
    /// One cycle completed; another may follow.
    Running,
    Stalled(StallReason),
}

// ---------------------------------------------------------------------------
// Machine variants
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Assembler {
    pub spec: MachineSpec,
    pub recipe: Option<Recipe>,
    pub input: Inventory,
    pub output: Inventory,
    pub fuel: Option<Inventory>,
    pub modules: ModuleSlots,
    pub bonus_progress: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Furnace {
    pub spec: MachineSpec,
    pub source: Inventory,
    pub result: Inventory,
    pub fuel: Option<Inventory>,
    pub modules: ModuleSlots,
    pub bonus_progress: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lab {
    pub spec: MachineSpec,
    pub input: Inventory,
    pub modules: ModuleSlots,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Boiler {
    pub spec: MachineSpec,
    pub fuel: Inventory,
}

/// A placed machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Machine {
    Assembler(Assembler),
    Furnace(Furnace),
    Lab(Lab),
    Boiler(Boiler),
}

fn module_slots(spec: &MachineSpec) -> ModuleSlots {
    ModuleSlots::new(&spec.name, spec.module_slots, spec.allowed_modules.clone())
}

fn fuel_slot(spec: &MachineSpec) -> Option<Inventory> {
    spec.is_burner().then(|| Inventory::new(1))
}

impl Machine {
    pub fn new(spec: &MachineSpec) -> Self {
        match spec.kind {
            MachineKind::Assembler => Machine::Assembler(Assembler {
                spec: spec.clone(),
                recipe: None,
                // Unusable until a recipe sets the slot layout.
                input: Inventory::new(0),
                output: Inventory::new(0),
                fuel: fuel_slot(spec),
                modules: module_slots(spec),
                bonus_progress: 0.0,
            }),
            MachineKind::Furnace => Machine::Furnace(Furnace {
                spec: spec.clone(),
                source: Inventory::new(1),
                result: Inventory::new(1),
                fuel: fuel_slot(spec),
                modules: module_slots(spec),
                bonus_progress: 0.0,
            }),
            MachineKind::Lab => Machine::Lab(Lab {
                spec: spec.clone(),
                input: Inventory::with_whitelist(spec.inputs.len(), spec.inputs.clone()),
                modules: module_slots(spec),
            }),
            MachineKind::Boiler => Machine::Boiler(Boiler {
                spec: spec.clone(),
                fuel: Inventory::new(1),
            }),
        }
    }

    pub fn spec(&self) -> &MachineSpec {
        match self {
            Machine::Assembler(m) => &m.spec,
            Machine::Furnace(m) => &m.spec,
            Machine::Lab(m) => &m.spec,
            Machine::Boiler(m) => &m.spec,
        }
    }

    pub fn name(&self) -> &str {
        &self.spec().name
    }

    pub fn role(&self) -> MachineRole {
        self.spec().role()
    }

    pub fn crafting_speed(&self) -> f64 {
        self.spec().crafting_speed
    }

    pub fn energy_usage(&self) -> f64 {
        self.spec().energy_usage
    }

    pub fn can_craft(&self, recipe: &Recipe) -> bool {
        self.spec().can_craft(recipe)
    }

    /// Recipe an assembler is set to. Furnaces infer theirs per cycle.
    pub fn recipe(&self) -> Option<&Recipe> {
        match self {
            Machine::Assembler(m) => m.recipe.as_ref(),
            _ => None,
        }
    }

    /// Every slot this machine exposes.
    pub fn slots(&self) -> Vec<InventorySlot> {
        let mut slots = Vec::new();
        match self {
            Machine::Assembler(m) => {
                if m.fuel.is_some() {
                    slots.push(InventorySlot::Fuel);
                }
                slots.extend([
                    InventorySlot::AssemblingMachineInput,
                    InventorySlot::AssemblingMachineOutput,
                    InventorySlot::AssemblingMachineModules,
                ]);
            }
            Machine::Furnace(m) => {
                if m.fuel.is_some() {
                    slots.push(InventorySlot::Fuel);
                }
                slots.extend([
                    InventorySlot::FurnaceSource,
                    InventorySlot::FurnaceResult,
                    InventorySlot::FurnaceModules,
                ]);
            }
            Machine::Lab(_) => slots.extend([InventorySlot::LabInput, InventorySlot::LabModules]),
            Machine::Boiler(_) => slots.push(InventorySlot::Fuel),
        }
        slots
    }

    /// An item slot. Module slots are reached through [`Machine::modules`].
    pub fn inventory(&self, slot: InventorySlot) -> Option<&Inventory> {
        match (self, slot) {
            (Machine::Assembler(m), InventorySlot::Fuel) => m.fuel.as_ref(),
            (Machine::Assembler(m), InventorySlot::AssemblingMachineInput) => Some(&m.input),
            (Machine::Assembler(m), InventorySlot::AssemblingMachineOutput) => Some(&m.output),
            (Machine::Furnace(m), InventorySlot::Fuel) => m.fuel.as_ref(),
            (Machine::Furnace(m), InventorySlot::FurnaceSource) => Some(&m.source),
            (Machine::Furnace(m), InventorySlot::FurnaceResult) => Some(&m.result),
            (Machine::Lab(m), InventorySlot::LabInput) => Some(&m.input),
            (Machine::Boiler(m), InventorySlot::Fuel) => Some(&m.fuel),
            _ => None,
        }
    }

    pub fn inventory_mut(&mut self, slot: InventorySlot) -> Option<&mut Inventory> {
        match (self, slot) {
            (Machine::Assembler(m), InventorySlot::Fuel) => m.fuel.as_mut(),
            (Machine::Assembler(m), InventorySlot::AssemblingMachineInput) => Some(&mut m.input),
            (Machine::Assembler(m), InventorySlot::AssemblingMachineOutput) => Some(&mut m.output),
            (Machine::Furnace(m), InventorySlot::Fuel) => m.fuel.as_mut(),
            (Machine::Furnace(m), InventorySlot::FurnaceSource) => Some(&mut m.source),
            (Machine::Furnace(m), InventorySlot::FurnaceResult) => Some(&mut m.result),
            (Machine::Lab(m), InventorySlot::LabInput) => Some(&mut m.input),
            (Machine::Boiler(m), InventorySlot::Fuel) => Some(&mut m.fuel),
            _ => None,
        }
    }

    pub fn modules(&self) -> Option<&ModuleSlots> {
        match self {
            Machine::Assembler(m) => Some(&m.modules),
            Machine::Furnace(m) => Some(&m.modules),
            Machine::Lab(m) => Some(&m.modules),
            Machine::Boiler(_) => None,
        }
    }

    pub fn modules_mut(&mut self) -> Option<&mut ModuleSlots> {
        match self {
            Machine::Assembler(m) => Some(&mut m.modules),
            Machine::Furnace(m) => Some(&mut m.modules),
            Machine::Lab(m) => Some(&mut m.modules),
            Machine::Boiler(_) => None,
        }
    }

    fn module_slot(&self) -> Option<InventorySlot> {
        match self {
            Machine::Assembler(_) => Some(InventorySlot::AssemblingMachineModules),
            Machine::Furnace(_) => Some(InventorySlot::FurnaceModules),
            Machine::Lab(_) => Some(InventorySlot::LabModules),
            Machine::Boiler(_) => None,
        }
    }

    pub fn productivity_bonus(&self, recipe: &str) -> f64 {
        self.modules().map_or(0.0, |m| m.productivity_bonus(recipe))
    }

    /// Input and output slots of a crafting machine.
    pub fn io_slots(&self) -> Option<(InventorySlot, InventorySlot)> {
        match self {
            Machine::Assembler(_) => Some((
                InventorySlot::AssemblingMachineInput,
                InventorySlot::AssemblingMachineOutput,
            )),
            Machine::Furnace(_) => Some((InventorySlot::FurnaceSource, InventorySlot::FurnaceResult)),
            Machine::Lab(_) | Machine::Boiler(_) => None,
        }
    }

    /// Fraction of the next bonus unit already accumulated.
    pub fn bonus_progress(&self) -> f64 {
        match self {
            Machine::Assembler(m) => m.bonus_progress,
            Machine::Furnace(m) => m.bonus_progress,
            Machine::Lab(_) | Machine::Boiler(_) => 0.0,
        }
    }

    /// Point an assembler at `recipe`. Returns whatever the input and output
    /// slots held before, or `None` if this machine cannot run the recipe.
    pub fn set_recipe(&mut self, recipe: &Recipe) -> Option<ItemCounts> {
        let Machine::Assembler(m) = self else {
            return None;
        };
        if !m.spec.can_craft(recipe) {
            return None;
        }

        let mut previous = m.input.drain();
        for (item, n) in m.output.drain() {
            add_count(&mut previous, &item, n);
        }

        let inputs: Vec<String> = recipe
            .ingredients
            .iter()
            .filter(|i| !i.is_fluid)
            .map(|i| i.name.clone())
            .collect();
        let outputs: Vec<String> = recipe
            .products
            .iter()
            .filter(|p| !p.is_fluid)
            .map(|p| p.name.clone())
            .collect();
        m.input.reconfigure(inputs.len(), inputs);
        m.output.reconfigure(outputs.len(), outputs);
        m.recipe = Some(recipe.clone());
        m.bonus_progress = 0.0;
        Some(previous)
    }

    /// Insert items (or modules) into a slot.
    pub fn transfer_in(
        &mut self,
        data: &GameData,
        slot: InventorySlot,
        item: &str,
        amount: u32,
    ) -> Result<(), TransferError> {
        if slot.is_modules() && self.module_slot() == Some(slot) {
            if let Some(modules) = self.modules_mut() {
                return Ok(modules.put(data, item, amount)?);
            }
        }
        let machine = self.name().to_string();
        let inv = self
            .inventory_mut(slot)
            .ok_or(TransferError::SlotNotFound { machine, slot })?;
        Ok(inv.put(data, item, amount)?)
    }

    /// Remove items (or modules) from a slot.
    pub fn transfer_out(
        &mut self,
        slot: InventorySlot,
        item: &str,
        amount: u32,
    ) -> Result<(), TransferError> {
        if slot.is_modules() && self.module_slot() == Some(slot) {
            if let Some(modules) = self.modules_mut() {
                return Ok(modules.take(item, amount)?);
            }
        }
        let machine = self.name().to_string();
        let inv = self
            .inventory_mut(slot)
            .ok_or(TransferError::SlotNotFound { machine, slot })?;
        Ok(inv.take(item, amount)?)
    }

    /// Empty every slot, modules included. Used when a machine is picked up.
    pub fn drain_all(&mut self) -> ItemCounts {
        let mut out = ItemCounts::new();
        for slot in self.slots() {
            if let Some(inv) = self.inventory_mut(slot) {
                for (item, n) in inv.drain() {
                    add_count(&mut out, &item, n);
                }
            }
        }
        if let Some(modules) = self.modules_mut() {
            for (item, n) in modules.drain() {
                add_count(&mut out, &item, n);
            }
        }
        out
    }

    /// Run one crafting cycle if inputs and output space allow it.
    pub fn craft_cycle(&mut self, data: &GameData) -> CraftStatus {
        match self {
            Machine::Assembler(m) => {
                let Some(recipe) = m.recipe.as_ref() else {
                    return CraftStatus::Stalled(StallReason::NoRecipe);
                };
                let bonus = m.modules.productivity_bonus(&recipe.name);
                run_cycle(data, recipe, &mut m.input, &mut m.output, bonus, &mut m.bonus_progress)
            }
            Machine::Furnace(m) => {
                let Some(ore) = m.source.contents().keys().next() else {
                    return CraftStatus::Stalled(StallReason::MissingInputs);
                };
                let Some(recipe) = data.smelting_recipe_for(ore) else {
                    return CraftStatus::Stalled(StallReason::NoRecipe);
                };
                if !m.spec.can_craft(recipe) {
                    return CraftStatus::Stalled(StallReason::NoRecipe);
                }
                let bonus = m.modules.productivity_bonus(&recipe.name);
                run_cycle(data, recipe, &mut m.source, &mut m.result, bonus, &mut m.bonus_progress)
            }
            Machine::Lab(_) | Machine::Boiler(_) => CraftStatus::Stalled(StallReason::NoRecipe),
        }
    }
}

/// Consume one invocation of `recipe` from `input` and deliver its products
/// to `output`. Fluids are not tracked.
///
/// When `bonus_progress` crosses 1 the cycle is a bonus cycle and delivers
/// the full product list twice, as the game does: one extra invocation's
/// output, so two cables rather than one for the cable recipe.
fn run_cycle(
    data: &GameData,
    recipe: &Recipe,
    input: &mut Inventory,
    output: &mut Inventory,
    bonus: f64,
    bonus_progress: &mut f64,
) -> CraftStatus {
    let ingredients = recipe.ingredients.iter().filter(|i| !i.is_fluid);
    if ingredients.clone().any(|i| input.count(&i.name) < i.amount) {
        return CraftStatus::Stalled(StallReason::MissingInputs);
    }

    let extra = if *bonus_progress + bonus >= 1.0 { 2 } else { 1 };
    let products: Vec<(&str, u32)> = recipe
        .products
        .iter()
        .filter(|p| !p.is_fluid)
        .map(|p| (p.name.as_str(), p.amount * extra))
        .collect();
    if !output.can_accept(data, &products) {
        return CraftStatus::Stalled(StallReason::OutputFull);
    }

    for i in ingredients {
        // Counts were checked above.
        if input.take(&i.name, i.amount).is_err() {
            return CraftStatus::Stalled(StallReason::MissingInputs);
        }
    }
    *bonus_progress += bonus;
    if *bonus_progress >= 1.0 {
        *bonus_progress -= 1.0;
    }
    for (item, n) in products {
        if output.put(data, item, n).is_err() {
            return CraftStatus::Stalled(StallReason::OutputFull);
        }
    }
    tracing::trace!(recipe = %recipe.name, bonus_progress = *bonus_progress, "craft cycle");
    CraftStatus::Running
}

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("machine '{machine}' has no {slot} inventory")]
    SlotNotFound { machine: String, slot: InventorySlot },
    #[error(transparent)]
    Inventory(#[from] InventoryError),
    #[error(transparent)]
    Module(#[from] ModuleError),
}
