//! Planner configuration: which recipe variant to use, the starting state,
//! and which items the resolver treats as terminal.

use crate::inventory::ItemCounts;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Items never expanded by the resolver. Ores and fluids are mined or
/// pumped; the oil products have several competing recipes.
pub const VANILLA_BASE_ITEMS: [&str; 14] = [
    "water",
    "crude-oil",
    "stone",
    "iron-ore",
    "copper-ore",
    "coal",
    "uranium-ore",
    "wood",
    "heavy-oil",
    "light-oil",
    "petroleum-gas",
    "solid-fuel",
    "uranium-235",
    "uranium-238",
];

/// Resources with a patch on the map.
pub const VANILLA_MINABLE: [&str; 5] = ["coal", "copper-ore", "iron-ore", "stone", "uranium-ore"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Resolve recipes to their expensive variant when one exists.
    pub use_expensive: bool,
    /// Item burned in boilers and burner machines.
    pub preferred_fuel: String,
    pub starting_inventory: ItemCounts,
    pub base_items: BTreeSet<String>,
    pub minable_resources: BTreeSet<String>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        let starting_inventory = [
            ("stone-furnace", 1),
            ("burner-mining-drill", 1),
            ("wood", 1),
            ("iron-plate", 8),
        ]
        .into_iter()
        .map(|(name, n)| (name.to_string(), n))
        .collect();

        Self {
            use_expensive: false,
            preferred_fuel: "coal".to_string(),
            starting_inventory,
            base_items: VANILLA_BASE_ITEMS.iter().map(|s| s.to_string()).collect(),
            minable_resources: VANILLA_MINABLE.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_starting_inventory() {
        let config = PlannerConfig::default();
        assert_eq!(config.starting_inventory.get("iron-plate"), Some(&8));
        assert_eq!(config.starting_inventory.len(), 4);
        assert_eq!(config.preferred_fuel, "coal");
    }

    #[test]
    fn minable_resources_are_base_items() {
        let config = PlannerConfig::default();
        for resource in &config.minable_resources {
            assert!(config.base_items.contains(resource), "{resource}");
        }
    }
}
