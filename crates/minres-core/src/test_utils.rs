//! Shared test fixtures for unit tests, integration tests, and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]`. The data is a
//! small slice of the vanilla game with the real numbers: enough to plan
//! the first furnaces, assemblers, a lab and the first science packs.

use crate::config::PlannerConfig;
use crate::registry::*;

// ===========================================================================
// Constructors
// ===========================================================================

pub fn ingredients(pairs: &[(&str, u32)]) -> Vec<Ingredient> {
    pairs.iter().map(|(n, a)| Ingredient::item(n, *a)).collect()
}

pub fn products(pairs: &[(&str, u32)]) -> Vec<Product> {
    pairs.iter().map(|(n, a)| Product::item(n, *a)).collect()
}

pub fn make_recipe(
    name: &str,
    category: &str,
    crafting_time: f64,
    inputs: &[(&str, u32)],
    outputs: &[(&str, u32)],
) -> RecipeDef {
    RecipeDef::new(
        name,
        category,
        RecipeVariant {
            ingredients: ingredients(inputs),
            products: products(outputs),
            crafting_time: Some(crafting_time),
        },
    )
}

pub fn make_tech(name: &str, prerequisites: &[&str], count: u32, time: f64) -> Technology {
    Technology {
        name: name.to_string(),
        prerequisites: prerequisites.iter().map(|p| p.to_string()).collect(),
        unit: TechUnit {
            count,
            ingredients: ingredients(&[("automation-science-pack", 1)]),
            time,
        },
    }
}

fn burner() -> EnergySource {
    EnergySource::Burner {
        fuel_category: FuelCategory::Chemical,
    }
}

// ===========================================================================
// Vanilla slice
// ===========================================================================

const STACK_50: &[&str] = &[
    "iron-ore",
    "copper-ore",
    "stone",
    "inserter",
    "stone-furnace",
    "burner-mining-drill",
    "assembling-machine-1",
    "assembling-machine-2",
    "boiler",
    "engine-unit",
    "productivity-module",
    "productivity-module-2",
];

const STACK_100: &[&str] = &[
    "iron-plate",
    "copper-plate",
    "steel-plate",
    "stone-brick",
    "iron-gear-wheel",
    "pipe",
    "transport-belt",
];

const STACK_200: &[&str] = &[
    "copper-cable",
    "electronic-circuit",
    "automation-science-pack",
    "logistic-science-pack",
];

const INTERMEDIATES: &[&str] = &[
    "iron-plate",
    "copper-plate",
    "steel-plate",
    "copper-cable",
    "iron-gear-wheel",
    "electronic-circuit",
    "engine-unit",
];

fn register_items(b: &mut GameDataBuilder) {
    for (names, stack) in [(STACK_50, 50), (STACK_100, 100), (STACK_200, 200)] {
        for name in names {
            b.register_item(Item::new(name, stack)).unwrap();
        }
    }
    b.register_item(Item::fuel("coal", 50, 4_000_000.0)).unwrap();
    b.register_item(Item::fuel("wood", 100, 2_000_000.0)).unwrap();
    b.register_item(Item::new("lab", 10)).unwrap();
}

fn register_recipes(b: &mut GameDataBuilder) {
    let recipes = [
        make_recipe("iron-plate", "smelting", 3.2, &[("iron-ore", 1)], &[("iron-plate", 1)]),
        make_recipe("copper-plate", "smelting", 3.2, &[("copper-ore", 1)], &[("copper-plate", 1)]),
        make_recipe("steel-plate", "smelting", 16.0, &[("iron-plate", 5)], &[("steel-plate", 1)]),
        make_recipe("stone-brick", "smelting", 3.2, &[("stone", 2)], &[("stone-brick", 1)]),
        make_recipe("copper-cable", "crafting", 0.5, &[("copper-plate", 1)], &[("copper-cable", 2)]),
        make_recipe("iron-gear-wheel", "crafting", 0.5, &[("iron-plate", 2)], &[("iron-gear-wheel", 1)]),
        make_recipe("pipe", "crafting", 0.5, &[("iron-plate", 1)], &[("pipe", 1)]),
        make_recipe(
            "electronic-circuit",
            "crafting",
            0.5,
            &[("iron-plate", 1), ("copper-cable", 3)],
            &[("electronic-circuit", 1)],
        ),
        make_recipe(
            "engine-unit",
            "advanced-crafting",
            10.0,
            &[("steel-plate", 1), ("iron-gear-wheel", 1), ("pipe", 2)],
            &[("engine-unit", 1)],
        ),
        make_recipe(
            "automation-science-pack",
            "crafting",
            5.0,
            &[("copper-plate", 1), ("iron-gear-wheel", 1)],
            &[("automation-science-pack", 1)],
        ),
        make_recipe(
            "logistic-science-pack",
            "crafting",
            6.0,
            &[("inserter", 1), ("transport-belt", 1)],
            &[("logistic-science-pack", 1)],
        ),
        make_recipe(
            "inserter",
            "crafting",
            0.5,
            &[("electronic-circuit", 1), ("iron-gear-wheel", 1), ("iron-plate", 1)],
            &[("inserter", 1)],
        ),
        make_recipe(
            "transport-belt",
            "crafting",
            0.5,
            &[("iron-plate", 1), ("iron-gear-wheel", 1)],
            &[("transport-belt", 2)],
        ),
        make_recipe("stone-furnace", "crafting", 0.5, &[("stone", 5)], &[("stone-furnace", 1)]),
        make_recipe(
            "burner-mining-drill",
            "crafting",
            2.0,
            &[("iron-gear-wheel", 3), ("stone-furnace", 1), ("iron-plate", 3)],
            &[("burner-mining-drill", 1)],
        ),
        make_recipe(
            "assembling-machine-1",
            "crafting",
            0.5,
            &[("electronic-circuit", 3), ("iron-gear-wheel", 5), ("iron-plate", 9)],
            &[("assembling-machine-1", 1)],
        ),
        make_recipe(
            "assembling-machine-2",
            "crafting",
            0.5,
            &[
                ("steel-plate", 2),
                ("electronic-circuit", 3),
                ("iron-gear-wheel", 5),
                ("assembling-machine-1", 1),
            ],
            &[("assembling-machine-2", 1)],
        ),
        make_recipe(
            "lab",
            "crafting",
            2.0,
            &[("electronic-circuit", 10), ("iron-gear-wheel", 10), ("transport-belt", 4)],
            &[("lab", 1)],
        ),
        make_recipe(
            "boiler",
            "crafting",
            0.5,
            &[("stone-furnace", 1), ("pipe", 4)],
            &[("boiler", 1)],
        ),
    ];
    for recipe in recipes {
        b.register_recipe(recipe).unwrap();
    }
}

fn register_technologies(b: &mut GameDataBuilder) {
    let techs = [
        make_tech("automation", &[], 10, 10.0),
        make_tech("electronics", &["automation"], 30, 15.0),
        make_tech("logistics", &["automation"], 30, 15.0),
        make_tech("fast-inserter", &["electronics", "logistics"], 20, 15.0),
        make_tech("logistic-science-pack", &[], 75, 5.0),
    ];
    for tech in techs {
        b.register_technology(tech).unwrap();
    }
}

fn register_machines(b: &mut GameDataBuilder) {
    let crafting: Vec<String> = ["crafting", "basic-crafting", "advanced-crafting"]
        .iter()
        .map(|c| c.to_string())
        .collect();

    let mut furnace = MachineSpec::new("stone-furnace", MachineKind::Furnace, 90_000.0, burner());
    furnace.crafting_categories = vec!["smelting".to_string()];

    let mut am1 = MachineSpec::new(
        "assembling-machine-1",
        MachineKind::Assembler,
        75_000.0,
        EnergySource::Electric,
    );
    am1.crafting_categories = crafting.clone();
    am1.crafting_speed = 0.5;

    let mut am2 = MachineSpec::new(
        "assembling-machine-2",
        MachineKind::Assembler,
        150_000.0,
        EnergySource::Electric,
    );
    am2.crafting_categories = crafting;
    am2.crafting_speed = 0.75;
    am2.module_slots = 2;

    let mut lab = MachineSpec::new("lab", MachineKind::Lab, 60_000.0, EnergySource::Electric);
    lab.module_slots = 2;
    lab.inputs = vec![
        "automation-science-pack".to_string(),
        "logistic-science-pack".to_string(),
    ];

    let boiler = MachineSpec::new("boiler", MachineKind::Boiler, 1_800_000.0, burner());

    for spec in [furnace, am1, am2, lab, boiler] {
        b.register_machine(spec).unwrap();
    }
}

fn register_modules(b: &mut GameDataBuilder) {
    for (name, tier, bonus) in [("productivity-module", 1, 0.04), ("productivity-module-2", 2, 0.06)] {
        let effect = ModuleEffect {
            productivity: bonus,
            speed: -0.05 * f64::from(tier),
            consumption: 0.4 * f64::from(tier),
            pollution: 0.05 * f64::from(tier),
        };
        let module = Module::new(name, tier, "productivity", effect).limited_to(INTERMEDIATES.iter().copied());
        b.register_module(module).unwrap();
    }
}

/// Builder loaded with the vanilla slice, for tests that add to it.
pub fn vanilla_builder(config: &PlannerConfig) -> GameDataBuilder {
    let mut b = GameDataBuilder::new(config);
    register_items(&mut b);
    register_recipes(&mut b);
    register_technologies(&mut b);
    register_machines(&mut b);
    register_modules(&mut b);
    b
}

/// The vanilla slice with the default configuration.
pub fn vanilla() -> GameData {
    vanilla_builder(&PlannerConfig::default()).build().unwrap()
}
