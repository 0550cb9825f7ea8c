//! Loading pipeline: reads data files, converts the raw dump into registry
//! types, and freezes the result into a [`GameData`].
//!
//! Provides format detection (RON/JSON/TOML), file discovery, and
//! deserialization helpers shared by game data and planner configuration.

use minres_core::config::PlannerConfig;
use minres_core::registry::{
    EnergySource, FuelCategory, GameData, GameDataBuilder, Ingredient, Item, MachineKind,
    MachineSpec, Module, ModuleEffect, Product, RecipeDef, RecipeVariant, RegistryError,
    TechUnit, Technology,
};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::schema::{
    EnergySourceData, IngredientData, ModuleData, ModuleSpecificationData, RawData, RecipeBody,
};

/// Base name looked up when a directory is given instead of a file.
pub const DATA_FILE: &str = "data-raw";

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// A required data file was not found in the given directory.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: String, dir: PathBuf },

    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// An entry parsed but cannot be turned into a registry value.
    #[error("invalid {kind} '{name}': {detail}")]
    InvalidEntry {
        kind: &'static str,
        name: String,
        detail: String,
    },

    /// The converted data was rejected by the registry.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Scan a directory for a data file with the given base name (without extension).
///
/// Returns `Ok(None)` if no file is found, or `Err(ConflictingFormats)` if
/// multiple formats exist for the same base name.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let mut found: Option<PathBuf> = None;

    for ext in ["ron", "toml", "json"] {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if candidate.exists() {
            if let Some(ref existing) = found {
                return Err(DataLoadError::ConflictingFormats {
                    a: existing.clone(),
                    b: candidate,
                });
            }
            found = Some(candidate);
        }
    }

    Ok(found)
}

/// Like [`find_data_file`], but returns an error if no file is found.
pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: base_name.to_string(),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

/// Read a file and deserialize it according to its format (detected from extension).
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;
    deserialize_str(&content, format).map_err(|detail| DataLoadError::Parse {
        file: path.to_path_buf(),
        detail,
    })
}

fn deserialize_str<T: DeserializeOwned>(content: &str, format: Format) -> Result<T, String> {
    match format {
        Format::Ron => ron::from_str(content).map_err(|e| e.to_string()),
        Format::Json => serde_json::from_str(content).map_err(|e| e.to_string()),
        Format::Toml => toml::from_str(content).map_err(|e| e.to_string()),
    }
}

// ===========================================================================
// Entry points
// ===========================================================================

/// Load a data dump from a file, or from `data-raw.{ron,toml,json}` inside
/// a directory.
pub fn load_game_data(path: &Path, config: &PlannerConfig) -> Result<GameData, DataLoadError> {
    let file = if path.is_dir() {
        require_data_file(path, DATA_FILE)?
    } else {
        path.to_path_buf()
    };
    debug!(file = %file.display(), "loading game data");
    let raw: RawData = deserialize_file(&file)?;
    build_game_data(raw, config)
}

/// Parse a JSON data dump held in memory.
pub fn parse_game_data_json(json: &str, config: &PlannerConfig) -> Result<GameData, DataLoadError> {
    let raw: RawData = serde_json::from_str(json).map_err(|e| DataLoadError::Parse {
        file: PathBuf::from("<memory>"),
        detail: e.to_string(),
    })?;
    build_game_data(raw, config)
}

/// Load a [`PlannerConfig`]. Missing fields take their vanilla defaults.
pub fn load_config(path: &Path) -> Result<PlannerConfig, DataLoadError> {
    let config: PlannerConfig = deserialize_file(path)?;
    debug!(
        file = %path.display(),
        expensive = config.use_expensive,
        fuel = %config.preferred_fuel,
        "loaded planner config"
    );
    Ok(config)
}

// ===========================================================================
// Conversion
// ===========================================================================

/// Convert a parsed dump into an immutable registry.
pub fn build_game_data(raw: RawData, config: &PlannerConfig) -> Result<GameData, DataLoadError> {
    let mut builder = GameDataBuilder::new(config);

    if let Some(character) = raw.character.values().next() {
        if !character.crafting_categories.is_empty() {
            builder.handcraft_categories(character.crafting_categories.iter().cloned());
        }
    }

    for data in raw.item.into_values().chain(raw.tool.into_values()) {
        let mut item = Item::new(&data.name, data.stack_size);
        item.fuel_value = data.fuel_value.map_or(0.0, |e| e.0);
        item.subgroup = data.subgroup;
        builder.register_item(item)?;
    }

    for data in raw.module.values() {
        builder.register_item(Item::new(&data.name, data.stack_size))?;
        builder.register_module(convert_module(data))?;
    }

    for (_, data) in raw.recipe {
        let normal = data.normal.clone().unwrap_or_else(|| data.body());
        let mut def = RecipeDef::new(&data.name, &data.category, convert_variant(&data.name, normal)?);
        def.subgroup = data.subgroup;
        def.expensive = match data.expensive {
            Some(body) => Some(convert_variant(&data.name, body)?),
            None => None,
        };
        builder.register_recipe(def)?;
    }

    for (_, data) in raw.technology {
        builder.register_technology(Technology {
            name: data.name,
            prerequisites: data.prerequisites,
            unit: TechUnit {
                count: data.unit.count,
                ingredients: data.unit.ingredients.iter().map(convert_ingredient).collect(),
                time: data.unit.time,
            },
        })?;
    }

    let modules: Vec<&ModuleData> = raw.module.values().collect();

    for (_, data) in raw.furnace {
        let mut spec = MachineSpec::new(
            &data.name,
            MachineKind::Furnace,
            data.energy_usage.0,
            convert_energy_source(&data.name, &data.energy_source)?,
        );
        spec.crafting_categories = data.crafting_categories;
        spec.crafting_speed = data.crafting_speed;
        apply_modules(&mut spec, data.module_specification, data.allowed_effects, &modules);
        builder.register_machine(spec)?;
    }

    for (_, data) in raw.assembling_machine {
        let mut spec = MachineSpec::new(
            &data.name,
            MachineKind::Assembler,
            data.energy_usage.0,
            convert_energy_source(&data.name, &data.energy_source)?,
        );
        spec.crafting_categories = data.crafting_categories;
        spec.crafting_speed = data.crafting_speed;
        apply_modules(&mut spec, data.module_specification, data.allowed_effects, &modules);
        builder.register_machine(spec)?;
    }

    for (_, data) in raw.lab {
        let mut spec = MachineSpec::new(
            &data.name,
            MachineKind::Lab,
            data.energy_usage.0,
            convert_energy_source(&data.name, &data.energy_source)?,
        );
        spec.inputs = data.inputs;
        apply_modules(&mut spec, data.module_specification, data.allowed_effects, &modules);
        builder.register_machine(spec)?;
    }

    for (_, data) in raw.boiler {
        let spec = MachineSpec::new(
            &data.name,
            MachineKind::Boiler,
            data.energy_consumption.0,
            convert_energy_source(&data.name, &data.energy_source)?,
        );
        builder.register_machine(spec)?;
    }

    let data = builder.build()?;
    debug!(
        items = data.item_count(),
        recipes = data.recipe_count(),
        "game data built"
    );
    Ok(data)
}

fn convert_ingredient(data: &IngredientData) -> Ingredient {
    if data.is_fluid() {
        Ingredient::fluid(data.name(), data.amount())
    } else {
        Ingredient::item(data.name(), data.amount())
    }
}

fn convert_product(data: &IngredientData) -> Product {
    if data.is_fluid() {
        Product::fluid(data.name(), data.amount())
    } else {
        Product::item(data.name(), data.amount())
    }
}

/// `results` wins over `result`/`result_count`.
fn convert_variant(recipe: &str, body: RecipeBody) -> Result<RecipeVariant, DataLoadError> {
    let products = if !body.results.is_empty() {
        body.results.iter().map(convert_product).collect()
    } else if let Some(result) = &body.result {
        vec![Product::item(result, body.result_count.unwrap_or(1))]
    } else {
        return Err(DataLoadError::InvalidEntry {
            kind: "recipe",
            name: recipe.to_string(),
            detail: "neither `result` nor `results` is set".to_string(),
        });
    };
    Ok(RecipeVariant {
        ingredients: body.ingredients.iter().map(convert_ingredient).collect(),
        products,
        crafting_time: body.energy_required,
    })
}

fn convert_module(data: &ModuleData) -> Module {
    let bonus = |b: Option<crate::schema::Bonus>| b.map_or(0.0, |b| b.bonus);
    let effect = ModuleEffect {
        productivity: bonus(data.effect.productivity),
        speed: bonus(data.effect.speed),
        consumption: bonus(data.effect.consumption),
        pollution: bonus(data.effect.pollution),
    };
    Module::new(&data.name, data.tier, &data.category, effect)
        .limited_to(data.limitation.iter().cloned())
}

fn convert_energy_source(
    machine: &str,
    source: &EnergySourceData,
) -> Result<EnergySource, DataLoadError> {
    match source.kind.as_str() {
        "electric" => Ok(EnergySource::Electric),
        "void" => Ok(EnergySource::Void),
        "burner" => {
            let fuel_category = match source.fuel_category.as_deref() {
                None | Some("chemical") => FuelCategory::Chemical,
                Some("nuclear") => FuelCategory::Nuclear,
                Some(other) => {
                    return Err(DataLoadError::InvalidEntry {
                        kind: "machine",
                        name: machine.to_string(),
                        detail: format!("unknown fuel category '{other}'"),
                    });
                }
            };
            Ok(EnergySource::Burner { fuel_category })
        }
        other => Err(DataLoadError::InvalidEntry {
            kind: "machine",
            name: machine.to_string(),
            detail: format!("unknown energy source '{other}'"),
        }),
    }
}

/// A module fits a machine when every effect it has is allowed there.
fn apply_modules(
    spec: &mut MachineSpec,
    slots: Option<ModuleSpecificationData>,
    allowed_effects: Option<Vec<String>>,
    modules: &[&ModuleData],
) {
    spec.module_slots = slots.map_or(0, |s| s.module_slots);
    let Some(effects) = allowed_effects else {
        return;
    };
    spec.allowed_modules = modules
        .iter()
        .filter(|m| m.effect.present().iter().all(|e| effects.iter().any(|a| a == e)))
        .map(|m| m.name.clone())
        .collect();
    // An empty list would accept anything.
    if spec.allowed_modules.is_empty() {
        spec.module_slots = 0;
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use minres_core::registry::MachineRole;
    use std::fs;

    /// Create a temporary directory with a unique name for test isolation.
    fn make_test_dir(suffix: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "minres_data_test_{suffix}_{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    /// Clean up a test directory.
    fn cleanup(dir: &Path) {
        let _ = fs::remove_dir_all(dir);
    }

    const DUMP: &str = r#"{
        "character": {"character": {"crafting_categories": ["crafting"]}},
        "item": {
            "iron-ore": {"name": "iron-ore", "stack_size": 50},
            "iron-plate": {"name": "iron-plate", "stack_size": 100},
            "iron-gear-wheel": {"name": "iron-gear-wheel", "stack_size": 100},
            "coal": {"name": "coal", "stack_size": 50, "fuel_value": "4MJ"},
            "empty-barrel": {"name": "empty-barrel", "stack_size": 10},
            "stone-furnace": {"name": "stone-furnace", "stack_size": 50},
            "assembling-machine-2": {"name": "assembling-machine-2", "stack_size": 50},
            "lab": {"name": "lab", "stack_size": 10},
            "boiler": {"name": "boiler", "stack_size": 50}
        },
        "tool": {
            "automation-science-pack": {"name": "automation-science-pack", "stack_size": 200}
        },
        "module": {
            "productivity-module": {
                "name": "productivity-module", "tier": 1, "category": "productivity",
                "effect": {"productivity": {"bonus": 0.04}, "consumption": {"bonus": 0.4}},
                "limitation": ["iron-gear-wheel"]
            },
            "speed-module": {
                "name": "speed-module", "tier": 1, "category": "speed",
                "effect": {"speed": {"bonus": 0.2}, "consumption": {"bonus": 0.5}}
            }
        },
        "recipe": {
            "iron-plate": {
                "name": "iron-plate", "category": "smelting", "energy_required": 3.2,
                "ingredients": [["iron-ore", 1]], "result": "iron-plate"
            },
            "iron-gear-wheel": {
                "name": "iron-gear-wheel",
                "normal": {"ingredients": [["iron-plate", 2]], "result": "iron-gear-wheel"},
                "expensive": {"ingredients": [["iron-plate", 4]], "result": "iron-gear-wheel"}
            },
            "fill-water-barrel": {
                "name": "fill-water-barrel", "category": "crafting-with-fluid",
                "subgroup": "fill-barrel",
                "ingredients": [{"name": "water", "amount": 50, "type": "fluid"}, ["empty-barrel", 1]],
                "results": [{"name": "water-barrel", "amount": 1}]
            },
            "automation-science-pack": {
                "name": "automation-science-pack", "energy_required": 5,
                "ingredients": [["iron-gear-wheel", 1]], "result": "automation-science-pack"
            }
        },
        "technology": {
            "automation": {
                "name": "automation",
                "unit": {"count": 10, "ingredients": [["automation-science-pack", 1]], "time": 10}
            },
            "electronics": {
                "name": "electronics", "prerequisites": ["automation"],
                "unit": {"count": 30, "ingredients": [["automation-science-pack", 1]], "time": 15}
            }
        },
        "furnace": {
            "stone-furnace": {
                "name": "stone-furnace", "crafting_categories": ["smelting"],
                "energy_usage": "90kW",
                "energy_source": {"type": "burner", "fuel_category": "chemical"}
            }
        },
        "assembling-machine": {
            "assembling-machine-2": {
                "name": "assembling-machine-2", "crafting_speed": 0.75,
                "crafting_categories": ["crafting", "advanced-crafting"],
                "energy_usage": "150kW", "energy_source": {"type": "electric"},
                "module_specification": {"module_slots": 2},
                "allowed_effects": ["productivity", "consumption", "pollution"]
            }
        },
        "lab": {
            "lab": {
                "name": "lab", "energy_usage": "60kW", "energy_source": {"type": "electric"},
                "inputs": ["automation-science-pack"],
                "module_specification": {"module_slots": 2}
            }
        },
        "boiler": {
            "boiler": {
                "name": "boiler", "energy_consumption": "1.8MW",
                "energy_source": {"type": "burner", "fuel_category": "chemical"}
            }
        }
    }"#;

    // -----------------------------------------------------------------------
    // detect_format
    // -----------------------------------------------------------------------

    #[test]
    fn detect_format_by_extension() {
        assert_eq!(detect_format(Path::new("data.ron")).unwrap(), Format::Ron);
        assert_eq!(detect_format(Path::new("data.toml")).unwrap(), Format::Toml);
        assert_eq!(detect_format(Path::new("data.json")).unwrap(), Format::Json);
    }

    #[test]
    fn detect_format_unsupported() {
        for name in ["data.yaml", "data"] {
            let result = detect_format(Path::new(name));
            assert!(matches!(result, Err(DataLoadError::UnsupportedFormat { .. })));
        }
    }

    // -----------------------------------------------------------------------
    // find_data_file
    // -----------------------------------------------------------------------

    #[test]
    fn find_data_file_found() {
        let dir = make_test_dir("find");
        fs::write(dir.join("data-raw.json"), "{}").unwrap();

        let result = find_data_file(&dir, DATA_FILE).unwrap();
        assert_eq!(result, Some(dir.join("data-raw.json")));

        cleanup(&dir);
    }

    #[test]
    fn find_data_file_conflict() {
        let dir = make_test_dir("find_conflict");
        fs::write(dir.join("data-raw.json"), "{}").unwrap();
        fs::write(dir.join("data-raw.ron"), "()").unwrap();

        let result = find_data_file(&dir, DATA_FILE);
        assert!(matches!(result, Err(DataLoadError::ConflictingFormats { .. })));

        cleanup(&dir);
    }

    #[test]
    fn require_data_file_missing() {
        let dir = make_test_dir("require_missing");

        let err = require_data_file(&dir, DATA_FILE).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("data-raw"), "got: {msg}");

        cleanup(&dir);
    }

    // -----------------------------------------------------------------------
    // Conversion
    // -----------------------------------------------------------------------

    #[test]
    fn dump_converts_into_registry() {
        let data = parse_game_data_json(DUMP, &PlannerConfig::default()).unwrap();

        assert_eq!(data.stack_size("automation-science-pack"), Some(200));
        assert!((data.item("coal").unwrap().fuel_value - 4e6).abs() < 1e-6);
        assert_eq!(data.recipe("iron-gear-wheel").unwrap().ingredients[0].amount, 2);
        // Missing energy_required falls back to the default crafting time.
        assert!((data.recipe("iron-gear-wheel").unwrap().crafting_time - 0.5).abs() < 1e-9);
        assert_eq!(data.smelting_recipe_for("iron-ore").unwrap().name, "iron-plate");
        assert!(data.recipe_for("water-barrel").is_none());
        assert!(data.recipe("fill-water-barrel").unwrap().ingredients[0].is_fluid);

        let tech = data.technology("electronics").unwrap();
        assert_eq!(tech.prerequisites, vec!["automation".to_string()]);
        assert_eq!(tech.unit.count, 30);
    }

    #[test]
    fn machines_and_modules() {
        let data = parse_game_data_json(DUMP, &PlannerConfig::default()).unwrap();

        let furnace = data.machine("stone-furnace").unwrap();
        assert_eq!(furnace.role(), MachineRole::Furnace);
        assert!(furnace.is_burner());
        assert!((furnace.energy_usage - 90_000.0).abs() < 1e-6);

        let am2 = data.machine("assembling-machine-2").unwrap();
        assert_eq!(am2.module_slots, 2);
        assert_eq!(am2.allowed_modules, vec!["productivity-module".to_string()]);

        let lab = data.machine("lab").unwrap();
        assert!(lab.allowed_modules.is_empty());
        assert_eq!(lab.inputs, vec!["automation-science-pack".to_string()]);

        let boiler = data.machine("boiler").unwrap();
        assert!((boiler.energy_usage - 1_800_000.0).abs() < 1e-6);

        let module = data.module("productivity-module").unwrap();
        assert!(module.applies_to("iron-gear-wheel"));
        assert!(!module.applies_to("iron-plate"));
        assert_eq!(data.stack_size("productivity-module"), Some(50));
    }

    #[test]
    fn expensive_variant_is_selected() {
        let config = PlannerConfig {
            use_expensive: true,
            ..PlannerConfig::default()
        };
        let data = parse_game_data_json(DUMP, &config).unwrap();
        assert_eq!(data.recipe("iron-gear-wheel").unwrap().ingredients[0].amount, 4);
        // Recipes without an expensive variant keep the normal one.
        assert_eq!(data.recipe("iron-plate").unwrap().ingredients[0].amount, 1);
    }

    #[test]
    fn handcraft_categories_come_from_character() {
        let data = parse_game_data_json(DUMP, &PlannerConfig::default()).unwrap();
        assert!(data.can_handcraft(data.recipe("iron-gear-wheel").unwrap()));
        assert!(!data.can_handcraft(data.recipe("iron-plate").unwrap()));
        assert!(!data.can_handcraft(data.recipe("fill-water-barrel").unwrap()));
    }

    #[test]
    fn load_from_directory() {
        let dir = make_test_dir("load_dir");
        fs::write(dir.join("data-raw.json"), DUMP).unwrap();

        let data = load_game_data(&dir, &PlannerConfig::default()).unwrap();
        assert!(data.recipe("automation-science-pack").is_some());

        cleanup(&dir);
    }

    #[test]
    fn load_config_from_toml() {
        let dir = make_test_dir("config_toml");
        let path = dir.join("planner.toml");
        fs::write(
            &path,
            r#"
use_expensive = true
preferred_fuel = "wood"

[starting_inventory]
iron-plate = 20
"#,
        )
        .unwrap();

        let config = load_config(&path).unwrap();
        assert!(config.use_expensive);
        assert_eq!(config.preferred_fuel, "wood");
        assert_eq!(config.starting_inventory.get("iron-plate"), Some(&20));
        assert!(config.base_items.contains("iron-ore"));

        cleanup(&dir);
    }

    #[test]
    fn load_config_from_ron() {
        let dir = make_test_dir("config_ron");
        let path = dir.join("planner.ron");
        fs::write(&path, r#"(preferred_fuel: "coal", use_expensive: false)"#).unwrap();

        let config = load_config(&path).unwrap();
        assert_eq!(config, PlannerConfig::default());

        cleanup(&dir);
    }

    // -----------------------------------------------------------------------
    // Error path tests
    // -----------------------------------------------------------------------

    #[test]
    fn recipe_without_result_is_invalid() {
        let json = r#"{"recipe": {"broken": {"name": "broken", "ingredients": [["iron-ore", 1]]}}}"#;
        let err = parse_game_data_json(json, &PlannerConfig::default()).unwrap_err();
        assert!(matches!(err, DataLoadError::InvalidEntry { kind: "recipe", .. }));
        let msg = err.to_string();
        assert!(msg.contains("broken"), "got: {msg}");
    }

    #[test]
    fn unknown_energy_source_is_invalid() {
        let json = r#"{"boiler": {"b": {"name": "b", "energy_consumption": "1MW",
            "energy_source": {"type": "heat"}}}}"#;
        let err = parse_game_data_json(json, &PlannerConfig::default()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("heat"), "got: {msg}");
    }

    #[test]
    fn unknown_prerequisite_surfaces_registry_error() {
        let json = r#"{"technology": {"t": {"name": "t", "prerequisites": ["missing"],
            "unit": {"count": 1, "ingredients": [], "time": 1}}}}"#;
        let err = parse_game_data_json(json, &PlannerConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            DataLoadError::Registry(RegistryError::UnknownPrerequisite { .. })
        ));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let err = parse_game_data_json("{ not json", &PlannerConfig::default()).unwrap_err();
        assert!(matches!(err, DataLoadError::Parse { .. }));
    }

    #[test]
    fn deserialize_file_parse_error() {
        let dir = make_test_dir("deser_parse_err");
        let path = dir.join("bad.ron");
        fs::write(&path, "this is not valid RON {{{").unwrap();

        let result: Result<RawData, _> = deserialize_file(&path);
        assert!(matches!(result, Err(DataLoadError::Parse { .. })));

        cleanup(&dir);
    }

    #[test]
    fn io_error_converts() {
        let result: Result<RawData, _> = deserialize_file(Path::new("/nonexistent/data-raw.json"));
        assert!(matches!(result, Err(DataLoadError::Io(_))));
    }
}
