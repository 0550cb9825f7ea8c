//! Dependency graph resolution: "N of item X" to the exact amount of every
//! transitive ingredient.
//!
//! The graph is an arena of [`DepNode`]s keyed by [`DepNodeId`]. Each item
//! appears once no matter how many recipes consume it, so shared
//! sub-ingredients accumulate a single total. Nodes are evaluated with a
//! deferred worklist: a node is ready once every node that consumes it has
//! been evaluated, otherwise it goes to the back of the queue. Base items are
//! never expanded, which keeps the graph acyclic.

use crate::inventory::{ItemAmount, ItemCounts};
use crate::registry::{GameData, Recipe};
use crate::state::SimulationState;
use slotmap::{SecondaryMap, SlotMap};
use std::collections::{HashMap, VecDeque};

slotmap::new_key_type! {
    /// Identifies a node within one resolution's dependency graph.
    pub struct DepNodeId;
}

// ---------------------------------------------------------------------------
// Graph
// ---------------------------------------------------------------------------

#[derive(Debug)]
struct DepNode<'a> {
    item: String,
    /// `None` for base items and for the synthetic root.
    recipe: Option<&'a Recipe>,
    /// Units of `item` one invocation yields. 1 for terminals and the root.
    per_run: u32,
    /// Items, not invocations.
    amount: u32,
    original_amount: u32,
    /// Ingredient nodes with the amount one invocation consumes.
    deps: Vec<(DepNodeId, u32)>,
    /// Nodes that consume this one.
    uses: Vec<DepNodeId>,
    /// The synthetic root that groups the requested items.
    meta: bool,
}

impl DepNode<'_> {
    fn per_unit(&self, dep: DepNodeId) -> u32 {
        self.deps
            .iter()
            .find(|(d, _)| *d == dep)
            .map_or(0, |(_, n)| *n)
    }
}

#[derive(Debug)]
struct DepGraph<'a> {
    nodes: SlotMap<DepNodeId, DepNode<'a>>,
    root: DepNodeId,
}

impl<'a> DepGraph<'a> {
    /// Expand `items` breadth-first and compute first-pass amounts.
    fn build(data: &'a GameData, items: &ItemCounts) -> Result<Self, ResolveError> {
        if items.is_empty() {
            return Err(ResolveError::EmptyRequest);
        }

        let mut nodes: SlotMap<DepNodeId, DepNode<'a>> = SlotMap::with_key();
        let root = nodes.insert(DepNode {
            item: String::new(),
            recipe: None,
            per_run: 1,
            amount: 1,
            original_amount: 0,
            deps: Vec::new(),
            uses: Vec::new(),
            meta: true,
        });

        let mut by_name: HashMap<String, DepNodeId> = HashMap::new();
        let mut expanded: SecondaryMap<DepNodeId, ()> = SecondaryMap::new();
        let mut queue = VecDeque::from([root]);

        while let Some(id) = queue.pop_front() {
            if expanded.insert(id, ()).is_some() {
                continue;
            }
            // BTreeMap order makes the root's children, and so the output,
            // deterministic.
            let ingredients: Vec<(String, u32)> = if nodes[id].meta {
                items.iter().map(|(name, n)| (name.clone(), *n)).collect()
            } else if let Some(recipe) = nodes[id].recipe {
                recipe
                    .ingredients
                    .iter()
                    .map(|i| (i.name.clone(), i.amount))
                    .collect()
            } else {
                continue;
            };

            for (name, per_unit) in ingredients {
                let dep = match by_name.get(&name) {
                    Some(&dep) => dep,
                    None => {
                        let recipe = if data.is_base_item(&name) {
                            None
                        } else {
                            Some(data.recipe_for(&name).ok_or_else(|| ResolveError::NoRecipe {
                                item: name.clone(),
                            })?)
                        };
                        let dep = nodes.insert(DepNode {
                            per_run: recipe.map_or(1, |r| r.product_count(&name).max(1)),
                            item: name.clone(),
                            recipe,
                            amount: 0,
                            original_amount: 0,
                            deps: Vec::new(),
                            uses: Vec::new(),
                            meta: false,
                        });
                        by_name.insert(name, dep);
                        dep
                    }
                };
                nodes[dep].uses.push(id);
                nodes[id].deps.push((dep, per_unit));
                queue.push_back(dep);
            }
        }

        let mut graph = Self { nodes, root };
        for id in graph.order() {
            if graph.nodes[id].meta {
                continue;
            }
            let amount: u64 = graph.nodes[id]
                .uses
                .iter()
                .map(|&u| {
                    let user = &graph.nodes[u];
                    (u64::from(user.amount) * u64::from(user.per_unit(id)))
                        .div_ceil(u64::from(user.per_run))
                })
                .sum();
            let amount = u32::try_from(amount).map_err(|_| ResolveError::AmountOverflow {
                item: graph.nodes[id].item.clone(),
            })?;
            let node = &mut graph.nodes[id];
            node.amount = amount;
            node.original_amount = amount;
        }
        Ok(graph)
    }

    /// Evaluation order: every node after all of its consumers.
    fn order(&self) -> Vec<DepNodeId> {
        let mut visited: SecondaryMap<DepNodeId, ()> = SecondaryMap::new();
        let mut queue = VecDeque::from([self.root]);
        let mut order = Vec::with_capacity(self.nodes.len());

        while let Some(id) = queue.pop_front() {
            if visited.contains_key(id) {
                continue;
            }
            let node = &self.nodes[id];
            if node.uses.iter().any(|u| !visited.contains_key(*u)) {
                queue.push_back(id);
                continue;
            }
            order.push(id);
            for &(dep, _) in &node.deps {
                if !visited.contains_key(dep) {
                    queue.push_back(dep);
                }
            }
            visited.insert(id, ());
        }
        order
    }

    /// Second pass: settle shared totals as fractions, round each node up to
    /// whole invocations, and credit productivity where it saves a run.
    fn settle(&mut self, order: &[DepNodeId], state: Option<&SimulationState>) -> Result<(), ResolveError> {
        let mut amounts: SecondaryMap<DepNodeId, f64> = SecondaryMap::new();

        for &id in order {
            let node = &self.nodes[id];
            let bonus = match (state, node.recipe) {
                (Some(state), Some(recipe)) => 1.0 + state.productivity_bonus(recipe),
                _ => 1.0,
            };
            let per_run = node.per_run;

            let overflow = || ResolveError::AmountOverflow {
                item: self.nodes[id].item.clone(),
            };
            let total = amounts.get(id).copied().unwrap_or(0.0).ceil().max(0.0);
            if total > f64::from(u32::MAX) {
                return Err(overflow());
            }
            let mut amount = total as u32;
            let extra = amount % per_run;
            if extra != 0 {
                amount = amount.checked_add(per_run - extra).ok_or_else(overflow)?;
            }
            if amount > 0 {
                self.nodes[id].amount = amount;
            }

            let node = &self.nodes[id];
            let item_diff = i64::from(node.original_amount) - i64::from(node.amount);

            // Skip the bonus when it would not save a whole invocation.
            let apply_bonus = if bonus > 1.0 && node.recipe.is_some() {
                let runs = (f64::from(node.amount) / f64::from(per_run)).ceil();
                1.0 / (bonus - 1.0) < runs
            } else {
                true
            };

            for &(dep, per_unit) in &node.deps {
                if amounts.get(dep).copied().unwrap_or(0.0) == 0.0 {
                    amounts.insert(dep, f64::from(self.nodes[dep].original_amount));
                }
                let Some(total) = amounts.get_mut(dep) else {
                    continue;
                };
                if item_diff > 0 {
                    *total -= item_diff as f64 * f64::from(per_unit) / f64::from(per_run);
                }
                if apply_bonus {
                    let wanted = f64::from(node.amount) * f64::from(per_unit) / f64::from(per_run);
                    *total -= wanted - wanted / bonus;
                }
            }
            tracing::trace!(item = %node.item, amount = node.amount, bonus, "settled node");
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Every item needed to make `items`, in reverse evaluation order: base
/// resources first, the requested items last.
///
/// With a `state`, recipes crafted by a live machine with productivity
/// modules need fewer ingredients.
pub fn resolve(
    data: &GameData,
    items: &ItemCounts,
    state: Option<&SimulationState>,
) -> Result<Vec<ItemAmount>, ResolveError> {
    let mut graph = DepGraph::build(data, items)?;
    let order = graph.order();
    graph.settle(&order, state)?;

    let mut out: Vec<ItemAmount> = order
        .iter()
        .map(|&id| &graph.nodes[id])
        .filter(|node| !node.meta)
        .map(|node| ItemAmount::new(&node.item, node.amount))
        .collect();
    out.reverse();
    tracing::debug!(requested = items.len(), steps = out.len(), "resolved dependency graph");
    Ok(out)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("nothing requested")]
    EmptyRequest,
    #[error("no recipe makes '{item}'")]
    NoRecipe { item: String },
    #[error("total for '{item}' does not fit in a u32 count")]
    AmountOverflow { item: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PlannerConfig;
    use crate::machine::InventorySlot;
    use crate::registry::{GameDataBuilder, Ingredient, Item, Product, RecipeDef, RecipeVariant};
    use crate::test_utils::vanilla;

    fn request(pairs: &[(&str, u32)]) -> ItemCounts {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn pairs(steps: &[ItemAmount]) -> Vec<(&str, u32)> {
        steps.iter().map(|s| (s.name.as_str(), s.amount)).collect()
    }

    #[test]
    fn circuit_chain() {
        let data = vanilla();
        let steps = resolve(&data, &request(&[("electronic-circuit", 3)]), None).unwrap();
        assert_eq!(
            pairs(&steps),
            vec![
                ("copper-ore", 5),
                ("copper-plate", 5),
                ("iron-ore", 3),
                // Cables come in pairs: 9 rounds up to 10.
                ("copper-cable", 10),
                ("iron-plate", 3),
                ("electronic-circuit", 3),
            ]
        );
    }

    #[test]
    fn shared_iron_plate() {
        let data = vanilla();
        let steps = resolve(&data, &request(&[("engine-unit", 10)]), None).unwrap();
        assert_eq!(
            pairs(&steps),
            vec![
                ("iron-ore", 90),
                ("iron-plate", 90),
                ("pipe", 20),
                ("iron-gear-wheel", 10),
                ("steel-plate", 10),
                ("engine-unit", 10),
            ]
        );
    }

    #[test]
    fn dependency_sharing_single_node() {
        let config = PlannerConfig {
            base_items: ["b".to_string()].into(),
            ..PlannerConfig::default()
        };
        let mut b = GameDataBuilder::new(&config);
        for name in ["a", "b", "c"] {
            b.register_item(Item::new(name, 100)).unwrap();
        }
        b.register_recipe(RecipeDef::new(
            "a",
            "",
            RecipeVariant {
                ingredients: vec![Ingredient::item("b", 2), Ingredient::item("c", 1)],
                products: vec![Product::item("a", 1)],
                crafting_time: None,
            },
        ))
        .unwrap();
        b.register_recipe(RecipeDef::new(
            "c",
            "",
            RecipeVariant {
                ingredients: vec![Ingredient::item("b", 1)],
                products: vec![Product::item("c", 1)],
                crafting_time: None,
            },
        ))
        .unwrap();
        let data = b.build().unwrap();

        let steps = resolve(&data, &request(&[("a", 3)]), None).unwrap();
        assert_eq!(pairs(&steps), vec![("b", 9), ("c", 3), ("a", 3)]);
    }

    #[test]
    fn several_requests_share_one_graph() {
        let data = vanilla();
        let steps = resolve(&data, &request(&[("iron-gear-wheel", 2), ("pipe", 3)]), None).unwrap();
        let plate = steps.iter().find(|s| s.name == "iron-plate").unwrap();
        assert_eq!(plate.amount, 7);
        assert_eq!(steps.iter().filter(|s| s.name == "iron-plate").count(), 1);
        assert_eq!(steps.first().unwrap().name, "iron-ore");
    }

    #[test]
    fn base_item_request_is_terminal() {
        let data = vanilla();
        let steps = resolve(&data, &request(&[("coal", 4)]), None).unwrap();
        assert_eq!(pairs(&steps), vec![("coal", 4)]);
    }

    #[test]
    fn productivity_below_threshold_is_ignored() {
        let data = vanilla();
        let mut state = SimulationState::default();
        state.construct(&data, "assembling-machine-2").unwrap();
        state
            .machine_mut("assembling-machine-2")
            .unwrap()
            .transfer_in(&data, InventorySlot::AssemblingMachineModules, "productivity-module", 2)
            .unwrap();

        // +8% saves a run only past 12.5 invocations.
        let small = resolve(&data, &request(&[("iron-gear-wheel", 10)]), Some(&state)).unwrap();
        assert_eq!(small.iter().find(|s| s.name == "iron-plate").unwrap().amount, 20);

        let large = resolve(&data, &request(&[("iron-gear-wheel", 50)]), Some(&state)).unwrap();
        // 100 plates less 100 - 100/1.08.
        assert_eq!(large.iter().find(|s| s.name == "iron-plate").unwrap().amount, 93);
        // The 7 plates saved are 7 ore never smelted.
        assert_eq!(large.iter().find(|s| s.name == "iron-ore").unwrap().amount, 93);
    }

    #[test]
    fn productivity_on_both_consumers_of_a_shared_ingredient() {
        let data = vanilla();
        let mut state = SimulationState::default();
        state.construct(&data, "assembling-machine-2").unwrap();
        state
            .machine_mut("assembling-machine-2")
            .unwrap()
            .transfer_in(&data, InventorySlot::AssemblingMachineModules, "productivity-module", 2)
            .unwrap();

        let steps = resolve(
            &data,
            &request(&[("electronic-circuit", 50), ("iron-gear-wheel", 50)]),
            Some(&state),
        )
        .unwrap();
        let amount = |name: &str| steps.iter().find(|s| s.name == name).unwrap().amount;

        assert_eq!(amount("electronic-circuit"), 50);
        assert_eq!(amount("iron-gear-wheel"), 50);
        // 150 plates, less 50 - 50/1.08 for circuits and 100 - 100/1.08 for
        // gears: 138.9 rounds up to 139.
        assert_eq!(amount("iron-plate"), 139);
        assert_eq!(amount("iron-ore"), 139);
        // 150 cables less 150 - 150/1.08, rounded up to whole pairs.
        assert_eq!(amount("copper-cable"), 140);
        // 70 cable runs with their own bonus: 70 / 1.08 rounds up to 65.
        assert_eq!(amount("copper-plate"), 65);
        assert_eq!(amount("copper-ore"), 65);
    }

    // =======================================================================
    // Error path tests
    // =======================================================================

    #[test]
    fn empty_request() {
        let data = vanilla();
        assert_eq!(resolve(&data, &ItemCounts::new(), None), Err(ResolveError::EmptyRequest));
    }

    #[test]
    fn unknown_item_short_circuits() {
        let data = vanilla();
        let err = resolve(&data, &request(&[("unobtainium", 1)]), None).unwrap_err();
        assert_eq!(
            err,
            ResolveError::NoRecipe {
                item: "unobtainium".to_string()
            }
        );
    }

    #[test]
    fn totals_past_u32_are_rejected() {
        let data = vanilla();
        // 9 plates per engine: 4.5e9 plates.
        let err = resolve(&data, &request(&[("engine-unit", 500_000_000)]), None).unwrap_err();
        assert!(matches!(err, ResolveError::AmountOverflow { .. }), "got: {err}");
    }
}
