//! The plan tree: tasks, their builders, id generation and pruning.
//!
//! A [`Task`] owns its prerequisites. Execution order is depth-first with
//! prerequisites first, so a task's children always run before it and
//! earlier siblings run before later ones. [`TaskKind::Meta`] only groups
//! children and is never executed.

use minres_core::inventory::ItemCounts;
use minres_core::machine::InventorySlot;
use minres_core::registry::GameData;
use minres_core::resolver::{ResolveError, resolve};
use minres_core::tech::tech_cost;
use serde::Serialize;
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Kinds
// ---------------------------------------------------------------------------

/// What a mining task removes from the world.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MineTarget {
    /// A raw resource patch or tree.
    Resource(String),
    /// A placed building, picked back up.
    Entity(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "task", rename_all = "snake_case")]
pub enum TaskKind {
    Mine {
        target: MineTarget,
        amount: u32,
    },
    /// Make `amount` items by whatever means pass 2 picks.
    Craft {
        item: String,
        amount: u32,
    },
    /// Hand craft `count` invocations of a recipe.
    Handcraft {
        recipe: String,
        count: u32,
    },
    Build {
        entity: String,
    },
    Put {
        entity: String,
        slot: InventorySlot,
        item: String,
        amount: u32,
    },
    Take {
        entity: String,
        slot: InventorySlot,
        item: String,
        amount: u32,
    },
    SetRecipe {
        entity: String,
        recipe: String,
    },
    /// An empty `tech` marks research that is already done.
    Research {
        tech: String,
    },
    /// Block until a machine slot holds at least `amount` of `item`.
    Wait {
        entity: String,
        slot: InventorySlot,
        item: String,
        amount: u32,
    },
    Speed {
        factor: f64,
    },
    Launch,
    Meta,
}

impl TaskKind {
    /// Label used in generated ids. Hand crafting shares the craft label.
    pub fn label(&self) -> &'static str {
        match self {
            TaskKind::Mine { .. } => "mine",
            TaskKind::Craft { .. } | TaskKind::Handcraft { .. } => "craft",
            TaskKind::Build { .. } => "build",
            TaskKind::Put { .. } => "put",
            TaskKind::Take { .. } => "take",
            TaskKind::SetRecipe { .. } => "recipe",
            TaskKind::Research { .. } => "tech",
            TaskKind::Wait { .. } => "wait",
            TaskKind::Speed { .. } => "speed",
            TaskKind::Launch => "launch",
            TaskKind::Meta => "meta",
        }
    }

    /// True when pruning should drop a task of this kind.
    fn is_void(&self) -> bool {
        match self {
            TaskKind::Craft { amount, .. } | TaskKind::Mine { amount, .. } => *amount == 0,
            TaskKind::Research { tech } => tech.is_empty(),
            _ => false,
        }
    }
}

// ---------------------------------------------------------------------------
// Ids
// ---------------------------------------------------------------------------

/// Sequential per-label id source: `task_craft_0`, `task_craft_1`, ...
#[derive(Debug, Clone, Default)]
pub struct TaskIdGen {
    counters: BTreeMap<&'static str, u32>,
}

impl TaskIdGen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self, kind: &TaskKind) -> String {
        let label = kind.label();
        let n = self.counters.entry(label).or_insert(0);
        let id = format!("task_{label}_{n}");
        *n += 1;
        id
    }

    /// The task's id, generating one on first use.
    pub fn assign(&mut self, task: &mut Task) -> String {
        if let Some(id) = &task.id {
            return id.clone();
        }
        let id = self.next_id(&task.kind);
        task.id = Some(id.clone());
        id
    }
}

// ---------------------------------------------------------------------------
// Tasks
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Task {
    pub id: Option<String>,
    pub kind: TaskKind,
    pub prerequisites: Vec<Task>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PlanBuildError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("unknown technology '{0}'")]
    UnknownTechnology(String),
}

impl Task {
    pub fn new(kind: TaskKind) -> Self {
        Self {
            id: None,
            kind,
            prerequisites: Vec::new(),
        }
    }

    /// Craft every requested item, resolving all of them in one graph so
    /// shared intermediates are made once.
    ///
    /// One requested item yields a `Craft` whose prerequisites are the
    /// resolved steps; several yield a `Meta` over all steps. Base items
    /// become resource mining.
    pub fn craft(data: &GameData, items: &ItemCounts) -> Result<Task, PlanBuildError> {
        let mut steps = resolve(data, items, None)?;

        let mut task = match items.iter().next() {
            Some((item, &amount)) if items.len() == 1 => {
                if data.is_base_item(item) {
                    return Ok(Task::mine(data, item, amount));
                }
                // The requested item resolves last.
                steps.pop();
                Task::new(TaskKind::Craft {
                    item: item.clone(),
                    amount,
                })
            }
            _ => Task::meta(),
        };

        for step in steps {
            let child = if data.is_base_item(&step.name) {
                Task::mine(data, &step.name, step.amount)
            } else {
                Task::new(TaskKind::Craft {
                    item: step.name,
                    amount: step.amount,
                })
            };
            task.add_prerequisite(child);
        }
        Ok(task)
    }

    /// Research `tech`: its prerequisite research first, then a craft of its
    /// science packs. Shared prerequisites appear once per path; pass 1
    /// blanks the repeats.
    pub fn research(data: &GameData, tech: &str) -> Result<Task, PlanBuildError> {
        let def = data
            .technology(tech)
            .ok_or_else(|| PlanBuildError::UnknownTechnology(tech.to_string()))?;

        let mut task = Task::new(TaskKind::Research {
            tech: tech.to_string(),
        });
        for prerequisite in &def.prerequisites {
            task.add_prerequisite(Task::research(data, prerequisite)?);
        }
        let cost = tech_cost(data, tech).unwrap_or_default();
        if !cost.is_empty() {
            task.add_prerequisite(Task::craft(data, &cost)?);
        }
        Ok(task)
    }

    /// Mine a base resource, or pick up a placed building.
    pub fn mine(data: &GameData, name: &str, amount: u32) -> Task {
        let target = if data.is_base_item(name) {
            MineTarget::Resource(name.to_string())
        } else {
            MineTarget::Entity(name.to_string())
        };
        Task::new(TaskKind::Mine { target, amount })
    }

    pub fn build(entity: &str) -> Task {
        Task::new(TaskKind::Build {
            entity: entity.to_string(),
        })
    }

    pub fn put(entity: &str, slot: InventorySlot, item: &str, amount: u32) -> Task {
        Task::new(TaskKind::Put {
            entity: entity.to_string(),
            slot,
            item: item.to_string(),
            amount,
        })
    }

    pub fn take(entity: &str, slot: InventorySlot, item: &str, amount: u32) -> Task {
        Task::new(TaskKind::Take {
            entity: entity.to_string(),
            slot,
            item: item.to_string(),
            amount,
        })
    }

    pub fn wait(entity: &str, slot: InventorySlot, item: &str, amount: u32) -> Task {
        Task::new(TaskKind::Wait {
            entity: entity.to_string(),
            slot,
            item: item.to_string(),
            amount,
        })
    }

    pub fn set_recipe(entity: &str, recipe: &str) -> Task {
        Task::new(TaskKind::SetRecipe {
            entity: entity.to_string(),
            recipe: recipe.to_string(),
        })
    }

    pub fn speed(factor: f64) -> Task {
        Task::new(TaskKind::Speed { factor })
    }

    pub fn launch() -> Task {
        Task::new(TaskKind::Launch)
    }

    pub fn meta() -> Task {
        Task::new(TaskKind::Meta)
    }

    /// A `Meta` grouping `tasks` in order.
    pub fn group(tasks: impl IntoIterator<Item = Task>) -> Task {
        let mut meta = Task::meta();
        meta.prerequisites.extend(tasks);
        meta
    }

    pub fn add_prerequisite(&mut self, task: Task) {
        self.prerequisites.push(task);
    }

    /// Drop zero-amount crafts and mines, blanked research, and groups left
    /// empty. Running it twice changes nothing.
    pub fn prune(&mut self) {
        for child in &mut self.prerequisites {
            child.prune();
        }
        self.prerequisites.retain(|child| {
            !child.kind.is_void()
                && !(child.kind == TaskKind::Meta && child.prerequisites.is_empty())
        });
    }

    /// Visit every task in execution order.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Task)) {
        for child in &self.prerequisites {
            child.walk(f);
        }
        f(self);
    }

    /// Number of tasks in the tree, this one included.
    pub fn task_count(&self) -> usize {
        let mut n = 0;
        self.walk(&mut |_| n += 1);
        n
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use minres_core::test_utils::vanilla;

    fn counts(pairs: &[(&str, u32)]) -> ItemCounts {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn craft(item: &str, amount: u32) -> TaskKind {
        TaskKind::Craft {
            item: item.to_string(),
            amount,
        }
    }

    fn mine(item: &str, amount: u32) -> TaskKind {
        TaskKind::Mine {
            target: MineTarget::Resource(item.to_string()),
            amount,
        }
    }

    fn kinds(task: &Task) -> Vec<TaskKind> {
        task.prerequisites.iter().map(|t| t.kind.clone()).collect()
    }

    // -----------------------------------------------------------------------
    // Builders
    // -----------------------------------------------------------------------

    #[test]
    fn craft_plates() {
        let data = vanilla();
        let task = Task::craft(&data, &counts(&[("iron-plate", 10)])).unwrap();
        assert_eq!(task.kind, craft("iron-plate", 10));
        assert_eq!(kinds(&task), vec![mine("iron-ore", 10)]);
    }

    #[test]
    fn craft_circuits_lists_resolved_steps() {
        let data = vanilla();
        let task = Task::craft(&data, &counts(&[("electronic-circuit", 3)])).unwrap();
        assert_eq!(task.kind, craft("electronic-circuit", 3));
        assert_eq!(
            kinds(&task),
            vec![
                mine("copper-ore", 5),
                craft("copper-plate", 5),
                mine("iron-ore", 3),
                craft("copper-cable", 10),
                craft("iron-plate", 3),
            ]
        );
    }

    #[test]
    fn craft_several_items_is_a_group() {
        let data = vanilla();
        let task = Task::craft(&data, &counts(&[("iron-gear-wheel", 2), ("pipe", 3)])).unwrap();
        assert_eq!(task.kind, TaskKind::Meta);
        let names: Vec<_> = kinds(&task);
        assert!(names.contains(&craft("iron-gear-wheel", 2)));
        assert!(names.contains(&craft("pipe", 3)));
        assert!(names.contains(&craft("iron-plate", 7)));
    }

    #[test]
    fn craft_base_item_is_mining() {
        let data = vanilla();
        let task = Task::craft(&data, &counts(&[("stone", 5)])).unwrap();
        assert_eq!(task.kind, mine("stone", 5));
        assert!(task.prerequisites.is_empty());
    }

    #[test]
    fn research_nests_prerequisites() {
        let data = vanilla();
        let task = Task::research(&data, "fast-inserter").unwrap();
        let mut techs = Vec::new();
        task.walk(&mut |t| {
            if let TaskKind::Research { tech } = &t.kind {
                techs.push(tech.clone());
            }
        });
        // automation appears once under each branch.
        assert_eq!(
            techs,
            vec!["automation", "electronics", "automation", "logistics", "fast-inserter"]
        );
        assert_eq!(
            task.prerequisites.last().unwrap().kind,
            craft("automation-science-pack", 20)
        );
    }

    #[test]
    fn mine_distinguishes_resources_and_entities() {
        let data = vanilla();
        assert_eq!(Task::mine(&data, "coal", 3).kind, mine("coal", 3));
        assert_eq!(
            Task::mine(&data, "stone-furnace", 1).kind,
            TaskKind::Mine {
                target: MineTarget::Entity("stone-furnace".to_string()),
                amount: 1,
            }
        );
    }

    // -----------------------------------------------------------------------
    // Ids
    // -----------------------------------------------------------------------

    #[test]
    fn ids_count_per_label() {
        let mut ids = TaskIdGen::new();
        let mut a = Task::build("lab");
        let mut b = Task::new(TaskKind::Handcraft {
            recipe: "pipe".to_string(),
            count: 1,
        });
        let mut c = Task::new(craft("pipe", 1));
        assert_eq!(ids.assign(&mut a), "task_build_0");
        assert_eq!(ids.assign(&mut b), "task_craft_0");
        assert_eq!(ids.assign(&mut c), "task_craft_1");
        // Stable once assigned.
        assert_eq!(ids.assign(&mut b), "task_craft_0");
    }

    // -----------------------------------------------------------------------
    // Pruning
    // -----------------------------------------------------------------------

    #[test]
    fn prune_drops_void_tasks_and_empty_groups() {
        let mut inner = Task::meta();
        inner.add_prerequisite(Task::new(craft("pipe", 0)));
        let mut root = Task::group([
            Task::new(mine("iron-ore", 0)),
            Task::new(TaskKind::Research {
                tech: String::new(),
            }),
            inner,
            Task::new(craft("iron-plate", 2)),
            Task::launch(),
        ]);
        root.prune();
        assert_eq!(kinds(&root), vec![craft("iron-plate", 2), TaskKind::Launch]);

        let once = root.clone();
        root.prune();
        assert_eq!(root, once);
    }

    #[test]
    fn walk_runs_prerequisites_first() {
        let data = vanilla();
        let task = Task::craft(&data, &counts(&[("iron-gear-wheel", 1)])).unwrap();
        let mut order = Vec::new();
        task.walk(&mut |t| order.push(t.kind.label()));
        assert_eq!(order, vec!["mine", "craft", "craft"]);
        assert_eq!(task.task_count(), 3);
    }

    // -----------------------------------------------------------------------
    // Error path tests
    // -----------------------------------------------------------------------

    #[test]
    fn unknown_technology() {
        let data = vanilla();
        let err = Task::research(&data, "rocket-silo").unwrap_err();
        assert_eq!(err, PlanBuildError::UnknownTechnology("rocket-silo".to_string()));
    }

    #[test]
    fn empty_craft_request() {
        let data = vanilla();
        let err = Task::craft(&data, &ItemCounts::new()).unwrap_err();
        assert!(matches!(err, PlanBuildError::Resolve(ResolveError::EmptyRequest)));
    }
}
