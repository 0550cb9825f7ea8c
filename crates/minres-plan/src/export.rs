//! Flattening a plan tree into the linear records a script generator reads.

use crate::task::{Task, TaskIdGen, TaskKind};
use serde::Serialize;

/// One executable task.
///
/// `prerequisites` are the ids of the task's direct children. `previous`
/// is the id emitted just before it, so a consumer can treat "no explicit
/// prerequisite" as "after the previous task".
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanStep {
    pub id: String,
    pub prerequisites: Vec<String>,
    pub previous: Option<String>,
    #[serde(flatten)]
    pub kind: TaskKind,
}

/// Emit every non-`Meta` task in execution order, assigning ids as needed.
///
/// A `Meta` child is referenced by the id of its last emitted descendant.
pub fn export(root: &mut Task, ids: &mut TaskIdGen) -> Vec<PlanStep> {
    let mut out = Vec::new();
    let mut last = None;
    emit(root, ids, &mut last, &mut out);
    out
}

fn emit(
    task: &mut Task,
    ids: &mut TaskIdGen,
    last: &mut Option<String>,
    out: &mut Vec<PlanStep>,
) -> Option<String> {
    let mut prerequisites = Vec::with_capacity(task.prerequisites.len());
    for child in &mut task.prerequisites {
        if let Some(id) = emit(child, ids, last, out) {
            prerequisites.push(id);
        }
    }

    if task.kind == TaskKind::Meta {
        return if task.prerequisites.is_empty() {
            None
        } else {
            last.clone()
        };
    }

    let id = ids.assign(task);
    out.push(PlanStep {
        id: id.clone(),
        prerequisites,
        previous: last.replace(id.clone()),
        kind: task.kind.clone(),
    });
    Some(id)
}
