//! Dependency graph operations and topological ordering.
//!
//! Edges are stored on each task as `(predecessor id, kind)` pairs, so
//! cycle checks and removals are id lookups against the arena rather than
//! pointer chasing, and tasks serialize independently of the graph.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::ScheduleError;
use crate::models::{Dependency, DependencyKind, TaskId, TaskState};
use crate::plan::ProjectPlan;

/// Adds a typed dependency edge from `task` to `predecessor`.
///
/// Validation order: both tasks must exist; `task` must still be editable
/// (Pending or Blocked) and hold no resource commitments; the edge must
/// not duplicate an existing one; and linking must not close a cycle.
/// On success the edge is appended and `task`'s Blocked state refreshed.
pub fn add_dependency(
    plan: &mut ProjectPlan,
    task: TaskId,
    predecessor: TaskId,
    kind: DependencyKind,
) -> Result<(), ScheduleError> {
    plan.task(task)?;
    plan.task(predecessor)?;
    plan.guard_schedule_edit(task)?;
    if plan.task(task)?.depends_on(predecessor) {
        return Err(ScheduleError::InvalidRequest(format!(
            "task {task} already depends on task {predecessor}"
        )));
    }
    // A cycle closes when task is already (transitively) a predecessor
    // of the proposed predecessor; a self-reference is the trivial case.
    if task == predecessor || is_reachable(plan, predecessor, task)? {
        return Err(ScheduleError::Cycle(task));
    }

    plan.task_mut(task)?
        .dependencies
        .push(Dependency { predecessor, kind });
    refresh_blocked_state(plan, task)
}

/// Removes the dependency edge from `task` to `predecessor`.
///
/// Subject to the same state and resource-commitment guards as
/// [`add_dependency`]; fails with `DependencyNotFound` if no such edge.
pub fn remove_dependency(
    plan: &mut ProjectPlan,
    task: TaskId,
    predecessor: TaskId,
) -> Result<(), ScheduleError> {
    plan.guard_schedule_edit(task)?;
    let edges = &mut plan.task_mut(task)?.dependencies;
    let position = edges
        .iter()
        .position(|d| d.predecessor == predecessor)
        .ok_or(ScheduleError::DependencyNotFound { task, predecessor })?;
    edges.remove(position);
    refresh_blocked_state(plan, task)
}

/// Direct predecessors of `task`, in edge insertion order.
pub fn predecessors(plan: &ProjectPlan, task: TaskId) -> Result<Vec<TaskId>, ScheduleError> {
    Ok(plan
        .task(task)?
        .dependencies
        .iter()
        .map(|d| d.predecessor)
        .collect())
}

/// Tasks directly depending on `task`, in plan insertion order.
pub fn successors(plan: &ProjectPlan, task: TaskId) -> Result<Vec<TaskId>, ScheduleError> {
    plan.task(task)?;
    Ok(plan
        .iter_tasks()
        .filter(|t| t.depends_on(task))
        .map(|t| t.id)
        .collect())
}

/// Whether `to` can be reached from `from` by following dependency edges.
fn is_reachable(plan: &ProjectPlan, from: TaskId, to: TaskId) -> Result<bool, ScheduleError> {
    let mut stack = vec![from];
    let mut visited = FxHashSet::default();
    while let Some(current) = stack.pop() {
        if current == to {
            return Ok(true);
        }
        if !visited.insert(current) {
            continue;
        }
        for dep in &plan.task(current)?.dependencies {
            stack.push(dep.predecessor);
        }
    }
    Ok(false)
}

/// Produces a linear order in which every predecessor precedes its
/// dependents, using Kahn's algorithm.
///
/// Ties among ready tasks are broken by plan insertion order, so the
/// result is stable across runs. Fails with `Cycle` when not every task
/// can be emitted; this re-validates independently of the guard in
/// [`add_dependency`].
pub fn topological_order(plan: &ProjectPlan) -> Result<Vec<TaskId>, ScheduleError> {
    let position: FxHashMap<TaskId, usize> = plan
        .task_ids()
        .iter()
        .enumerate()
        .map(|(pos, &id)| (id, pos))
        .collect();

    // Remaining unemitted predecessors per task, and the reverse edges
    // used to decrement them.
    let mut pending_preds: FxHashMap<TaskId, usize> = FxHashMap::default();
    let mut dependents: FxHashMap<TaskId, Vec<TaskId>> = FxHashMap::default();
    for task in plan.iter_tasks() {
        pending_preds.insert(task.id, task.dependencies.len());
        for dep in &task.dependencies {
            dependents.entry(dep.predecessor).or_default().push(task.id);
        }
    }

    let mut ready: BinaryHeap<Reverse<usize>> = plan
        .iter_tasks()
        .filter(|t| t.dependencies.is_empty())
        .map(|t| Reverse(position[&t.id]))
        .collect();

    let mut order = Vec::with_capacity(plan.len());
    while let Some(Reverse(pos)) = ready.pop() {
        let id = plan.task_ids()[pos];
        order.push(id);
        if let Some(deps) = dependents.get(&id) {
            for &dependent in deps {
                let remaining = pending_preds
                    .get_mut(&dependent)
                    .ok_or(ScheduleError::TaskNotFound(dependent))?;
                *remaining -= 1;
                if *remaining == 0 {
                    ready.push(Reverse(position[&dependent]));
                }
            }
        }
    }

    if order.len() != plan.len() {
        // Some task never reached zero pending predecessors; report the
        // first one left out of the emitted order.
        let emitted: FxHashSet<TaskId> = order.iter().copied().collect();
        for task in plan.iter_tasks() {
            if !emitted.contains(&task.id) {
                return Err(ScheduleError::Cycle(task.id));
            }
        }
    }
    Ok(order)
}

/// Re-evaluates the Blocked/Pending side effect for one task.
///
/// A task is forced Blocked while any finish-to-start predecessor is not
/// Completed, or any start-to-start predecessor has not started.
/// Finish-to-finish edges constrain the finish date only and never block.
pub(crate) fn refresh_blocked_state(
    plan: &mut ProjectPlan,
    task: TaskId,
) -> Result<(), ScheduleError> {
    if !plan.task(task)?.state.is_editable() {
        return Ok(());
    }
    let mut blocked = false;
    for dep in plan.task(task)?.dependencies.clone() {
        let pred_state = plan.task(dep.predecessor)?.state;
        blocked |= match dep.kind {
            DependencyKind::FinishToStart => pred_state != TaskState::Completed,
            DependencyKind::StartToStart => pred_state.is_editable(),
            DependencyKind::FinishToFinish => false,
        };
        if blocked {
            break;
        }
    }
    let state = &mut plan.task_mut(task)?.state;
    *state = if blocked {
        TaskState::Blocked
    } else {
        TaskState::Pending
    };
    Ok(())
}
