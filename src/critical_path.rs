//! Critical path recomputation using forward and backward passes.
//!
//! The forward pass walks the topological order from the project start
//! and pushes earliest dates through each dependency constraint; the
//! backward pass walks the reverse order from the earliest-allowable
//! finish bound and pulls latest dates back. Slack is the gap between
//! the two start dates; zero slack marks a task critical.
//!
//! The whole recomputation is all-or-nothing: results are computed into
//! local maps and applied to the arena only once every task has resolved,
//! so a malformed graph can never leave half-updated dates behind.

use chrono::{Days, Duration, NaiveDate};
use rustc_hash::FxHashMap;

use crate::config::PlanningConfig;
use crate::error::ScheduleError;
use crate::graph;
use crate::models::{DependencyKind, TaskId};
use crate::{log_changes, log_debug};
use crate::plan::ProjectPlan;

/// Outcome of a full schedule recomputation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ScheduleSummary {
    /// Zero-slack tasks, in topological order.
    pub critical_tasks: Vec<TaskId>,
    /// Days from the project start to the latest earliest-finish.
    pub makespan_days: i64,
}

/// Recomputes earliest/latest dates, slack and critical flags for every
/// task in the plan, then refreshes the Blocked/Pending side effect.
pub fn recompute(
    plan: &mut ProjectPlan,
    config: &PlanningConfig,
) -> Result<ScheduleSummary, ScheduleError> {
    let order = graph::topological_order(plan)?;

    let (earliest_start, earliest_finish) = forward_pass(plan, &order, config)?;
    let (latest_start, latest_finish) = backward_pass(plan, &order, config)?;

    // Every task resolved; apply in one sweep.
    let mut critical_tasks = Vec::new();
    let mut makespan_days = 0i64;
    for &id in &order {
        let es = earliest_start[&id];
        let ls = latest_start[&id];
        let slack = (ls - es).num_days();

        let task = plan.task_mut(id)?;
        task.set_earliest_start(es);
        task.latest_start = Some(ls);
        task.latest_finish = Some(latest_finish[&id]);
        task.slack = Some(slack);
        task.critical = slack == 0;
        if task.critical {
            critical_tasks.push(id);
        }
        makespan_days = makespan_days.max((earliest_finish[&id] - plan.start_date).num_days());
    }

    for &id in &order {
        graph::refresh_blocked_state(plan, id)?;
    }

    log_changes!(
        config.verbosity,
        "[cpm] project {}: recomputed {} tasks, {} critical, makespan {} days",
        plan.name,
        order.len(),
        critical_tasks.len(),
        makespan_days
    );

    Ok(ScheduleSummary {
        critical_tasks,
        makespan_days,
    })
}

type DateMap = FxHashMap<TaskId, NaiveDate>;

fn forward_pass(
    plan: &ProjectPlan,
    order: &[TaskId],
    config: &PlanningConfig,
) -> Result<(DateMap, DateMap), ScheduleError> {
    let mut earliest_start = DateMap::default();
    let mut earliest_finish = DateMap::default();

    for &id in order {
        let task = plan.task(id)?;
        let duration = Duration::days(task.duration_days as i64);

        let mut start = plan.start_date;
        for dep in &task.dependencies {
            // Predecessors are resolved first by construction of the order
            let pred_start = earliest_start[&dep.predecessor];
            let pred_finish = earliest_finish[&dep.predecessor];
            let bound = match dep.kind {
                DependencyKind::FinishToStart => pred_finish,
                DependencyKind::StartToStart => pred_start,
                DependencyKind::FinishToFinish => pred_finish - duration,
            };
            start = start.max(bound);
        }

        let finish = start
            .checked_add_days(Days::new(task.duration_days as u64))
            .ok_or_else(|| {
                ScheduleError::InvalidRequest(format!("date overflow scheduling task {id}"))
            })?;
        log_debug!(
            config.verbosity,
            "[cpm] forward task {id}: es {start} ef {finish}"
        );
        earliest_start.insert(id, start);
        earliest_finish.insert(id, finish);
    }

    Ok((earliest_start, earliest_finish))
}

fn backward_pass(
    plan: &ProjectPlan,
    order: &[TaskId],
    config: &PlanningConfig,
) -> Result<(DateMap, DateMap), ScheduleError> {
    let mut latest_start = DateMap::default();
    let mut latest_finish = DateMap::default();

    // Reverse edges: predecessor -> (dependent, kind)
    let mut dependents: FxHashMap<TaskId, Vec<(TaskId, DependencyKind)>> = FxHashMap::default();
    for task in plan.iter_tasks() {
        for dep in &task.dependencies {
            dependents
                .entry(dep.predecessor)
                .or_default()
                .push((task.id, dep.kind));
        }
    }

    // The finish bound seeds terminal tasks; a bound tighter than the
    // forward pass allows yields negative slack rather than an error so
    // the caller can surface the overrun.
    let bound = plan.finish_bound;

    for &id in order.iter().rev() {
        let task = plan.task(id)?;
        let duration = Duration::days(task.duration_days as i64);

        let mut finish = bound;
        if let Some(deps) = dependents.get(&id) {
            for &(dependent, kind) in deps {
                let succ_start = latest_start[&dependent];
                let succ_finish = latest_finish[&dependent];
                let limit = match kind {
                    DependencyKind::FinishToStart => succ_start,
                    DependencyKind::StartToStart => succ_start + duration,
                    DependencyKind::FinishToFinish => succ_finish,
                };
                finish = finish.min(limit);
            }
        }

        log_debug!(
            config.verbosity,
            "[cpm] backward task {id}: ls {} lf {finish}",
            finish - duration
        );
        latest_finish.insert(id, finish);
        latest_start.insert(id, finish - duration);
    }

    Ok((latest_start, latest_finish))
}
