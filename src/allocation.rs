//! Allocation resolver: validates resource requests against task windows,
//! searches for alternatives, and suggests reprogramming dates.
//!
//! The resolver never formats or delivers user-facing messages; it raises
//! structured [`PlanEvent`]s through the [`EventSink`] seam and leaves
//! notification to the surrounding service layer.

use chrono::NaiveDate;

use crate::config::PlanningConfig;
use crate::error::ScheduleError;
use crate::models::{MemberId, ResourceId, ResourceNeed, TaskId};
use crate::plan::{ProjectPlan, ResourcePool};
use crate::{log_changes, log_checks};

/// Structured notification raised by the resolver.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum PlanEvent {
    /// A capacity-bypassing assignment was applied.
    ForcedAssignment {
        task: TaskId,
        resource_name: String,
        project_name: String,
        members: Vec<MemberId>,
    },
    /// An alternative search over a resource type came back empty.
    NoAlternativeFound {
        resource_name: String,
        project_name: String,
        start: NaiveDate,
        end: NaiveDate,
        quantity: u32,
    },
    /// A feasible later start date was found for a conflicted request.
    ReprogramSuggested {
        task: TaskId,
        resource_name: String,
        project_name: String,
        proposed_start: NaiveDate,
    },
}

/// Receiver for resolver events; the notification collaborator implements
/// this at the service layer.
pub trait EventSink {
    fn publish(&mut self, event: PlanEvent);
}

/// Plain collector, used in tests and simple callers.
impl EventSink for Vec<PlanEvent> {
    fn publish(&mut self, event: PlanEvent) {
        self.push(event);
    }
}

/// Validates a resource request against the task's computed window and
/// commits it: the usage interval lands on the resource and the need on
/// the task. The default, non-destructive assignment path.
pub fn validate_and_assign(
    plan: &mut ProjectPlan,
    pool: &mut ResourcePool,
    task: TaskId,
    resource: ResourceId,
    quantity: u32,
    config: &PlanningConfig,
) -> Result<(), ScheduleError> {
    let capacity = pool.resource(resource)?.capacity;
    let (start, end) = task_window(plan, task)?;
    if quantity == 0 {
        return Err(ScheduleError::InvalidRequest(format!(
            "zero quantity requested for task {task}"
        )));
    }
    if quantity > capacity {
        return Err(ScheduleError::CapacityExceeded {
            resource,
            capacity,
            requested: quantity,
        });
    }
    if !pool.resource(resource)?.has_capacity(start, end, quantity)? {
        log_checks!(
            config.verbosity,
            "[alloc] task {task}: resource {resource} conflicts over [{start}, {end})"
        );
        return Err(ScheduleError::Conflict { task, resource });
    }

    pool.resource_mut(resource)?
        .add_usage(start, end, quantity, task)?;
    plan.task_mut(task)?
        .needs
        .push(ResourceNeed { resource, quantity });
    log_changes!(
        config.verbosity,
        "[alloc] task {task}: assigned {quantity} of resource {resource} over [{start}, {end})"
    );
    Ok(())
}

/// Commits an assignment without the conflict check, as an explicit,
/// audited override. The resulting overload is observable in the ledger
/// and every task member is notified through the sink.
pub fn force_assign(
    plan: &mut ProjectPlan,
    pool: &mut ResourcePool,
    task: TaskId,
    resource: ResourceId,
    quantity: u32,
    config: &PlanningConfig,
    sink: &mut dyn EventSink,
) -> Result<(), ScheduleError> {
    pool.resource(resource)?;
    let (start, end) = task_window(plan, task)?;

    pool.resource_mut(resource)?
        .add_usage_forced(start, end, quantity, task)?;
    plan.task_mut(task)?
        .needs
        .push(ResourceNeed { resource, quantity });

    let resource_name = pool.resource(resource)?.name.clone();
    let members = plan.task(task)?.members.clone();
    log_changes!(
        config.verbosity,
        "[alloc] task {task}: FORCED {quantity} of resource {resource} over [{start}, {end})"
    );
    sink.publish(PlanEvent::ForcedAssignment {
        task,
        resource_name,
        project_name: plan.name.clone(),
        members,
    });
    Ok(())
}

/// Resources of the same type as `original` that could satisfy the
/// request over `[start, end)`, in pool order.
///
/// Scope excludes the original itself and resources exclusive to other
/// projects. An empty result is the designed "nothing available"
/// outcome, not an error; it raises [`PlanEvent::NoAlternativeFound`].
pub fn find_alternatives_same_type(
    plan: &ProjectPlan,
    pool: &ResourcePool,
    original: ResourceId,
    start: NaiveDate,
    end: NaiveDate,
    quantity: u32,
    config: &PlanningConfig,
    sink: &mut dyn EventSink,
) -> Result<Vec<ResourceId>, ScheduleError> {
    let original_resource = pool.resource(original)?;
    if quantity == 0 || start >= end {
        return Err(ScheduleError::InvalidRequest(format!(
            "malformed alternative search [{start}, {end}) x{quantity}"
        )));
    }

    let mut alternatives = Vec::new();
    for candidate in pool.iter_resources() {
        if candidate.id == original
            || candidate.kind != original_resource.kind
            || !candidate.available_to(plan.id)
            || candidate.capacity < quantity
        {
            continue;
        }
        if candidate.has_capacity(start, end, quantity)? {
            alternatives.push(candidate.id);
        } else {
            log_checks!(
                config.verbosity,
                "[alloc] alternative {} rejected: no capacity over [{start}, {end})",
                candidate.id
            );
        }
    }

    if alternatives.is_empty() {
        sink.publish(PlanEvent::NoAlternativeFound {
            resource_name: original_resource.name.clone(),
            project_name: plan.name.clone(),
            start,
            end,
            quantity,
        });
    }
    Ok(alternatives)
}

/// Advisory query: the next date the resource could host the task for its
/// full duration. Mutates nothing; the caller decides whether to apply it
/// via `modify_start_date` followed by [`validate_and_assign`].
pub fn suggest_reprogram(
    plan: &ProjectPlan,
    pool: &ResourcePool,
    task: TaskId,
    resource: ResourceId,
    quantity: u32,
    today: NaiveDate,
    config: &PlanningConfig,
    sink: &mut dyn EventSink,
) -> Result<NaiveDate, ScheduleError> {
    let duration_days = plan.task(task)?.duration_days;
    let candidate = pool
        .resource(resource)?
        .next_available_date(duration_days, quantity, today, config)?;

    sink.publish(PlanEvent::ReprogramSuggested {
        task,
        resource_name: pool.resource(resource)?.name.clone(),
        project_name: plan.name.clone(),
        proposed_start: candidate,
    });
    Ok(candidate)
}

/// Releases an assignment: removes the usage interval held by the task on
/// the resource, then drops the need. Mirror image of
/// [`validate_and_assign`].
///
/// The removal is keyed by task id, not by the task's current window: a
/// recomputation may have moved the window since the assignment was
/// committed, and the release must still find the recorded interval.
pub fn release_assignment(
    plan: &mut ProjectPlan,
    pool: &mut ResourcePool,
    task: TaskId,
    resource: ResourceId,
    config: &PlanningConfig,
) -> Result<(), ScheduleError> {
    plan.task(task)?
        .needs
        .iter()
        .find(|n| n.resource == resource)
        .ok_or(ScheduleError::NeedNotFound { task, resource })?;

    let released = pool.resource_mut(resource)?.remove_usage_for_task(task)?;
    plan.task_mut(task)?
        .needs
        .retain(|n| n.resource != resource);
    log_changes!(
        config.verbosity,
        "[alloc] task {task}: released resource {resource} over [{}, {})",
        released.start,
        released.end
    );
    Ok(())
}

/// Tasks whose committed usage no longer matches their current window.
///
/// Dependency edits elsewhere in the graph can move a committed task's
/// dates on the next recomputation; this reports the drift so the caller
/// can release and re-assign. A reporting query, never an error.
pub fn verify_assignments(plan: &ProjectPlan, pool: &ResourcePool) -> Vec<TaskId> {
    let mut stale = Vec::new();
    for task in plan.iter_tasks() {
        if task.needs.is_empty() {
            continue;
        }
        let consistent = task.window().is_some_and(|(start, end)| {
            task.needs.iter().all(|need| {
                pool.resource(need.resource).is_ok_and(|r| {
                    r.usage.iter().any(|u| {
                        u.task == task.id
                            && u.start == start
                            && u.end == end
                            && u.quantity == need.quantity
                    })
                })
            })
        });
        if !consistent {
            stale.push(task.id);
        }
    }
    stale
}

fn task_window(plan: &ProjectPlan, task: TaskId) -> Result<(NaiveDate, NaiveDate), ScheduleError> {
    plan.task(task)?.window().ok_or_else(|| {
        ScheduleError::InvalidRequest(format!("task {task} has no computed schedule window"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DependencyKind, Resource, Task};

    fn d(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    fn config() -> PlanningConfig {
        PlanningConfig::default()
    }

    /// Plan with one 5-day task scheduled Jan 10-15, and a pool with one
    /// Backend resource of the given capacity.
    fn fixture(capacity: u32) -> (ProjectPlan, ResourcePool) {
        let mut plan = ProjectPlan::new(1, "website", d(2025, 1, 1), d(2025, 12, 31)).unwrap();
        plan.insert_task(Task::new(1, 5).with_member(70).with_member(71))
            .unwrap();
        plan.modify_start_date(1, d(2025, 1, 10)).unwrap();

        let mut pool = ResourcePool::new();
        pool.insert_resource(
            Resource::new(10, "Backend", capacity).with_name("build-server"),
        )
        .unwrap();
        (plan, pool)
    }

    #[test]
    fn test_validate_and_assign_success() {
        let (mut plan, mut pool) = fixture(2);
        validate_and_assign(&mut plan, &mut pool, 1, 10, 1, &config()).unwrap();

        assert_eq!(
            plan.task(1).unwrap().needs,
            vec![ResourceNeed {
                resource: 10,
                quantity: 1
            }]
        );
        let usage = &pool.resource(10).unwrap().usage;
        assert_eq!(usage.len(), 1);
        assert_eq!(usage[0].start, d(2025, 1, 10));
        assert_eq!(usage[0].end, d(2025, 1, 15));
        assert_eq!(usage[0].task, 1);
    }

    #[test]
    fn test_assign_requires_window() {
        let (mut plan, mut pool) = fixture(2);
        plan.insert_task(Task::new(2, 3)).unwrap();
        assert!(matches!(
            validate_and_assign(&mut plan, &mut pool, 2, 10, 1, &config()).unwrap_err(),
            ScheduleError::InvalidRequest(_)
        ));
    }

    #[test]
    fn test_assign_unknown_resource_or_task() {
        let (mut plan, mut pool) = fixture(2);
        assert!(matches!(
            validate_and_assign(&mut plan, &mut pool, 1, 99, 1, &config()).unwrap_err(),
            ScheduleError::ResourceNotFound(99)
        ));
        assert!(matches!(
            validate_and_assign(&mut plan, &mut pool, 42, 10, 1, &config()).unwrap_err(),
            ScheduleError::TaskNotFound(42)
        ));
    }

    #[test]
    fn test_assign_quantity_over_capacity() {
        let (mut plan, mut pool) = fixture(2);
        assert!(matches!(
            validate_and_assign(&mut plan, &mut pool, 1, 10, 3, &config()).unwrap_err(),
            ScheduleError::CapacityExceeded {
                resource: 10,
                capacity: 2,
                requested: 3
            }
        ));
        assert!(plan.task(1).unwrap().needs.is_empty());
    }

    #[test]
    fn test_conflict_mutates_nothing_while_force_bypasses() {
        let (mut plan, mut pool) = fixture(1);
        plan.insert_task(Task::new(2, 5)).unwrap();
        plan.modify_start_date(2, d(2025, 1, 10)).unwrap();

        validate_and_assign(&mut plan, &mut pool, 1, 10, 1, &config()).unwrap();

        // Identical request for the overlapping window: the checked path
        // fails and adds nothing
        assert!(matches!(
            validate_and_assign(&mut plan, &mut pool, 2, 10, 1, &config()).unwrap_err(),
            ScheduleError::Conflict {
                task: 2,
                resource: 10
            }
        ));
        assert!(plan.task(2).unwrap().needs.is_empty());
        assert_eq!(pool.resource(10).unwrap().usage.len(), 1);

        // The forced path succeeds, overloads observably, and notifies
        let mut events: Vec<PlanEvent> = Vec::new();
        force_assign(&mut plan, &mut pool, 2, 10, 1, &config(), &mut events).unwrap();
        assert_eq!(pool.resource(10).unwrap().usage.len(), 2);
        assert!(plan.task(2).unwrap().has_needs());
        assert_eq!(
            events,
            vec![PlanEvent::ForcedAssignment {
                task: 2,
                resource_name: "build-server".to_string(),
                project_name: "website".to_string(),
                members: vec![],
            }]
        );
    }

    #[test]
    fn test_find_alternatives_same_type() {
        let (mut plan, mut pool) = fixture(1);
        pool.insert_resource(Resource::new(11, "Backend", 5).with_name("spare"))
            .unwrap();
        pool.insert_resource(Resource::new(12, "Frontend", 5)).unwrap();
        // Exclusive to another project: out of scope
        pool.insert_resource(Resource::new(13, "Backend", 5).with_project(2))
            .unwrap();

        // Fully book the original over the search window
        validate_and_assign(&mut plan, &mut pool, 1, 10, 1, &config()).unwrap();

        let mut events: Vec<PlanEvent> = Vec::new();
        let found = find_alternatives_same_type(
            &plan,
            &pool,
            10,
            d(2025, 1, 10),
            d(2025, 1, 15),
            1,
            &config(),
            &mut events,
        )
        .unwrap();
        assert_eq!(found, vec![11]);
        assert!(events.is_empty());
    }

    #[test]
    fn test_no_alternative_is_empty_result_with_event() {
        let (plan, mut pool) = fixture(1);
        // Same type but too small for the requested quantity
        pool.insert_resource(Resource::new(11, "Backend", 1)).unwrap();

        let mut events: Vec<PlanEvent> = Vec::new();
        let found = find_alternatives_same_type(
            &plan,
            &pool,
            10,
            d(2025, 1, 10),
            d(2025, 1, 15),
            2,
            &config(),
            &mut events,
        )
        .unwrap();
        assert!(found.is_empty());
        assert_eq!(
            events,
            vec![PlanEvent::NoAlternativeFound {
                resource_name: "build-server".to_string(),
                project_name: "website".to_string(),
                start: d(2025, 1, 10),
                end: d(2025, 1, 15),
                quantity: 2,
            }]
        );
    }

    #[test]
    fn test_suggest_reprogram_is_pure() {
        let (mut plan, mut pool) = fixture(1);
        validate_and_assign(&mut plan, &mut pool, 1, 10, 1, &config()).unwrap();

        plan.insert_task(Task::new(2, 4)).unwrap();
        plan.modify_start_date(2, d(2025, 1, 10)).unwrap();

        let usage_before = pool.resource(10).unwrap().usage.clone();
        let mut events: Vec<PlanEvent> = Vec::new();
        let proposed = suggest_reprogram(
            &plan,
            &pool,
            2,
            10,
            1,
            d(2025, 1, 10),
            &config(),
            &mut events,
        )
        .unwrap();

        assert_eq!(proposed, d(2025, 1, 15));
        assert_eq!(pool.resource(10).unwrap().usage, usage_before);
        assert_eq!(plan.task(2).unwrap().needs, vec![]);
        assert_eq!(
            events,
            vec![PlanEvent::ReprogramSuggested {
                task: 2,
                resource_name: "build-server".to_string(),
                project_name: "website".to_string(),
                proposed_start: d(2025, 1, 15),
            }]
        );
    }

    #[test]
    fn test_release_mirrors_assignment() {
        let (mut plan, mut pool) = fixture(1);
        validate_and_assign(&mut plan, &mut pool, 1, 10, 1, &config()).unwrap();

        release_assignment(&mut plan, &mut pool, 1, 10, &config()).unwrap();
        assert!(plan.task(1).unwrap().needs.is_empty());
        assert!(pool.resource(10).unwrap().usage.is_empty());

        // Released tasks are schedule-editable again
        plan.modify_duration(1, 3).unwrap();

        assert!(matches!(
            release_assignment(&mut plan, &mut pool, 1, 10, &config()).unwrap_err(),
            ScheduleError::NeedNotFound {
                task: 1,
                resource: 10
            }
        ));
    }

    #[test]
    fn test_release_after_window_drift() {
        // Editing a predecessor moves the committed task's window on the
        // next recomputation; release must still find the reservation.
        let mut plan = ProjectPlan::new(1, "website", d(2025, 1, 1), d(2025, 12, 31)).unwrap();
        plan.insert_task(Task::new(1, 2)).unwrap();
        plan.insert_task(Task::new(2, 3)).unwrap();
        crate::graph::add_dependency(&mut plan, 2, 1, DependencyKind::FinishToStart).unwrap();
        crate::critical_path::recompute(&mut plan, &config()).unwrap();

        let mut pool = ResourcePool::new();
        pool.insert_resource(Resource::new(10, "Backend", 1)).unwrap();
        validate_and_assign(&mut plan, &mut pool, 2, 10, 1, &config()).unwrap();

        plan.modify_duration(1, 5).unwrap();
        crate::critical_path::recompute(&mut plan, &config()).unwrap();
        assert_eq!(verify_assignments(&plan, &pool), vec![2]);

        release_assignment(&mut plan, &mut pool, 2, 10, &config()).unwrap();
        assert!(plan.task(2).unwrap().needs.is_empty());
        assert!(pool.resource(10).unwrap().usage.is_empty());
        assert!(verify_assignments(&plan, &pool).is_empty());
    }

    #[test]
    fn test_verify_assignments_detects_drift() {
        let (mut plan, mut pool) = fixture(2);
        validate_and_assign(&mut plan, &mut pool, 1, 10, 1, &config()).unwrap();
        assert!(verify_assignments(&plan, &pool).is_empty());

        // Move the window behind the resolver's back; the recorded usage
        // interval is now stale
        plan.task_mut(1).unwrap().set_earliest_start(d(2025, 2, 1));
        assert_eq!(verify_assignments(&plan, &pool), vec![1]);
    }

    #[test]
    fn test_assignment_locks_schedule_until_release() {
        let (mut plan, mut pool) = fixture(2);
        plan.insert_task(Task::new(2, 2)).unwrap();
        validate_and_assign(&mut plan, &mut pool, 1, 10, 1, &config()).unwrap();

        assert!(matches!(
            plan.modify_duration(1, 9).unwrap_err(),
            ScheduleError::TaskHasResourcesAssigned(1)
        ));
        assert!(matches!(
            plan.modify_start_date(1, d(2025, 3, 1)).unwrap_err(),
            ScheduleError::TaskHasResourcesAssigned(1)
        ));
        assert!(matches!(
            crate::graph::add_dependency(
                &mut plan,
                1,
                2,
                crate::models::DependencyKind::FinishToStart
            )
            .unwrap_err(),
            ScheduleError::TaskHasResourcesAssigned(1)
        ));

        release_assignment(&mut plan, &mut pool, 1, 10, &config()).unwrap();
        plan.modify_duration(1, 9).unwrap();
    }
}
