//! Project and resource aggregates.
//!
//! `ProjectPlan` owns the task arena for one project; `ResourcePool` owns
//! the resources visible to the application. Both keep insertion order so
//! every query and tie-break is deterministic across runs. All mutation
//! goes through the operations here and in [`crate::graph`],
//! [`crate::capacity`] and [`crate::allocation`]; callers never touch the
//! collections directly.

use chrono::NaiveDate;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;
use crate::models::{ProjectId, Resource, ResourceId, Task, TaskId, TaskState};

/// The task arena for a single project, plus the project-level date bounds
/// consumed by the critical path pass.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProjectPlan {
    pub id: ProjectId,
    pub name: String,
    /// Seed of the forward pass.
    pub start_date: NaiveDate,
    /// Earliest allowable finish; seed of the backward pass.
    pub finish_bound: NaiveDate,
    tasks: FxHashMap<TaskId, Task>,
    /// Insertion order; also the topological tie-break order.
    order: Vec<TaskId>,
}

impl ProjectPlan {
    /// Creates an empty plan.
    ///
    /// Fails with `InvalidRequest` if the finish bound precedes the start.
    pub fn new(
        id: ProjectId,
        name: impl Into<String>,
        start_date: NaiveDate,
        finish_bound: NaiveDate,
    ) -> Result<Self, ScheduleError> {
        if finish_bound < start_date {
            return Err(ScheduleError::InvalidRequest(format!(
                "finish bound {finish_bound} precedes project start {start_date}"
            )));
        }
        Ok(Self {
            id,
            name: name.into(),
            start_date,
            finish_bound,
            tasks: FxHashMap::default(),
            order: Vec::new(),
        })
    }

    /// Adds a task to the arena.
    pub fn insert_task(&mut self, task: Task) -> Result<(), ScheduleError> {
        if task.duration_days == 0 {
            return Err(ScheduleError::InvalidRequest(format!(
                "task {} has zero duration",
                task.id
            )));
        }
        if self.tasks.contains_key(&task.id) {
            return Err(ScheduleError::InvalidRequest(format!(
                "duplicate task id {}",
                task.id
            )));
        }
        self.order.push(task.id);
        self.tasks.insert(task.id, task);
        Ok(())
    }

    /// Removes a task from the arena.
    ///
    /// Fails if the task still holds resource commitments or if another
    /// task depends on it; the caller must release and unlink first.
    pub fn remove_task(&mut self, id: TaskId) -> Result<Task, ScheduleError> {
        let task = self.task(id)?;
        if task.has_needs() {
            return Err(ScheduleError::TaskHasResourcesAssigned(id));
        }
        if let Some(dependent) = self.iter_tasks().find(|t| t.depends_on(id)) {
            return Err(ScheduleError::InvalidRequest(format!(
                "task {} still depends on task {id}",
                dependent.id
            )));
        }
        self.order.retain(|&t| t != id);
        self.tasks
            .remove(&id)
            .ok_or(ScheduleError::TaskNotFound(id))
    }

    /// Looks up a task.
    pub fn task(&self, id: TaskId) -> Result<&Task, ScheduleError> {
        self.tasks.get(&id).ok_or(ScheduleError::TaskNotFound(id))
    }

    pub(crate) fn task_mut(&mut self, id: TaskId) -> Result<&mut Task, ScheduleError> {
        self.tasks
            .get_mut(&id)
            .ok_or(ScheduleError::TaskNotFound(id))
    }

    /// Task ids in insertion order.
    pub fn task_ids(&self) -> &[TaskId] {
        &self.order
    }

    /// Tasks in insertion order.
    pub fn iter_tasks(&self) -> impl Iterator<Item = &Task> {
        self.order.iter().filter_map(|id| self.tasks.get(id))
    }

    /// Number of tasks.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the plan has no tasks.
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Moves a task from Pending or Blocked to InProgress and unblocks
    /// any start-to-start successor waiting only on this start.
    pub fn start_task(&mut self, id: TaskId) -> Result<(), ScheduleError> {
        self.transition(id, TaskState::InProgress)?;
        self.refresh_successors(id)
    }

    /// Moves a task from InProgress to Completed and unblocks any
    /// successor whose last blocking predecessor this was.
    pub fn complete_task(&mut self, id: TaskId) -> Result<(), ScheduleError> {
        self.transition(id, TaskState::Completed)?;
        self.refresh_successors(id)
    }

    fn refresh_successors(&mut self, id: TaskId) -> Result<(), ScheduleError> {
        let successors = crate::graph::successors(self, id)?;
        for succ in successors {
            crate::graph::refresh_blocked_state(self, succ)?;
        }
        Ok(())
    }

    fn transition(&mut self, id: TaskId, to: TaskState) -> Result<(), ScheduleError> {
        let task = self.task_mut(id)?;
        if !task.state.can_transition_to(to) {
            return Err(ScheduleError::InvalidStateTransition {
                task: id,
                from: task.state,
                to,
            });
        }
        task.state = to;
        Ok(())
    }

    /// Changes a task's duration.
    ///
    /// Rejected while resource commitments are attached, so committed
    /// usage intervals can never silently drift from the task window.
    pub fn modify_duration(&mut self, id: TaskId, duration_days: u32) -> Result<(), ScheduleError> {
        if duration_days == 0 {
            return Err(ScheduleError::InvalidRequest(format!(
                "task {id} duration must be at least one day"
            )));
        }
        self.guard_schedule_edit(id)?;
        let task = self.task_mut(id)?;
        task.duration_days = duration_days;
        if let Some(start) = task.earliest_start {
            task.set_earliest_start(start);
        }
        Ok(())
    }

    /// Changes a task's earliest start date, updating the derived finish.
    ///
    /// Subject to the same resource-commitment guard as `modify_duration`.
    pub fn modify_start_date(&mut self, id: TaskId, start: NaiveDate) -> Result<(), ScheduleError> {
        if start < self.start_date {
            return Err(ScheduleError::InvalidRequest(format!(
                "start {start} precedes project start {}",
                self.start_date
            )));
        }
        self.guard_schedule_edit(id)?;
        self.task_mut(id)?.set_earliest_start(start);
        Ok(())
    }

    /// Changes the earliest-allowable-finish bound.
    ///
    /// Only validated against the project start here; consistency with
    /// task dates is settled by the next recomputation.
    pub fn modify_finish_bound(&mut self, finish_bound: NaiveDate) -> Result<(), ScheduleError> {
        if finish_bound < self.start_date {
            return Err(ScheduleError::InvalidRequest(format!(
                "finish bound {finish_bound} precedes project start {}",
                self.start_date
            )));
        }
        self.finish_bound = finish_bound;
        Ok(())
    }

    /// Common guard for schedule-affecting edits: the task must not have
    /// started and must hold no resource commitments.
    pub(crate) fn guard_schedule_edit(&self, id: TaskId) -> Result<(), ScheduleError> {
        let task = self.task(id)?;
        if !task.state.is_editable() {
            return Err(ScheduleError::InvalidState {
                task: id,
                state: task.state,
            });
        }
        if task.has_needs() {
            return Err(ScheduleError::TaskHasResourcesAssigned(id));
        }
        Ok(())
    }
}

/// Resources shared across projects, in insertion order.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ResourcePool {
    resources: FxHashMap<ResourceId, Resource>,
    order: Vec<ResourceId>,
}

impl ResourcePool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a resource to the pool.
    pub fn insert_resource(&mut self, resource: Resource) -> Result<(), ScheduleError> {
        if resource.capacity == 0 {
            return Err(ScheduleError::InvalidRequest(format!(
                "resource {} has zero capacity",
                resource.id
            )));
        }
        if self.resources.contains_key(&resource.id) {
            return Err(ScheduleError::InvalidRequest(format!(
                "duplicate resource id {}",
                resource.id
            )));
        }
        self.order.push(resource.id);
        self.resources.insert(resource.id, resource);
        Ok(())
    }

    /// Looks up a resource.
    pub fn resource(&self, id: ResourceId) -> Result<&Resource, ScheduleError> {
        self.resources
            .get(&id)
            .ok_or(ScheduleError::ResourceNotFound(id))
    }

    pub(crate) fn resource_mut(&mut self, id: ResourceId) -> Result<&mut Resource, ScheduleError> {
        self.resources
            .get_mut(&id)
            .ok_or(ScheduleError::ResourceNotFound(id))
    }

    /// Resource ids in insertion order.
    pub fn resource_ids(&self) -> &[ResourceId] {
        &self.order
    }

    /// Resources in insertion order.
    pub fn iter_resources(&self) -> impl Iterator<Item = &Resource> {
        self.order.iter().filter_map(|id| self.resources.get(id))
    }
}
