//! Error types shared across the scheduling core.

use thiserror::Error;

use crate::models::{ResourceId, TaskId, TaskState};

/// Errors that can occur during scheduling and allocation.
///
/// Every operation validates eagerly and returns one of these without
/// applying any partial mutation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    #[error("dependency cycle detected at task {0}")]
    Cycle(TaskId),
    #[error("task {task} is in state {state:?}; operation requires Pending or Blocked")]
    InvalidState { task: TaskId, state: TaskState },
    #[error("invalid state transition for task {task}: {from:?} -> {to:?}")]
    InvalidStateTransition {
        task: TaskId,
        from: TaskState,
        to: TaskState,
    },
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),
    #[error("resource not found: {0}")]
    ResourceNotFound(ResourceId),
    #[error("task {task} has no dependency on task {predecessor}")]
    DependencyNotFound { task: TaskId, predecessor: TaskId },
    #[error("no matching usage interval on resource {0}")]
    UsageNotFound(ResourceId),
    #[error("task {task} holds no assignment for resource {resource}")]
    NeedNotFound { task: TaskId, resource: ResourceId },
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("resource {resource} capacity {capacity} exceeded by request for {requested}")]
    CapacityExceeded {
        resource: ResourceId,
        capacity: u32,
        requested: u32,
    },
    #[error("assignment of resource {resource} to task {task} conflicts with existing usage")]
    Conflict { task: TaskId, resource: ResourceId },
    #[error("task {0} still has resources assigned; release them before editing the schedule")]
    TaskHasResourcesAssigned(TaskId),
}
