//! Core data types for the scheduling and allocation system.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

/// Task identifier, assigned by the persistence layer.
pub type TaskId = u32;
/// Resource identifier, assigned by the persistence layer.
pub type ResourceId = u32;
/// Project identifier, assigned by the persistence layer.
pub type ProjectId = u32;
/// Member identifier, assigned by the persistence layer.
pub type MemberId = u32;

/// Lifecycle state of a task.
///
/// Legal caller-driven transitions are `Pending/Blocked -> InProgress ->
/// Completed`. The `Pending <-> Blocked` pair is a dependency side effect
/// maintained by the core, never requested directly.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskState {
    /// Ready to start; no blocking predecessor.
    Pending,
    /// Waiting on at least one incomplete predecessor.
    Blocked,
    /// Work has started; the dependency set and dates are frozen.
    InProgress,
    /// Terminal state.
    Completed,
}

impl TaskState {
    /// Whether schedule edits (dependencies, dates, duration) are still allowed.
    pub fn is_editable(self) -> bool {
        matches!(self, TaskState::Pending | TaskState::Blocked)
    }

    /// Whether a caller-requested transition to `to` is legal.
    pub fn can_transition_to(self, to: TaskState) -> bool {
        matches!(
            (self, to),
            (TaskState::Pending, TaskState::InProgress)
                | (TaskState::Blocked, TaskState::InProgress)
                | (TaskState::InProgress, TaskState::Completed)
        )
    }
}

/// How a predecessor's dates constrain a dependent task's dates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DependencyKind {
    /// Dependent may not start before the predecessor finishes.
    FinishToStart,
    /// Dependent may not start before the predecessor starts.
    StartToStart,
    /// Dependent may not finish before the predecessor finishes.
    FinishToFinish,
}

impl std::fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code = match self {
            DependencyKind::FinishToStart => "FS",
            DependencyKind::StartToStart => "SS",
            DependencyKind::FinishToFinish => "FF",
        };
        write!(f, "{code}")
    }
}

/// A typed, non-owning edge to a predecessor task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub predecessor: TaskId,
    pub kind: DependencyKind,
}

/// A quantity of a resource required by a task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceNeed {
    pub resource: ResourceId,
    pub quantity: u32,
}

/// A committed reservation of resource quantity over a half-open date range.
///
/// Intervals are never merged; each allocation stays distinct so it can be
/// removed later by exact match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageInterval {
    /// First committed day (inclusive).
    pub start: NaiveDate,
    /// Day after the last committed day (exclusive).
    pub end: NaiveDate,
    /// Units in use over the range.
    pub quantity: u32,
    /// Task the reservation belongs to.
    pub task: TaskId,
}

impl UsageInterval {
    /// Whether this interval overlaps the half-open range `[start, end)`.
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.start < end && start < self.end
    }

    /// Whether this interval covers the given instant.
    pub fn covers(&self, instant: NaiveDate) -> bool {
        self.start <= instant && instant < self.end
    }
}

/// A task to be scheduled.
///
/// Scheduling fields (`earliest_start` through `critical`) are written by
/// the critical path pass; everything else is caller-supplied.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    /// Working duration in whole days (>= 1).
    pub duration_days: u32,
    /// Earliest start date; `None` until scheduled.
    pub earliest_start: Option<NaiveDate>,
    /// Derived: `earliest_start + duration_days`.
    pub earliest_finish: Option<NaiveDate>,
    /// Latest start date from the backward pass.
    pub latest_start: Option<NaiveDate>,
    /// Latest finish date from the backward pass.
    pub latest_finish: Option<NaiveDate>,
    /// Slack in days; `None` until computed.
    pub slack: Option<i64>,
    /// Whether the task sits on the critical path (zero slack).
    pub critical: bool,
    pub state: TaskState,
    /// Typed edges to predecessor tasks.
    pub dependencies: Vec<Dependency>,
    /// Members assigned to work on this task.
    pub members: Vec<MemberId>,
    /// Resource commitments held by this task.
    pub needs: Vec<ResourceNeed>,
}

impl Task {
    /// Creates a new pending task with the given id and duration.
    pub fn new(id: TaskId, duration_days: u32) -> Self {
        Self {
            id,
            title: String::new(),
            description: String::new(),
            duration_days,
            earliest_start: None,
            earliest_finish: None,
            latest_start: None,
            latest_finish: None,
            slack: None,
            critical: false,
            state: TaskState::Pending,
            dependencies: Vec::new(),
            members: Vec::new(),
            needs: Vec::new(),
        }
    }

    /// Sets the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Adds an assigned member.
    pub fn with_member(mut self, member: MemberId) -> Self {
        self.members.push(member);
        self
    }

    /// The scheduled window `[earliest_start, earliest_finish)`, if computed.
    pub fn window(&self) -> Option<(NaiveDate, NaiveDate)> {
        match (self.earliest_start, self.earliest_finish) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => None,
        }
    }

    /// Whether any resource commitment is attached.
    pub fn has_needs(&self) -> bool {
        !self.needs.is_empty()
    }

    /// Whether this task has a direct dependency on `predecessor`.
    pub fn depends_on(&self, predecessor: TaskId) -> bool {
        self.dependencies
            .iter()
            .any(|d| d.predecessor == predecessor)
    }

    /// Sets `earliest_start` and the derived `earliest_finish`.
    pub(crate) fn set_earliest_start(&mut self, start: NaiveDate) {
        self.earliest_start = Some(start);
        self.earliest_finish = start.checked_add_days(Days::new(self.duration_days as u64));
    }
}

/// A shared resource with a simultaneous-use capacity ceiling.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub name: String,
    /// Resource type used by the alternative search (e.g. "Backend").
    pub kind: String,
    pub description: String,
    /// Maximum quantity in simultaneous use (>= 1).
    pub capacity: u32,
    /// Owning project; presence makes the resource exclusive to it.
    pub project: Option<ProjectId>,
    /// Committed reservations, in insertion order.
    pub usage: Vec<UsageInterval>,
}

impl Resource {
    /// Creates a new resource of the given type and capacity.
    pub fn new(id: ResourceId, kind: impl Into<String>, capacity: u32) -> Self {
        Self {
            id,
            name: String::new(),
            kind: kind.into(),
            description: String::new(),
            capacity,
            project: None,
            usage: Vec::new(),
        }
    }

    /// Sets the name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Marks the resource exclusive to a project.
    pub fn with_project(mut self, project: ProjectId) -> Self {
        self.project = Some(project);
        self
    }

    /// Whether the resource is usable from within `project`.
    ///
    /// Unowned resources are usable everywhere; owned resources only by
    /// their project.
    pub fn available_to(&self, project: ProjectId) -> bool {
        self.project.is_none() || self.project == Some(project)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_task_builder() {
        let task = Task::new(1, 5)
            .with_title("Design schema")
            .with_description("Initial data model")
            .with_member(7);

        assert_eq!(task.id, 1);
        assert_eq!(task.duration_days, 5);
        assert_eq!(task.title, "Design schema");
        assert_eq!(task.state, TaskState::Pending);
        assert_eq!(task.members, vec![7]);
        assert!(task.window().is_none());
        assert!(!task.has_needs());
    }

    #[test]
    fn test_derived_finish() {
        let mut task = Task::new(1, 3);
        task.set_earliest_start(d(2025, 3, 10));
        assert_eq!(task.window(), Some((d(2025, 3, 10), d(2025, 3, 13))));
    }

    #[test]
    fn test_state_transitions() {
        assert!(TaskState::Pending.can_transition_to(TaskState::InProgress));
        assert!(TaskState::Blocked.can_transition_to(TaskState::InProgress));
        assert!(TaskState::InProgress.can_transition_to(TaskState::Completed));

        assert!(!TaskState::Pending.can_transition_to(TaskState::Completed));
        assert!(!TaskState::Completed.can_transition_to(TaskState::Pending));
        assert!(!TaskState::Completed.can_transition_to(TaskState::InProgress));
        assert!(!TaskState::InProgress.can_transition_to(TaskState::Pending));
    }

    #[test]
    fn test_dependency_kind_codes() {
        assert_eq!(DependencyKind::FinishToStart.to_string(), "FS");
        assert_eq!(DependencyKind::StartToStart.to_string(), "SS");
        assert_eq!(DependencyKind::FinishToFinish.to_string(), "FF");
    }

    #[test]
    fn test_usage_interval_overlap() {
        let interval = UsageInterval {
            start: d(2025, 1, 10),
            end: d(2025, 1, 15),
            quantity: 1,
            task: 1,
        };
        assert!(interval.overlaps(d(2025, 1, 12), d(2025, 1, 20)));
        assert!(interval.overlaps(d(2025, 1, 1), d(2025, 1, 11)));
        // Half-open: touching at a boundary is not an overlap
        assert!(!interval.overlaps(d(2025, 1, 15), d(2025, 1, 20)));
        assert!(!interval.overlaps(d(2025, 1, 1), d(2025, 1, 10)));
        assert!(interval.covers(d(2025, 1, 10)));
        assert!(!interval.covers(d(2025, 1, 15)));
    }

    #[test]
    fn test_resource_exclusivity() {
        let shared = Resource::new(1, "Backend", 2).with_name("Build server");
        assert!(shared.available_to(10));
        assert!(shared.available_to(11));

        let owned = Resource::new(2, "Backend", 1).with_project(10);
        assert!(owned.available_to(10));
        assert!(!owned.available_to(11));
    }

    #[test]
    fn test_task_serde_round_trip() {
        let mut task = Task::new(3, 4).with_title("Integrate payments");
        task.set_earliest_start(d(2025, 6, 2));
        task.dependencies.push(Dependency {
            predecessor: 1,
            kind: DependencyKind::FinishToStart,
        });

        let json = serde_json::to_string(&task).unwrap();
        let back: Task = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, task.id);
        assert_eq!(back.window(), task.window());
        assert_eq!(back.dependencies, task.dependencies);
    }
}
