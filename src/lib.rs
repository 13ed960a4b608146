//! Dependency-aware scheduling and resource allocation for project plans.
//!
//! This crate provides the data structures and algorithms behind a project
//! tracker: critical-path computation over typed dependency graphs, a
//! capacity ledger for shared resources, and an allocation resolver that
//! keeps task windows and resource commitments consistent.

pub mod allocation;
pub mod capacity;
pub mod config;
pub mod critical_path;
pub mod error;
pub mod graph;
pub mod logging;
pub mod models;
pub mod plan;

pub use allocation::{
    find_alternatives_same_type, force_assign, release_assignment, suggest_reprogram,
    validate_and_assign, verify_assignments, EventSink, PlanEvent,
};
pub use config::PlanningConfig;
pub use critical_path::{recompute, ScheduleSummary};
pub use error::ScheduleError;
pub use graph::{add_dependency, remove_dependency, topological_order};
pub use models::{
    Dependency, DependencyKind, MemberId, ProjectId, Resource, ResourceId, ResourceNeed, Task,
    TaskId, TaskState, UsageInterval,
};
pub use plan::{ProjectPlan, ResourcePool};
