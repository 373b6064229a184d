//! Planning module for provisioning operations.
//!
//! This module compares the configuration against recorded state and
//! generates and executes plans that bring Azure in line with it.

mod diff;
mod plan;
mod executor;

pub use diff::{DiffEngine, DiffResult, DiffType, ResourceDiff};
pub use plan::{ActionType, PlannedAction, ProvisionPlan};
pub use executor::{ActionResult, ExecutionResult, PlanExecutor, RefreshResult};
