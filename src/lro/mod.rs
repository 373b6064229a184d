//! Long-running operation (LRO) support.
//!
//! Remote create and delete calls against Azure Resource Manager return a
//! handle rather than a finished resource. This module separates initiating
//! an operation, polling its handle, and interpreting the outcome so every
//! resource type can share one reconcile loop.

mod operation;
mod reconciler;

pub use operation::{OperationFailure, OperationHandle, OperationStatus, PollKind, PollOutcome};
pub use reconciler::{LroReconciler, OperationContext, OperationPoller, PollSettings};
