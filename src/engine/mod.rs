//! Execution engine for stackctl
//!
//! The engine runs change set operations over a batch:
//! 1. Fan out - one provider call per stack on a thread pool
//! 2. Collect - results keyed by stack
//! 3. Report - provider faults either fail the stack or abort the batch

pub mod executor;
pub mod local;

use anyhow::Result;
use changeset::{ChangeSetDescription, ChangeSetLabel, ChangeSetStatus, StackStatus};

pub use executor::PlanExecutor;
pub use local::LocalProvider;

/// Per-stack access to the infrastructure being managed
pub trait StackProvider: Send + Sync {
    fn create_change_set(&self, stack: &str, label: &ChangeSetLabel) -> Result<()>;

    /// Current status of a change set, without blocking
    fn change_set_status(&self, stack: &str, label: &ChangeSetLabel) -> Result<ChangeSetStatus>;

    fn describe_change_set(&self, stack: &str, label: &ChangeSetLabel)
    -> Result<ChangeSetDescription>;

    fn execute_change_set(&self, stack: &str, label: &ChangeSetLabel) -> Result<StackStatus>;

    /// Remove a change set. Removing one that doesn't exist is not an error.
    fn delete_change_set(&self, stack: &str, label: &ChangeSetLabel) -> Result<()>;

    /// Apply the stack's current config directly
    fn update(&self, stack: &str) -> Result<StackStatus>;
}
