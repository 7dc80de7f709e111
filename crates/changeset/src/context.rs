//! Collaborator traits
//!
//! These traits allow the changeset crate to be used without depending on
//! a specific dependency resolver, infrastructure provider, prompt library
//! or output format.

use crate::filter::RenderedDescription;
use crate::types::{
    ChangeSetDescription, ChangeSetLabel, ChangeSetStatus, LaunchOrder, Stack, StackMap,
    StackStatus,
};
use anyhow::Result;
use std::fmt;

/// Operations an execution engine can run over a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateChangeSet,
    WaitForChangeSet,
    DescribeChangeSet,
    ExecuteChangeSet,
    DeleteChangeSet,
    Update,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateChangeSet => "create_change_set",
            Self::WaitForChangeSet => "wait_for_change_set",
            Self::DescribeChangeSet => "describe_change_set",
            Self::ExecuteChangeSet => "execute_change_set",
            Self::DeleteChangeSet => "delete_change_set",
            Self::Update => "update",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolves the stacks of a command into a launch order
pub trait PlanResolver {
    /// Resolve the plan for an operation. Called once per invocation.
    fn resolve(&mut self, operation: Operation) -> Result<()>;

    /// Batches in dependency order. Empty until `resolve` succeeds.
    fn launch_order(&self) -> &LaunchOrder;
}

/// Runs one operation against every stack of a batch
///
/// Implementations must return an entry for every stack passed in, even
/// when some stacks fail. Expected per-stack failures are reported through
/// the result values; `Err` is reserved for engine-level faults.
pub trait ExecutionEngine {
    fn create_change_set(&self, batch: &[Stack], label: &ChangeSetLabel) -> Result<StackMap<()>>;

    /// Block until every stack's change set reaches a terminal status
    fn wait_for_change_set(
        &self,
        batch: &[Stack],
        label: &ChangeSetLabel,
    ) -> Result<StackMap<ChangeSetStatus>>;

    fn describe_change_set(
        &self,
        batch: &[Stack],
        label: &ChangeSetLabel,
    ) -> Result<StackMap<ChangeSetDescription>>;

    fn execute_change_set(
        &self,
        batch: &[Stack],
        label: &ChangeSetLabel,
    ) -> Result<StackMap<StackStatus>>;

    fn delete_change_set(&self, batch: &[Stack], label: &ChangeSetLabel) -> Result<StackMap<()>>;

    /// Update every stack directly, respecting the launch order internally
    fn update(&self, launch_order: &LaunchOrder) -> Result<StackMap<StackStatus>>;
}

/// Destination for operator-facing output
///
/// Purely presentational: implementations must not influence control flow.
pub trait OutputSink {
    /// Render a change set description for one stack
    fn write_description(&mut self, stack: &Stack, description: &RenderedDescription<'_>);

    /// Render a plain text line
    fn write_line(&mut self, line: &str);
}

/// Sink that discards all output
pub struct NoOutput;

impl OutputSink for NoOutput {
    fn write_description(&mut self, _stack: &Stack, _description: &RenderedDescription<'_>) {}
    fn write_line(&mut self, _line: &str) {}
}

/// Confirmation callback for user interaction
pub trait ConfirmCallback {
    /// Ask the user to confirm an action
    ///
    /// # Returns
    /// `true` if the user confirmed, `false` otherwise
    fn confirm(&mut self, prompt: &str) -> Result<bool>;
}

/// Auto-confirm callback (always returns true)
pub struct AutoConfirm;

impl ConfirmCallback for AutoConfirm {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(true)
    }
}

/// Auto-decline callback (always returns false)
pub struct AutoDecline;

impl ConfirmCallback for AutoDecline {
    fn confirm(&mut self, _prompt: &str) -> Result<bool> {
        Ok(false)
    }
}

/// Source of change set labels
pub trait LabelSource {
    /// Produce a label not used before by this or any other invocation
    fn next_label(&mut self) -> ChangeSetLabel;
}
