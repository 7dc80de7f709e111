//! Core types for change-set based stack updates

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One unit of managed infrastructure state, identified by name
///
/// Names are path-like (`network/vpc`) and unique within a project.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Stack {
    pub name: String,
}

impl Stack {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl fmt::Display for Stack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Stacks with no dependencies among each other
pub type Batch = Vec<Stack>;

/// Batches in the order they must be processed
pub type LaunchOrder = Vec<Batch>;

/// Per-stack results, ordered by stack name
pub type StackMap<T> = BTreeMap<Stack, T>;

/// Label identifying one change set attempt for one batch
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeSetLabel(String);

impl ChangeSetLabel {
    pub fn new(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChangeSetLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Status a change set reports for one stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeSetStatus {
    /// Requested but not yet being computed
    Pending,
    /// Being computed by the provider
    InProgress,
    /// Computed and executable
    Ready,
    /// Could not be computed (including "no changes")
    Failed,
    /// Superseded by a newer stack state, can no longer be executed
    Obsolete,
}

impl ChangeSetStatus {
    /// Whether waiting on this status can stop
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending | Self::InProgress)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

impl fmt::Display for ChangeSetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::InProgress => "IN_PROGRESS",
            Self::Ready => "READY",
            Self::Failed => "FAILED",
            Self::Obsolete => "OBSOLETE",
        };
        f.write_str(s)
    }
}

/// What a change does to a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeAction {
    Add,
    Modify,
    Remove,
}

impl fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Add => "Add",
            Self::Modify => "Modify",
            Self::Remove => "Remove",
        };
        f.write_str(s)
    }
}

/// Whether a modification replaces the underlying resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Replacement {
    True,
    False,
    Conditional,
}

/// A single attribute-level detail of a change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChangeDetail {
    pub attribute: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_source: Option<String>,
}

/// One resource-level entry in a change set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Change {
    pub action: ChangeAction,
    pub logical_resource_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physical_resource_id: Option<String>,
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replacement: Option<Replacement>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scope: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<ChangeDetail>,
}

/// Full description of a change set for one stack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ChangeSetDescription {
    pub change_set_name: String,
    pub stack_name: String,
    pub status: ChangeSetStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, String>,
    #[serde(default)]
    pub changes: Vec<Change>,
}

impl ChangeSetDescription {
    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }
}

/// Terminal result of updating one stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StackStatus {
    Complete,
    InProgress,
    Failed,
    /// Never attempted, e.g. because a dependency failed
    Pending,
}

impl StackStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

impl fmt::Display for StackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Complete => "complete",
            Self::InProgress => "in progress",
            Self::Failed => "failed",
            Self::Pending => "pending",
        };
        f.write_str(s)
    }
}

/// Options for a change-set update run
#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
    /// Print full change set descriptions instead of simplified ones
    pub verbose: bool,
    /// Skip confirmation prompts
    pub auto_approve: bool,
}

/// Result of processing one batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Batch processed; holds outcomes of the stacks that were executed
    Completed { outcomes: StackMap<StackStatus> },
    /// The operator declined to proceed
    Declined,
}

/// Result of a whole update run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Completed(StackMap<StackStatus>),
    /// The operator declined a batch; `applied` holds stacks earlier batches
    /// already executed
    Declined { applied: StackMap<StackStatus> },
}
