//! Change set description rendering
//!
//! Descriptions are shown either in full (verbose) or reduced to the fields
//! an operator needs to review a change.

use crate::types::{
    Change, ChangeAction, ChangeSetDescription, ChangeSetStatus, Replacement,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// A change reduced to its identity and effect
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SimplifiedChange {
    pub action: ChangeAction,
    pub logical_resource_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub physical_resource_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replacement: Option<Replacement>,
    pub resource_type: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub scope: Vec<String>,
}

impl From<&Change> for SimplifiedChange {
    fn from(change: &Change) -> Self {
        Self {
            action: change.action,
            logical_resource_id: change.logical_resource_id.clone(),
            physical_resource_id: change.physical_resource_id.clone(),
            replacement: change.replacement,
            resource_type: change.resource_type.clone(),
            scope: change.scope.clone(),
        }
    }
}

/// A description without status detail, parameters or per-attribute changes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SimplifiedDescription {
    pub change_set_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub execution_status: Option<String>,
    pub stack_name: String,
    pub changes: Vec<SimplifiedChange>,
}

impl From<&ChangeSetDescription> for SimplifiedDescription {
    fn from(description: &ChangeSetDescription) -> Self {
        Self {
            change_set_name: description.change_set_name.clone(),
            creation_time: description.creation_time,
            execution_status: description.execution_status.clone(),
            stack_name: description.stack_name.clone(),
            changes: description.changes.iter().map(SimplifiedChange::from).collect(),
        }
    }
}

/// A description ready to hand to an output sink
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RenderedDescription<'a> {
    Full(&'a ChangeSetDescription),
    Simplified(SimplifiedDescription),
}

impl RenderedDescription<'_> {
    pub fn stack_name(&self) -> &str {
        match self {
            Self::Full(d) => &d.stack_name,
            Self::Simplified(d) => &d.stack_name,
        }
    }

    pub fn change_set_name(&self) -> &str {
        match self {
            Self::Full(d) => &d.change_set_name,
            Self::Simplified(d) => &d.change_set_name,
        }
    }

    pub fn change_count(&self) -> usize {
        match self {
            Self::Full(d) => d.changes.len(),
            Self::Simplified(d) => d.changes.len(),
        }
    }

    /// Changes as (action, logical id, resource type, replacement)
    pub fn change_lines(&self) -> Vec<(ChangeAction, &str, &str, Option<Replacement>)> {
        match self {
            Self::Full(d) => d
                .changes
                .iter()
                .map(|c| {
                    (
                        c.action,
                        c.logical_resource_id.as_str(),
                        c.resource_type.as_str(),
                        c.replacement,
                    )
                })
                .collect(),
            Self::Simplified(d) => d
                .changes
                .iter()
                .map(|c| {
                    (
                        c.action,
                        c.logical_resource_id.as_str(),
                        c.resource_type.as_str(),
                        c.replacement,
                    )
                })
                .collect(),
        }
    }
}

/// Render a description in full (verbose) or simplified form
pub fn render(description: &ChangeSetDescription, verbose: bool) -> RenderedDescription<'_> {
    if verbose {
        RenderedDescription::Full(description)
    } else {
        RenderedDescription::Simplified(SimplifiedDescription::from(description))
    }
}

/// Whether a stack has nothing to do: not ready and no changes
pub fn is_noop(status: ChangeSetStatus, description: Option<&ChangeSetDescription>) -> bool {
    !status.is_ready() && description.is_none_or(|d| !d.has_changes())
}

/// Notice emitted for a stack whose change set holds nothing to apply
pub fn skip_notice(stack_name: &str, label: &str) -> String {
    format!("{} No changes in change set: {}", stack_name, label)
}
