//! Error types for change set workflows.
//!
//! Engine faults carry the operation and label they happened under so the
//! operator can find (and if needed remove) the change set by hand.

use crate::context::Operation;
use crate::types::ChangeSetLabel;
use thiserror::Error;

/// Errors that abort a change set workflow.
#[derive(Debug, Error)]
pub enum ChangeSetError {
    /// The execution engine failed while running an operation
    #[error("{operation} failed for change set {label}: {source}")]
    Engine {
        /// Operation that was running
        operation: Operation,
        /// Change set the operation targeted
        label: ChangeSetLabel,
        /// Underlying engine error
        #[source]
        source: anyhow::Error,
    },

    /// The change set could not be deleted after the batch was processed
    #[error("failed to delete change set {label}: {source}")]
    Cleanup {
        /// Change set that may have been left behind
        label: ChangeSetLabel,
        /// Underlying engine error
        #[source]
        source: anyhow::Error,
    },

    /// The direct update operation failed as a whole
    #[error("update failed: {0}")]
    Update(#[source] anyhow::Error),

    /// Asking the operator for confirmation failed
    #[error("confirmation failed: {0}")]
    Confirm(#[source] anyhow::Error),
}

impl ChangeSetError {
    pub(crate) fn engine(operation: Operation, label: &ChangeSetLabel, source: anyhow::Error) -> Self {
        Self::Engine {
            operation,
            label: label.clone(),
            source,
        }
    }

    /// Label of the change set involved, if any
    pub fn label(&self) -> Option<&ChangeSetLabel> {
        match self {
            Self::Engine { label, .. } | Self::Cleanup { label, .. } => Some(label),
            Self::Update(_) | Self::Confirm(_) => None,
        }
    }
}

/// Result type for change set workflows.
pub type Result<T> = std::result::Result<T, ChangeSetError>;
