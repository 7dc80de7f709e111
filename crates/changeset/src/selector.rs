//! Update candidate selection

use crate::types::{ChangeSetDescription, ChangeSetStatus, Stack, StackMap};

/// Stacks whose change set is ready and holds at least one change
///
/// A stack missing from `descriptions` is treated as having no changes.
pub fn stacks_to_update(
    statuses: &StackMap<ChangeSetStatus>,
    descriptions: &StackMap<ChangeSetDescription>,
) -> Vec<Stack> {
    statuses
        .iter()
        .filter(|(stack, status)| {
            status.is_ready() && descriptions.get(*stack).is_some_and(|d| d.has_changes())
        })
        .map(|(stack, _)| stack.clone())
        .collect()
}
