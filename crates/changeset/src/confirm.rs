//! Confirmation gate

use crate::context::ConfirmCallback;
use crate::error::{ChangeSetError, Result};
use crate::types::Stack;

/// Operator decision at a confirmation gate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approved,
    Declined,
}

/// Ask for a decision, unless `auto_approve` is set
///
/// A negative answer is a `Decision::Declined`, not an error. Only a failure
/// to ask at all is an error.
pub fn gate<C: ConfirmCallback + ?Sized>(
    auto_approve: bool,
    prompt: &str,
    confirm: &mut C,
) -> Result<Decision> {
    if auto_approve {
        log::debug!("Auto-approved: {}", prompt);
        return Ok(Decision::Approved);
    }

    match confirm.confirm(prompt).map_err(ChangeSetError::Confirm)? {
        true => Ok(Decision::Approved),
        false => {
            log::info!("Declined: {}", prompt);
            Ok(Decision::Declined)
        }
    }
}

/// Prompt for applying change sets to the given stacks
pub fn update_prompt(stacks: &[Stack]) -> String {
    let names: Vec<&str> = stacks.iter().map(|s| s.name.as_str()).collect();
    format!("Proceed with stack update of [{}]?", names.join(", "))
}

/// Prompt for a whole-command operation, e.g. a direct update
pub fn command_prompt(command: &str, command_path: &str) -> String {
    format!("Do you want to {} '{}'?", command, command_path)
}
