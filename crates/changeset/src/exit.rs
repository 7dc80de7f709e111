//! Mapping run outcomes to process exit codes

use crate::types::{RunOutcome, StackMap, StackStatus};
use serde::Serialize;

pub const SUCCESS_EXIT_CODE: u8 = 0;
pub const FAILURE_EXIT_CODE: u8 = 1;
/// The operator declined to proceed
pub const DECLINED_EXIT_CODE: u8 = 1;

/// Exit code for a set of stack outcomes
///
/// `0` only when every stack completed. The empty set is a success.
pub fn stack_status_exit_code<'a>(outcomes: impl IntoIterator<Item = &'a StackStatus>) -> u8 {
    let all_complete = outcomes.into_iter().all(|status| match status {
        StackStatus::Complete => true,
        StackStatus::InProgress | StackStatus::Failed | StackStatus::Pending => false,
    });
    if all_complete {
        SUCCESS_EXIT_CODE
    } else {
        FAILURE_EXIT_CODE
    }
}

/// Exit code for a whole run
pub fn exit_code(outcome: &RunOutcome) -> u8 {
    match outcome {
        RunOutcome::Completed(outcomes) => stack_status_exit_code(outcomes.values()),
        RunOutcome::Declined { .. } => DECLINED_EXIT_CODE,
    }
}

/// Counts of stack outcomes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OutcomeSummary {
    pub complete: usize,
    pub in_progress: usize,
    pub failed: usize,
    pub pending: usize,
}

impl OutcomeSummary {
    pub fn from_outcomes(outcomes: &StackMap<StackStatus>) -> Self {
        let mut summary = Self::default();
        for status in outcomes.values() {
            summary.add(*status);
        }
        summary
    }

    pub fn add(&mut self, status: StackStatus) {
        match status {
            StackStatus::Complete => self.complete += 1,
            StackStatus::InProgress => self.in_progress += 1,
            StackStatus::Failed => self.failed += 1,
            StackStatus::Pending => self.pending += 1,
        }
    }

    /// Total number of stacks
    pub fn total(&self) -> usize {
        self.complete + self.in_progress + self.failed + self.pending
    }

    pub fn is_success(&self) -> bool {
        self.total() == self.complete
    }
}
