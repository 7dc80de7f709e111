//! Change set label generation

use crate::context::LabelSource;
use crate::types::ChangeSetLabel;
use uuid::Uuid;

const LABEL_PREFIX: &str = "change-set";

/// Random labels of the form `change-set-<32 hex digits>`
///
/// Uniqueness holds across batches and across concurrent invocations.
#[derive(Debug, Default)]
pub struct UuidLabels;

impl LabelSource for UuidLabels {
    fn next_label(&mut self) -> ChangeSetLabel {
        ChangeSetLabel::new(format!("{}-{}", LABEL_PREFIX, Uuid::new_v4().simple()))
    }
}

/// Deterministic labels `<prefix>-1`, `<prefix>-2`, ...
#[derive(Debug)]
pub struct SequentialLabels {
    prefix: String,
    next: u64,
}

impl SequentialLabels {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: 1,
        }
    }
}

impl Default for SequentialLabels {
    fn default() -> Self {
        Self::new(LABEL_PREFIX)
    }
}

impl LabelSource for SequentialLabels {
    fn next_label(&mut self) -> ChangeSetLabel {
        let label = ChangeSetLabel::new(format!("{}-{}", self.prefix, self.next));
        self.next += 1;
        label
    }
}
