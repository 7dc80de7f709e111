//! Test doubles shared by the workflow tests

use crate::context::{ConfirmCallback, ExecutionEngine, Operation, OutputSink};
use crate::filter::RenderedDescription;
use crate::types::{
    Change, ChangeAction, ChangeSetDescription, ChangeSetLabel, ChangeSetStatus, LaunchOrder,
    Stack, StackMap, StackStatus,
};
use anyhow::{Result, bail};
use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, VecDeque};

/// One recorded engine call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub operation: Operation,
    pub stacks: Vec<String>,
    pub label: Option<String>,
}

/// Scripted engine that records every call it receives
#[derive(Default)]
pub struct RecordingEngine {
    pub statuses: HashMap<String, ChangeSetStatus>,
    pub change_counts: HashMap<String, usize>,
    pub execute_results: HashMap<String, StackStatus>,
    pub update_results: HashMap<String, StackStatus>,
    pub fail_on: Option<Operation>,
    pub calls: RefCell<Vec<Call>>,
}

impl RecordingEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a stack's change set status and number of changes
    pub fn with_stack(mut self, name: &str, status: ChangeSetStatus, changes: usize) -> Self {
        self.statuses.insert(name.to_string(), status);
        self.change_counts.insert(name.to_string(), changes);
        self
    }

    pub fn with_execute_result(mut self, name: &str, status: StackStatus) -> Self {
        self.execute_results.insert(name.to_string(), status);
        self
    }

    pub fn with_update_result(mut self, name: &str, status: StackStatus) -> Self {
        self.update_results.insert(name.to_string(), status);
        self
    }

    pub fn failing_on(mut self, operation: Operation) -> Self {
        self.fail_on = Some(operation);
        self
    }

    pub fn calls_to(&self, operation: Operation) -> Vec<Call> {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.operation == operation)
            .cloned()
            .collect()
    }

    pub fn operations(&self) -> Vec<Operation> {
        self.calls.borrow().iter().map(|c| c.operation).collect()
    }

    fn record(&self, operation: Operation, stacks: &[Stack], label: Option<&ChangeSetLabel>) -> Result<()> {
        self.calls.borrow_mut().push(Call {
            operation,
            stacks: stacks.iter().map(|s| s.name.clone()).collect(),
            label: label.map(|l| l.to_string()),
        });
        if self.fail_on == Some(operation) {
            bail!("engine fault during {}", operation);
        }
        Ok(())
    }
}

pub fn change(index: usize) -> Change {
    Change {
        action: ChangeAction::Add,
        logical_resource_id: format!("Resource{index}"),
        physical_resource_id: None,
        resource_type: "Test::Resource".into(),
        replacement: None,
        scope: vec![],
        details: vec![],
    }
}

impl ExecutionEngine for RecordingEngine {
    fn create_change_set(&self, batch: &[Stack], label: &ChangeSetLabel) -> Result<StackMap<()>> {
        self.record(Operation::CreateChangeSet, batch, Some(label))?;
        Ok(batch.iter().map(|s| (s.clone(), ())).collect())
    }

    fn wait_for_change_set(
        &self,
        batch: &[Stack],
        label: &ChangeSetLabel,
    ) -> Result<StackMap<ChangeSetStatus>> {
        self.record(Operation::WaitForChangeSet, batch, Some(label))?;
        Ok(batch
            .iter()
            .map(|s| {
                let status = self
                    .statuses
                    .get(&s.name)
                    .copied()
                    .unwrap_or(ChangeSetStatus::Ready);
                (s.clone(), status)
            })
            .collect())
    }

    fn describe_change_set(
        &self,
        batch: &[Stack],
        label: &ChangeSetLabel,
    ) -> Result<StackMap<ChangeSetDescription>> {
        self.record(Operation::DescribeChangeSet, batch, Some(label))?;
        Ok(batch
            .iter()
            .map(|s| {
                let count = self.change_counts.get(&s.name).copied().unwrap_or(0);
                let description = ChangeSetDescription {
                    change_set_name: label.to_string(),
                    stack_name: s.name.clone(),
                    status: self
                        .statuses
                        .get(&s.name)
                        .copied()
                        .unwrap_or(ChangeSetStatus::Ready),
                    status_reason: None,
                    execution_status: None,
                    creation_time: None,
                    parameters: BTreeMap::new(),
                    changes: (0..count).map(change).collect(),
                };
                (s.clone(), description)
            })
            .collect())
    }

    fn execute_change_set(
        &self,
        batch: &[Stack],
        label: &ChangeSetLabel,
    ) -> Result<StackMap<StackStatus>> {
        self.record(Operation::ExecuteChangeSet, batch, Some(label))?;
        Ok(batch
            .iter()
            .map(|s| {
                let status = self
                    .execute_results
                    .get(&s.name)
                    .copied()
                    .unwrap_or(StackStatus::Complete);
                (s.clone(), status)
            })
            .collect())
    }

    fn delete_change_set(&self, batch: &[Stack], label: &ChangeSetLabel) -> Result<StackMap<()>> {
        self.record(Operation::DeleteChangeSet, batch, Some(label))?;
        Ok(batch.iter().map(|s| (s.clone(), ())).collect())
    }

    fn update(&self, launch_order: &LaunchOrder) -> Result<StackMap<StackStatus>> {
        let stacks: Vec<Stack> = launch_order.iter().flatten().cloned().collect();
        self.record(Operation::Update, &stacks, None)?;
        Ok(stacks
            .into_iter()
            .map(|s| {
                let status = self
                    .update_results
                    .get(&s.name)
                    .copied()
                    .unwrap_or(StackStatus::Complete);
                (s, status)
            })
            .collect())
    }
}

/// Sink that keeps everything written to it
#[derive(Default)]
pub struct RecordingSink {
    pub lines: Vec<String>,
    /// (stack, change count, was verbose)
    pub descriptions: Vec<(String, usize, bool)>,
}

impl OutputSink for RecordingSink {
    fn write_description(&mut self, stack: &Stack, description: &RenderedDescription<'_>) {
        let verbose = matches!(description, RenderedDescription::Full(_));
        self.descriptions
            .push((stack.name.clone(), description.change_count(), verbose));
    }

    fn write_line(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }
}

/// Confirm callback with scripted answers that records prompts
///
/// Answers are given in order; the last one repeats once the script runs out.
pub struct ScriptedConfirm {
    answers: VecDeque<bool>,
    last: bool,
    pub prompts: Vec<String>,
}

impl ScriptedConfirm {
    pub fn answering(answer: bool) -> Self {
        Self::sequence(&[answer])
    }

    pub fn sequence(answers: &[bool]) -> Self {
        Self {
            answers: answers.iter().copied().collect(),
            last: answers.last().copied().unwrap_or(false),
            prompts: Vec::new(),
        }
    }
}

impl ConfirmCallback for ScriptedConfirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        self.prompts.push(prompt.to_string());
        Ok(self.answers.pop_front().unwrap_or(self.last))
    }
}

pub fn stacks(names: &[&str]) -> Vec<Stack> {
    names.iter().map(|n| Stack::new(*n)).collect()
}
