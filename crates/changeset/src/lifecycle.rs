//! Change set lifecycle for one batch
//!
//! create -> wait -> describe -> (execute | skip) -> delete
//!
//! The change set is a scoped resource: [`ChangeSetGuard`] is armed before
//! the change set is created and deletes it exactly once, whichever way the
//! batch ends (completion, engine fault, decline or panic).

use crate::confirm::{Decision, gate, update_prompt};
use crate::context::{ConfirmCallback, ExecutionEngine, Operation, OutputSink};
use crate::error::{ChangeSetError, Result};
use crate::filter::{is_noop, render, skip_notice};
use crate::selector::stacks_to_update;
use crate::types::{
    BatchOutcome, ChangeSetDescription, ChangeSetLabel, ChangeSetStatus, Stack, StackMap,
    UpdateOptions,
};

/// Owns the change set of one batch and deletes it when released or dropped
pub struct ChangeSetGuard<'a, E: ExecutionEngine + ?Sized> {
    engine: &'a E,
    batch: &'a [Stack],
    label: ChangeSetLabel,
    released: bool,
}

impl<'a, E: ExecutionEngine + ?Sized> ChangeSetGuard<'a, E> {
    /// Take ownership of the change set `label` over `batch`
    ///
    /// Arm before calling create: a create that fails part-way may still
    /// leave change sets behind for some stacks.
    pub fn arm(engine: &'a E, batch: &'a [Stack], label: ChangeSetLabel) -> Self {
        Self {
            engine,
            batch,
            label,
            released: false,
        }
    }

    pub fn label(&self) -> &ChangeSetLabel {
        &self.label
    }

    /// Delete the change set for the full batch and report the result
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.delete()
    }

    fn delete(&self) -> Result<()> {
        log::debug!(
            "Deleting change set {} for {} stacks",
            self.label,
            self.batch.len()
        );
        self.engine
            .delete_change_set(self.batch, &self.label)
            .map(|_| ())
            .map_err(|source| ChangeSetError::Cleanup {
                label: self.label.clone(),
                source,
            })
    }
}

impl<E: ExecutionEngine + ?Sized> Drop for ChangeSetGuard<'_, E> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        if let Err(e) = self.delete() {
            log::error!("{}", e);
        }
    }
}

/// Run the full change set lifecycle for one batch
///
/// Engine faults propagate after the change set has been deleted. If the
/// delete also fails, the original fault is returned and the delete failure
/// is logged.
pub fn process_batch<E, C, O>(
    engine: &E,
    batch: &[Stack],
    label: ChangeSetLabel,
    options: &UpdateOptions,
    confirm: &mut C,
    sink: &mut O,
) -> Result<BatchOutcome>
where
    E: ExecutionEngine + ?Sized,
    C: ConfirmCallback + ?Sized,
    O: OutputSink + ?Sized,
{
    let guard = ChangeSetGuard::arm(engine, batch, label);
    let result = run_batch(engine, batch, guard.label(), options, confirm, sink);
    let cleanup = guard.release();

    match (result, cleanup) {
        (Ok(outcome), Ok(())) => Ok(outcome),
        (Ok(_), Err(cleanup)) => Err(cleanup),
        (Err(err), Ok(())) => Err(err),
        (Err(err), Err(cleanup)) => {
            log::error!("{}", cleanup);
            Err(err)
        }
    }
}

fn run_batch<E, C, O>(
    engine: &E,
    batch: &[Stack],
    label: &ChangeSetLabel,
    options: &UpdateOptions,
    confirm: &mut C,
    sink: &mut O,
) -> Result<BatchOutcome>
where
    E: ExecutionEngine + ?Sized,
    C: ConfirmCallback + ?Sized,
    O: OutputSink + ?Sized,
{
    log::debug!("Creating change set {} for {} stacks", label, batch.len());
    engine
        .create_change_set(batch, label)
        .map_err(|e| ChangeSetError::engine(Operation::CreateChangeSet, label, e))?;

    log::debug!("Waiting for change set {}", label);
    let statuses = engine
        .wait_for_change_set(batch, label)
        .map_err(|e| ChangeSetError::engine(Operation::WaitForChangeSet, label, e))?;

    log::debug!("Describing change set {}", label);
    let descriptions = engine
        .describe_change_set(batch, label)
        .map_err(|e| ChangeSetError::engine(Operation::DescribeChangeSet, label, e))?;

    report(&statuses, &descriptions, label, options.verbose, sink);

    let stacks = stacks_to_update(&statuses, &descriptions);
    if stacks.is_empty() {
        log::info!("Nothing to execute in change set {}", label);
        return Ok(BatchOutcome::Completed {
            outcomes: StackMap::new(),
        });
    }

    if gate(options.auto_approve, &update_prompt(&stacks), confirm)? == Decision::Declined {
        return Ok(BatchOutcome::Declined);
    }

    log::debug!("Executing change set {} for {} stacks", label, stacks.len());
    let outcomes = engine
        .execute_change_set(&stacks, label)
        .map_err(|e| ChangeSetError::engine(Operation::ExecuteChangeSet, label, e))?;

    Ok(BatchOutcome::Completed { outcomes })
}

/// Emit a skip notice or a description for every stack of the batch
fn report<O: OutputSink + ?Sized>(
    statuses: &StackMap<ChangeSetStatus>,
    descriptions: &StackMap<ChangeSetDescription>,
    label: &ChangeSetLabel,
    verbose: bool,
    sink: &mut O,
) {
    for (stack, status) in statuses {
        let description = descriptions.get(stack);
        if is_noop(*status, description) {
            sink.write_line(&skip_notice(&stack.name, label.as_str()));
            continue;
        }
        match description {
            Some(description) => sink.write_description(stack, &render(description, verbose)),
            None => log::warn!("No description for {} in change set {}", stack, label),
        }
    }
}
