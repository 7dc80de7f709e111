//! Batch sequencing for change set updates

use crate::context::{ConfirmCallback, ExecutionEngine, LabelSource, OutputSink};
use crate::error::Result;
use crate::lifecycle::process_batch;
use crate::types::{BatchOutcome, LaunchOrder, RunOutcome, StackMap, StackStatus, UpdateOptions};

/// Update every batch of `launch_order` through its own change set
///
/// Batches run strictly in order, each with a fresh label. The run stops at
/// the first engine fault or decline. When a batch reports failed stacks the
/// remaining batches are not attempted and their stacks are reported as
/// [`StackStatus::Pending`].
pub fn run_change_set_update<E, L, C, O>(
    engine: &E,
    launch_order: &LaunchOrder,
    options: &UpdateOptions,
    labels: &mut L,
    confirm: &mut C,
    sink: &mut O,
) -> Result<RunOutcome>
where
    E: ExecutionEngine + ?Sized,
    L: LabelSource + ?Sized,
    C: ConfirmCallback + ?Sized,
    O: OutputSink + ?Sized,
{
    let mut outcomes = StackMap::new();
    let total = launch_order.len();

    for (index, batch) in launch_order.iter().enumerate() {
        if batch.is_empty() {
            continue;
        }

        let label = labels.next_label();
        log::info!(
            "Batch {}/{}: change set {} over {} stacks",
            index + 1,
            total,
            label,
            batch.len()
        );

        match process_batch(engine, batch, label, options, confirm, sink)? {
            BatchOutcome::Completed {
                outcomes: batch_outcomes,
            } => {
                let failed = batch_outcomes.values().any(|s| !s.is_success());
                outcomes.extend(batch_outcomes);
                if failed {
                    log::warn!("Batch {}/{} had failures, stopping", index + 1, total);
                    for stack in launch_order[index + 1..].iter().flatten() {
                        outcomes.insert(stack.clone(), StackStatus::Pending);
                    }
                    break;
                }
            }
            BatchOutcome::Declined => return Ok(RunOutcome::Declined { applied: outcomes }),
        }
    }

    Ok(RunOutcome::Completed(outcomes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{AutoConfirm, Operation};
    use crate::error::ChangeSetError;
    use crate::exit::exit_code;
    use crate::label::SequentialLabels;
    use crate::testing::{RecordingEngine, RecordingSink, ScriptedConfirm, stacks};
    use crate::types::{ChangeSetStatus, Stack};

    fn auto() -> UpdateOptions {
        UpdateOptions {
            verbose: false,
            auto_approve: true,
        }
    }

    #[test]
    fn test_batches_run_in_order_with_fresh_labels() {
        let engine = RecordingEngine::new()
            .with_stack("vpc", ChangeSetStatus::Ready, 1)
            .with_stack("db", ChangeSetStatus::Ready, 1)
            .with_stack("app", ChangeSetStatus::Ready, 1);
        let order = vec![stacks(&["vpc"]), stacks(&["db", "app"])];

        let outcome = run_change_set_update(
            &engine,
            &order,
            &auto(),
            &mut SequentialLabels::new("cs"),
            &mut AutoConfirm,
            &mut RecordingSink::default(),
        )
        .unwrap();

        let RunOutcome::Completed(outcomes) = outcome else {
            panic!("expected completed run");
        };
        assert_eq!(outcomes.len(), 3);

        let creates = engine.calls_to(Operation::CreateChangeSet);
        assert_eq!(creates[0].stacks, vec!["vpc"]);
        assert_eq!(creates[0].label.as_deref(), Some("cs-1"));
        assert_eq!(creates[1].stacks, vec!["db", "app"]);
        assert_eq!(creates[1].label.as_deref(), Some("cs-2"));

        // batch 1 is deleted before batch 2 is created
        let ops = engine.operations();
        let first_delete = ops.iter().position(|o| *o == Operation::DeleteChangeSet).unwrap();
        let second_create = ops
            .iter()
            .rposition(|o| *o == Operation::CreateChangeSet)
            .unwrap();
        assert!(first_delete < second_create);
    }

    #[test]
    fn test_decline_stops_later_batches() {
        let engine = RecordingEngine::new()
            .with_stack("first", ChangeSetStatus::Ready, 1)
            .with_stack("second", ChangeSetStatus::Ready, 1);
        let order = vec![stacks(&["first"]), stacks(&["second"])];

        let outcome = run_change_set_update(
            &engine,
            &order,
            &UpdateOptions::default(),
            &mut SequentialLabels::default(),
            &mut ScriptedConfirm::answering(false),
            &mut RecordingSink::default(),
        )
        .unwrap();

        assert_eq!(
            outcome,
            RunOutcome::Declined {
                applied: StackMap::new()
            }
        );
        assert_eq!(engine.calls_to(Operation::CreateChangeSet).len(), 1);
        assert_eq!(engine.calls_to(Operation::DeleteChangeSet).len(), 1);
    }

    #[test]
    fn test_decline_after_applied_batch_keeps_applied_outcomes() {
        let engine = RecordingEngine::new()
            .with_stack("vpc", ChangeSetStatus::Ready, 1)
            .with_stack("app", ChangeSetStatus::Ready, 1);
        let order = vec![stacks(&["vpc"]), stacks(&["app"])];
        let mut confirm = ScriptedConfirm::sequence(&[true, false]);

        let outcome = run_change_set_update(
            &engine,
            &order,
            &UpdateOptions::default(),
            &mut SequentialLabels::default(),
            &mut confirm,
            &mut RecordingSink::default(),
        )
        .unwrap();

        let RunOutcome::Declined { applied } = &outcome else {
            panic!("expected declined run");
        };
        assert_eq!(
            *applied,
            StackMap::from([(Stack::new("vpc"), StackStatus::Complete)])
        );
        assert_eq!(exit_code(&outcome), 1);
        assert_eq!(confirm.prompts.len(), 2);
        assert_eq!(engine.calls_to(Operation::ExecuteChangeSet).len(), 1);
        assert_eq!(engine.calls_to(Operation::DeleteChangeSet).len(), 2);
    }

    #[test]
    fn test_engine_fault_stops_later_batches() {
        let engine = RecordingEngine::new().failing_on(Operation::WaitForChangeSet);
        let order = vec![stacks(&["first"]), stacks(&["second"])];

        let err = run_change_set_update(
            &engine,
            &order,
            &auto(),
            &mut SequentialLabels::default(),
            &mut AutoConfirm,
            &mut RecordingSink::default(),
        )
        .unwrap_err();

        assert!(matches!(err, ChangeSetError::Engine { .. }));
        assert_eq!(engine.calls_to(Operation::CreateChangeSet).len(), 1);
        assert_eq!(engine.calls_to(Operation::DeleteChangeSet).len(), 1);
    }

    #[test]
    fn test_failed_stack_marks_remaining_batches_pending() {
        let engine = RecordingEngine::new()
            .with_stack("vpc", ChangeSetStatus::Ready, 1)
            .with_execute_result("vpc", StackStatus::Failed)
            .with_stack("app", ChangeSetStatus::Ready, 1);
        let order = vec![stacks(&["vpc"]), stacks(&["app"])];

        let outcome = run_change_set_update(
            &engine,
            &order,
            &auto(),
            &mut SequentialLabels::default(),
            &mut AutoConfirm,
            &mut RecordingSink::default(),
        )
        .unwrap();

        let RunOutcome::Completed(outcomes) = outcome else {
            panic!("expected completed run");
        };
        assert_eq!(outcomes[&Stack::new("vpc")], StackStatus::Failed);
        assert_eq!(outcomes[&Stack::new("app")], StackStatus::Pending);
        assert_eq!(engine.calls_to(Operation::CreateChangeSet).len(), 1);
    }

    #[test]
    fn test_empty_batches_create_nothing() {
        let engine = RecordingEngine::new();
        let order = vec![vec![], stacks(&["only"])];

        run_change_set_update(
            &engine,
            &order,
            &auto(),
            &mut SequentialLabels::default(),
            &mut AutoConfirm,
            &mut RecordingSink::default(),
        )
        .unwrap();

        assert_eq!(engine.calls_to(Operation::CreateChangeSet).len(), 1);
        assert_eq!(engine.calls_to(Operation::DeleteChangeSet).len(), 1);
    }

    #[test]
    fn test_scenario_both_ready_auto_approved() {
        let engine = RecordingEngine::new()
            .with_stack("S1", ChangeSetStatus::Ready, 1)
            .with_stack("S2", ChangeSetStatus::Ready, 3);
        let mut confirm = ScriptedConfirm::answering(false);

        let outcome = run_change_set_update(
            &engine,
            &vec![stacks(&["S1", "S2"])],
            &auto(),
            &mut SequentialLabels::default(),
            &mut confirm,
            &mut RecordingSink::default(),
        )
        .unwrap();

        assert_eq!(exit_code(&outcome), 0);
        assert!(confirm.prompts.is_empty());
        assert_eq!(engine.calls_to(Operation::ExecuteChangeSet)[0].stacks, vec!["S1", "S2"]);
    }

    #[test]
    fn test_scenario_in_progress_without_changes_is_skipped() {
        let engine = RecordingEngine::new().with_stack("S3", ChangeSetStatus::InProgress, 0);
        let mut sink = RecordingSink::default();

        let outcome = run_change_set_update(
            &engine,
            &vec![stacks(&["S3"])],
            &UpdateOptions::default(),
            &mut SequentialLabels::default(),
            &mut ScriptedConfirm::answering(true),
            &mut sink,
        )
        .unwrap();

        assert_eq!(exit_code(&outcome), 0);
        assert_eq!(sink.lines, vec!["S3 No changes in change set: change-set-1"]);
        assert!(engine.calls_to(Operation::ExecuteChangeSet).is_empty());
        assert_eq!(engine.calls_to(Operation::DeleteChangeSet).len(), 1);
    }

    #[test]
    fn test_scenario_user_declines() {
        let engine = RecordingEngine::new().with_stack("S4", ChangeSetStatus::Ready, 1);
        let mut confirm = ScriptedConfirm::answering(false);

        let outcome = run_change_set_update(
            &engine,
            &vec![stacks(&["S4"])],
            &UpdateOptions::default(),
            &mut SequentialLabels::default(),
            &mut confirm,
            &mut RecordingSink::default(),
        )
        .unwrap();

        assert_eq!(exit_code(&outcome), 1);
        assert_eq!(confirm.prompts.len(), 1);
        assert!(engine.calls_to(Operation::ExecuteChangeSet).is_empty());
        assert_eq!(engine.calls_to(Operation::DeleteChangeSet).len(), 1);
    }
}
