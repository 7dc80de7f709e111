//! Direct update path (no change sets)

use crate::confirm::{Decision, command_prompt, gate};
use crate::context::{ConfirmCallback, ExecutionEngine};
use crate::error::{ChangeSetError, Result};
use crate::types::{LaunchOrder, RunOutcome, StackMap};

/// Confirm once for the whole command, then update every stack directly
pub fn run_direct_update<E, C>(
    engine: &E,
    launch_order: &LaunchOrder,
    command_path: &str,
    auto_approve: bool,
    confirm: &mut C,
) -> Result<RunOutcome>
where
    E: ExecutionEngine + ?Sized,
    C: ConfirmCallback + ?Sized,
{
    let prompt = command_prompt("update", command_path);
    if gate(auto_approve, &prompt, confirm)? == Decision::Declined {
        return Ok(RunOutcome::Declined {
            applied: StackMap::new(),
        });
    }

    let stack_count: usize = launch_order.iter().map(Vec::len).sum();
    log::info!(
        "Updating {} stacks in {} batches",
        stack_count,
        launch_order.len()
    );

    let outcomes = engine.update(launch_order).map_err(ChangeSetError::Update)?;
    Ok(RunOutcome::Completed(outcomes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Operation;
    use crate::exit::exit_code;
    use crate::testing::{RecordingEngine, ScriptedConfirm, stacks};
    use crate::types::StackStatus;

    #[test]
    fn test_mixed_outcomes_map_to_failure_every_time() {
        let engine = RecordingEngine::new()
            .with_update_result("s5", StackStatus::Complete)
            .with_update_result("s6", StackStatus::Failed);
        let order = vec![stacks(&["s5", "s6"])];
        let mut confirm = ScriptedConfirm::answering(true);

        let codes: Vec<u8> = (0..3)
            .map(|_| {
                let outcome = run_direct_update(&engine, &order, "dev", true, &mut confirm).unwrap();
                exit_code(&outcome)
            })
            .collect();

        assert!(codes.iter().all(|c| *c != 0));
        assert!(codes.windows(2).all(|w| w[0] == w[1]));
        assert!(confirm.prompts.is_empty());
    }

    #[test]
    fn test_asks_once_naming_the_path() {
        let engine = RecordingEngine::new();
        let mut confirm = ScriptedConfirm::answering(true);

        let outcome =
            run_direct_update(&engine, &vec![stacks(&["a", "b"])], "dev/app", false, &mut confirm)
                .unwrap();

        assert_eq!(exit_code(&outcome), 0);
        assert_eq!(confirm.prompts, vec!["Do you want to update 'dev/app'?"]);
        assert_eq!(engine.operations(), vec![Operation::Update]);
    }

    #[test]
    fn test_decline_skips_update() {
        let engine = RecordingEngine::new();

        let outcome = run_direct_update(
            &engine,
            &vec![stacks(&["a"])],
            "dev",
            false,
            &mut ScriptedConfirm::answering(false),
        )
        .unwrap();

        assert_eq!(
            outcome,
            RunOutcome::Declined {
                applied: StackMap::new()
            }
        );
        assert_eq!(exit_code(&outcome), 1);
        assert!(engine.operations().is_empty());
    }

    #[test]
    fn test_engine_fault_propagates() {
        let engine = RecordingEngine::new().failing_on(Operation::Update);
        let err = run_direct_update(
            &engine,
            &vec![stacks(&["a"])],
            "dev",
            true,
            &mut ScriptedConfirm::answering(true),
        )
        .unwrap_err();
        assert!(matches!(err, ChangeSetError::Update(_)));
    }
}
