//! `stackctl update`

use anyhow::Result;
use changeset::{
    ConfirmCallback, ExecutionEngine, LabelSource, LaunchOrder, Operation, OutcomeSummary,
    OutputSink, PlanResolver, RunOutcome, UpdateOptions, UuidLabels, exit_code,
    run_change_set_update, run_direct_update,
};

use crate::cli::UpdateArgs;
use crate::config::{CommandContext, TEMPLATES_DIR};
use crate::engine::{LocalProvider, PlanExecutor};
use crate::output::TerminalSink;
use crate::plan::StackPlan;
use crate::ui;

/// Run the update command, returning the process exit code
pub fn run(ctx: &CommandContext, args: &UpdateArgs) -> Result<u8> {
    let mut plan = StackPlan::new(ctx.clone());
    plan.resolve(plan_operation(args))?;

    let provider = LocalProvider::new(
        ctx.state_path(),
        ctx.project_path.join(TEMPLATES_DIR),
        plan.stacks().clone(),
    );
    let engine = PlanExecutor::new(provider, plan.dependencies(), ctx.project.max_concurrency)?
        .with_poll_interval(ctx.project.poll_interval());

    update(
        &engine,
        plan.launch_order(),
        args,
        &mut UuidLabels,
        &mut ui::DialoguerConfirm,
        &mut TerminalSink::new(ctx.output_format),
    )
}

/// Operation the plan is resolved for
fn plan_operation(args: &UpdateArgs) -> Operation {
    if args.change_set {
        Operation::CreateChangeSet
    } else {
        Operation::Update
    }
}

fn update<E, L, C, O>(
    engine: &E,
    launch_order: &LaunchOrder,
    args: &UpdateArgs,
    labels: &mut L,
    confirm: &mut C,
    sink: &mut O,
) -> Result<u8>
where
    E: ExecutionEngine,
    L: LabelSource,
    C: ConfirmCallback,
    O: OutputSink,
{
    let outcome = if args.change_set {
        let options = UpdateOptions {
            verbose: args.verbose,
            auto_approve: args.yes,
        };
        run_change_set_update(engine, launch_order, &options, labels, confirm, sink)?
    } else {
        run_direct_update(engine, launch_order, &args.path, args.yes, confirm)?
    };

    report(&outcome);
    Ok(exit_code(&outcome))
}

fn report(outcome: &RunOutcome) {
    let outcomes = match outcome {
        RunOutcome::Declined { applied } => {
            ui::warn("Update cancelled");
            if !applied.is_empty() {
                ui::warn("Stacks updated before the cancellation:");
                ui::stack_outcomes(applied);
            }
            return;
        }
        RunOutcome::Completed(outcomes) if outcomes.is_empty() => {
            ui::info("No stacks needed updating");
            return;
        }
        RunOutcome::Completed(outcomes) => outcomes,
    };

    ui::header("Update Summary");
    ui::stack_outcomes(outcomes);

    let summary = OutcomeSummary::from_outcomes(outcomes);
    println!();
    if summary.is_success() {
        ui::success(&ui::summary_line(&summary));
    } else {
        ui::error(&ui::summary_line(&summary));
        if summary.pending > 0 {
            ui::dim("Stacks not attempted wait on a stack that did not complete");
        }
    }
}
