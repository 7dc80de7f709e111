//! # Changeset
//!
//! Change-set based stack updates: preview what an update would do, ask
//! before applying it, apply only the stacks that actually changed, and
//! always remove the change set afterwards.
//!
//! ## Core Concepts
//!
//! - **Stack**: one unit of managed infrastructure state
//! - **Batch**: stacks with no dependencies among each other
//! - **Launch order**: batches in dependency order
//! - **Change set**: ephemeral preview of an update, one per batch
//!
//! ## Example
//!
//! ```ignore
//! use changeset::{
//!     AutoConfirm, NoOutput, UpdateOptions, UuidLabels, exit_code, run_change_set_update,
//! };
//!
//! let launch_order = vec![vec![Stack::new("dev/vpc")], vec![Stack::new("dev/app")]];
//! let outcome = run_change_set_update(
//!     &engine,
//!     &launch_order,
//!     &UpdateOptions { verbose: false, auto_approve: true },
//!     &mut UuidLabels,
//!     &mut AutoConfirm,
//!     &mut NoOutput,
//! )?;
//! std::process::exit(exit_code(&outcome).into());
//! ```
//!
//! ## Provider Traits
//!
//! The crate uses traits for dependency injection:
//!
//! - [`PlanResolver`]: Computes the launch order
//! - [`ExecutionEngine`]: Runs change set operations over a batch
//! - [`OutputSink`]: Renders descriptions and notices
//! - [`ConfirmCallback`]: Handles user confirmations
//! - [`LabelSource`]: Generates change set labels
//!
//! This allows the crate to be used without hard dependencies on a
//! specific infrastructure provider, prompt library or output format.

pub mod confirm;
pub mod context;
pub mod direct;
pub mod error;
pub mod exit;
pub mod filter;
pub mod label;
pub mod lifecycle;
pub mod selector;
pub mod sequencer;
pub mod types;

#[cfg(test)]
mod testing;

// Re-export main types at crate root
pub use confirm::{Decision, command_prompt, gate, update_prompt};
pub use context::{
    AutoConfirm, AutoDecline, ConfirmCallback, ExecutionEngine, LabelSource, NoOutput, Operation,
    OutputSink, PlanResolver,
};
pub use direct::run_direct_update;
pub use error::{ChangeSetError, Result};
pub use exit::{
    DECLINED_EXIT_CODE, FAILURE_EXIT_CODE, OutcomeSummary, SUCCESS_EXIT_CODE, exit_code,
    stack_status_exit_code,
};
pub use filter::{RenderedDescription, SimplifiedChange, SimplifiedDescription, is_noop, render};
pub use label::{SequentialLabels, UuidLabels};
pub use lifecycle::{ChangeSetGuard, process_batch};
pub use selector::stacks_to_update;
pub use sequencer::run_change_set_update;
pub use types::{
    Batch, BatchOutcome, Change, ChangeAction, ChangeDetail, ChangeSetDescription, ChangeSetLabel,
    ChangeSetStatus, LaunchOrder, Replacement, RunOutcome, Stack, StackMap, StackStatus,
    UpdateOptions,
};
