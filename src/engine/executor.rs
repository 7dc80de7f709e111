//! Parallel execution of provider calls over a batch

use anyhow::{Context, Result};
use changeset::{
    ChangeSetDescription, ChangeSetLabel, ChangeSetStatus, ExecutionEngine, LaunchOrder, Operation,
    Stack, StackMap, StackStatus,
};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::progress;

use super::StackProvider;

type Collected<T> = Arc<Mutex<Vec<(Stack, Result<T>)>>>;

/// Runs every [`ExecutionEngine`] operation through a [`StackProvider`]
pub struct PlanExecutor<P> {
    provider: P,
    /// Dependencies per stack, used by direct updates
    dependencies: BTreeMap<String, Vec<String>>,
    /// Shared by every operation of the run
    pool: rayon::ThreadPool,
    poll_interval: Duration,
}

impl<P: StackProvider> PlanExecutor<P> {
    /// Create an executor with at most `jobs` provider calls in flight
    pub fn new(
        provider: P,
        dependencies: BTreeMap<String, Vec<String>>,
        jobs: usize,
    ) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(jobs.max(1))
            .thread_name(|i| format!("stackctl-provider-{i}"))
            .build()
            .context("Failed to create provider thread pool")?;

        Ok(Self {
            provider,
            dependencies,
            pool,
            poll_interval: Duration::from_secs(1),
        })
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Call `op` once per stack on the thread pool
    fn for_each_stack<T, F>(&self, batch: &[Stack], op: F) -> Result<Vec<(Stack, Result<T>)>>
    where
        T: Send,
        F: Fn(&Stack) -> Result<T> + Sync,
    {
        let results: Collected<T> = Arc::new(Mutex::new(Vec::with_capacity(batch.len())));

        self.pool.install(|| {
            batch.par_iter().for_each(|stack| {
                let result = op(stack);
                push_result(&results, (stack.clone(), result));
            });
        });

        into_results(results)
    }

    /// Fan out an operation whose per-stack errors abort the batch
    ///
    /// Every stack is attempted before the first error is raised.
    fn run_or_fault<T, F>(&self, operation: Operation, batch: &[Stack], op: F) -> Result<StackMap<T>>
    where
        T: Send,
        F: Fn(&Stack) -> Result<T> + Sync,
    {
        let mut first_error = None;
        let mut collected = StackMap::new();

        for (stack, result) in self.for_each_stack(batch, op)? {
            match result {
                Ok(value) => {
                    collected.insert(stack, value);
                }
                Err(e) => {
                    log::error!("{} failed for {}: {:#}", operation, stack, e);
                    // keep the error of the first stack by name
                    let replace = first_error
                        .as_ref()
                        .is_none_or(|(first, _): &(Stack, anyhow::Error)| stack < *first);
                    if replace {
                        first_error = Some((stack, e));
                    }
                }
            }
        }

        match first_error {
            Some((stack, e)) => Err(e.context(format!("{} failed for stack {}", operation, stack))),
            None => Ok(collected),
        }
    }

    /// Fan out an operation whose per-stack errors become a stack status
    fn run_or_status<T, F>(
        &self,
        operation: Operation,
        batch: &[Stack],
        failed: T,
        op: F,
    ) -> Result<StackMap<T>>
    where
        T: Send + Copy,
        F: Fn(&Stack) -> Result<T> + Sync,
    {
        let collected = self
            .for_each_stack(batch, op)?
            .into_iter()
            .map(|(stack, result)| {
                let value = result.unwrap_or_else(|e| {
                    log::error!("{} failed for {}: {:#}", operation, stack, e);
                    failed
                });
                (stack, value)
            })
            .collect();
        Ok(collected)
    }

    /// Whether any dependency of `stack` did not complete in this run
    fn blocked_by(&self, stack: &Stack, outcomes: &StackMap<StackStatus>) -> Option<String> {
        self.dependencies
            .get(&stack.name)
            .into_iter()
            .flatten()
            .find(|dep| {
                outcomes
                    .get(&Stack::new(dep.as_str()))
                    .is_some_and(|status| !status.is_success())
            })
            .cloned()
    }
}

impl<P: StackProvider> ExecutionEngine for PlanExecutor<P> {
    fn create_change_set(&self, batch: &[Stack], label: &ChangeSetLabel) -> Result<StackMap<()>> {
        let pb = progress::bar(batch.len(), "Creating change sets");
        let result = self.run_or_fault(Operation::CreateChangeSet, batch, |stack| {
            let created = self.provider.create_change_set(&stack.name, label);
            pb.inc(1);
            created
        });
        pb.finish_and_clear();
        result
    }

    fn wait_for_change_set(
        &self,
        batch: &[Stack],
        label: &ChangeSetLabel,
    ) -> Result<StackMap<ChangeSetStatus>> {
        let spinner = progress::spinner(&format!("Waiting for change set {}", label));
        let mut statuses = StackMap::new();
        let mut pending: Vec<Stack> = batch.to_vec();

        loop {
            let polled = self.run_or_status(
                Operation::WaitForChangeSet,
                &pending,
                ChangeSetStatus::Failed,
                |stack| self.provider.change_set_status(&stack.name, label),
            )?;

            pending.clear();
            for (stack, status) in polled {
                if status.is_terminal() {
                    log::debug!("Change set {} for {} is {}", label, stack, status);
                    statuses.insert(stack, status);
                } else {
                    pending.push(stack);
                }
            }

            if pending.is_empty() {
                break;
            }
            spinner.set_message(format!(
                "Waiting for change set {} ({} stacks pending)",
                label,
                pending.len()
            ));
            thread::sleep(self.poll_interval);
        }

        spinner.finish_and_clear();
        Ok(statuses)
    }

    fn describe_change_set(
        &self,
        batch: &[Stack],
        label: &ChangeSetLabel,
    ) -> Result<StackMap<ChangeSetDescription>> {
        self.run_or_fault(Operation::DescribeChangeSet, batch, |stack| {
            self.provider.describe_change_set(&stack.name, label)
        })
    }

    fn execute_change_set(
        &self,
        batch: &[Stack],
        label: &ChangeSetLabel,
    ) -> Result<StackMap<StackStatus>> {
        let pb = progress::bar(batch.len(), "Executing change sets");
        let result = self.run_or_status(
            Operation::ExecuteChangeSet,
            batch,
            StackStatus::Failed,
            |stack| {
                let status = self.provider.execute_change_set(&stack.name, label);
                pb.inc(1);
                status
            },
        );
        pb.finish_and_clear();
        result
    }

    fn delete_change_set(&self, batch: &[Stack], label: &ChangeSetLabel) -> Result<StackMap<()>> {
        self.run_or_fault(Operation::DeleteChangeSet, batch, |stack| {
            self.provider.delete_change_set(&stack.name, label)
        })
    }

    fn update(&self, launch_order: &LaunchOrder) -> Result<StackMap<StackStatus>> {
        let total = launch_order.iter().map(Vec::len).sum();
        let pb = progress::bar(total, "Updating stacks");
        let mut outcomes = StackMap::new();

        for batch in launch_order {
            let mut runnable = Vec::with_capacity(batch.len());
            for stack in batch {
                match self.blocked_by(stack, &outcomes) {
                    Some(dependency) => {
                        log::warn!(
                            "Not updating {}: dependency {} did not complete",
                            stack,
                            dependency
                        );
                        pb.inc(1);
                        outcomes.insert(stack.clone(), StackStatus::Pending);
                    }
                    None => runnable.push(stack.clone()),
                }
            }

            let updated =
                self.run_or_status(Operation::Update, &runnable, StackStatus::Failed, |stack| {
                    let status = self.provider.update(&stack.name);
                    pb.inc(1);
                    status
                })?;
            outcomes.extend(updated);
        }

        pb.finish_and_clear();
        Ok(outcomes)
    }
}

fn push_result<T>(results: &Collected<T>, result: (Stack, Result<T>)) {
    match results.lock() {
        Ok(mut locked) => locked.push(result),
        Err(poisoned) => poisoned.into_inner().push(result),
    }
}

fn into_results<T>(results: Collected<T>) -> Result<Vec<(Stack, Result<T>)>> {
    let mutex = Arc::try_unwrap(results)
        .map_err(|_| anyhow::anyhow!("Failed to collect provider results: shared result state"))?;

    match mutex.into_inner() {
        Ok(collected) => Ok(collected),
        Err(poisoned) => Ok(poisoned.into_inner()),
    }
}
