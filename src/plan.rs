//! Resolving a command path into a launch order

use anyhow::Result;
use changeset::{LaunchOrder, Operation, PlanResolver, Stack};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::config::{self, CommandContext, StackConfig};

/// Errors found while building a launch order
#[derive(Error, Debug, PartialEq, Eq)]
pub enum PlanError {
    /// The command path matched no stack config
    #[error("No stacks found under '{path}'")]
    NoStacks {
        /// Command path as given
        path: String,
    },

    /// A stack depends on a stack that has no config
    #[error("Stack '{stack}' depends on unknown stack '{dependency}'")]
    UnknownDependency { stack: String, dependency: String },

    /// Stacks that depend on each other in a cycle
    #[error("Circular dependency between stacks: {}", .0.join(", "))]
    Cycle(Vec<String>),
}

/// The stacks a command targets and the order to launch them in
pub struct StackPlan {
    context: CommandContext,
    stacks: BTreeMap<String, StackConfig>,
    launch_order: LaunchOrder,
}

impl StackPlan {
    pub fn new(context: CommandContext) -> Self {
        Self {
            context,
            stacks: BTreeMap::new(),
            launch_order: Vec::new(),
        }
    }

    /// Stack configs selected by the command path. Empty until resolved.
    pub fn stacks(&self) -> &BTreeMap<String, StackConfig> {
        &self.stacks
    }

    /// Dependencies of each selected stack, restricted to the selection
    pub fn dependencies(&self) -> BTreeMap<String, Vec<String>> {
        self.stacks
            .iter()
            .map(|(name, config)| {
                let deps = config
                    .dependencies
                    .iter()
                    .filter(|d| self.stacks.contains_key(*d))
                    .cloned()
                    .collect();
                (name.clone(), deps)
            })
            .collect()
    }
}

impl PlanResolver for StackPlan {
    fn resolve(&mut self, operation: Operation) -> Result<()> {
        let all = config::load_stack_configs(&self.context.project_path, &self.context.user_variables)?;

        for (name, config) in &all {
            if let Some(missing) = config.dependencies.iter().find(|d| !all.contains_key(*d)) {
                return Err(PlanError::UnknownDependency {
                    stack: name.clone(),
                    dependency: missing.clone(),
                }
                .into());
            }
        }

        let path = &self.context.command_path;
        self.stacks = all
            .into_iter()
            .filter(|(name, _)| is_selected(name, path))
            .collect();

        if self.stacks.is_empty() {
            return Err(PlanError::NoStacks { path: path.clone() }.into());
        }

        self.launch_order = if self.context.ignore_dependencies {
            vec![self.stacks.keys().map(Stack::new).collect()]
        } else {
            compute_launch_order(&self.dependencies())?
        };

        log::debug!(
            "Resolved {} for '{}': {} stacks in {} batches",
            operation,
            path,
            self.stacks.len(),
            self.launch_order.len()
        );
        Ok(())
    }

    fn launch_order(&self) -> &LaunchOrder {
        &self.launch_order
    }
}

/// Whether a stack name equals the command path or lies beneath it
fn is_selected(name: &str, path: &str) -> bool {
    path.is_empty()
        || name == path
        || name
            .strip_prefix(path)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Layered topological sort: every batch holds the stacks whose
/// dependencies all sit in earlier batches
///
/// Dependencies missing from `dependencies` are treated as already deployed.
pub fn compute_launch_order(
    dependencies: &BTreeMap<String, Vec<String>>,
) -> Result<LaunchOrder, PlanError> {
    let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    let mut in_degree: BTreeMap<&str, usize> = BTreeMap::new();

    for (name, deps) in dependencies {
        in_degree.entry(name.as_str()).or_insert(0);
        for dep in deps.iter().filter(|d| dependencies.contains_key(*d)) {
            dependents.entry(dep.as_str()).or_default().push(name.as_str());
            *in_degree.entry(name.as_str()).or_insert(0) += 1;
        }
    }

    let mut launch_order = Vec::new();
    let mut ready: Vec<&str> = in_degree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(name, _)| *name)
        .collect();
    let mut placed = 0;

    while !ready.is_empty() {
        ready.sort_unstable();
        let mut next = Vec::new();
        for name in &ready {
            for dependent in dependents.get(name).into_iter().flatten() {
                if let Some(degree) = in_degree.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        next.push(*dependent);
                    }
                }
            }
        }
        placed += ready.len();
        launch_order.push(ready.iter().map(|n| Stack::new(*n)).collect());
        ready = next;
    }

    if placed != in_degree.len() {
        let remaining = in_degree
            .into_iter()
            .filter(|(_, degree)| *degree > 0)
            .map(|(name, _)| name.to_string())
            .collect();
        return Err(PlanError::Cycle(remaining));
    }

    Ok(launch_order)
}
