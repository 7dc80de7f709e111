//! Stack provider backed by JSON files in the project's state directory
//!
//! Deployed stacks live at `<state>/stacks/<stack>.json` and change sets at
//! `<state>/change-sets/<stack>/<label>.json`.

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Utc};
use changeset::{
    Change, ChangeAction, ChangeDetail, ChangeSetDescription, ChangeSetLabel, ChangeSetStatus,
    Replacement, StackStatus,
};
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::config::StackConfig;

use super::StackProvider;

const NO_CHANGES_REASON: &str = "The submitted information didn't contain changes.";
const EXECUTE_COMPLETE: &str = "EXECUTE_COMPLETE";

/// One resource of a template or deployed stack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Resource {
    #[serde(rename = "Type")]
    pub resource_type: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub properties: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Template {
    #[serde(default)]
    resources: BTreeMap<String, Resource>,
}

/// What is currently deployed for a stack
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeployedStack {
    pub resources: BTreeMap<String, Resource>,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredChangeSet {
    description: ChangeSetDescription,
    /// Resources the stack will have once executed
    target: BTreeMap<String, Resource>,
    /// `last_updated` of the deployed stack this change set was computed against
    base_updated: Option<DateTime<Utc>>,
}

/// File-backed [`StackProvider`]
pub struct LocalProvider {
    state_dir: PathBuf,
    templates_dir: PathBuf,
    stacks: BTreeMap<String, StackConfig>,
}

impl LocalProvider {
    pub fn new(
        state_dir: PathBuf,
        templates_dir: PathBuf,
        stacks: BTreeMap<String, StackConfig>,
    ) -> Self {
        Self {
            state_dir,
            templates_dir,
            stacks,
        }
    }

    fn stack_file(&self, stack: &str) -> PathBuf {
        self.state_dir.join("stacks").join(format!("{stack}.json"))
    }

    fn change_set_file(&self, stack: &str, label: &ChangeSetLabel) -> PathBuf {
        self.state_dir
            .join("change-sets")
            .join(stack)
            .join(format!("{label}.json"))
    }

    fn config(&self, stack: &str) -> Result<&StackConfig> {
        self.stacks
            .get(stack)
            .with_context(|| format!("No config for stack {stack}"))
    }

    /// Deployed state, or `None` if the stack was never deployed
    pub fn deployed(&self, stack: &str) -> Result<Option<DeployedStack>> {
        read_json(&self.stack_file(stack))
    }

    fn save_deployed(
        &self,
        stack: &str,
        resources: BTreeMap<String, Resource>,
        parameters: BTreeMap<String, String>,
    ) -> Result<DateTime<Utc>> {
        let deployed = DeployedStack {
            resources,
            parameters,
            last_updated: Utc::now(),
        };
        write_json(&self.stack_file(stack), &deployed)?;
        Ok(deployed.last_updated)
    }

    fn load_change_set(&self, stack: &str, label: &ChangeSetLabel) -> Result<StoredChangeSet> {
        let path = self.change_set_file(stack, label);
        read_json(&path)?
            .with_context(|| format!("Change set {label} does not exist for stack {stack}"))
    }

    /// Template resources with parameter references resolved
    fn target_resources(&self, stack: &str) -> Result<BTreeMap<String, Resource>> {
        let config = self.config(stack)?;
        let path = self.templates_dir.join(&config.template);
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read template: {}", path.display()))?;
        let mut template: Template = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse template: {}", path.display()))?;

        for resource in template.resources.values_mut() {
            resolve_refs(&mut resource.properties, &config.parameters);
        }
        Ok(template.resources)
    }

    /// True when the deployed stack moved on since the change set was computed
    fn is_stale(&self, stack: &str, stored: &StoredChangeSet) -> Result<bool> {
        let current = self.deployed(stack)?.map(|d| d.last_updated);
        Ok(current != stored.base_updated)
    }
}

impl StackProvider for LocalProvider {
    fn create_change_set(&self, stack: &str, label: &ChangeSetLabel) -> Result<()> {
        let config = self.config(stack)?;
        let target = self.target_resources(stack)?;
        let deployed = self.deployed(stack)?;

        let current = deployed
            .as_ref()
            .map(|d| d.resources.clone())
            .unwrap_or_default();
        let changes = diff_resources(stack, &current, &target);

        let (status, status_reason, execution_status) = if changes.is_empty() {
            (
                ChangeSetStatus::Failed,
                Some(NO_CHANGES_REASON.to_string()),
                "UNAVAILABLE",
            )
        } else {
            (ChangeSetStatus::Ready, None, "AVAILABLE")
        };

        let stored = StoredChangeSet {
            description: ChangeSetDescription {
                change_set_name: label.to_string(),
                stack_name: stack.to_string(),
                status,
                status_reason,
                execution_status: Some(execution_status.to_string()),
                creation_time: Some(Utc::now()),
                parameters: config.parameters.clone(),
                changes,
            },
            target,
            base_updated: deployed.map(|d| d.last_updated),
        };

        write_json(&self.change_set_file(stack, label), &stored)?;
        log::debug!(
            "Created change set {} for {} ({}, {} changes)",
            label,
            stack,
            status,
            stored.description.changes.len()
        );
        Ok(())
    }

    fn change_set_status(&self, stack: &str, label: &ChangeSetLabel) -> Result<ChangeSetStatus> {
        let stored = self.load_change_set(stack, label)?;
        let status = stored.description.status;
        if status.is_ready() && self.is_stale(stack, &stored)? {
            return Ok(ChangeSetStatus::Obsolete);
        }
        Ok(status)
    }

    fn describe_change_set(
        &self,
        stack: &str,
        label: &ChangeSetLabel,
    ) -> Result<ChangeSetDescription> {
        let mut stored = self.load_change_set(stack, label)?;
        if stored.description.status.is_ready() && self.is_stale(stack, &stored)? {
            stored.description.status = ChangeSetStatus::Obsolete;
            stored.description.execution_status = Some("OBSOLETE".to_string());
        }
        Ok(stored.description)
    }

    fn execute_change_set(&self, stack: &str, label: &ChangeSetLabel) -> Result<StackStatus> {
        let path = self.change_set_file(stack, label);
        let mut stored = self.load_change_set(stack, label)?;

        if !stored.description.status.is_ready() {
            bail!(
                "Change set {} for {} is {} and cannot be executed",
                label,
                stack,
                stored.description.status
            );
        }
        if stored.description.execution_status.as_deref() == Some(EXECUTE_COMPLETE) {
            bail!("Change set {} for {} was already executed", label, stack);
        }
        if self.is_stale(stack, &stored)? {
            bail!(
                "Change set {} for {} is obsolete: the stack changed since it was created",
                label,
                stack
            );
        }

        let deployed_at = self.save_deployed(
            stack,
            stored.target.clone(),
            stored.description.parameters.clone(),
        )?;

        // the stack now matches this change set, so it is not stale
        stored.base_updated = Some(deployed_at);
        stored.description.execution_status = Some(EXECUTE_COMPLETE.to_string());
        write_json(&path, &stored)?;

        log::info!("Executed change set {} for {}", label, stack);
        Ok(StackStatus::Complete)
    }

    fn delete_change_set(&self, stack: &str, label: &ChangeSetLabel) -> Result<()> {
        let path = self.change_set_file(stack, label);
        match fs::remove_file(&path) {
            Ok(()) => {
                log::debug!("Deleted change set {} for {}", label, stack);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to delete change set: {}", path.display())),
        }
    }

    fn update(&self, stack: &str) -> Result<StackStatus> {
        let config = self.config(stack)?;
        let target = self.target_resources(stack)?;

        if let Some(deployed) = self.deployed(stack)?
            && deployed.resources == target
            && deployed.parameters == config.parameters
        {
            log::info!("No updates to perform on {}", stack);
            return Ok(StackStatus::Complete);
        }

        self.save_deployed(stack, target, config.parameters.clone())?;
        log::info!("Updated {}", stack);
        Ok(StackStatus::Complete)
    }
}

/// Replace `{"Ref": "Name"}` objects with the value of parameter `Name`
fn resolve_refs(value: &mut Value, parameters: &BTreeMap<String, String>) {
    if let Value::Object(map) = &*value
        && map.len() == 1
        && let Some(Value::String(name)) = map.get("Ref")
        && let Some(resolved) = parameters.get(name)
    {
        *value = Value::String(resolved.clone());
        return;
    }

    match value {
        Value::Object(map) => {
            for v in map.values_mut() {
                resolve_refs(v, parameters);
            }
        }
        Value::Array(items) => {
            for v in items {
                resolve_refs(v, parameters);
            }
        }
        _ => {}
    }
}

/// Changes needed to go from `current` to `target`
fn diff_resources(
    stack: &str,
    current: &BTreeMap<String, Resource>,
    target: &BTreeMap<String, Resource>,
) -> Vec<Change> {
    let mut changes = Vec::new();

    for (logical_id, desired) in target {
        match current.get(logical_id) {
            None => changes.push(Change {
                action: ChangeAction::Add,
                logical_resource_id: logical_id.clone(),
                physical_resource_id: None,
                resource_type: desired.resource_type.clone(),
                replacement: None,
                scope: vec![],
                details: vec![],
            }),
            Some(existing) if existing == desired => {}
            Some(existing) => {
                let type_changed = existing.resource_type != desired.resource_type;
                changes.push(Change {
                    action: ChangeAction::Modify,
                    logical_resource_id: logical_id.clone(),
                    physical_resource_id: Some(physical_id(stack, logical_id)),
                    resource_type: desired.resource_type.clone(),
                    replacement: Some(if type_changed {
                        Replacement::True
                    } else {
                        Replacement::False
                    }),
                    scope: vec!["Properties".to_string()],
                    details: property_details(&existing.properties, &desired.properties),
                });
            }
        }
    }

    for (logical_id, existing) in current {
        if !target.contains_key(logical_id) {
            changes.push(Change {
                action: ChangeAction::Remove,
                logical_resource_id: logical_id.clone(),
                physical_resource_id: Some(physical_id(stack, logical_id)),
                resource_type: existing.resource_type.clone(),
                replacement: None,
                scope: vec![],
                details: vec![],
            });
        }
    }

    changes
}

/// Top-level properties that differ between two property objects
fn property_details(current: &Value, desired: &Value) -> Vec<ChangeDetail> {
    let empty = serde_json::Map::new();
    let current = current.as_object().unwrap_or(&empty);
    let desired = desired.as_object().unwrap_or(&empty);

    let mut names: Vec<&String> = current.keys().chain(desired.keys()).collect();
    names.sort();
    names.dedup();

    names
        .into_iter()
        .filter(|name| current.get(*name) != desired.get(*name))
        .map(|name| ChangeDetail {
            attribute: "Properties".to_string(),
            name: Some(name.clone()),
            change_source: Some("DirectModification".to_string()),
        })
        .collect()
}

fn physical_id(stack: &str, logical_id: &str) -> String {
    format!("{}-{}", stack.replace('/', "-"), logical_id)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read state file: {}", path.display()))?;
    let value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse state file: {}", path.display()))?;
    Ok(Some(value))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create state directory: {}", dir.display()))?;
    }
    let content = serde_json::to_string_pretty(value).context("Failed to serialize state")?;
    fs::write(path, content)
        .with_context(|| format!("Failed to write state file: {}", path.display()))
}
