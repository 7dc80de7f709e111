//! Project and stack configuration
//!
//! A project is a directory laid out as:
//!
//! ```text
//! <project>/
//!   config/
//!     config.toml          project settings (optional)
//!     dev/
//!       vpc.toml           stack "dev/vpc"
//!       app.toml           stack "dev/app"
//!   templates/
//!     vpc.json
//! ```
//!
//! Stack configs may reference user variables as `{{ var.NAME }}`.

use anyhow::{Context, Result, bail};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;
use walkdir::WalkDir;

use crate::output::OutputFormat;

pub const CONFIG_DIR: &str = "config";
pub const TEMPLATES_DIR: &str = "templates";
const SETTINGS_FILE: &str = "config.toml";

static VARIABLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*var\.([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("variable pattern is valid")
});

// ============================================================================
// Project Settings
// ============================================================================

/// Settings from `config/config.toml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectConfig {
    /// Optional project identifier, informational
    pub project_code: Option<String>,
    /// Where provider state lives, relative to the project unless absolute
    pub state_dir: PathBuf,
    /// Maximum stacks processed at once within a batch
    pub max_concurrency: usize,
    /// Delay between change set status polls
    pub poll_interval_ms: u64,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            project_code: None,
            state_dir: PathBuf::from(".stackctl"),
            max_concurrency: 4,
            poll_interval_ms: 1000,
        }
    }
}

impl ProjectConfig {
    /// Load project settings, or defaults if the file doesn't exist
    pub fn load(project_path: &Path) -> Result<Self> {
        let path = project_path.join(CONFIG_DIR).join(SETTINGS_FILE);

        if !path.exists() {
            log::debug!("No project settings at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read project settings: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse project settings: {}", path.display()))?;

        if config.max_concurrency == 0 {
            bail!("max_concurrency must be at least 1 in {}", path.display());
        }

        log::debug!("Loaded project settings from {}", path.display());
        Ok(config)
    }

    /// Absolute state directory for a project
    pub fn state_path(&self, project_path: &Path) -> PathBuf {
        if self.state_dir.is_absolute() {
            self.state_dir.clone()
        } else {
            project_path.join(&self.state_dir)
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

// ============================================================================
// Stack Config
// ============================================================================

/// One stack's config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StackConfig {
    /// Template path, relative to `templates/`
    pub template: PathBuf,
    /// Names of stacks that must be updated first
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub parameters: BTreeMap<String, String>,
    #[serde(default)]
    pub stack_tags: BTreeMap<String, String>,
}

/// Load every stack config under `<project>/config`, keyed by stack name
pub fn load_stack_configs(
    project_path: &Path,
    user_variables: &BTreeMap<String, String>,
) -> Result<BTreeMap<String, StackConfig>> {
    let config_dir = project_path.join(CONFIG_DIR);
    if !config_dir.is_dir() {
        bail!(
            "No {} directory in project {}",
            CONFIG_DIR,
            project_path.display()
        );
    }

    let mut stacks = BTreeMap::new();
    for entry in WalkDir::new(&config_dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", config_dir.display()))?;
        let path = entry.path();

        if !entry.file_type().is_file()
            || path.extension().and_then(|e| e.to_str()) != Some("toml")
            || entry.file_name() == SETTINGS_FILE
        {
            continue;
        }

        let name = stack_name(&config_dir, path)?;
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read stack config: {}", path.display()))?;
        let rendered = render_variables(&content, user_variables, path)?;
        let config: StackConfig = toml::from_str(&rendered)
            .with_context(|| format!("Failed to parse stack config: {}", path.display()))?;

        log::debug!("Loaded stack {} from {}", name, path.display());
        stacks.insert(name, config);
    }

    Ok(stacks)
}

/// Stack name for a config file: its path under `config/`, without extension
fn stack_name(config_dir: &Path, path: &Path) -> Result<String> {
    let relative = path
        .strip_prefix(config_dir)
        .with_context(|| format!("{} is outside {}", path.display(), config_dir.display()))?
        .with_extension("");

    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Ok(parts.join("/"))
}

/// Replace `{{ var.NAME }}` placeholders with user variables
pub fn render_variables(
    content: &str,
    user_variables: &BTreeMap<String, String>,
    source: &Path,
) -> Result<String> {
    let mut missing = None;
    let rendered = VARIABLE.replace_all(content, |caps: &Captures<'_>| {
        let name = &caps[1];
        match user_variables.get(name) {
            Some(value) => value.clone(),
            None => {
                missing.get_or_insert_with(|| name.to_string());
                String::new()
            }
        }
    });

    if let Some(name) = missing {
        bail!(
            "Undefined user variable '{}' in {} (pass --var {}=...)",
            name,
            source.display(),
            name
        );
    }

    Ok(rendered.into_owned())
}

// ============================================================================
// Command Context
// ============================================================================

/// Everything a command needs to know about its invocation
#[derive(Debug, Clone)]
pub struct CommandContext {
    /// Stack or stack group the command targets, relative to `config/`
    pub command_path: String,
    pub project_path: PathBuf,
    pub project: ProjectConfig,
    pub user_variables: BTreeMap<String, String>,
    pub output_format: OutputFormat,
    pub ignore_dependencies: bool,
}

impl CommandContext {
    pub fn new(
        project_path: PathBuf,
        command_path: &str,
        user_variables: BTreeMap<String, String>,
        output_format: OutputFormat,
        ignore_dependencies: bool,
    ) -> Result<Self> {
        let project = ProjectConfig::load(&project_path)?;
        Ok(Self {
            command_path: normalize_command_path(command_path),
            project_path,
            project,
            user_variables,
            output_format,
            ignore_dependencies,
        })
    }

    pub fn state_path(&self) -> PathBuf {
        self.project.state_path(&self.project_path)
    }
}

/// Strip `./`, trailing slashes and a `.toml` extension
fn normalize_command_path(path: &str) -> String {
    let path = path.trim().trim_start_matches("./").trim_matches('/');
    let path = path.strip_suffix(".toml").unwrap_or(path);
    if path == "." {
        String::new()
    } else {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_project_config_defaults_when_missing() {
        let dir = TempDir::new().unwrap();
        let config = ProjectConfig::load(dir.path()).unwrap();
        assert_eq!(config, ProjectConfig::default());
        assert_eq!(config.state_path(dir.path()), dir.path().join(".stackctl"));
    }

    #[test]
    fn test_project_config_partial_file() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "config/config.toml", "max_concurrency = 2\n");
        let config = ProjectConfig::load(dir.path()).unwrap();
        assert_eq!(config.max_concurrency, 2);
        assert_eq!(config.poll_interval_ms, 1000);
    }

    #[test]
    fn test_project_config_rejects_zero_concurrency() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "config/config.toml", "max_concurrency = 0\n");
        assert!(ProjectConfig::load(dir.path()).is_err());
    }

    #[test]
    fn test_load_stack_configs_names_by_path() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "config/config.toml", "project_code = \"demo\"\n");
        write(dir.path(), "config/dev/vpc.toml", "template = \"vpc.json\"\n");
        write(
            dir.path(),
            "config/dev/app.toml",
            "template = \"app.json\"\ndependencies = [\"dev/vpc\"]\n",
        );
        write(dir.path(), "config/dev/notes.md", "not a stack");

        let stacks = load_stack_configs(dir.path(), &BTreeMap::new()).unwrap();

        assert_eq!(stacks.keys().collect::<Vec<_>>(), vec!["dev/app", "dev/vpc"]);
        assert_eq!(stacks["dev/app"].dependencies, vec!["dev/vpc"]);
    }

    #[test]
    fn test_load_stack_configs_requires_config_dir() {
        let dir = TempDir::new().unwrap();
        assert!(load_stack_configs(dir.path(), &BTreeMap::new()).is_err());
    }

    #[test]
    fn test_render_variables() {
        let vars = BTreeMap::from([("env".to_string(), "prod".to_string())]);
        let rendered = render_variables(
            "template = \"{{ var.env }}.json\"\n[parameters]\nEnv = \"{{var.env}}\"\n",
            &vars,
            Path::new("x.toml"),
        )
        .unwrap();
        assert_eq!(rendered, "template = \"prod.json\"\n[parameters]\nEnv = \"prod\"\n");
    }

    #[test]
    fn test_render_variables_undefined() {
        let err = render_variables("a = \"{{ var.region }}\"", &BTreeMap::new(), Path::new("x.toml"))
            .unwrap_err();
        assert!(err.to_string().contains("'region'"));
    }

    #[test]
    fn test_normalize_command_path() {
        assert_eq!(normalize_command_path("./dev/"), "dev");
        assert_eq!(normalize_command_path("dev/app.toml"), "dev/app");
        assert_eq!(normalize_command_path("."), "");
        assert_eq!(normalize_command_path("/"), "");
    }
}
