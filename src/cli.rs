use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "stackctl")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Preview and apply stack updates through change sets", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Project directory
    #[arg(long, env = "STACKCTL_DIR", default_value = ".", global = true)]
    pub dir: PathBuf,

    /// Format for change set descriptions
    #[arg(long, value_enum, default_value_t = OutputFormat::Yaml, global = true)]
    pub output: OutputFormat,

    /// User variable for stack configs (repeatable)
    #[arg(long = "var", value_name = "KEY=VALUE", value_parser = parse_var, global = true)]
    pub vars: Vec<(String, String)>,

    /// Treat every stack as independent of the others
    #[arg(long, global = true)]
    pub ignore_dependencies: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Only log errors
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Update a stack or every stack under a group
    Update(UpdateArgs),

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args, Debug, Clone)]
pub struct UpdateArgs {
    /// Stack or stack group, relative to config/
    pub path: String,

    /// Preview changes through a change set before applying them
    #[arg(short = 'c', long)]
    pub change_set: bool,

    /// Show full change set descriptions
    #[arg(short, long)]
    pub verbose: bool,

    /// Skip confirmation prompts
    #[arg(short, long)]
    pub yes: bool,
}

/// Parse a `KEY=VALUE` pair
fn parse_var(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid KEY=VALUE: no '=' found in '{s}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("invalid KEY=VALUE: empty key in '{s}'"));
    }
    Ok((key.to_string(), value.to_string()))
}
