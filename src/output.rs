//! Rendering change set descriptions for the terminal

use anyhow::{Context, Result};
use changeset::{ChangeAction, OutputSink, RenderedDescription, Replacement, Stack};
use clap::ValueEnum;
use colored::Colorize;

/// How descriptions are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Yaml,
    Json,
    Text,
}

/// Sink that prints to stdout in the chosen format
pub struct TerminalSink {
    format: OutputFormat,
}

impl TerminalSink {
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }
}

impl OutputSink for TerminalSink {
    fn write_description(&mut self, stack: &Stack, description: &RenderedDescription<'_>) {
        match format_description(self.format, description) {
            Ok(rendered) => println!("{}", rendered.trim_end()),
            Err(e) => log::error!("Could not render change set for {}: {:#}", stack, e),
        }
    }

    fn write_line(&mut self, line: &str) {
        println!("{}", line);
    }
}

/// Render one description in the given format
pub fn format_description(
    format: OutputFormat,
    description: &RenderedDescription<'_>,
) -> Result<String> {
    match format {
        OutputFormat::Yaml => {
            serde_yaml::to_string(description).context("Failed to serialize change set as YAML")
        }
        OutputFormat::Json => serde_json::to_string_pretty(description)
            .context("Failed to serialize change set as JSON"),
        OutputFormat::Text => Ok(format_text(description)),
    }
}

fn format_text(description: &RenderedDescription<'_>) -> String {
    let mut out = format!(
        "{} {}\n",
        description.stack_name().bold(),
        format!("({})", description.change_set_name()).dimmed()
    );

    let changes = description.change_lines();
    if changes.is_empty() {
        out.push_str(&format!("  {} No changes\n", "✓".green()));
        return out;
    }

    for (action, logical_id, resource_type, replacement) in changes {
        let symbol = match action {
            ChangeAction::Add => "+".green(),
            ChangeAction::Modify => "~".yellow(),
            ChangeAction::Remove => "-".red(),
        };
        let replace = match replacement {
            Some(Replacement::True) => " [replace]".red().to_string(),
            Some(Replacement::Conditional) => " [may replace]".yellow().to_string(),
            Some(Replacement::False) | None => String::new(),
        };
        out.push_str(&format!(
            "  {} {:<30} {}{}\n",
            symbol,
            logical_id,
            resource_type.dimmed(),
            replace
        ));
    }

    out.push_str(&format!(
        "  {} changes\n",
        description.change_count().to_string().bold()
    ));
    out
}
