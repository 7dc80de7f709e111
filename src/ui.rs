use anyhow::Result;
use changeset::{ConfirmCallback, OutcomeSummary, StackMap, StackStatus};
use colored::Colorize;

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a dim/muted message
pub fn dim(msg: &str) {
    println!("  {}", msg.dimmed());
}

/// Print a header/title
pub fn header(title: &str) {
    println!();
    println!("{}", title.bold());
    println!("{}", "─".repeat(title.chars().count()).dimmed());
}

/// Print one line per stack outcome
pub fn stack_outcomes(outcomes: &StackMap<StackStatus>) {
    for (stack, status) in outcomes {
        let symbol = match status {
            StackStatus::Complete => "✓".green(),
            StackStatus::InProgress => "…".blue(),
            StackStatus::Failed => "✗".red(),
            StackStatus::Pending => "○".dimmed(),
        };
        println!("  {} {} {}", symbol, stack, format!("({})", status).dimmed());
    }
}

/// One-line summary of stack outcomes
pub fn summary_line(summary: &OutcomeSummary) -> String {
    let mut parts = vec![format!("{} complete", summary.complete)];
    if summary.failed > 0 {
        parts.push(format!("{} failed", summary.failed));
    }
    if summary.in_progress > 0 {
        parts.push(format!("{} in progress", summary.in_progress));
    }
    if summary.pending > 0 {
        parts.push(format!("{} not attempted", summary.pending));
    }
    parts.join(", ")
}

/// Interactive confirmation on the terminal
pub struct DialoguerConfirm;

impl ConfirmCallback for DialoguerConfirm {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()?;

        Ok(confirmed)
    }
}

// ============================================================================
// Tests
// ============================================================================
