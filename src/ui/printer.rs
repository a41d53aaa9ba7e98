//! Colourized rendering of operation records for the CLI.

use colored::{ColoredString, Colorize};

use crate::core::ops::{BulkSummary, OpOutcome, Status};

/// Item lines printed under a record before collapsing the rest
const MAX_ITEMS: usize = 20;

pub fn status_icon(status: Status) -> ColoredString {
    match status {
        Status::Success => "✓".green().bold(),
        Status::Warning => "!".yellow().bold(),
        Status::Error => "✗".red().bold(),
    }
}

pub fn colorize(status: Status, text: &str) -> ColoredString {
    match status {
        Status::Success => text.green(),
        Status::Warning => text.yellow(),
        Status::Error => text.red(),
    }
}

/// Plain-text lines of a record, as shown in the CLI and the dashboard log
pub fn outcome_lines<T>(outcome: &OpOutcome<T>, max_items: usize) -> Vec<String> {
    let mut lines = vec![format!("[{}] {}", outcome.status, outcome.message)];
    lines.extend(outcome.items.iter().take(max_items).map(|i| format!("  - {}", i)));
    if outcome.items.len() > max_items {
        lines.push(format!("  ... and {} more", outcome.items.len() - max_items));
    }
    lines
}

pub fn print_outcome<T>(outcome: &OpOutcome<T>) {
    println!(
        "{} {}",
        status_icon(outcome.status),
        colorize(outcome.status, &outcome.message).bold()
    );
    for item in outcome.items.iter().take(MAX_ITEMS) {
        println!("    {}", item.white());
    }
    if outcome.items.len() > MAX_ITEMS {
        println!(
            "    {}",
            format!("... and {} more", outcome.items.len() - MAX_ITEMS).dimmed()
        );
    }
}

pub fn print_summary(summary: &BulkSummary) {
    let status = summary.status();
    println!();
    println!(
        "{} {}",
        status_icon(status),
        colorize(
            status,
            &format!(
                "{}: {}/{} steps succeeded ({} warnings, {} failed)",
                summary.name, summary.succeeded, summary.attempted, summary.warnings, summary.failed
            )
        )
        .bold()
    );
    for line in &summary.lines {
        println!("    {}", line.dimmed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_lines_collapse_items() {
        let outcome: OpOutcome =
            OpOutcome::success("Scanned").with_items((0..5).map(|i| format!("file{}", i)));
        let lines = outcome_lines(&outcome, 2);
        assert_eq!(lines[0], "[success] Scanned");
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[3], "  ... and 3 more");
    }
}
