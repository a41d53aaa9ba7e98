// Progress display for bulk operations

use colored::Colorize;
use std::io::{self, Write};

use super::printer::status_icon;
use crate::core::ops::{BulkHandle, BulkSummary, ProgressEvent, Status};

const BAR_WIDTH: usize = 30;

/// `[=====     ] 50% (2/4)` on the current line, filled in the colour of
/// the worst status seen so far
pub fn show_progress_bar(completed: usize, total: usize, worst: Status) {
    let ratio = if total == 0 {
        0.0
    } else {
        (completed as f64 / total as f64).min(1.0)
    };
    let filled = (ratio * BAR_WIDTH as f64).round() as usize;
    let bar = "=".repeat(filled);
    let bar = match worst {
        Status::Success => bar.green(),
        Status::Warning => bar.yellow(),
        Status::Error => bar.red(),
    };

    print!(
        "\r[{}{}] {:>3.0}% ({}/{}) ",
        bar,
        " ".repeat(BAR_WIDTH - filled),
        ratio * 100.0,
        completed,
        total
    );
    io::stdout().flush().ok();
}

pub fn clear_line() {
    print!("\r{:width$}\r", "", width = BAR_WIDTH + 20);
    io::stdout().flush().ok();
}

fn worse(a: Status, b: Status) -> Status {
    match (a, b) {
        (Status::Error, _) | (_, Status::Error) => Status::Error,
        (Status::Warning, _) | (_, Status::Warning) => Status::Warning,
        _ => Status::Success,
    }
}

/// Print each event of a running bulk operation, then wait for it to end
pub fn follow_bulk(mut handle: BulkHandle) -> crate::Result<BulkSummary> {
    let mut worst = Status::Success;
    while let Some(event) = handle.events.blocking_recv() {
        match event {
            ProgressEvent::Started { name, total } => {
                println!("{}", format!("Running {} ({} steps)", name, total).cyan().bold());
            }
            ProgressEvent::Step {
                name,
                status,
                message,
                completed,
                total,
                ..
            } => {
                clear_line();
                println!("{} {}: {}", status_icon(status), name.bold(), message);
                worst = worse(worst, status);
                show_progress_bar(completed, total, worst);
            }
            ProgressEvent::Finished(_) => {
                clear_line();
                break;
            }
        }
    }
    handle.join()
}
