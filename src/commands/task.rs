//! Scheduled tasks: edit the tasks file, or run the scheduler in the foreground.

use anyhow::{Context as _, Result};
use clap::ArgMatches;
use colored::Colorize;
use tokio_util::sync::CancellationToken;

use super::{show, Context};
use crate::core::ops::automation::{self, ScheduleType, TaskScheduler};
use crate::core::ops::Status;

fn task_id(matches: &ArgMatches) -> Result<u32> {
    matches
        .get_one::<u32>("id")
        .copied()
        .context("task id is required")
}

pub fn execute(matches: &ArgMatches, ctx: &Context) -> Result<Status> {
    let store = ctx.config.tasks_file();

    let status = match matches.subcommand() {
        Some(("create", sub)) => {
            let name = sub.get_one::<String>("name").context("--name is required")?;
            let command = sub
                .get_one::<String>("command")
                .context("--command is required")?;
            let kind: ScheduleType = sub
                .get_one::<String>("type")
                .context("--type is required")?
                .parse()?;
            let value = sub.get_one::<String>("value").map(String::as_str).unwrap_or("");
            show(automation::create_task(&store, name, command, kind, value))
        }
        Some(("list", _)) => list(&store)?,
        Some(("delete", sub)) => show(automation::delete_task(&store, task_id(sub)?)),
        Some(("enable", sub)) => show(automation::set_task_enabled(&store, task_id(sub)?, true)),
        Some(("disable", sub)) => {
            show(automation::set_task_enabled(&store, task_id(sub)?, false))
        }
        Some(("daemon", _)) => daemon(store)?,
        _ => {
            println!("Use 'qdesk task --help' for more information.");
            Status::Success
        }
    };
    Ok(status)
}

fn list(store: &std::path::Path) -> Result<Status> {
    let outcome = automation::list_tasks(store);
    if let Some(tasks) = &outcome.detail {
        let now = chrono::Local::now().naive_local();
        for task in tasks {
            let next = automation::next_run(task, now)
                .filter(|_| task.enabled)
                .map(|t| crate::ui::formatters::format_naive(&t))
                .unwrap_or_else(|| "-".to_string());
            let state = if task.enabled {
                "enabled".green()
            } else {
                "disabled".dimmed()
            };
            println!(
                "{:>4}  {:<20} {:<8} {:<16} next: {}  {}",
                task.id,
                task.name.white().bold(),
                task.schedule_type.to_string(),
                task.schedule_value,
                next.cyan(),
                state
            );
        }
        if !tasks.is_empty() {
            println!();
        }
    }
    // The table above already lists every task
    let mut summary = outcome.erase();
    summary.items.clear();
    Ok(show(summary))
}

/// Run due tasks until Ctrl+C
fn daemon(store: std::path::PathBuf) -> Result<Status> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_time()
        .thread_name("qdesk-scheduler")
        .build()
        .context("Failed to start the scheduler runtime")?;

    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    ctrlc::set_handler(move || {
        println!();
        println!("{}", "Stopping scheduler...".yellow().bold());
        cancel_clone.cancel();
    })
    .map_err(|e| anyhow::anyhow!("Failed to set Ctrl+C handler: {}", e))?;

    println!(
        "{} {}",
        "Scheduler running on".cyan().bold(),
        store.display().to_string().white()
    );
    println!("{}", "Press Ctrl+C to stop".dimmed());

    runtime.block_on(TaskScheduler::new(store).run(cancel));
    Ok(Status::Success)
}
