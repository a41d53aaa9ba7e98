//! `health`, `diagnose`, `services` and `report`: point-in-time views of
//! the machine.

use anyhow::Result;
use chrono::Local;
use clap::ArgMatches;
use colored::Colorize;
use std::path::PathBuf;
use std::time::Duration;

use super::show;
use crate::core::diagnostics;
use crate::core::ops::{optimizer, Status};
use crate::core::report;
use crate::ui::{format_bytes, format_percent, print_outcome};

pub fn execute_health() -> Result<Status> {
    let outcome = optimizer::system_health();
    if let Some(h) = &outcome.detail {
        println!("{}", "System health".cyan().bold());
        println!("  CPU:       {}", format_percent(h.cpu_usage));
        println!(
            "  Memory:    {} ({} GB available)",
            format_percent(h.memory_usage),
            h.memory_available_gb
        );
        println!("  Disk:      {}", format_percent(h.disk_usage));
        println!("  Processes: {}", h.process_count);
        println!("  Uptime:    {}h", h.uptime_hours);
        println!();
    }
    Ok(show(outcome))
}

pub fn execute_report(matches: &ArgMatches) -> Result<Status> {
    let path = matches
        .get_one::<String>("output")
        .map(PathBuf::from)
        .unwrap_or_else(|| {
            PathBuf::from(format!(
                "qdesk_report_{}.json",
                Local::now().format("%Y%m%d_%H%M%S")
            ))
        });

    let outcome = report::export_report(&path);
    if let Some(r) = &outcome.detail {
        println!(
            "{} {} │ {} cores │ {} / {} RAM │ {} disks",
            r.hostname.as_deref().unwrap_or("unknown host").white().bold(),
            r.os.as_deref().unwrap_or_default(),
            r.cpu.logical_cores,
            format_bytes(r.memory.used_bytes),
            format_bytes(r.memory.total_bytes),
            r.disks.len()
        );
    }
    Ok(show(outcome))
}

pub fn execute_diagnose(matches: &ArgMatches) -> Result<Status> {
    let secs = matches.get_one::<u64>("cpu-seconds").copied().unwrap_or(10);
    println!(
        "{}",
        format!("Running diagnostics (sampling CPU for {}s)...", secs).cyan()
    );
    Ok(show(diagnostics::run_diagnostics(Duration::from_secs(secs))))
}

pub fn execute_services(matches: &ArgMatches) -> Result<Status> {
    let mut outcome = report::services_info();
    if matches.get_flag("running") {
        if let Some(services) = &outcome.detail {
            outcome.items = services
                .iter()
                .filter(|s| s.is_running())
                .map(|s| format!("{} {}", s.name, s.display_name))
                .collect();
        }
    }
    print_outcome(&outcome);
    Ok(outcome.status)
}
