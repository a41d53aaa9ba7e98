//! Live metrics: the terminal dashboard, or one JSON line per sampler tick.

use anyhow::{Context as _, Result};
use clap::ArgMatches;
use colored::Colorize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::Context;
use crate::core::monitor::{MonitorRuntime, SamplerConfig};
use crate::core::ops::Status;
use crate::core::session::Session;
use crate::ui::dashboard::run_dashboard;

pub fn execute(matches: &ArgMatches, ctx: &Context) -> Result<Status> {
    if matches.get_flag("json") {
        let ticks = matches.get_one::<u64>("ticks").copied();
        return run_json_output(ctx, ticks);
    }

    run_dashboard(Session::new(ctx.config.clone())).context("Failed to run the dashboard")?;
    Ok(Status::Success)
}

/// Run in JSON output mode (for scripting)
fn run_json_output(ctx: &Context, ticks: Option<u64>) -> Result<Status> {
    let config = SamplerConfig::from(&ctx.config.sampler);
    let poll = config.tick;
    let runtime = MonitorRuntime::start(config).context("Failed to start the metrics sampler")?;

    let running = Arc::new(AtomicBool::new(true));
    let running_clone = running.clone();
    ctrlc::set_handler(move || {
        running_clone.store(false, Ordering::Relaxed);
    })
    .map_err(|e| anyhow::anyhow!("Failed to set Ctrl+C handler: {}", e))?;

    let mut printed = 0u64;
    let mut last_tick = 0u64;
    while running.load(Ordering::Relaxed) && ticks.map_or(true, |n| printed < n) {
        std::thread::sleep(poll / 2);

        let snapshot = runtime.snapshot();
        if snapshot.readings.tick == last_tick {
            continue;
        }
        last_tick = snapshot.readings.tick;

        println!("{}", serde_json::to_string(&snapshot.readings)?);
        printed += 1;
    }

    runtime.shutdown().context("Failed to stop the metrics sampler")?;
    if !running.load(Ordering::Relaxed) {
        eprintln!("{}", "Stopped by Ctrl+C".dimmed());
    }
    Ok(Status::Success)
}

