use anyhow::Result;
use clap::ArgMatches;

use super::{run_bulk, show, Context};
use crate::core::ops::{optimizer, Status};

/// Operations that end processes or delete files
const DESTRUCTIVE: &[&str] = &[
    "kill-heavy",
    "idle-apps",
    "chrome",
    "temp",
    "recycle",
    "prefetch",
    "full-clean",
    "auto",
    "elite",
];

pub fn execute(matches: &ArgMatches, ctx: &Context) -> Result<Status> {
    let Some((op, sub)) = matches.subcommand() else {
        println!("Use 'qdesk optimize --help' for more information.");
        return Ok(Status::Success);
    };

    if DESTRUCTIVE.contains(&op) && !ctx.confirm(&format!("Run '{}' now?", op))? {
        return super::cancelled();
    }

    let settings = &ctx.config.processes;
    let status = match op {
        "free-ram" => show(optimizer::free_ram()),
        "clear-cache" => show(optimizer::clear_cache()),
        "memory" => show(optimizer::optimize_memory()),
        "kill-heavy" => show(optimizer::kill_heavy_processes(settings)),
        "idle-apps" => show(optimizer::end_idle_apps(settings)),
        "chrome" => show(optimizer::clean_chrome()),
        "startup" => show(optimizer::scan_startup()),
        "disable-startup" => show(optimizer::disable_heavy_startup()),
        "boot" => show(optimizer::optimize_boot()),
        "temp" => show(optimizer::clean_temp()),
        "recycle" => show(optimizer::empty_recycle()),
        "prefetch" => show(optimizer::clear_prefetch()),
        "registry" => show(optimizer::clean_registry()),
        "disk-cleanup" => show(optimizer::disk_cleanup()),
        "game-mode" => {
            let target = sub.get_one::<String>("process").map(String::as_str).unwrap_or("");
            show(optimizer::game_mode(target))
        }
        "high-performance" => show(optimizer::high_performance()),
        "priority" => show(optimizer::priority_boost()),
        "full-clean" => run_bulk("full-clean", optimizer::full_system_clean())?,
        "auto" => run_bulk("auto-optimize", optimizer::auto_optimize(settings)?)?,
        "elite" => run_bulk("elite-clean", optimizer::elite_clean(settings))?,
        other => {
            println!("Unknown optimize operation: {}", other);
            Status::Error
        }
    };
    Ok(status)
}
