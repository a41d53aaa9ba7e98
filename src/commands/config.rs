use anyhow::{Context as _, Result};
use clap::ArgMatches;
use colored::Colorize;
use std::path::Path;

use super::Context;
use crate::core::config::Config;
use crate::core::ops::Status;

pub fn execute(matches: &ArgMatches, ctx: &Context) -> Result<Status> {
    match matches.subcommand() {
        Some(("show", _)) => show(&ctx.config),
        Some(("path", _)) => {
            println!("{}", Config::get_config_path()?.display());
            Ok(Status::Success)
        }
        Some(("reset", _)) => reset(ctx),
        Some(("add-scan-dir", sub)) => {
            let dir = sub
                .get_one::<String>("dir")
                .context("Directory argument is required")?;
            add_scan_dir(ctx, dir)
        }
        _ => {
            println!("Use 'qdesk config --help' for more information.");
            Ok(Status::Success)
        }
    }
}

fn show(config: &Config) -> Result<Status> {
    println!("{}", serde_json::to_string_pretty(config)?);
    println!();
    println!("{} {}", "Scan directories:".white().bold(), config.scan_directories().len());
    for dir in config.scan_directories() {
        println!("  {}", dir.display().to_string().cyan());
    }
    println!("{} {}", "Quarantine:".white().bold(), config.quarantine_dir().display());
    println!("{} {}", "Tasks file:".white().bold(), config.tasks_file().display());
    Ok(Status::Success)
}

fn reset(ctx: &Context) -> Result<Status> {
    if !ctx.confirm("Restore the default configuration?")? {
        return super::cancelled();
    }
    Config::default().save()?;
    println!("{}", "✓ Configuration reset to defaults".green());
    Ok(Status::Success)
}

fn add_scan_dir(ctx: &Context, dir: &str) -> Result<Status> {
    let path = Path::new(dir);
    if !path.is_dir() {
        println!("{}", format!("Error: '{}' is not a directory", dir).red());
        return Ok(Status::Error);
    }

    let mut config = ctx.config.clone();
    let canonical = path
        .canonicalize()
        .unwrap_or_else(|_| path.to_path_buf())
        .to_string_lossy()
        .into_owned();
    if config.security.scan_directories.contains(&canonical) {
        println!("{}", format!("{} is already scanned", canonical).yellow());
        return Ok(Status::Warning);
    }
    config.security.scan_directories.push(canonical.clone());
    config.save()?;
    println!("{} {}", "✓ Added scan directory".green(), canonical.cyan());
    Ok(Status::Success)
}
