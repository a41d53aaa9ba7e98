use anyhow::{Context as _, Result};
use clap::ArgMatches;

use super::{show, Context};
use crate::core::ops::{automation, Status};

fn minutes(matches: &ArgMatches) -> Result<u32> {
    matches
        .get_one::<u32>("minutes")
        .copied()
        .context("minutes argument is required")
}

fn names(matches: &ArgMatches, id: &str) -> Vec<String> {
    matches
        .get_many::<String>(id)
        .map(|v| v.cloned().collect())
        .unwrap_or_default()
}

pub fn execute(matches: &ArgMatches, ctx: &Context) -> Result<Status> {
    let status = match matches.subcommand() {
        Some(("shutdown", sub)) => {
            let minutes = minutes(sub)?;
            if !ctx.confirm(&format!("Shut down in {} minute(s)?", minutes))? {
                return super::cancelled();
            }
            show(automation::schedule_shutdown(minutes))
        }
        Some(("restart", sub)) => {
            let minutes = minutes(sub)?;
            if !ctx.confirm(&format!("Restart in {} minute(s)?", minutes))? {
                return super::cancelled();
            }
            show(automation::schedule_restart(minutes))
        }
        Some(("cancel", _)) => show(automation::cancel_shutdown()),
        Some(("launch", sub)) => show(automation::launch_apps(&names(sub, "apps"))),
        Some(("close-all", sub)) => {
            if !ctx.confirm("Close every running application?")? {
                return super::cancelled();
            }
            show(automation::close_all_apps(&names(sub, "exclude")))
        }
        _ => {
            println!("Use 'qdesk power --help' for more information.");
            Status::Success
        }
    };
    Ok(status)
}
