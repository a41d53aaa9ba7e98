use anyhow::Result;
use clap::ArgMatches;

use super::{show, Context};
use crate::core::ops::{privacy, Status};
use crate::platform::paths;

pub fn execute(matches: &ArgMatches, ctx: &Context) -> Result<Status> {
    let home = paths::home_dir();
    match matches.subcommand() {
        Some(("browsers", _)) => {
            if !ctx.confirm("Delete browser history, cookies and caches?")? {
                return super::cancelled();
            }
            Ok(show(privacy::clear_browser_data(&home)))
        }
        Some(("traces", _)) => {
            if !ctx.confirm("Clear recent documents, jump lists and event logs?")? {
                return super::cancelled();
            }
            Ok(show(privacy::clear_system_traces(&home)))
        }
        _ => {
            println!("Use 'qdesk privacy --help' for more information.");
            Ok(Status::Success)
        }
    }
}
