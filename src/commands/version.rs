use anyhow::Result;
use colored::Colorize;

use crate::core::ops::Status;

pub fn execute() -> Result<Status> {
    println!(
        "{} {}",
        "qdesk".cyan().bold(),
        env!("CARGO_PKG_VERSION").white()
    );
    println!("{}", env!("CARGO_PKG_DESCRIPTION").dimmed());
    Ok(Status::Success)
}
