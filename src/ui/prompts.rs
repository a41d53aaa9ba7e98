// UI prompts and user interaction module

use colored::Colorize;
use std::io::{self, Write};

/// Ask user for yes/no confirmation
pub fn confirm(message: &str) -> io::Result<bool> {
    print!("{} ", message.white().bold());
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;

    Ok(is_yes(&input))
}

/// Confirmation that `--yes` answers in advance
pub fn confirm_or_skip(message: &str, assume_yes: bool) -> io::Result<bool> {
    if assume_yes {
        return Ok(true);
    }
    let confirmed = confirm(&format!("{} (y/n):", message))?;
    if !confirmed {
        println!("{}", "Operation cancelled by user.".yellow());
    }
    Ok(confirmed)
}

fn is_yes(input: &str) -> bool {
    let response = input.trim().to_lowercase();
    response == "y" || response == "yes"
}

pub fn warn(message: &str) {
    println!("{}", message.yellow());
}

pub fn info(message: &str) {
    println!("{}", message.cyan());
}

pub fn success(message: &str) {
    println!("{}", message.green());
}

pub fn error(message: &str) {
    eprintln!("{}", message.red());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_yes() {
        assert!(is_yes("y\n"));
        assert!(is_yes("  YES "));
        assert!(!is_yes("no"));
        assert!(!is_yes(""));
    }

    #[test]
    fn test_assume_yes_skips_prompt() {
        assert!(confirm_or_skip("Delete everything?", true).unwrap());
    }
}
