//! Running external programs with captured output.
//!
//! Arguments are always passed as a vector; only `run_line`/`spawn_line`
//! go through the platform shell, and those are reserved for user-authored
//! task commands.

use std::process::{Command, Stdio};

use crate::error::{QdError, Result};

#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// First non-empty line of stderr, else stdout
    pub fn summary(&self) -> String {
        self.stderr
            .lines()
            .chain(self.stdout.lines())
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or("no output")
            .to_string()
    }
}

fn command(program: &str, args: &[&str]) -> Command {
    let mut cmd = Command::new(program);
    cmd.args(args);

    #[cfg(windows)]
    {
        use std::os::windows::process::CommandExt;
        cmd.creation_flags(CREATE_NO_WINDOW);
    }

    cmd
}

/// Run `program` to completion and capture its output
pub fn run(program: &str, args: &[&str]) -> Result<CommandOutput> {
    log::debug!("Running {} {:?}", program, args);

    let output = command(program, args)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| QdError::command_failed(program, e.to_string()))?;

    Ok(CommandOutput {
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Like `run`, but a non-zero exit status is an error
pub fn run_checked(program: &str, args: &[&str]) -> Result<CommandOutput> {
    let output = run(program, args)?;
    if output.success() {
        Ok(output)
    } else {
        Err(QdError::command_failed(program, output.summary()))
    }
}

/// Start `program` without waiting for it; returns the child pid
pub fn spawn(program: &str, args: &[&str]) -> Result<u32> {
    let child = command(program, args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| QdError::command_failed(program, e.to_string()))?;
    Ok(child.id())
}

#[cfg(windows)]
fn shell_command(line: &str) -> Command {
    command("cmd", &["/C", line])
}

#[cfg(not(windows))]
fn shell_command(line: &str) -> Command {
    command("sh", &["-c", line])
}

/// Run a command line through the platform shell
pub fn run_line(line: &str) -> Result<CommandOutput> {
    let line = line.trim();
    if line.is_empty() {
        return Err(QdError::invalid_input("empty command line"));
    }

    let output = shell_command(line)
        .stdin(Stdio::null())
        .output()
        .map_err(|e| QdError::command_failed(line, e.to_string()))?;

    Ok(CommandOutput {
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Start a command line through the platform shell without waiting
pub fn spawn_line(line: &str) -> Result<u32> {
    let line = line.trim();
    if line.is_empty() {
        return Err(QdError::invalid_input("empty command line"));
    }

    let child = shell_command(line)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| QdError::command_failed(line, e.to_string()))?;
    Ok(child.id())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_program_is_command_failed() {
        let err = run("qdesk-definitely-not-a-program", &[]).unwrap_err();
        assert!(matches!(err, QdError::CommandFailed { .. }));
    }

    #[test]
    fn test_empty_line_rejected() {
        assert!(matches!(
            run_line("   "),
            Err(QdError::InvalidInput(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_line_captures_stdout() {
        let output = run_line("echo hello").unwrap();
        assert!(output.success());
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[test]
    fn test_summary_prefers_stderr() {
        let output = CommandOutput {
            code: Some(1),
            stdout: "out\n".into(),
            stderr: "\n  bad thing \n".into(),
        };
        assert_eq!(output.summary(), "bad thing");
    }
}
