//! Subprocess execution with failure propagation.
//!
//! Every external tool (python, pip, conda, micromamba, pynsist) goes
//! through [`run_checked`], which logs the full command line, captures the
//! output, and converts a non-zero exit into a typed error carrying the
//! command and the tail of stderr.

use crate::error::{EnvError, Result};
use std::ffi::OsStr;
use std::path::Path;
use std::process::Output;
use tokio::process::Command;

/// Stderr lines kept in error messages.
const STDERR_TAIL_LINES: usize = 20;

/// Render a command line for logging and error messages.
fn render<S: AsRef<OsStr>>(program: &OsStr, args: &[S]) -> String {
    let mut parts = vec![program.to_string_lossy().into_owned()];
    parts.extend(args.iter().map(|a| a.as_ref().to_string_lossy().into_owned()));
    parts.join(" ")
}

/// Run a command to completion, failing on non-zero exit.
///
/// Stdout is logged at debug level and returned as lossy UTF-8; lossy
/// conversion keeps odd bytes in pip output from aborting a build.
pub async fn run_checked<P, S>(program: P, args: &[S], cwd: Option<&Path>) -> Result<String>
where
    P: AsRef<OsStr>,
    S: AsRef<OsStr>,
{
    let output = run_captured(program, args, cwd).await?;
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

/// Run a command and return the raw [`Output`], failing on non-zero exit.
pub async fn run_captured<P, S>(program: P, args: &[S], cwd: Option<&Path>) -> Result<Output>
where
    P: AsRef<OsStr>,
    S: AsRef<OsStr>,
{
    let command_line = render(program.as_ref(), args);
    log::info!("$ {command_line}");

    let mut command = Command::new(program.as_ref());
    command.args(args);
    if let Some(dir) = cwd {
        command.current_dir(dir);
    }

    let output = command
        .output()
        .await
        .map_err(|error| EnvError::SpawnFailed {
            command: command_line.clone(),
            error,
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    if !stdout.trim().is_empty() {
        log::debug!("{}", stdout.trim_end());
    }

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        let tail: Vec<&str> = stderr
            .lines()
            .rev()
            .take(STDERR_TAIL_LINES)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        return Err(EnvError::CommandFailed {
            command: command_line,
            code: output.status.code(),
            stderr: tail.join("\n"),
        }
        .into());
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn captures_stdout_of_successful_command() {
        let out = run_checked("echo", &["hello"], None).await.expect("echo");
        assert_eq!(out.trim(), "hello");
    }

    #[tokio::test]
    async fn nonzero_exit_becomes_command_failed() {
        let err = run_checked("sh", &["-c", "echo oops >&2; exit 3"], None)
            .await
            .expect_err("must fail");
        let message = err.to_string();
        assert!(message.contains("exit code Some(3)"), "got: {message}");
        assert!(message.contains("oops"), "got: {message}");
    }

    #[tokio::test]
    async fn missing_program_becomes_spawn_failed() {
        let err = run_checked("definitely-not-a-real-tool", &[] as &[&str], None)
            .await
            .expect_err("must fail");
        assert!(err.to_string().contains("Failed to spawn"));
    }
}
