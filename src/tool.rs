//! External tool invocation.
//!
//! Tools are shell command lines run from the project root. A tool either
//! runs to completion with inherited stdio ([`run_shell`]) or acts as a
//! stream filter that reads its input on stdin and writes the transformed
//! result to stdout ([`pipe_through`]).

use std::io::Write;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread;
use thiserror::Error;

/// Error raised by an external tool.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The command could not be started
    #[error("failed to start `{command}`: {source}")]
    Spawn { command: String, source: std::io::Error },
    /// The command exited unsuccessfully
    #[error("`{}` {}{}", .command, exit_status(.code), stderr_suffix(.stderr))]
    Failed { command: String, code: Option<i32>, stderr: String },
    /// Reading or writing the command's pipes failed
    #[error("I/O error while running `{command}`: {source}")]
    Io { command: String, source: std::io::Error },
}

impl ToolError {
    /// Exit code reported by the tool, if it exited normally.
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            ToolError::Failed { code, .. } => *code,
            _ => None,
        }
    }
}

fn exit_status(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exited with status {}", code),
        None => "was terminated by a signal".to_string(),
    }
}

fn stderr_suffix(stderr: &str) -> String {
    let stderr = stderr.trim();
    if stderr.is_empty() {
        String::new()
    } else {
        format!(": {}", stderr)
    }
}

#[cfg(not(windows))]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(command);
    cmd
}

#[cfg(windows)]
fn shell(command: &str) -> Command {
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").arg(command);
    cmd
}

/// Run a command line with inherited stdio, failing on a non-zero exit.
pub fn run_shell(command: &str, cwd: &Path) -> Result<(), ToolError> {
    log::debug!("running `{}` in {}", command, cwd.display());

    let status = shell(command)
        .current_dir(cwd)
        .status()
        .map_err(|source| ToolError::Spawn { command: command.to_string(), source })?;

    if status.success() {
        Ok(())
    } else {
        Err(ToolError::Failed {
            command: command.to_string(),
            code: status.code(),
            stderr: String::new(),
        })
    }
}

/// Feed `input` to a command on stdin and return what it wrote to stdout.
///
/// Stderr is captured and attached to the error when the command fails.
pub fn pipe_through(command: &str, cwd: &Path, input: &[u8]) -> Result<Vec<u8>, ToolError> {
    log::debug!("piping {} bytes through `{}`", input.len(), command);

    let mut child = shell(command)
        .current_dir(cwd)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|source| ToolError::Spawn { command: command.to_string(), source })?;

    // Write stdin from a separate thread so a tool that streams output
    // before consuming all input cannot deadlock against us.
    let mut stdin = child.stdin.take().ok_or_else(|| ToolError::Io {
        command: command.to_string(),
        source: std::io::Error::other("stdin not captured"),
    })?;
    let owned = input.to_vec();
    let writer = thread::spawn(move || stdin.write_all(&owned));

    let output = child
        .wait_with_output()
        .map_err(|source| ToolError::Io { command: command.to_string(), source })?;

    match writer.join() {
        Ok(Ok(())) => {}
        // A filter that exits without reading all of its input is judged by
        // its exit status alone.
        Ok(Err(e)) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
        Ok(Err(source)) => return Err(ToolError::Io { command: command.to_string(), source }),
        Err(_) => {
            return Err(ToolError::Io {
                command: command.to_string(),
                source: std::io::Error::other("stdin writer panicked"),
            })
        }
    }

    if output.status.success() {
        Ok(output.stdout)
    } else {
        Err(ToolError::Failed {
            command: command.to_string(),
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
