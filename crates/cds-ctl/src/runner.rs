//! Process execution seam.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::CtlError;

/// Captured result of a finished process.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CommandOutput {
  /// Exit code, `None` when the process was killed by a signal.
  pub status: Option<i32>,
  pub stdout: String,
  pub stderr: String,
}

impl CommandOutput {
  pub fn success(&self) -> bool {
    self.status == Some(0)
  }
}

/// Runs a program to completion and captures its output.
#[async_trait]
pub trait CommandRunner: Send + Sync {
  async fn run(
    &self,
    program: &Path,
    args: &[String],
    cwd: &Path,
    timeout: Option<Duration>,
  ) -> Result<CommandOutput, CtlError>;
}

/// Runs programs as child processes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
  async fn run(
    &self,
    program: &Path,
    args: &[String],
    cwd: &Path,
    timeout: Option<Duration>,
  ) -> Result<CommandOutput, CtlError> {
    let mut command = Command::new(program);
    command
      .args(args)
      .current_dir(cwd)
      .stdin(Stdio::null())
      .stdout(Stdio::piped())
      .stderr(Stdio::piped())
      .kill_on_drop(true);

    let child = command.spawn().map_err(|source| CtlError::Spawn {
      binary: PathBuf::from(program),
      source,
    })?;
    debug!(program = %program.display(), pid = ?child.id(), "process spawned");

    let output = match timeout {
      Some(limit) => match tokio::time::timeout(limit, child.wait_with_output()).await {
        Ok(output) => output?,
        Err(_) => {
          return Err(CtlError::Timeout {
            binary: PathBuf::from(program),
            timeout: limit,
          });
        }
      },
      None => child.wait_with_output().await?,
    };

    Ok(CommandOutput {
      status: output.status.code(),
      stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
      stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
  }
}
