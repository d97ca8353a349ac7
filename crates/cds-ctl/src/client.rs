use serde::de::DeserializeOwned;
use tracing::{info, instrument, warn};

use crate::command::CtlCommand;
use crate::config::CtlConfig;
use crate::error::CtlError;
use crate::runner::{CommandRunner, ProcessRunner};

/// Client for one configuration context of the command-line tool.
pub struct CdsCtl<R: CommandRunner = ProcessRunner> {
  config: CtlConfig,
  runner: R,
}

impl CdsCtl<ProcessRunner> {
  pub fn new(config: CtlConfig) -> Self {
    Self::with_runner(config, ProcessRunner)
  }
}

impl<R: CommandRunner> CdsCtl<R> {
  pub fn with_runner(config: CtlConfig, runner: R) -> Self {
    Self { config, runner }
  }

  pub fn config(&self) -> &CtlConfig {
    &self.config
  }

  pub fn context_name(&self) -> &str {
    self.config.context_name()
  }

  /// Run a command and return its stdout as is.
  #[instrument(
    name = "cdsctl",
    skip(self, command),
    fields(context = %self.context_name(), command = %command)
  )]
  pub async fn run_text(&self, command: &CtlCommand) -> Result<String, CtlError> {
    let args = command.to_args(&self.config);
    let output = self
      .runner
      .run(
        &self.config.binary,
        &args,
        &self.config.working_dir,
        self.config.timeout,
      )
      .await?;

    if !output.success() {
      warn!(status = ?output.status, stderr = %output.stderr.trim(), "command failed");
      return Err(CtlError::Failed {
        command: command.to_string(),
        status: output.status,
        stderr: output.stderr.trim().to_string(),
      });
    }

    info!(bytes = output.stdout.len(), "command completed");
    Ok(output.stdout)
  }

  /// Run a command with `--format json` and decode its stdout.
  pub async fn run_json<T: DeserializeOwned>(&self, command: &CtlCommand) -> Result<T, CtlError> {
    let command = command.clone().json();
    let stdout = self.run_text(&command).await?;
    serde_json::from_str(&stdout).map_err(|source| CtlError::InvalidOutput {
      command: command.to_string(),
      source,
    })
  }

  /// Workflows of a project.
  pub async fn workflow_list(&self, project: &str) -> Result<serde_json::Value, CtlError> {
    self
      .run_json(&CtlCommand::new(["workflow", "list"]).arg(project))
      .await
  }

  /// Workflows the user marked as favorite.
  pub async fn workflow_favorites(&self) -> Result<serde_json::Value, CtlError> {
    self
      .run_json(&CtlCommand::new(["workflow", "favorites", "list"]))
      .await
  }

  /// Past runs of a workflow, most recent first.
  pub async fn workflow_history(
    &self,
    project: &str,
    workflow: &str,
  ) -> Result<serde_json::Value, CtlError> {
    self
      .run_json(
        &CtlCommand::new(["workflow", "history"])
          .arg(project)
          .arg(workflow),
      )
      .await
  }

  /// A single workflow run with its node runs, fetched from the raw API.
  pub async fn workflow_run(
    &self,
    project: &str,
    workflow: &str,
    number: i64,
  ) -> Result<serde_json::Value, CtlError> {
    let command = CtlCommand::new(["admin", "curl"]).arg(format!(
      "/project/{}/workflows/{}/runs/{}",
      project, workflow, number
    ));
    let stdout = self.run_text(&command).await?;
    serde_json::from_str(&stdout).map_err(|source| CtlError::InvalidOutput {
      command: command.to_string(),
      source,
    })
  }

  /// Projects the user marked as favorite.
  pub async fn project_favorites(&self) -> Result<serde_json::Value, CtlError> {
    self
      .run_json(&CtlCommand::new(["project", "favorites", "list"]))
      .await
  }

  pub async fn application_list(&self, project: &str) -> Result<serde_json::Value, CtlError> {
    self
      .run_json(&CtlCommand::new(["application", "list"]).arg(project))
      .await
  }

  pub async fn pipeline_list(&self, project: &str) -> Result<serde_json::Value, CtlError> {
    self
      .run_json(&CtlCommand::new(["pipeline", "list"]).arg(project))
      .await
  }

  /// Status of the last run of a workflow.
  pub async fn workflow_status(
    &self,
    project: &str,
    workflow: &str,
  ) -> Result<serde_json::Value, CtlError> {
    self
      .run_json(
        &CtlCommand::new(["workflow", "status"])
          .arg(project)
          .arg(workflow),
      )
      .await
  }
}
