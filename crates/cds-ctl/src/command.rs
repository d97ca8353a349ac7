use std::fmt;

use crate::config::CtlConfig;

/// How the client should print its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

/// A single client invocation, e.g. `workflow status PROJ my-wf`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CtlCommand {
  pub subcommand: Vec<String>,
  pub args: Vec<String>,
  pub format: OutputFormat,
}

impl CtlCommand {
  pub fn new<I, S>(subcommand: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      subcommand: subcommand.into_iter().map(Into::into).collect(),
      ..Default::default()
    }
  }

  pub fn arg(mut self, arg: impl Into<String>) -> Self {
    self.args.push(arg.into());
    self
  }

  pub fn json(mut self) -> Self {
    self.format = OutputFormat::Json;
    self
  }

  /// Full argument list: `-f <file> -c <context> <subcommand..> <args..> [--format json]`.
  pub fn to_args(&self, config: &CtlConfig) -> Vec<String> {
    let mut args = Vec::new();
    if let Some(file) = &config.config_file {
      args.push("-f".to_string());
      args.push(file.display().to_string());
    }
    if let Some(context) = &config.context {
      args.push("-c".to_string());
      args.push(context.clone());
    }
    args.extend(self.subcommand.iter().cloned());
    args.extend(self.args.iter().cloned());
    if self.format == OutputFormat::Json {
      args.push("--format".to_string());
      args.push("json".to_string());
    }
    args
  }
}

impl fmt::Display for CtlCommand {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.subcommand.join(" "))
  }
}
