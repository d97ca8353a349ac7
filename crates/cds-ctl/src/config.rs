use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the client binary looked up on `PATH` by default.
pub const DEFAULT_BINARY: &str = "cdsctl";

/// Context name reported when none is configured.
pub const DEFAULT_CONTEXT: &str = "default";

/// How to invoke the command-line client.
#[derive(Debug, Clone, PartialEq)]
pub struct CtlConfig {
  /// Binary to run, a bare name is resolved through `PATH`.
  pub binary: PathBuf,
  /// Client configuration file, passed as `-f`.
  pub config_file: Option<PathBuf>,
  /// Context inside the configuration file, passed as `-c`.
  pub context: Option<String>,
  /// Directory the client runs in; it reads project settings from there.
  pub working_dir: PathBuf,
  /// Kill the client if it runs longer than this.
  pub timeout: Option<Duration>,
}

impl Default for CtlConfig {
  fn default() -> Self {
    Self {
      binary: PathBuf::from(DEFAULT_BINARY),
      config_file: None,
      context: None,
      working_dir: PathBuf::from("."),
      timeout: None,
    }
  }
}

impl CtlConfig {
  pub fn context_name(&self) -> &str {
    self.context.as_deref().unwrap_or(DEFAULT_CONTEXT)
  }

  /// Run in the directory holding `path` (or `path` itself if it is a
  /// directory), e.g. the folder of the file being edited.
  pub fn working_dir_for(mut self, path: &Path) -> Self {
    self.working_dir = if path.is_dir() {
      path.to_path_buf()
    } else {
      match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
      }
    };
    self
  }
}
