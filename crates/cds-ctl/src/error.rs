//! Error types for invoking the command-line client.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while running the command-line client.
#[derive(Debug, Error)]
pub enum CtlError {
  /// The binary could not be started.
  #[error("failed to spawn '{}': {source}", .binary.display())]
  Spawn {
    binary: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// The client ran but exited unsuccessfully.
  #[error("command '{command}' failed with status {status:?}: {stderr}")]
  Failed {
    command: String,
    status: Option<i32>,
    stderr: String,
  },

  /// The client did not finish in time.
  #[error("'{}' timed out after {timeout:?}", .binary.display())]
  Timeout { binary: PathBuf, timeout: Duration },

  /// Output was requested as JSON but could not be decoded.
  #[error("invalid JSON output from '{command}': {source}")]
  InvalidOutput {
    command: String,
    #[source]
    source: serde_json::Error,
  },

  /// A client configuration file could not be read.
  #[error("failed to read config file '{}': {source}", .path.display())]
  ConfigRead {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  /// A client configuration file is not valid TOML.
  #[error("invalid config file '{}': {source}", .path.display())]
  InvalidConfig {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },

  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
}
