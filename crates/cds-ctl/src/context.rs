//! Contexts declared in cdsctl configuration files.
//!
//! A configuration file is TOML with one table per context and an optional
//! top-level `current` key naming the context in use:
//!
//! ```toml
//! current = "prod"
//!
//! [prod]
//! Host = "https://cds.example.com"
//!
//! [staging]
//! Host = "https://cds.staging.example.com"
//! ```

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::CtlConfig;
use crate::error::CtlError;

const CURRENT_KEY: &str = "current";

/// A named context inside one configuration file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CdsContext {
  pub name: String,
  pub config_file: PathBuf,
  /// Named by the file's `current` key.
  pub current: bool,
}

impl CdsContext {
  /// Client configuration selecting this context.
  pub fn config(&self) -> CtlConfig {
    CtlConfig {
      config_file: Some(self.config_file.clone()),
      context: Some(self.name.clone()),
      ..Default::default()
    }
  }
}

/// Read every context from the given configuration files, file by file, in
/// declaration order.
pub async fn discover_contexts(config_files: &[PathBuf]) -> Result<Vec<CdsContext>, CtlError> {
  let mut contexts = Vec::new();
  for path in config_files {
    let content = tokio::fs::read_to_string(path)
      .await
      .map_err(|source| CtlError::ConfigRead {
        path: path.clone(),
        source,
      })?;
    contexts.extend(parse_contexts(path, &content)?);
  }
  debug!(files = config_files.len(), contexts = contexts.len(), "contexts discovered");
  Ok(contexts)
}

/// Contexts declared in the content of `config_file`.
pub fn parse_contexts(config_file: &Path, content: &str) -> Result<Vec<CdsContext>, CtlError> {
  let table: toml::Table = content.parse().map_err(|source| CtlError::InvalidConfig {
    path: config_file.to_path_buf(),
    source,
  })?;

  let current = table.get(CURRENT_KEY).and_then(|v| v.as_str());

  Ok(
    table
      .iter()
      .filter(|(name, value)| name.as_str() != CURRENT_KEY && value.is_table())
      .map(|(name, _)| CdsContext {
        name: name.clone(),
        config_file: config_file.to_path_buf(),
        current: current == Some(name.as_str()),
      })
      .collect(),
  )
}

/// The context in use: the first one a file marks as current, else the
/// first one found.
pub fn current_context(contexts: &[CdsContext]) -> Option<&CdsContext> {
  contexts
    .iter()
    .find(|c| c.current)
    .or_else(|| contexts.first())
}
