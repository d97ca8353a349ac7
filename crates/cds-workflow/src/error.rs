use thiserror::Error;

use crate::node::Id;

#[derive(Debug, Error)]
pub enum WorkflowError {
  #[error("invalid workflow payload: {0}")]
  Json(#[from] serde_json::Error),

  #[error("node not found: {0}")]
  NodeNotFound(Id),

  #[error("refused to delete node {node_id}: {reason}")]
  DeleteRefused { node_id: Id, reason: &'static str },
}
