use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::node::{Id, NodeKey};

/// A user notification fired on the terminal status of its source nodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Notification {
  #[serde(default)]
  pub id: Id,
  #[serde(default)]
  pub source_node_id: Vec<Id>,
  #[serde(default)]
  pub source_node_ref: Vec<String>,
  /// Delivery channel, e.g. `"email"` or `"jabber"`.
  #[serde(rename = "type", default)]
  pub kind: String,
  #[serde(default, skip_serializing_if = "serde_json::Value::is_null")]
  pub settings: serde_json::Value,
  #[serde(flatten)]
  pub extra: BTreeMap<String, serde_json::Value>,
}

impl Notification {
  pub fn new(id: Id, kind: impl Into<String>) -> Self {
    Self {
      id,
      kind: kind.into(),
      ..Default::default()
    }
  }

  pub fn with_source(mut self, node: &NodeKey) -> Self {
    self.source_node_id.push(node.id);
    self.source_node_ref.push(node.reference.clone());
    self
  }

  /// Drop every reference to the given nodes.
  pub fn strip(&mut self, nodes: &[NodeKey]) {
    let ids: HashSet<Id> = nodes.iter().map(|n| n.id).collect();
    let refs: HashSet<&str> = nodes
      .iter()
      .filter(|n| !n.reference.is_empty())
      .map(|n| n.reference.as_str())
      .collect();

    self.source_node_id.retain(|id| !ids.contains(id));
    self.source_node_ref.retain(|r| !refs.contains(r.as_str()));
  }

  pub fn has_sources(&self) -> bool {
    !self.source_node_id.is_empty() || !self.source_node_ref.is_empty()
  }
}
