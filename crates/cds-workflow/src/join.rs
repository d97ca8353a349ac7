use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::node::{Id, Node, NodeKey};

/// A fan-in point: its triggers run once its upstream nodes have run.
///
/// Sources are references (ids, with refs as the name-based fallback), never
/// ownership. The join owns its outgoing triggers the same way a node does.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Join {
  #[serde(default)]
  pub id: Id,
  #[serde(default)]
  pub source_node_id: Vec<Id>,
  #[serde(default)]
  pub source_node_ref: Vec<String>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub triggers: Vec<JoinTrigger>,
  #[serde(flatten)]
  pub extra: BTreeMap<String, serde_json::Value>,
}

/// An outgoing edge from a join to the node it owns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JoinTrigger {
  #[serde(default)]
  pub id: Id,
  #[serde(default)]
  pub join_id: Id,
  #[serde(default)]
  pub workflow_dest_node_id: Id,
  pub workflow_dest_node: Node,
  #[serde(flatten)]
  pub extra: BTreeMap<String, serde_json::Value>,
}

impl Join {
  /// Create a join over the given upstream nodes.
  pub fn new(id: Id, sources: &[&Node]) -> Self {
    Self {
      id,
      source_node_id: sources.iter().map(|n| n.id).collect(),
      source_node_ref: sources.iter().map(|n| n.reference.clone()).collect(),
      ..Default::default()
    }
  }

  pub fn with_child(mut self, child: Node) -> Self {
    self.add_child(child);
    self
  }

  pub fn add_child(&mut self, child: Node) {
    self.triggers.push(JoinTrigger::new(self.id, child));
  }

  pub fn children(&self) -> impl Iterator<Item = &Node> {
    self.triggers.iter().map(|t| &t.workflow_dest_node)
  }

  pub fn children_mut(&mut self) -> impl Iterator<Item = &mut Node> {
    self.triggers.iter_mut().map(|t| &mut t.workflow_dest_node)
  }

  pub fn has_source(&self, id: Id) -> bool {
    self.source_node_id.contains(&id)
  }

  /// Drop `node` from both source sets.
  pub fn remove_source(&mut self, node: &NodeKey) {
    self.source_node_id.retain(|id| *id != node.id);
    if !node.reference.is_empty() {
      self.source_node_ref.retain(|r| *r != node.reference);
    }
  }

  /// Replace `from` by `to` in the source sets.
  ///
  /// Each set is handled on its own: an entry for `from` is removed, and `to`
  /// is added only where `from` was listed and `to` is not listed yet. With
  /// no `to`, this is [`remove_source`](Self::remove_source). Returns whether
  /// anything changed.
  pub fn repoint_source(&mut self, from: &NodeKey, to: Option<&NodeKey>) -> bool {
    let mut changed = false;

    if let Some(pos) = self.source_node_id.iter().position(|id| *id == from.id) {
      self.source_node_id.remove(pos);
      changed = true;
      if let Some(to) = to
        && !self.source_node_id.contains(&to.id)
      {
        self.source_node_id.push(to.id);
      }
    }

    if !from.reference.is_empty()
      && let Some(pos) = self.source_node_ref.iter().position(|r| *r == from.reference)
    {
      self.source_node_ref.remove(pos);
      changed = true;
      if let Some(to) = to
        && !to.reference.is_empty()
        && !self.source_node_ref.contains(&to.reference)
      {
        self.source_node_ref.push(to.reference.clone());
      }
    }

    changed
  }

  /// A join with no sources left can never fire.
  pub fn is_orphaned(&self) -> bool {
    self.source_node_id.is_empty() && self.source_node_ref.is_empty()
  }
}

impl JoinTrigger {
  pub fn new(join_id: Id, dest: Node) -> Self {
    Self {
      id: 0,
      join_id,
      workflow_dest_node_id: dest.id,
      workflow_dest_node: dest,
      extra: BTreeMap::new(),
    }
  }
}
