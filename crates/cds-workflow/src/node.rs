use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::hook::{Hook, OutgoingHook};

/// Identifier of a persisted node, join, hook or notification.
///
/// `0` means "not persisted yet".
pub type Id = i64;

/// A single stage of the pipeline graph.
///
/// A node exclusively owns its outgoing triggers and, through them, every
/// node reachable below it. Fan-in is never expressed through ownership;
/// see [`Join`](crate::Join).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
  #[serde(default)]
  pub id: Id,
  #[serde(default)]
  pub name: String,
  /// Stable textual reference, used to match join sources before ids exist.
  #[serde(rename = "ref", default)]
  pub reference: String,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub triggers: Vec<NodeTrigger>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub hooks: Vec<Hook>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub outgoing_hooks: Vec<OutgoingHook>,
  /// Fields of the server payload this model does not interpret.
  #[serde(flatten)]
  pub extra: BTreeMap<String, serde_json::Value>,
}

/// An outgoing edge from a node to the node it owns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeTrigger {
  #[serde(default)]
  pub id: Id,
  /// Id of the node owning this trigger.
  #[serde(rename = "workflow_node_id", alias = "parent_id", default)]
  pub parent_id: Id,
  #[serde(default)]
  pub workflow_dest_node_id: Id,
  pub workflow_dest_node: Node,
  #[serde(flatten)]
  pub extra: BTreeMap<String, serde_json::Value>,
}

/// Id and ref of a node, detached from the node itself.
///
/// Used wherever a node has to be named after it has been moved or dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeKey {
  pub id: Id,
  pub reference: String,
}

/// Outcome of searching a subtree for the parent of a node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParentLookup<'a> {
  /// The id is not reachable from the searched node.
  NotFound,
  /// The searched node is the target itself; its parent lies outside the
  /// subtree (a join, or nothing when it is the root).
  Itself,
  /// The immediate parent of the target inside the subtree.
  Parent(&'a Node),
}

impl Node {
  pub fn new(id: Id, name: impl Into<String>) -> Self {
    let name = name.into();
    Self {
      id,
      reference: name.clone(),
      name,
      ..Default::default()
    }
  }

  /// Append a trigger to `child`, stamped with this node's id.
  pub fn with_child(mut self, child: Node) -> Self {
    self.add_child(child);
    self
  }

  pub fn add_child(&mut self, child: Node) {
    self.triggers.push(NodeTrigger::new(self.id, child));
  }

  pub fn key(&self) -> NodeKey {
    NodeKey {
      id: self.id,
      reference: self.reference.clone(),
    }
  }

  /// Direct children, in trigger order.
  pub fn children(&self) -> impl Iterator<Item = &Node> {
    self.triggers.iter().map(|t| &t.workflow_dest_node)
  }

  /// Depth-first, pre-order search following triggers.
  pub fn find(&self, predicate: &mut dyn FnMut(&Node) -> bool) -> Option<&Node> {
    if predicate(self) {
      return Some(self);
    }
    self
      .triggers
      .iter()
      .find_map(|t| t.workflow_dest_node.find(&mut *predicate))
  }

  pub fn find_mut(&mut self, predicate: &mut dyn FnMut(&Node) -> bool) -> Option<&mut Node> {
    if predicate(self) {
      return Some(self);
    }
    self
      .triggers
      .iter_mut()
      .find_map(|t| t.workflow_dest_node.find_mut(&mut *predicate))
  }

  /// This node and every node below it, in pre-order.
  pub fn descendants(&self) -> Vec<&Node> {
    let mut nodes = vec![self];
    for child in self.children() {
      nodes.extend(child.descendants());
    }
    nodes
  }

  /// Determine whether `target_id` is reachable from this node and, if so,
  /// which node inside this subtree is its immediate parent.
  pub fn parent_of(&self, target_id: Id) -> ParentLookup<'_> {
    if self.id == target_id {
      return ParentLookup::Itself;
    }
    for trigger in &self.triggers {
      match trigger.workflow_dest_node.parent_of(target_id) {
        ParentLookup::NotFound => continue,
        ParentLookup::Itself => return ParentLookup::Parent(self),
        found @ ParentLookup::Parent(_) => return found,
      }
    }
    ParentLookup::NotFound
  }

  /// Reset this node and every node below it to "not persisted yet".
  pub fn reset_ids(&mut self) {
    self.id = 0;
    for trigger in &mut self.triggers {
      trigger.workflow_dest_node.reset_ids();
    }
  }

  /// Whether a run condition of this node mentions `needle` in its
  /// variable or its value.
  pub fn condition_mentions(&self, needle: &str) -> bool {
    let Some(conditions) = self
      .extra
      .get("context")
      .and_then(|c| c.get("conditions"))
      .and_then(|c| c.get("plain"))
      .and_then(|p| p.as_array())
    else {
      return false;
    };

    conditions.iter().any(|condition| {
      ["variable", "value"].iter().any(|field| {
        condition
          .get(*field)
          .and_then(|v| v.as_str())
          .is_some_and(|text| text.contains(needle))
      })
    })
  }

  pub fn find_hook(&self, hook_id: Id) -> Option<&Hook> {
    if let Some(hook) = self.hooks.iter().find(|h| h.id == hook_id) {
      return Some(hook);
    }
    self
      .triggers
      .iter()
      .find_map(|t| t.workflow_dest_node.find_hook(hook_id))
  }

  pub fn find_hook_mut(&mut self, hook_id: Id) -> Option<&mut Hook> {
    if let Some(pos) = self.hooks.iter().position(|h| h.id == hook_id) {
      return self.hooks.get_mut(pos);
    }
    self
      .triggers
      .iter_mut()
      .find_map(|t| t.workflow_dest_node.find_hook_mut(hook_id))
  }

  /// Remove the first hook with `hook_id` from this subtree.
  pub fn take_hook(&mut self, hook_id: Id) -> Option<Hook> {
    if let Some(pos) = self.hooks.iter().position(|h| h.id == hook_id) {
      return Some(self.hooks.remove(pos));
    }
    self
      .triggers
      .iter_mut()
      .find_map(|t| t.workflow_dest_node.take_hook(hook_id))
  }
}

impl NodeTrigger {
  pub fn new(parent_id: Id, dest: Node) -> Self {
    Self {
      id: 0,
      parent_id,
      workflow_dest_node_id: dest.id,
      workflow_dest_node: dest,
      extra: BTreeMap::new(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn sample() -> Node {
    Node::new(1, "build")
      .with_child(Node::new(2, "test").with_child(Node::new(4, "deploy")))
      .with_child(Node::new(3, "lint"))
  }

  #[test]
  fn test_with_child_stamps_parent_id() {
    let root = sample();
    assert_eq!(root.triggers[0].parent_id, 1);
    assert_eq!(root.triggers[0].workflow_dest_node_id, 2);
    assert_eq!(root.triggers[0].workflow_dest_node.triggers[0].parent_id, 2);
  }

  #[test]
  fn test_find_is_preorder() {
    let root = sample();
    let mut seen = Vec::new();
    root.find(&mut |n: &Node| {
      seen.push(n.id);
      false
    });
    assert_eq!(seen, vec![1, 2, 4, 3]);
  }

  #[test]
  fn test_parent_of() {
    let root = sample();
    assert_eq!(root.parent_of(1), ParentLookup::Itself);
    match root.parent_of(4) {
      ParentLookup::Parent(parent) => assert_eq!(parent.id, 2),
      other => panic!("expected parent, got {:?}", other),
    }
    match root.parent_of(3) {
      ParentLookup::Parent(parent) => assert_eq!(parent.id, 1),
      other => panic!("expected parent, got {:?}", other),
    }
    assert_eq!(root.parent_of(99), ParentLookup::NotFound);
  }

  #[test]
  fn test_descendants_include_self() {
    let root = sample();
    let ids: Vec<Id> = root.descendants().iter().map(|n| n.id).collect();
    assert_eq!(ids, vec![1, 2, 4, 3]);
  }

  #[test]
  fn test_ref_field_name_on_the_wire() {
    let node = Node::new(7, "pkg");
    let value = serde_json::to_value(&node).unwrap();
    assert_eq!(value["ref"], "pkg");
    assert!(value.get("triggers").is_none());
  }

  #[test]
  fn test_reset_ids_reaches_descendants() {
    let mut root = sample();
    root.reset_ids();
    assert!(root.descendants().iter().all(|n| n.id == 0));
    assert_eq!(root.triggers[0].workflow_dest_node.name, "test");
  }

  #[test]
  fn test_condition_mentions() {
    let node: Node = serde_json::from_value(serde_json::json!({
      "id": 2,
      "name": "deploy",
      "context": {
        "conditions": {
          "plain": [
            { "variable": "cds.status", "operator": "eq", "value": "Success" },
            { "variable": "git.branch", "operator": "eq", "value": "{{.workflow.build.git.branch}}" }
          ]
        }
      }
    }))
    .unwrap();

    assert!(node.condition_mentions("workflow.build"));
    assert!(node.condition_mentions("cds.status"));
    assert!(!node.condition_mentions("workflow.lint"));
    assert!(!Node::new(1, "bare").condition_mentions("workflow.build"));
  }

  #[test]
  fn test_parent_id_alias_is_accepted() {
    let trigger: NodeTrigger = serde_json::from_value(serde_json::json!({
      "parent_id": 3,
      "workflow_dest_node": { "id": 4, "name": "n" }
    }))
    .unwrap();
    assert_eq!(trigger.parent_id, 3);
    assert_eq!(trigger.workflow_dest_node.id, 4);

    let value = serde_json::to_value(&trigger).unwrap();
    assert_eq!(value["workflow_node_id"], 3);
  }
}
