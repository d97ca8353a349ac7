//! Read-only traversal of a workflow.
//!
//! Every lookup visits nodes in the same order: the root subtree depth-first
//! (pre-order, triggers in order), then each join's trigger subtrees, join by
//! join. The first match wins.

use std::collections::{BTreeSet, HashSet};

use crate::hook::{Hook, OutgoingHook};
use crate::node::{Id, Node, ParentLookup};
use crate::workflow::Workflow;

impl Workflow {
  pub fn find_by_id(&self, id: Id) -> Option<&Node> {
    self.find_by_predicate(|n| n.id == id)
  }

  pub fn find_by_ref(&self, reference: &str) -> Option<&Node> {
    self.find_by_predicate(|n| n.reference == reference)
  }

  pub fn find_by_predicate(&self, mut predicate: impl FnMut(&Node) -> bool) -> Option<&Node> {
    self.subtrees().find_map(|n| n.find(&mut predicate))
  }

  pub fn find_by_id_mut(&mut self, id: Id) -> Option<&mut Node> {
    let mut predicate = |n: &Node| n.id == id;
    self.subtrees_mut().find_map(|n| n.find_mut(&mut predicate))
  }

  pub fn find_hook_by_id(&self, hook_id: Id) -> Option<&Hook> {
    self.subtrees().find_map(|n| n.find_hook(hook_id))
  }

  /// Every node, in traversal order.
  pub fn all_nodes(&self) -> Vec<&Node> {
    self.subtrees().flat_map(|n| n.descendants()).collect()
  }

  /// `(id, name)` of every node, in traversal order, each id once.
  pub fn node_names(&self) -> Vec<(Id, String)> {
    let mut seen = HashSet::new();
    self
      .all_nodes()
      .into_iter()
      .filter(|n| seen.insert(n.id))
      .map(|n| (n.id, n.name.clone()))
      .collect()
  }

  pub fn all_hooks(&self) -> Vec<&Hook> {
    self.all_nodes().into_iter().flat_map(|n| &n.hooks).collect()
  }

  pub fn all_outgoing_hooks(&self) -> Vec<&OutgoingHook> {
    self
      .all_nodes()
      .into_iter()
      .flat_map(|n| &n.outgoing_hooks)
      .collect()
  }

  /// Nodes whose run conditions refer to `workflow.<name>`, i.e. the nodes
  /// affected when the node called `name` is renamed.
  pub fn node_name_impact(&self, name: &str) -> Vec<&Node> {
    let variable = format!("workflow.{}", name);
    self
      .all_nodes()
      .into_iter()
      .filter(|n| n.condition_mentions(&variable))
      .collect()
  }

  /// Search the subtree rooted at `from` for the parent of `target_id`.
  pub fn parent_node<'a>(&self, from: &'a Node, target_id: Id) -> ParentLookup<'a> {
    from.parent_of(target_id)
  }

  /// Ids of the nodes whose completion can start `node_id`.
  ///
  /// A node owned by another node has that node as its only predecessor.
  /// A node owned by a join may be started by any of the join's sources,
  /// so all of them are returned.
  pub fn ancestor_ids(&self, node_id: Id) -> BTreeSet<Id> {
    let mut ancestors = BTreeSet::new();

    if let ParentLookup::Parent(parent) = self.parent_node(&self.root, node_id) {
      ancestors.insert(parent.id);
    }

    for join in &self.joins {
      for child in join.children() {
        match self.parent_node(child, node_id) {
          ParentLookup::NotFound => {}
          ParentLookup::Itself => ancestors.extend(join.source_node_id.iter().copied()),
          ParentLookup::Parent(parent) => {
            ancestors.insert(parent.id);
          }
        }
      }
    }

    ancestors
  }
}
