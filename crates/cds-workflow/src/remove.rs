//! Structural deletion.
//!
//! Both operations either apply their whole edit or leave the workflow
//! exactly as it was and return `false`.

use tracing::{debug, info, warn};

use crate::join::JoinTrigger;
use crate::node::{Id, Node, NodeKey};
use crate::workflow::Workflow;

/// Where a detached node used to hang.
struct Detached {
  /// The node that adopted the children, `None` when the parent was a join.
  parent: Option<NodeKey>,
  target: NodeKey,
}

impl Workflow {
  /// Delete a single node, re-attaching its children to its former parent.
  ///
  /// Deleting the root only succeeds when there is exactly one node to
  /// promote in its place: its single trigger destination, or the single
  /// trigger destination of the only join, when that join fed from nothing
  /// but the root.
  ///
  /// Every join listing the deleted node as a source is re-pointed to the
  /// adopting parent node (or just loses the source when the parent was a
  /// join). Stale refs left behind are the job of
  /// [`remove_old_ref`](Self::remove_old_ref).
  pub fn remove_node_without_child(&mut self, node_id: Id) -> bool {
    if node_id == self.root.id {
      return self.remove_root();
    }

    let Some(detached) = self.detach_collapsing(node_id) else {
      debug!(node_id, "node to delete is not attached anywhere");
      return false;
    };

    for join in &mut self.joins {
      if join.repoint_source(&detached.target, detached.parent.as_ref()) {
        debug!(join_id = join.id, node_id, "join source re-pointed");
      }
    }

    info!(
      node_id,
      parent_id = detached.parent.as_ref().map(|p| p.id),
      "node removed, children re-attached"
    );
    true
  }

  fn remove_root(&mut self) -> bool {
    let root = self.root.key();

    if self.root.triggers.len() > 1 {
      warn!(node_id = root.id, "refusing to delete a root with several children");
      return false;
    }
    if self.joins.len() > 1 {
      warn!(node_id = root.id, "refusing to delete the root of a workflow with several joins");
      return false;
    }

    let promote_child = self.root.triggers.len() == 1;
    let collapse_join = !promote_child
      && self.joins.first().is_some_and(|join| {
        join.has_source(root.id)
          && join.source_node_id.iter().all(|id| *id == root.id)
          && join.triggers.len() == 1
      });

    if !promote_child && !collapse_join {
      warn!(node_id = root.id, "refusing to delete the root: nothing to promote");
      return false;
    }

    if let Some(join) = self.joins.first_mut() {
      join.remove_source(&root);
    }

    let promoted = if promote_child {
      self.root.triggers.pop().map(|t| t.workflow_dest_node)
    } else {
      self
        .joins
        .pop()
        .and_then(|join| join.triggers.into_iter().next())
        .map(|t| t.workflow_dest_node)
    };

    match promoted {
      Some(new_root) => {
        info!(old_root = root.id, new_root = new_root.id, "root replaced");
        self.root_id = new_root.id;
        self.root = new_root;
        true
      }
      None => false,
    }
  }

  /// Find the trigger pointing at `node_id`, splice it out and hand the
  /// node's triggers over to the owner of that trigger.
  fn detach_collapsing(&mut self, node_id: Id) -> Option<Detached> {
    if let Some(detached) = detach_from_node(&mut self.root, node_id) {
      return Some(detached);
    }

    for join in &mut self.joins {
      if let Some(pos) = join
        .triggers
        .iter()
        .position(|t| t.workflow_dest_node.id == node_id)
      {
        let removed = join.triggers.remove(pos).workflow_dest_node;
        let target = removed.key();
        let join_id = join.id;
        join.triggers.extend(
          removed
            .triggers
            .into_iter()
            .map(|t| JoinTrigger::new(join_id, t.workflow_dest_node)),
        );
        return Some(Detached {
          parent: None,
          target,
        });
      }

      for child in join.children_mut() {
        if let Some(detached) = detach_from_node(child, node_id) {
          return Some(detached);
        }
      }
    }

    None
  }

  /// Delete a node together with its whole subtree.
  ///
  /// The root can't be deleted this way. When `node_id` names a join, the
  /// join itself is dropped. On success, joins and notifications that lost
  /// all their sources are dropped too.
  pub fn remove_node_with_child(&mut self, node_id: Id) -> bool {
    if node_id == self.root.id {
      warn!(node_id, "refusing to delete the root with its children");
      return false;
    }

    let removed = prune_from_node(&mut self.root, node_id) || self.prune_from_joins(node_id);
    if !removed {
      debug!(node_id, "node to delete is not attached anywhere");
      return false;
    }

    self.clean_joins();
    self.clean_notifications();
    info!(node_id, "subtree removed");
    true
  }

  fn prune_from_joins(&mut self, node_id: Id) -> bool {
    for i in 0..self.joins.len() {
      if self.joins[i].id == node_id {
        self.joins.remove(i);
        return true;
      }

      let join = &mut self.joins[i];
      if let Some(pos) = join
        .triggers
        .iter()
        .position(|t| t.workflow_dest_node.id == node_id)
      {
        join.triggers.remove(pos);
        return true;
      }

      if join.children_mut().any(|child| prune_from_node(child, node_id)) {
        return true;
      }
    }
    false
  }
}

fn detach_from_node(node: &mut Node, node_id: Id) -> Option<Detached> {
  if let Some(pos) = node
    .triggers
    .iter()
    .position(|t| t.workflow_dest_node.id == node_id)
  {
    let removed = node.triggers.remove(pos).workflow_dest_node;
    let target = removed.key();
    let parent_id = node.id;
    node.triggers.extend(removed.triggers.into_iter().map(|mut t| {
      t.parent_id = parent_id;
      t
    }));
    return Some(Detached {
      parent: Some(node.key()),
      target,
    });
  }

  node
    .triggers
    .iter_mut()
    .find_map(|t| detach_from_node(&mut t.workflow_dest_node, node_id))
}

fn prune_from_node(node: &mut Node, node_id: Id) -> bool {
  if let Some(pos) = node
    .triggers
    .iter()
    .position(|t| t.workflow_dest_node.id == node_id)
  {
    node.triggers.remove(pos);
    return true;
  }

  node
    .triggers
    .iter_mut()
    .any(|t| prune_from_node(&mut t.workflow_dest_node, node_id))
}
