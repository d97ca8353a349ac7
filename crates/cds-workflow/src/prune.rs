//! Reference clean-up after structural edits.
//!
//! Joins and notifications point at nodes by id and ref rather than owning
//! them, so deleting nodes can leave them dangling.

use std::collections::HashSet;

use tracing::debug;

use crate::node::{Id, Node, NodeKey};
use crate::workflow::Workflow;

impl Workflow {
  /// Drop join source refs naming nodes that no longer exist, then every
  /// join left without a source ref.
  pub fn remove_old_ref(&mut self) {
    let refs: HashSet<String> = self
      .all_nodes()
      .into_iter()
      .map(|n| n.reference.clone())
      .collect();

    self.joins.retain_mut(|join| {
      join.source_node_ref.retain(|r| refs.contains(r));
      if join.source_node_ref.is_empty() {
        debug!(join_id = join.id, "join removed: no valid source ref left");
        return false;
      }
      true
    });
  }

  /// Drop join sources (ids and refs) naming nodes that no longer exist,
  /// then every join left without any source.
  pub fn clean_joins(&mut self) {
    let (ids, refs) = self.present_keys();

    self.joins.retain_mut(|join| {
      join.source_node_id.retain(|id| ids.contains(id));
      join.source_node_ref.retain(|r| refs.contains(r));
      if join.is_orphaned() {
        debug!(join_id = join.id, "join removed: no valid source left");
        return false;
      }
      true
    });
  }

  /// Drop notification references naming nodes that no longer exist, then
  /// every notification left without any reference.
  pub fn clean_notifications(&mut self) {
    let (ids, refs) = self.present_keys();

    self.notifications.retain_mut(|notification| {
      notification.source_node_id.retain(|id| ids.contains(id));
      notification.source_node_ref.retain(|r| refs.contains(r));
      if !notification.has_sources() {
        debug!(notification_id = notification.id, "notification removed: no source left");
        return false;
      }
      true
    });
  }

  /// Remove `node` from the sources of every notification.
  pub fn remove_node_from_notifications(&mut self, node: &NodeKey) {
    let node = std::slice::from_ref(node);
    for notification in &mut self.notifications {
      notification.strip(node);
    }
  }

  /// Remove `target_id` and every node below it from the sources of every
  /// notification.
  ///
  /// When the target is the root, the nodes hanging off the joins go too.
  pub fn remove_nodes_from_notifications_cascade(&mut self, target_id: Id) {
    let mut doomed = Vec::new();
    collect_cascade(&self.root, target_id, false, &mut doomed);

    let root_doomed = self.root.id == target_id;
    for child in self.joins.iter().flat_map(|j| j.children()) {
      collect_cascade(child, target_id, root_doomed, &mut doomed);
    }

    debug!(target_id, nodes = doomed.len(), "stripping notifications");
    for notification in &mut self.notifications {
      notification.strip(&doomed);
    }
  }

  fn present_keys(&self) -> (HashSet<Id>, HashSet<String>) {
    let nodes = self.all_nodes();
    let ids = nodes.iter().map(|n| n.id).collect();
    let refs = nodes.iter().map(|n| n.reference.clone()).collect();
    (ids, refs)
  }
}

fn collect_cascade(node: &Node, target_id: Id, deleting: bool, doomed: &mut Vec<NodeKey>) {
  let deleting = deleting || node.id == target_id;
  if deleting {
    doomed.push(node.key());
  }
  for child in node.children() {
    collect_cascade(child, target_id, deleting, doomed);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::join::Join;
  use crate::notification::Notification;

  fn notify(id: Id, nodes: &[&Node]) -> Notification {
    nodes
      .iter()
      .fold(Notification::new(id, "email"), |n, node| n.with_source(&node.key()))
  }

  #[test]
  fn test_remove_old_ref_keeps_live_refs() {
    let one = Node::new(1, "one");
    let mut join = Join::new(10, &[&one]).with_child(Node::new(2, "two"));
    join.source_node_ref.push("gone".to_string());
    let mut workflow = Workflow::new("w", one).with_join(join);

    workflow.remove_old_ref();
    assert_eq!(workflow.joins[0].source_node_ref, vec!["one"]);
  }

  #[test]
  fn test_remove_old_ref_drops_emptied_join() {
    let mut join = Join::new(10, &[]).with_child(Node::new(2, "two"));
    join.source_node_id.push(9);
    join.source_node_ref.push("gone".to_string());
    let mut workflow = Workflow::new("w", Node::new(1, "one")).with_join(join);

    workflow.remove_old_ref();
    assert!(workflow.joins.is_empty());
  }

  #[test]
  fn test_remove_old_ref_sees_refs_below_joins() {
    // join A ── 5; join B fed by 5.
    let one = Node::new(1, "one");
    let five = Node::new(5, "five");
    let join_b = Join::new(11, &[&five]).with_child(Node::new(6, "six"));
    let join_a = Join::new(10, &[&one]).with_child(five);
    let mut workflow = Workflow::new("w", one).with_join(join_a).with_join(join_b);

    workflow.remove_old_ref();
    assert_eq!(workflow.joins.len(), 2);
  }

  #[test]
  fn test_remove_old_ref_drops_join_without_refs() {
    let mut join = Join::new(10, &[]).with_child(Node::new(2, "two"));
    join.source_node_id.push(1);
    let mut workflow = Workflow::new("w", Node::new(1, "one")).with_join(join);

    workflow.remove_old_ref();
    assert!(workflow.joins.is_empty());
  }

  #[test]
  fn test_remove_node_from_notifications() {
    let one = Node::new(1, "one");
    let two = Node::new(2, "two");
    let mut workflow = Workflow::new("w", one.clone().with_child(two.clone()))
      .with_notification(notify(1, &[&one, &two]))
      .with_notification(notify(2, &[&one]));

    workflow.remove_node_from_notifications(&two.key());
    assert_eq!(workflow.notifications[0].source_node_id, vec![1]);
    assert_eq!(workflow.notifications[0].source_node_ref, vec!["one"]);
    assert_eq!(workflow.notifications[1].source_node_id, vec![1]);
  }

  #[test]
  fn test_cascade_strips_descendants_only() {
    // 1 ─┬─ 2 ── 3
    //    └─ 4
    let three = Node::new(3, "three");
    let two = Node::new(2, "two").with_child(three.clone());
    let four = Node::new(4, "four");
    let root = Node::new(1, "one").with_child(two.clone()).with_child(four.clone());
    let mut workflow = Workflow::new("w", root).with_notification(notify(1, &[&two, &three, &four]));

    workflow.remove_nodes_from_notifications_cascade(2);
    assert_eq!(workflow.notifications[0].source_node_id, vec![4]);
    assert_eq!(workflow.notifications[0].source_node_ref, vec!["four"]);
  }

  #[test]
  fn test_cascade_from_root_reaches_join_subtrees() {
    let one = Node::new(1, "one");
    let five = Node::new(5, "five");
    let join = Join::new(10, &[&one]).with_child(five.clone());
    let mut workflow = Workflow::new("w", one.clone())
      .with_join(join)
      .with_notification(notify(1, &[&one, &five]));

    workflow.remove_nodes_from_notifications_cascade(1);
    assert!(!workflow.notifications[0].has_sources());
  }

  #[test]
  fn test_cascade_inside_join_subtree() {
    let one = Node::new(1, "one");
    let six = Node::new(6, "six");
    let five = Node::new(5, "five").with_child(six.clone());
    let join = Join::new(10, &[&one]).with_child(five.clone());
    let mut workflow = Workflow::new("w", one.clone())
      .with_join(join)
      .with_notification(notify(1, &[&one, &five, &six]));

    workflow.remove_nodes_from_notifications_cascade(5);
    assert_eq!(workflow.notifications[0].source_node_id, vec![1]);
  }

  #[test]
  fn test_clean_notifications_drops_empty() {
    let one = Node::new(1, "one");
    let ghost = Node::new(9, "ghost");
    let mut workflow = Workflow::new("w", one.clone())
      .with_notification(notify(1, &[&ghost]))
      .with_notification(notify(2, &[&one, &ghost]));

    workflow.clean_notifications();
    assert_eq!(workflow.notifications.len(), 1);
    assert_eq!(workflow.notifications[0].id, 2);
    assert_eq!(workflow.notifications[0].source_node_id, vec![1]);
  }
}
