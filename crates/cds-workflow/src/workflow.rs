use std::collections::BTreeMap;
use std::iter;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::WorkflowError;
use crate::join::Join;
use crate::node::{Id, Node};
use crate::notification::Notification;

/// A workflow as exchanged with the API: one root tree, the joins hanging
/// off it, and the notifications referencing its nodes.
///
/// Every mutating operation edits the value in place. Callers that need to
/// keep the last known good graph (e.g. until the API accepted the edit)
/// should go through [`Workflow::try_edit`] or clone first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
  #[serde(default)]
  pub id: Id,
  #[serde(default)]
  pub name: String,
  pub root: Node,
  #[serde(default)]
  pub root_id: Id,
  #[serde(default)]
  pub joins: Vec<Join>,
  #[serde(default)]
  pub notifications: Vec<Notification>,
  #[serde(flatten)]
  pub extra: BTreeMap<String, serde_json::Value>,
}

/// Fields the API adds to a fetched workflow and refuses on submission.
const API_ONLY_FIELDS: &[&str] = &[
  "usage",
  "applications",
  "environments",
  "pipelines",
  "project_integrations",
  "hook_models",
  "outgoing_hook_models",
];

/// How much of the graph goes away with a deleted node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteMode {
  /// Delete the node and re-attach its children to its parent.
  NodeOnly,
  /// Delete the node together with everything it owns.
  WithChildren,
}

impl Workflow {
  pub fn new(name: impl Into<String>, root: Node) -> Self {
    Self {
      name: name.into(),
      root_id: root.id,
      root,
      ..Default::default()
    }
  }

  pub fn with_join(mut self, join: Join) -> Self {
    self.joins.push(join);
    self
  }

  pub fn with_notification(mut self, notification: Notification) -> Self {
    self.notifications.push(notification);
    self
  }

  pub fn from_json(payload: &str) -> Result<Self, WorkflowError> {
    let workflow: Workflow = serde_json::from_str(payload)?;
    debug!(
      workflow_id = workflow.id,
      joins = workflow.joins.len(),
      notifications = workflow.notifications.len(),
      "workflow decoded"
    );
    Ok(workflow)
  }

  pub fn to_json(&self) -> Result<String, WorkflowError> {
    Ok(serde_json::to_string(self)?)
  }

  pub fn to_json_pretty(&self) -> Result<String, WorkflowError> {
    Ok(serde_json::to_string_pretty(self)?)
  }

  /// Strip server-assigned identity before the workflow is submitted back.
  ///
  /// Every node id and join id is reset to `0`, and the lookup tables the
  /// API attaches to a fetched workflow are dropped.
  pub fn prepare_request_for_api(&mut self) {
    for subtree in self.subtrees_mut() {
      subtree.reset_ids();
    }
    for join in &mut self.joins {
      join.id = 0;
    }
    for key in API_ONLY_FIELDS {
      self.extra.remove(*key);
    }
    debug!(workflow_id = self.id, "workflow prepared for submission");
  }

  /// Top-level subtrees in traversal order: the root, then the destination
  /// of every join trigger, join by join.
  pub fn subtrees(&self) -> impl Iterator<Item = &Node> {
    iter::once(&self.root).chain(self.joins.iter().flat_map(|j| j.children()))
  }

  pub fn subtrees_mut(&mut self) -> impl Iterator<Item = &mut Node> {
    iter::once(&mut self.root).chain(self.joins.iter_mut().flat_map(|j| j.children_mut()))
  }

  /// Apply `edit` to a copy of this workflow.
  ///
  /// Returns the edited copy when `edit` reports success; `self` is never
  /// touched, so a refused edit or a rejected save just drops the copy.
  pub fn try_edit(&self, edit: impl FnOnce(&mut Workflow) -> bool) -> Option<Workflow> {
    let mut candidate = self.clone();
    edit(&mut candidate).then_some(candidate)
  }

  /// Delete a node and clean every reference to what was removed.
  ///
  /// This is the full editor action: notifications are stripped of the
  /// deleted node(s), the structure is edited, and stale join references are
  /// pruned. Runs on a copy; `self` is unchanged on error.
  pub fn delete_node(&self, node_id: Id, mode: DeleteMode) -> Result<Workflow, WorkflowError> {
    let target = self
      .find_by_id(node_id)
      .ok_or(WorkflowError::NodeNotFound(node_id))?
      .key();

    let edited = match mode {
      DeleteMode::NodeOnly => self.try_edit(|w| {
        if !w.remove_node_without_child(node_id) {
          return false;
        }
        w.remove_node_from_notifications(&target);
        w.remove_old_ref();
        true
      }),
      DeleteMode::WithChildren => self.try_edit(|w| {
        if node_id == w.root.id {
          return false;
        }
        w.remove_nodes_from_notifications_cascade(node_id);
        w.remove_node_with_child(node_id)
      }),
    };

    let edited = edited.ok_or(WorkflowError::DeleteRefused {
      node_id,
      reason: match mode {
        DeleteMode::NodeOnly if node_id == self.root.id => {
          "the root has no single successor to promote"
        }
        DeleteMode::NodeOnly => "node is not attached to any parent",
        DeleteMode::WithChildren => "the root cannot be deleted with its children",
      },
    })?;

    info!(workflow_id = self.id, node_id, ?mode, "node deleted");
    Ok(edited)
  }
}
