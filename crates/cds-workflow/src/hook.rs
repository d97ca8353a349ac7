//! Hook definitions attached to nodes.
//!
//! Hook configuration is never interpreted by the graph operations; it is
//! carried as a typed string-keyed map so that edits round-trip cleanly.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::node::Id;
use crate::workflow::Workflow;

/// Configuration of a hook, keyed by parameter name.
pub type HookConfig = BTreeMap<String, HookConfigValue>;

/// A single hook configuration entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HookConfigValue {
  #[serde(default)]
  pub value: String,
  #[serde(default)]
  pub configurable: bool,
  /// Type tag, e.g. `"string"`, `"integer"`, `"repository"`.
  #[serde(rename = "type", default)]
  pub kind: String,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub multiple_choice_list: Vec<String>,
}

/// A trigger hook: an activation condition for the node it is attached to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Hook {
  #[serde(default)]
  pub id: Id,
  #[serde(default)]
  pub uuid: String,
  #[serde(default)]
  pub workflow_node_id: Id,
  #[serde(default)]
  pub workflow_hook_model_id: Id,
  #[serde(default)]
  pub config: HookConfig,
  #[serde(flatten)]
  pub extra: BTreeMap<String, serde_json::Value>,
}

/// A hook fired when the owning node finishes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutgoingHook {
  #[serde(default)]
  pub id: Id,
  #[serde(default)]
  pub uuid: String,
  #[serde(default)]
  pub workflow_hook_model_id: Id,
  #[serde(default)]
  pub config: HookConfig,
  #[serde(flatten)]
  pub extra: BTreeMap<String, serde_json::Value>,
}

impl Hook {
  pub fn new(id: Id, uuid: impl Into<String>, model_id: Id) -> Self {
    Self {
      id,
      uuid: uuid.into(),
      workflow_hook_model_id: model_id,
      ..Default::default()
    }
  }

  /// Set a plain string configuration entry.
  pub fn with_config(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
    self.config.insert(
      key.into(),
      HookConfigValue {
        value: value.into(),
        kind: "string".to_string(),
        ..Default::default()
      },
    );
    self
  }
}

impl Workflow {
  /// Overwrite the configuration of the hook with the same id.
  ///
  /// Returns `false` when no such hook exists.
  pub fn update_hook(&mut self, hook: &Hook) -> bool {
    let existing = self
      .subtrees_mut()
      .find_map(|n| n.find_hook_mut(hook.id));

    match existing {
      Some(existing) => {
        existing.config = hook.config.clone();
        debug!(hook_id = hook.id, "hook updated");
        true
      }
      None => false,
    }
  }

  /// Detach the first hook with `hook_id` from its node.
  pub fn remove_hook(&mut self, hook_id: Id) -> Option<Hook> {
    let removed = self.subtrees_mut().find_map(|n| n.take_hook(hook_id));
    if removed.is_some() {
      debug!(hook_id, "hook removed");
    }
    removed
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::join::Join;
  use crate::node::Node;
  use serde_json::json;

  fn sample() -> Workflow {
    let mut one = Node::new(1, "one");
    one.hooks.push(Hook::new(100, "repo", 1).with_config("branch", "master"));
    let mut five = Node::new(5, "five");
    five.hooks.push(Hook::new(101, "cron", 2).with_config("cron", "0 * * * *"));
    let join = Join::new(10, &[&one]).with_child(five);
    Workflow::new("w", one).with_join(join)
  }

  #[test]
  fn test_update_hook_overwrites_config() {
    let mut workflow = sample();
    let edit = Hook::new(101, "cron", 2).with_config("cron", "*/5 * * * *");
    assert!(workflow.update_hook(&edit));

    let hook = workflow.find_hook_by_id(101).unwrap();
    assert_eq!(hook.config["cron"].value, "*/5 * * * *");
    assert_eq!(workflow.find_hook_by_id(100).unwrap().config["branch"].value, "master");
  }

  #[test]
  fn test_update_missing_hook_is_noop() {
    let mut workflow = sample();
    let before = workflow.clone();
    assert!(!workflow.update_hook(&Hook::new(7, "x", 1)));
    assert_eq!(workflow, before);
  }

  #[test]
  fn test_remove_hook_in_join_subtree() {
    let mut workflow = sample();
    let removed = workflow.remove_hook(101).unwrap();
    assert_eq!(removed.uuid, "cron");
    assert!(workflow.find_hook_by_id(101).is_none());
    assert!(workflow.find_hook_by_id(100).is_some());
    assert!(workflow.remove_hook(101).is_none());
  }

  #[test]
  fn test_config_value_wire_shape() {
    let hook: Hook = serde_json::from_value(json!({
      "id": 12,
      "uuid": "a6b9",
      "workflow_hook_model_id": 3,
      "config": {
        "cron": { "value": "0 * * * *", "configurable": true, "type": "string" },
        "branch": {
          "value": "master",
          "configurable": true,
          "type": "list",
          "multiple_choice_list": ["master", "dev"]
        }
      },
      "model": { "name": "Scheduler" }
    }))
    .unwrap();

    assert_eq!(hook.config["cron"].value, "0 * * * *");
    assert_eq!(hook.config["branch"].multiple_choice_list.len(), 2);
    assert_eq!(hook.extra["model"]["name"], "Scheduler");

    let back = serde_json::to_value(&hook).unwrap();
    assert_eq!(back["config"]["cron"]["type"], "string");
    assert_eq!(back["model"]["name"], "Scheduler");
  }
}
