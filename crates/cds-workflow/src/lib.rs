//! CDS Workflow
//!
//! In-memory model of a pipeline workflow and the structural edits the
//! editor performs on it.
//!
//! A workflow is a tree of nodes owned through their triggers, plus a list of
//! joins that merge several upstream nodes into one downstream branch. Joins
//! refer to their upstream nodes by id and ref; they never own them. The
//! types serialize to the exact JSON shape of the API payload, so a workflow
//! is decoded, edited locally and sent back whole.
//!
//! Key properties:
//! - Lookups return `None` instead of failing
//! - Structural edits return `false` and leave the workflow untouched when
//!   they refuse a request
//! - No I/O, no locking: edits are synchronous and single-writer

mod error;
mod hook;
mod join;
mod lookup;
mod node;
mod notification;
mod prune;
mod remove;
mod workflow;

pub use error::WorkflowError;
pub use hook::{Hook, HookConfig, HookConfigValue, OutgoingHook};
pub use join::{Join, JoinTrigger};
pub use node::{Id, Node, NodeKey, NodeTrigger, ParentLookup};
pub use notification::Notification;
pub use workflow::{DeleteMode, Workflow};
