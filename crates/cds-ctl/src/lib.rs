//! CDS Ctl
//!
//! Async wrapper around the `cdsctl` command-line client. Commands are run
//! as `<binary> -f <config file> -c <context> <subcommand> [--format json]`
//! in a chosen working directory, and their stdout is returned as text or
//! decoded from JSON. Contexts are discovered from the client's TOML
//! configuration files.

mod client;
mod command;
mod config;
mod context;
mod error;
mod runner;

pub use client::CdsCtl;
pub use command::{CtlCommand, OutputFormat};
pub use config::{CtlConfig, DEFAULT_BINARY, DEFAULT_CONTEXT};
pub use context::{CdsContext, current_context, discover_contexts, parse_contexts};
pub use error::CtlError;
pub use runner::{CommandOutput, CommandRunner, ProcessRunner};
