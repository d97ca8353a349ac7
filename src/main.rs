use std::io::{self, IsTerminal, Read};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use serde_json::{Value, json};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use cds_ctl::{CdsCtl, CtlCommand, CtlConfig, current_context, discover_contexts};
use cds_workflow::{DeleteMode, Id, Workflow};

/// cds - edit CDS workflow payloads and drive the cdsctl client
#[derive(Parser)]
#[command(name = "cds")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Workflow payload to read (default: stdin)
  #[arg(long, short = 'w', global = true)]
  workflow: Option<PathBuf>,

  /// Pretty-print JSON output
  #[arg(long, global = true)]
  pretty: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Delete a node and print the edited workflow
  DeleteNode {
    /// Id of the node to delete
    node_id: Id,

    /// Delete the whole subtree instead of re-attaching the children
    #[arg(long)]
    with_children: bool,
  },

  /// Print the immediate predecessors of a node
  Ancestors {
    /// Id of the node
    node_id: Id,
  },

  /// List every node as {id, name}
  Nodes,

  /// List every trigger and outgoing hook
  Hooks,

  /// Drop join sources referring to refs that are gone
  PruneRefs,

  /// Remove a hook and print the edited workflow
  RemoveHook {
    /// Id of the hook
    hook_id: Id,
  },

  /// List the contexts declared in cdsctl configuration files
  Contexts {
    /// cdsctl configuration files to read
    #[arg(long = "known-config", env = "CDS_KNOWN_CONFIGS", value_delimiter = ',', required = true)]
    known_configs: Vec<PathBuf>,
  },

  /// Run the cdsctl client
  Ctl(CtlArgs),
}

#[derive(Args)]
struct CtlArgs {
  /// Client binary
  #[arg(long, env = "CDS_CTL_BINARY", default_value = cds_ctl::DEFAULT_BINARY)]
  binary: PathBuf,

  /// Client configuration file
  #[arg(long, env = "CDS_CONFIG_FILE")]
  config_file: Option<PathBuf>,

  /// Context inside the configuration file
  #[arg(long, env = "CDS_CONTEXT")]
  context: Option<String>,

  /// Configuration files to pick the current context from when no
  /// `--config-file` is given
  #[arg(long = "known-config", env = "CDS_KNOWN_CONFIGS", value_delimiter = ',')]
  known_configs: Vec<PathBuf>,

  /// Directory to run the client in, or a file inside it
  #[arg(long)]
  working_dir: Option<PathBuf>,

  /// Kill the client after this many seconds
  #[arg(long)]
  timeout_secs: Option<u64>,

  /// Ask for JSON output and decode it
  #[arg(long)]
  json: bool,

  /// Subcommand and arguments, e.g. `workflow status PROJ build`
  #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
  command: Vec<String>,
}

fn main() -> Result<()> {
  init_tracing();
  let cli = Cli::parse();

  let output = match cli.command {
    Commands::Ctl(args) => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(run_ctl(args))?
    }
    Commands::Contexts { known_configs } => {
      let rt = tokio::runtime::Runtime::new()?;
      rt.block_on(list_contexts(known_configs))?
    }
    command => {
      let workflow = load_workflow(cli.workflow.as_ref())?;
      run_graph(command, workflow)?
    }
  };

  print_json(&output, cli.pretty)
}

fn init_tracing() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
  tracing_subscriber::registry()
    .with(filter)
    .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
    .init();
}

fn run_graph(command: Commands, workflow: Workflow) -> Result<Value> {
  let output = match command {
    Commands::DeleteNode {
      node_id,
      with_children,
    } => {
      let mode = if with_children {
        DeleteMode::WithChildren
      } else {
        DeleteMode::NodeOnly
      };
      let edited = workflow
        .delete_node(node_id, mode)
        .with_context(|| format!("failed to delete node {}", node_id))?;
      serde_json::to_value(&edited)?
    }
    Commands::Ancestors { node_id } => {
      if workflow.find_by_id(node_id).is_none() {
        bail!("node {} not found in workflow", node_id);
      }
      json!(workflow.ancestor_ids(node_id))
    }
    Commands::Nodes => {
      let nodes: Vec<Value> = workflow
        .node_names()
        .into_iter()
        .map(|(id, name)| json!({ "id": id, "name": name }))
        .collect();
      Value::Array(nodes)
    }
    Commands::Hooks => json!({
      "hooks": workflow.all_hooks(),
      "outgoing_hooks": workflow.all_outgoing_hooks(),
    }),
    Commands::PruneRefs => {
      let mut edited = workflow;
      edited.remove_old_ref();
      serde_json::to_value(&edited)?
    }
    Commands::RemoveHook { hook_id } => {
      let mut edited = workflow;
      if edited.remove_hook(hook_id).is_none() {
        bail!("hook {} not found in workflow", hook_id);
      }
      serde_json::to_value(&edited)?
    }
    Commands::Ctl(_) | Commands::Contexts { .. } => {
      bail!("this command does not operate on a workflow payload")
    }
  };

  Ok(output)
}

async fn list_contexts(known_configs: Vec<PathBuf>) -> Result<Value> {
  let contexts = discover_contexts(&known_configs)
    .await
    .context("failed to discover cdsctl contexts")?;
  let current = current_context(&contexts);

  let listed: Vec<Value> = contexts
    .iter()
    .map(|c| {
      json!({
        "name": c.name,
        "config_file": c.config_file.display().to_string(),
        "current": current.is_some_and(|cur| std::ptr::eq(cur, c)),
      })
    })
    .collect();
  Ok(Value::Array(listed))
}

async fn run_ctl(args: CtlArgs) -> Result<Value> {
  let mut config = CtlConfig::default();
  if args.config_file.is_none() && !args.known_configs.is_empty() {
    let contexts = discover_contexts(&args.known_configs)
      .await
      .context("failed to discover cdsctl contexts")?;
    if let Some(current) = current_context(&contexts) {
      debug!(context = %current.name, file = %current.config_file.display(), "using current context");
      config = current.config();
    }
  }
  if args.config_file.is_some() {
    config.config_file = args.config_file;
  }
  if args.context.is_some() {
    config.context = args.context;
  }
  config.binary = args.binary;
  config.timeout = args.timeout_secs.map(Duration::from_secs);
  if let Some(dir) = &args.working_dir {
    config = config.working_dir_for(dir);
  }

  let ctl = CdsCtl::new(config);
  info!(context = ctl.context_name(), "running cdsctl");

  let mut words = args.command.into_iter();
  let Some(first) = words.next() else {
    bail!("missing cdsctl subcommand");
  };
  let mut command = CtlCommand::new([first]);
  for word in words {
    command = command.arg(word);
  }

  if args.json {
    let value: Value = ctl
      .run_json(&command)
      .await
      .with_context(|| format!("cdsctl {} failed", command))?;
    Ok(value)
  } else {
    let text = ctl
      .run_text(&command)
      .await
      .with_context(|| format!("cdsctl {} failed", command))?;
    Ok(Value::String(text))
  }
}

fn load_workflow(path: Option<&PathBuf>) -> Result<Workflow> {
  let payload = match path {
    Some(path) => std::fs::read_to_string(path)
      .with_context(|| format!("failed to read workflow file: {}", path.display()))?,
    None => read_payload_from_stdin()?,
  };

  let workflow = Workflow::from_json(&payload).context("failed to parse workflow payload")?;
  debug!(workflow = %workflow.name, root = workflow.root_id, "workflow loaded");
  Ok(workflow)
}

fn read_payload_from_stdin() -> Result<String> {
  if io::stdin().is_terminal() {
    bail!("no workflow given: pass --workflow <FILE> or pipe a payload on stdin");
  }

  let mut input = String::new();
  io::stdin()
    .read_to_string(&mut input)
    .context("failed to read workflow payload from stdin")?;
  Ok(input)
}

fn print_json(value: &Value, pretty: bool) -> Result<()> {
  let rendered = if pretty {
    serde_json::to_string_pretty(value)?
  } else {
    serde_json::to_string(value)?
  };
  println!("{}", rendered);
  Ok(())
}
