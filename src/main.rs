use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use tokio::sync::mpsc::UnboundedReceiver;
use tracing_subscriber::EnvFilter;

use rigger_client::HttpTaskClient;
use rigger_config::ConsoleConfig;
use rigger_engine::{AnsibleAction, ClusterPhase, Console, InitMode};
use rigger_runtime::{ChannelNotifier, PipelineEvent, PipelineResult};
use rigger_task::{OperationKind, Severity, TaskFamily};

/// Rigger - drive remote cluster provisioning from the terminal
#[derive(Parser)]
#[command(name = "rigger")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the configuration file (default: ~/.rigger/config.json)
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  /// Override the executor base URL from the configuration
  #[arg(long, global = true)]
  executor_url: Option<String>,

  /// Log filter, e.g. `info` or `rigger_runtime=debug` (default: RUST_LOG or `warn`)
  #[arg(long, global = true)]
  log_level: Option<String>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Manage Ansible on the control node
  Ansible {
    #[command(subcommand)]
    action: AnsibleCommand,
  },

  /// Bootstrap a Kubernetes cluster
  K8s {
    #[command(subcommand)]
    action: K8sCommand,
  },

  /// Run playbooks
  Playbook {
    #[command(subcommand)]
    action: PlaybookCommand,
  },

  /// List executor operations and their endpoints
  Operations,
}

#[derive(Subcommand)]
enum AnsibleCommand {
  /// Check the environment, install Ansible and verify it
  Install,
  /// Remove and install Ansible again
  Reinstall,
  /// Remove Ansible and its residual files
  Uninstall,
  /// Initialize layout, configuration and SSH keys, then ping the nodes
  Init {
    /// Skip the final connectivity check
    #[arg(long)]
    quick: bool,
  },
  /// Check connectivity to every node
  Ping,
}

#[derive(Subcommand)]
enum K8sCommand {
  /// Run the bootstrap phases in order, stopping at the first failure
  Bootstrap {
    /// Last phase to run
    #[arg(long, value_enum, default_value_t = PhaseArg::Verification)]
    until: PhaseArg,
  },
}

#[derive(Subcommand)]
enum PlaybookCommand {
  /// Execute a playbook by id
  Run {
    /// The playbook id
    playbook_id: String,
  },
}

#[derive(Clone, Copy, ValueEnum)]
enum PhaseArg {
  Environment,
  Deployment,
  Verification,
}

impl From<PhaseArg> for ClusterPhase {
  fn from(phase: PhaseArg) -> Self {
    match phase {
      PhaseArg::Environment => ClusterPhase::Environment,
      PhaseArg::Deployment => ClusterPhase::Deployment,
      PhaseArg::Verification => ClusterPhase::Verification,
    }
  }
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  init_tracing(cli.log_level.as_deref())?;

  let Some(command) = cli.command else {
    println!("rigger - use --help to see available commands");
    return Ok(());
  };

  let mut config = load_config(cli.config)?;
  if let Some(url) = cli.executor_url {
    config.executor.base_url = url;
  }
  tracing::debug!(base_url = %config.executor.base_url, "configuration loaded");

  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async { run(command, config).await })
}

async fn run(command: Commands, config: ConsoleConfig) -> Result<()> {
  let client = HttpTaskClient::new(&config.executor).context("failed to create executor client")?;

  let params = match command {
    Commands::Operations => serde_json::Value::Null,
    _ => read_payload_from_stdin()?,
  };

  let (notifier, events) = ChannelNotifier::channel();
  let console = Console::new(&config, Arc::new(client)).with_notifier(Arc::new(notifier));
  let printer = tokio::spawn(print_events(events));

  let shutdown = console.shutdown_token().clone();
  tokio::spawn(async move {
    if tokio::signal::ctrl_c().await.is_ok() {
      eprintln!("Cancelling...");
      shutdown.cancel();
    }
  });

  let results = match command {
    Commands::Operations => return list_operations(&config),
    Commands::Ansible { action } => {
      let result = match action {
        AnsibleCommand::Install => console.run_ansible(AnsibleAction::Install, &params).await,
        AnsibleCommand::Reinstall => console.run_ansible(AnsibleAction::Reinstall, &params).await,
        AnsibleCommand::Uninstall => console.run_ansible(AnsibleAction::Uninstall, &params).await,
        AnsibleCommand::Init { quick } => {
          let mode = if quick { InitMode::Quick } else { InitMode::Full };
          console.initialize(mode, &params).await
        }
        AnsibleCommand::Ping => console.ping(&params).await,
      };
      vec![result.context("ansible pipeline could not run")?]
    }
    Commands::K8s {
      action: K8sCommand::Bootstrap { until },
    } => bootstrap(&console, until.into(), &params).await?,
    Commands::Playbook {
      action: PlaybookCommand::Run { playbook_id },
    } => {
      let result = console
        .execute_playbook(&playbook_id, &params)
        .await
        .context("playbook pipeline could not run")?;
      vec![result]
    }
  };

  // Dropping the console closes the event channel so the printer drains and exits.
  drop(console);
  let _ = printer.await;

  println!("{}", serde_json::to_string_pretty(&results)?);

  match results.last() {
    Some(result) if result.cancelled => bail!("cancelled"),
    Some(PipelineResult {
      succeeded: false,
      failed_step_label,
      error,
      ..
    }) => bail!(
      "step '{}' failed: {}",
      failed_step_label.as_deref().unwrap_or("unknown"),
      error.as_deref().unwrap_or("unknown error")
    ),
    _ => Ok(()),
  }
}

fn list_operations(config: &ConsoleConfig) -> Result<()> {
  let client = HttpTaskClient::new(&config.executor).context("failed to create executor client")?;
  for kind in OperationKind::ALL {
    let url = client.operation_url(kind)?;
    println!("{:<20} {:<15} {}", kind.as_str(), kind.family().as_str(), url);
  }
  for family in [TaskFamily::Initialization, TaskFamily::Playbook] {
    let url = client.status_url(family, "")?;
    println!("{:<20} {:<15} {}{{task_id}}", "status", family.as_str(), url);
  }
  Ok(())
}

async fn bootstrap(
  console: &Console,
  until: ClusterPhase,
  params: &serde_json::Value,
) -> Result<Vec<PipelineResult>> {
  let mut results = Vec::new();
  for phase in ClusterPhase::ALL.into_iter().filter(|p| *p <= until) {
    let result = console
      .run_phase(phase, params)
      .await
      .with_context(|| format!("phase '{}' could not run", phase))?;
    let succeeded = result.succeeded;
    results.push(result);
    if !succeeded {
      break;
    }
  }
  Ok(results)
}

async fn print_events(mut events: UnboundedReceiver<PipelineEvent>) {
  while let Some(event) = events.recv().await {
    match event {
      PipelineEvent::PipelineStarted { pipeline, .. } => eprintln!("==> {}", pipeline),
      PipelineEvent::StepStarted { step, .. } => eprintln!("  [ ] {}", step),
      PipelineEvent::StepLog { lines, .. } => {
        for line in lines {
          let marker = match line.severity {
            Severity::Error => "!",
            Severity::Success => "+",
            Severity::Step => ">",
            Severity::Info => " ",
          };
          eprintln!("      {} {}", marker, line.text);
        }
      }
      PipelineEvent::StepCompleted { step, .. } => eprintln!("  [x] {}", step),
      PipelineEvent::StepFailed { step, error, .. } => eprintln!("  [!] {}: {}", step, error),
      PipelineEvent::PipelineCompleted { pipeline, .. } => eprintln!("==> {} completed", pipeline),
      PipelineEvent::PipelineFailed { pipeline, step, .. } => {
        eprintln!("==> {} failed at '{}'", pipeline, step)
      }
      PipelineEvent::PipelineCancelled { pipeline, .. } => eprintln!("==> {} cancelled", pipeline),
    }
  }
}

fn init_tracing(level: Option<&str>) -> Result<()> {
  let filter = match level {
    Some(level) => EnvFilter::try_new(level).context("invalid --log-level filter")?,
    None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
  };
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(io::stderr)
    .with_target(true)
    .init();
  Ok(())
}

fn load_config(path: Option<PathBuf>) -> Result<ConsoleConfig> {
  let path = match path {
    Some(path) => path,
    None => dirs::home_dir()
      .context("could not determine home directory")?
      .join(".rigger")
      .join("config.json"),
  };
  ConsoleConfig::load(&path)
    .with_context(|| format!("failed to load configuration: {}", path.display()))
}

fn read_payload_from_stdin() -> Result<serde_json::Value> {
  use std::io::IsTerminal;

  if io::stdin().is_terminal() {
    // No stdin pipe, use empty object
    Ok(serde_json::json!({}))
  } else {
    let mut input = String::new();
    io::stdin()
      .read_to_string(&mut input)
      .context("failed to read parameters from stdin")?;

    if input.trim().is_empty() {
      Ok(serde_json::json!({}))
    } else {
      serde_json::from_str(&input).context("failed to parse parameters JSON from stdin")
    }
  }
}
