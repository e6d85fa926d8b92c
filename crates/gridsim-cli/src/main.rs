//! gridsim — run and compare task-scheduling policies.
//!
//! # Usage
//!
//! ```text
//! gridsim init --path gridsim.toml
//! gridsim run --config gridsim.toml --policy heuristic
//! gridsim compare --config gridsim.toml --baseline fcfs --candidate learned
//! gridsim compare --config gridsim.toml --candidate learned --episodes 20
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use gridsim_core::PolicyKind;
use tokio::sync::watch;
use tracing::info;

mod commands;

#[derive(Parser)]
#[command(
    name = "gridsim",
    about = "GridSim — discrete-time task scheduling simulator",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Log output format.
    #[arg(long, global = true, value_enum, default_value = "text")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

/// Report format on stdout.
#[derive(Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Where the config and tasks come from.
#[derive(Args)]
pub struct SourceArgs {
    /// TOML config (defaults apply when omitted).
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Replay tasks from a JSON trace instead of generating them.
    #[arg(short, long)]
    pub trace: Option<PathBuf>,
    /// Override the tick bound from the config.
    #[arg(long)]
    pub max_ticks: Option<u64>,
    /// Override the seed from the config.
    #[arg(long)]
    pub seed: Option<u64>,
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate one policy over a workload.
    Run {
        #[command(flatten)]
        source: SourceArgs,
        /// Policy to run (fcfs, heuristic, learned). Defaults to the config's.
        #[arg(short, long)]
        policy: Option<PolicyKind>,
        /// Write the tasks used by this run as a JSON trace.
        #[arg(long)]
        save_trace: Option<PathBuf>,
    },
    /// Simulate two policies over the same workload and machines.
    Compare {
        #[command(flatten)]
        source: SourceArgs,
        #[arg(short, long, default_value = "fcfs")]
        baseline: PolicyKind,
        #[arg(long, default_value = "learned")]
        candidate: PolicyKind,
        /// Train the candidate over this many runs of the workload and
        /// compare its last one.
        #[arg(short, long, default_value_t = 1)]
        episodes: usize,
    },
    /// Write a starting config file.
    Init {
        #[arg(short, long, default_value = "gridsim.toml")]
        path: PathBuf,
        #[arg(long, default_value = "fcfs")]
        policy: PolicyKind,
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_format)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, stopping at the next tick");
            let _ = shutdown_tx.send(true);
        }
    });

    match cli.command {
        Commands::Run {
            source,
            policy,
            save_trace,
        } => commands::run::run(source, policy, save_trace, shutdown_rx).await,
        Commands::Compare {
            source,
            baseline,
            candidate,
            episodes,
        } => commands::compare::compare(source, baseline, candidate, episodes, shutdown_rx).await,
        Commands::Init {
            path,
            policy,
            force,
        } => commands::init::init(&path, policy, force),
    }
}

fn init_tracing(format: LogFormat) -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info,gridsim=info"))?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
    Ok(())
}
