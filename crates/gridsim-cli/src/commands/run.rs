use std::path::PathBuf;

use anyhow::bail;
use gridsim_core::PolicyKind;
use gridsim_engine::{Simulator, summarize, workload};
use gridsim_metrics::{RunStatus, format_summary};
use tokio::sync::watch;
use tracing::info;

use crate::{OutputFormat, SourceArgs};

pub async fn run(
    source: SourceArgs,
    policy: Option<PolicyKind>,
    save_trace: Option<PathBuf>,
    shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let mut config = super::load_config(&source)?;
    if let Some(policy) = policy {
        config.policy = policy;
    }
    let tasks = super::load_tasks(&source, &config)?;
    if let Some(path) = &save_trace {
        workload::save_trace(path, &tasks)?;
        info!(path = %path.display(), tasks = tasks.len(), "trace written");
    }

    let policy = config.policy;
    let max_ticks = config.max_ticks;
    let summary = tokio::task::spawn_blocking(move || {
        let mut sim = Simulator::new(&config, tasks)?.with_shutdown(shutdown);
        summarize(policy, sim.run_to_completion(max_ticks))
    })
    .await??;

    match source.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Text => println!("{}", format_summary(&summary)),
    }

    if summary.status != RunStatus::Completed {
        bail!("{} run {}", summary.policy, summary.status.label());
    }
    Ok(())
}
