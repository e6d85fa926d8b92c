use anyhow::bail;
use gridsim_core::PolicyKind;
use gridsim_engine::compare_with_shutdown;
use gridsim_metrics::format_report;
use tokio::sync::watch;

use crate::{OutputFormat, SourceArgs};

pub async fn compare(
    source: SourceArgs,
    baseline: PolicyKind,
    candidate: PolicyKind,
    episodes: usize,
    shutdown: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    let config = super::load_config(&source)?;
    let tasks = super::load_tasks(&source, &config)?;
    let machines = config.machine_specs();

    let report = tokio::task::spawn_blocking(move || {
        compare_with_shutdown(&config, baseline, candidate, &tasks, &machines, episodes, Some(shutdown))
    })
    .await??;

    match source.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => println!("{}", format_report(&report)),
    }

    if !report.both_completed() {
        bail!("comparison is based on partial runs");
    }
    Ok(())
}
