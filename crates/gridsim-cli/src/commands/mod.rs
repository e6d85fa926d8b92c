pub mod compare;
pub mod init;
pub mod run;

use anyhow::Context;
use gridsim_core::{SimConfig, Task};
use gridsim_engine::workload;

use crate::SourceArgs;

/// Load the config (or defaults), apply CLI overrides, and validate.
pub fn load_config(source: &SourceArgs) -> anyhow::Result<SimConfig> {
    let mut config = match &source.config {
        Some(path) => SimConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => SimConfig::default(),
    };
    if let Some(max_ticks) = source.max_ticks {
        config.max_ticks = max_ticks;
    }
    if let Some(seed) = source.seed {
        config.seed = seed;
    }
    config.validate()?;
    Ok(config)
}

/// Tasks from the trace if one was given, else the configured workload.
pub fn load_tasks(source: &SourceArgs, config: &SimConfig) -> anyhow::Result<Vec<Task>> {
    match &source.trace {
        Some(path) => workload::load_trace(path)
            .with_context(|| format!("loading trace from {}", path.display())),
        None => Ok(gridsim_engine::generate_workload(config)),
    }
}
