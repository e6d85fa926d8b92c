//! Task sources: a seeded synthetic generator and JSON trace replay.

use std::collections::HashSet;
use std::path::Path;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use gridsim_core::{ConfigError, ConfigResult, Task, WorkloadConfig};

use crate::error::SimResult;

/// Generate `task_count` tasks, one every `arrival_interval` ticks.
///
/// Demands and durations are uniform integers within the configured
/// inclusive ranges. The same seed always yields the same tasks.
pub fn generate(config: &WorkloadConfig, seed: u64) -> Vec<Task> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..config.task_count)
        .map(|i| {
            let cpu = uniform_int(&mut rng, config.cpu_demand);
            let memory = uniform_int(&mut rng, config.memory_demand);
            let [lo, hi] = config.duration;
            let duration = rng.random_range(lo..=hi.max(lo)) as f64;
            let arrival = (i as u64).saturating_mul(config.arrival_interval);
            Task::new(i as u64, arrival, cpu, memory, duration)
        })
        .collect()
}

/// A whole number in `[lo, hi]`. Falls back to `lo` itself when the range
/// holds none, which `SimConfig::validate` rejects.
fn uniform_int(rng: &mut StdRng, [lo, hi]: [f64; 2]) -> f64 {
    let lo_i = lo.ceil() as u64;
    let hi_i = hi.floor() as u64;
    if lo_i > hi_i {
        return lo;
    }
    rng.random_range(lo_i..=hi_i) as f64
}

/// Load a JSON array of tasks recorded by an earlier run or written by hand.
pub fn load_trace(path: &Path) -> SimResult<Vec<Task>> {
    let content = std::fs::read_to_string(path)?;
    let tasks: Vec<Task> = serde_json::from_str(&content)?;
    validate_tasks(&tasks)?;
    info!(path = %path.display(), tasks = tasks.len(), "loaded trace");
    Ok(tasks)
}

/// Write tasks as a JSON trace that `load_trace` can replay.
pub fn save_trace(path: &Path, tasks: &[Task]) -> SimResult<()> {
    let json = serde_json::to_string_pretty(tasks)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Every task well-formed and unstarted, ids unique.
pub fn validate_tasks(tasks: &[Task]) -> ConfigResult<()> {
    let mut seen = HashSet::with_capacity(tasks.len());
    for task in tasks {
        task.validate()?;
        if !seen.insert(task.id) {
            return Err(ConfigError::DuplicateTask(task.id));
        }
    }
    Ok(())
}
