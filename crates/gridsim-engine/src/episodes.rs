//! Episodic training: one policy carried across repeated runs.
//!
//! Each episode starts from fresh machines and a reset clock over the same
//! tasks. The policy, and with it any replay buffer and trainer state,
//! survives from one episode to the next.

use tokio::sync::watch;
use tracing::info;

use gridsim_core::{ConfigError, MachineSpec, SimConfig, Task};
use gridsim_metrics::{RunStatus, RunSummary, best_episode};
use gridsim_placement::{SchedulingPolicy, StateEncoder};

use crate::error::SimResult;
use crate::simulator::{Simulator, build_policy};
use crate::summarize;

/// A policy after its episodes, with how each one went.
pub struct TrainedPolicy {
    pub policy: Box<dyn SchedulingPolicy>,
    /// Oldest first. A cancelled episode is the last one.
    pub episodes: Vec<RunSummary>,
}

impl TrainedPolicy {
    /// The completed episode with the lowest average weighted turnaround.
    pub fn best(&self) -> Option<(usize, &RunSummary)> {
        best_episode(&self.episodes).map(|i| (i, &self.episodes[i]))
    }

    pub fn last(&self) -> Option<&RunSummary> {
        self.episodes.last()
    }
}

/// Run `config.policy` for `episodes` episodes over the same tasks.
pub fn train_episodes(
    config: &SimConfig,
    tasks: &[Task],
    machines: &[MachineSpec],
    episodes: usize,
) -> SimResult<TrainedPolicy> {
    train_episodes_with_shutdown(config, tasks, machines, episodes, None)
}

/// `train_episodes`, stopping after the episode in which `shutdown` reads true.
///
/// An episode that hits the tick bound is recorded as exhausted and the
/// next one still runs.
pub fn train_episodes_with_shutdown(
    config: &SimConfig,
    tasks: &[Task],
    machines: &[MachineSpec],
    episodes: usize,
    shutdown: Option<watch::Receiver<bool>>,
) -> SimResult<TrainedPolicy> {
    if episodes == 0 {
        return Err(ConfigError::invalid("episodes", "must be at least 1").into());
    }
    config.validate()?;
    let encoder = StateEncoder::new(machines.len(), config.tracked_tasks())?;
    let mut policy = build_policy(config, encoder)?;
    let mut history = Vec::with_capacity(episodes);

    for episode in 1..=episodes {
        let mut sim = Simulator::with_policy(config, tasks.to_vec(), machines, policy)?;
        if let Some(rx) = &shutdown {
            sim = sim.with_shutdown(rx.clone());
        }
        let result = sim.run_to_completion(config.max_ticks);
        policy = sim.into_policy();

        let summary = summarize(config.policy, result)?;
        let stats = policy.training_stats().unwrap_or_default();
        info!(
            episode,
            of = episodes,
            status = summary.status.label(),
            avg_weighted_turnaround = summary.snapshot.avg_weighted_turnaround,
            makespan = summary.snapshot.makespan,
            buffered = stats.buffered,
            training_steps = stats.steps,
            "episode finished"
        );

        let cancelled = summary.status == RunStatus::Cancelled;
        history.push(summary);
        if cancelled {
            break;
        }
    }

    Ok(TrainedPolicy {
        policy,
        episodes: history,
    })
}
