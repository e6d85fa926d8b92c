//! GridSim engine — the discrete-time scheduling simulator.
//!
//! Coordinates the resource pool, the state encoder, a scheduling policy
//! and the metrics collector over a simulated clock.
//!
//! # Components
//!
//! - **`simulator`** — `Simulator`, the Idle → Running → Draining → Done tick loop
//! - **`workload`** — Seeded task generator and JSON trace replay
//! - **`episodes`** — One policy trained over repeated runs of a workload
//! - **`compare()`** — Runs two policies over the same tasks and machines
//!
//! Each run is single-threaded and deterministic for a given seed. Runs
//! share nothing, so `compare` executes its two runs on separate threads.

pub mod episodes;
pub mod error;
pub mod simulator;
pub mod workload;

use std::thread;

use tokio::sync::watch;
use tracing::info;

use gridsim_core::{ConfigError, MachineSpec, PolicyKind, SimConfig, Task};
use gridsim_metrics::{ComparisonReport, MetricsSnapshot, RunStatus, RunSummary};

pub use episodes::{TrainedPolicy, train_episodes, train_episodes_with_shutdown};
pub use error::{SimError, SimResult};
pub use simulator::{SimPhase, Simulator, SkippedTask, TickResult, build_policy};

/// Handle to one simulation run.
pub type SimulationHandle = Simulator;

/// Distinct from the execution sampler (`seed`) and trainer (`seed + 1`).
const WORKLOAD_SEED_OFFSET: u64 = 2;

/// The synthetic workload for `config`, derived from its seed.
pub fn generate_workload(config: &SimConfig) -> Vec<Task> {
    workload::generate(&config.workload, config.seed.wrapping_add(WORKLOAD_SEED_OFFSET))
}

/// Build a run whose tasks come from the configured synthetic workload.
pub fn create_simulation(config: &SimConfig) -> SimResult<SimulationHandle> {
    Simulator::new(config, generate_workload(config))
}

pub fn step(handle: &mut SimulationHandle) -> SimResult<TickResult> {
    handle.step()
}

pub fn run_to_completion(handle: &mut SimulationHandle, max_ticks: u64) -> SimResult<MetricsSnapshot> {
    handle.run_to_completion(max_ticks)
}

/// Run `baseline` and `candidate` over the same tasks and machine set.
///
/// Each run gets its own machines, pool, RNG and replay buffer. A run
/// that hits the tick bound is reported with `RunStatus::Exhausted`
/// rather than failing the comparison.
pub fn compare(
    config: &SimConfig,
    baseline: PolicyKind,
    candidate: PolicyKind,
    tasks: &[Task],
    machines: &[MachineSpec],
) -> SimResult<ComparisonReport> {
    compare_with_shutdown(config, baseline, candidate, tasks, machines, 1, None)
}

/// `compare`, stopping both runs once `shutdown` reads true.
///
/// With `episodes > 1` the candidate trains over that many episodes and
/// its last episode is compared against a single baseline run.
pub fn compare_with_shutdown(
    config: &SimConfig,
    baseline: PolicyKind,
    candidate: PolicyKind,
    tasks: &[Task],
    machines: &[MachineSpec],
    episodes: usize,
    shutdown: Option<watch::Receiver<bool>>,
) -> SimResult<ComparisonReport> {
    info!(
        baseline = %baseline,
        candidate = %candidate,
        episodes,
        tasks = tasks.len(),
        machines = machines.len(),
        "comparing policies"
    );

    let (base, cand) = thread::scope(|s| {
        let base_shutdown = shutdown.clone();
        let base = s.spawn(move || run_policy(config, baseline, tasks, machines, base_shutdown));
        let cand = s.spawn(move || run_candidate(config, candidate, tasks, machines, episodes, shutdown));
        (join(base), join(cand))
    });

    let (last, history) = cand?;
    Ok(ComparisonReport::new(base?, last).with_episodes(history))
}

/// The candidate's final run, plus every episode when there was more than one.
fn run_candidate(
    config: &SimConfig,
    policy: PolicyKind,
    tasks: &[Task],
    machines: &[MachineSpec],
    episodes: usize,
    shutdown: Option<watch::Receiver<bool>>,
) -> SimResult<(RunSummary, Vec<RunSummary>)> {
    if episodes == 1 {
        return Ok((run_policy(config, policy, tasks, machines, shutdown)?, Vec::new()));
    }

    let mut config = config.clone();
    config.policy = policy;
    let trained = train_episodes_with_shutdown(&config, tasks, machines, episodes, shutdown)?;
    let Some(last) = trained.last().cloned() else {
        return Err(ConfigError::invalid("episodes", "must be at least 1").into());
    };
    Ok((last, trained.episodes))
}

fn join<T>(handle: thread::ScopedJoinHandle<'_, T>) -> T {
    match handle.join() {
        Ok(value) => value,
        Err(panic) => std::panic::resume_unwind(panic),
    }
}

/// Run one policy to completion and summarize how it ended.
pub fn run_policy(
    config: &SimConfig,
    policy: PolicyKind,
    tasks: &[Task],
    machines: &[MachineSpec],
    shutdown: Option<watch::Receiver<bool>>,
) -> SimResult<RunSummary> {
    let mut config = config.clone();
    config.policy = policy;

    let mut sim = Simulator::with_machines(&config, tasks.to_vec(), machines)?;
    if let Some(rx) = shutdown {
        sim = sim.with_shutdown(rx);
    }
    summarize(policy, sim.run_to_completion(config.max_ticks))
}

/// Turn a run's result into a report row. Early stops keep their
/// partial metrics; any other error is returned.
pub fn summarize(policy: PolicyKind, result: SimResult<MetricsSnapshot>) -> SimResult<RunSummary> {
    let (status, snapshot) = match result {
        Ok(snapshot) => (RunStatus::Completed, snapshot),
        Err(SimError::ExhaustedTicks { partial, .. }) => (RunStatus::Exhausted, *partial),
        Err(SimError::Cancelled { partial, .. }) => (RunStatus::Cancelled, *partial),
        Err(e) => return Err(e),
    };
    Ok(RunSummary {
        policy: policy.to_string(),
        status,
        snapshot,
    })
}
