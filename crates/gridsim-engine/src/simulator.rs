//! Simulator — drives the discrete clock through its phases.
//!
//! ```text
//!   Idle ──start()──▶ Running ──queue empty, tasks running──▶ Draining ──▶ Done
//!                        │                                                  ▲
//!                        └──────────── nothing left anywhere ───────────────┘
//! ```
//!
//! Every tick runs in the same order: release finished tasks, admit
//! arrivals into the waiting queue, drop tasks no machine can ever run,
//! then ask the policy for assignments until it declines (or its
//! per-tick limit is reached). Freed capacity is therefore reusable in
//! the same tick it was released. The policy then observes the tick's
//! outcome, whether or not it was asked to place anything.

use std::collections::VecDeque;

use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use gridsim_core::{MachineSpec, NonAdmittableAction, PolicyKind, SimConfig, Task, TaskId};
use gridsim_learn::{LearnedPolicy, weighted_turnaround_reward};
use gridsim_metrics::{MetricsCollector, MetricsSnapshot};
use gridsim_placement::{
    Assignment, DecisionContext, ExecutionSampler, Fcfs, HeuristicBalanced, ResourcePool,
    SchedulingPolicy, StateEncoder, TickFeedback,
};

use crate::error::{SimError, SimResult};
use crate::workload::validate_tasks;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SimPhase {
    /// Built, clock not started.
    Idle,
    /// Tasks are arriving or waiting.
    Running,
    /// Nothing left to place; releasing running tasks only.
    Draining,
    /// Terminal.
    Done,
}

/// What happened during one tick.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickResult {
    pub tick: u64,
    /// Phase after the tick.
    pub phase: SimPhase,
    pub released: Vec<TaskId>,
    pub arrived: usize,
    pub assigned: Vec<Assignment>,
    pub skipped: Vec<TaskId>,
    /// Negative summed weighted turnaround of the released tasks.
    pub reward: f64,
}

/// A task dropped because no machine could ever hold it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SkippedTask {
    pub task_id: TaskId,
    pub waited: u64,
    pub tick: u64,
}

pub struct Simulator {
    phase: SimPhase,
    clock: u64,
    max_wait_ticks: u64,
    on_non_admittable: NonAdmittableAction,
    pool: ResourcePool,
    encoder: StateEncoder,
    policy: Box<dyn SchedulingPolicy>,
    /// Not yet arrived, ordered by (arrival_time, id).
    pending: VecDeque<Task>,
    /// Arrived and unassigned, in arrival order.
    waiting: Vec<Task>,
    metrics: MetricsCollector,
    skipped: Vec<SkippedTask>,
    shutdown: Option<watch::Receiver<bool>>,
}

impl Simulator {
    /// Build a run over `config.machines` with the configured policy.
    pub fn new(config: &SimConfig, tasks: Vec<Task>) -> SimResult<Self> {
        Self::with_machines(config, tasks, &config.machine_specs())
    }

    /// Build a run over an explicit machine set.
    pub fn with_machines(config: &SimConfig, tasks: Vec<Task>, machines: &[MachineSpec]) -> SimResult<Self> {
        config.validate()?;
        let encoder = StateEncoder::new(machines.len(), config.tracked_tasks())?;
        let policy = build_policy(config, encoder)?;
        Self::with_policy(config, tasks, machines, policy)
    }

    /// Build a run driven by a caller-supplied policy.
    pub fn with_policy(
        config: &SimConfig,
        tasks: Vec<Task>,
        machines: &[MachineSpec],
        policy: Box<dyn SchedulingPolicy>,
    ) -> SimResult<Self> {
        config.validate()?;
        validate_tasks(&tasks)?;
        let encoder = StateEncoder::new(machines.len(), config.tracked_tasks())?;
        let pool = ResourcePool::new(machines, ExecutionSampler::new(config.seed, &config.execution))?;

        let mut tasks = tasks;
        tasks.sort_by_key(|t| (t.arrival_time, t.id));

        Ok(Self {
            phase: SimPhase::Idle,
            clock: 0,
            max_wait_ticks: config.max_wait_ticks,
            on_non_admittable: config.on_non_admittable,
            pool,
            encoder,
            policy,
            pending: tasks.into(),
            waiting: Vec::new(),
            metrics: MetricsCollector::new(),
            skipped: Vec::new(),
            shutdown: None,
        })
    }

    /// Stop the run at the next tick boundary once `shutdown` reads true.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    pub fn phase(&self) -> SimPhase {
        self.phase
    }

    /// Current tick.
    pub fn clock(&self) -> u64 {
        self.clock
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    pub fn policy(&self) -> &dyn SchedulingPolicy {
        self.policy.as_ref()
    }

    /// Give up the run and keep its policy, with whatever it has learned.
    pub fn into_policy(self) -> Box<dyn SchedulingPolicy> {
        self.policy
    }

    pub fn pool(&self) -> &ResourcePool {
        &self.pool
    }

    pub fn encoder(&self) -> &StateEncoder {
        &self.encoder
    }

    pub fn waiting(&self) -> &[Task] {
        &self.waiting
    }

    pub fn skipped(&self) -> &[SkippedTask] {
        &self.skipped
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn collector(&self) -> &MetricsCollector {
        &self.metrics
    }

    /// Start the clock. Has no effect once started.
    pub fn start(&mut self) {
        if self.phase != SimPhase::Idle {
            debug!(phase = ?self.phase, "start ignored");
            return;
        }
        info!(
            policy = self.policy.name(),
            machines = self.pool.machines().len(),
            tasks = self.pending.len(),
            "simulation started"
        );
        self.phase = SimPhase::Running;
    }

    /// Advance the clock by one tick. Starts the run if still idle.
    pub fn step(&mut self) -> SimResult<TickResult> {
        if self.is_cancelled() {
            warn!(tick = self.clock, "simulation cancelled");
            return Err(SimError::Cancelled {
                tick: self.clock,
                partial: Box::new(self.metrics()),
            });
        }

        let now = self.clock;
        match self.phase {
            SimPhase::Idle => self.start(),
            SimPhase::Done => {
                return Ok(TickResult {
                    tick: now,
                    phase: SimPhase::Done,
                    released: Vec::new(),
                    arrived: 0,
                    assigned: Vec::new(),
                    skipped: Vec::new(),
                    reward: 0.0,
                });
            }
            SimPhase::Running | SimPhase::Draining => {}
        }

        let released = self.pool.release_all(now);
        self.metrics.record_completed(&released);
        let reward = weighted_turnaround_reward(&released);

        let arrived = self.admit_arrivals(now);
        let skipped = self.drop_non_admittable(now)?;
        let state = self.encoder.encode(self.pool.machines(), &self.waiting);
        let assigned = self.place(now)?;

        let phase = if !self.pending.is_empty() || !self.waiting.is_empty() {
            SimPhase::Running
        } else if self.pool.has_running() {
            SimPhase::Draining
        } else {
            SimPhase::Done
        };
        if phase != self.phase {
            info!(tick = now, from = ?self.phase, to = ?phase, "phase changed");
            self.phase = phase;
        }

        let next_state = self.encoder.encode(self.pool.machines(), &self.waiting);
        self.policy.observe(&TickFeedback {
            state: &state,
            reward,
            next_state: &next_state,
            done: self.phase == SimPhase::Done,
        });

        self.metrics.record_tick(self.pool.avg_cpu_utilization());
        self.clock += 1;

        if self.phase == SimPhase::Done {
            info!(
                tick = now,
                completed = self.metrics.completed().len(),
                skipped = self.skipped.len(),
                "simulation done"
            );
        }

        Ok(TickResult {
            tick: now,
            phase: self.phase,
            released: released.iter().map(|t| t.id).collect(),
            arrived,
            assigned,
            skipped,
            reward,
        })
    }

    /// Step until done or `max_ticks` more ticks have run.
    ///
    /// Hitting the bound is an error carrying the metrics so far.
    pub fn run_to_completion(&mut self, max_ticks: u64) -> SimResult<MetricsSnapshot> {
        self.start();
        let mut ticks = 0;
        while self.phase != SimPhase::Done {
            if ticks >= max_ticks {
                let partial = self.metrics();
                warn!(
                    max_ticks,
                    completed = partial.completed_count,
                    waiting = self.waiting.len(),
                    running = self.pool.running_count(),
                    "tick bound reached before all tasks finished"
                );
                return Err(SimError::ExhaustedTicks {
                    max_ticks,
                    partial: Box::new(partial),
                });
            }
            self.step()?;
            ticks += 1;
        }
        Ok(self.metrics())
    }

    fn is_cancelled(&self) -> bool {
        self.shutdown.as_ref().is_some_and(|rx| *rx.borrow())
    }

    fn admit_arrivals(&mut self, now: u64) -> usize {
        let mut arrived = 0;
        while self.pending.front().is_some_and(|t| t.arrival_time <= now) {
            if let Some(task) = self.pending.pop_front() {
                debug!(task = task.id, now, "task arrived");
                self.waiting.push(task);
                arrived += 1;
            }
        }
        arrived
    }

    /// Remove (or abort on) tasks that have waited past the bound and
    /// exceed every machine's total capacity.
    fn drop_non_admittable(&mut self, now: u64) -> SimResult<Vec<TaskId>> {
        let mut skipped = Vec::new();
        let mut i = 0;
        while i < self.waiting.len() {
            let task = &self.waiting[i];
            let waited = now.saturating_sub(task.arrival_time);
            if waited <= self.max_wait_ticks || self.pool.could_ever_admit(task) {
                i += 1;
                continue;
            }

            let task_id = task.id;
            match self.on_non_admittable {
                NonAdmittableAction::Abort => {
                    return Err(SimError::NonAdmittable {
                        task_id,
                        waited,
                        tick: now,
                    });
                }
                NonAdmittableAction::Skip => {
                    warn!(
                        task = task_id,
                        waited,
                        cpu = task.cpu_demand,
                        memory = task.memory_demand,
                        "skipping task that fits no machine"
                    );
                    self.waiting.remove(i);
                    self.metrics.record_skipped(task_id);
                    self.skipped.push(SkippedTask {
                        task_id,
                        waited,
                        tick: now,
                    });
                    skipped.push(task_id);
                }
            }
        }
        Ok(skipped)
    }

    /// Ask the policy for assignments and apply them.
    fn place(&mut self, now: u64) -> SimResult<Vec<Assignment>> {
        let limit = self.policy.assignments_per_tick();
        let mut assigned = Vec::new();

        while !self.waiting.is_empty() && limit.is_none_or(|n| assigned.len() < n) {
            let state = self.encoder.encode(self.pool.machines(), &self.waiting);
            let pick = self.policy.select(&DecisionContext {
                state: &state,
                machines: self.pool.machines(),
                waiting: &self.waiting,
                now,
            });

            let Some(pick) = pick else {
                break;
            };
            let Some(index) = self.waiting.iter().position(|t| t.id == pick.task_id) else {
                warn!(task = pick.task_id, "policy picked a task that is not waiting");
                break;
            };
            if !self.pool.can_admit(pick.machine_id, &self.waiting[index]) {
                warn!(
                    task = pick.task_id,
                    machine = pick.machine_id,
                    "policy picked an inadmissible pair"
                );
                break;
            }

            let task = self.waiting.remove(index);
            self.pool.assign(pick.machine_id, task, now)?;
            assigned.push(pick);
        }

        Ok(assigned)
    }
}

/// Instantiate the policy named by `config.policy`.
pub fn build_policy(config: &SimConfig, encoder: StateEncoder) -> SimResult<Box<dyn SchedulingPolicy>> {
    let policy: Box<dyn SchedulingPolicy> = match config.policy {
        PolicyKind::Fcfs => Box::new(Fcfs::new()),
        PolicyKind::Heuristic => Box::new(HeuristicBalanced::from_config(&config.heuristic)),
        PolicyKind::Learned => Box::new(LearnedPolicy::from_config(encoder, &config.learned, config.seed)?),
    };
    Ok(policy)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(policy: PolicyKind) -> SimConfig {
        let mut config = SimConfig::scaffold(policy);
        config.machines.count = 1;
        config.encoder.max_tracked_tasks = 4;
        config
    }

    #[test]
    fn starts_idle_and_runs_on_first_step() {
        let mut sim = Simulator::new(&config(PolicyKind::Fcfs), vec![Task::new(1, 0, 10.0, 10.0, 3.0)]).unwrap();
        assert_eq!(sim.phase(), SimPhase::Idle);

        let tick = sim.step().unwrap();
        assert_eq!(tick.tick, 0);
        assert_eq!(tick.arrived, 1);
        assert_eq!(tick.assigned, vec![Assignment { task_id: 1, machine_id: 0 }]);
        assert_eq!(tick.phase, SimPhase::Draining);
        assert_eq!(sim.clock(), 1);
    }

    #[test]
    fn empty_workload_finishes_immediately() {
        let mut sim = Simulator::new(&config(PolicyKind::Heuristic), Vec::new()).unwrap();
        let snap = sim.run_to_completion(10).unwrap();
        assert_eq!(sim.phase(), SimPhase::Done);
        assert_eq!(snap.completed_count, 0);
        assert_eq!(snap.makespan, 0.0);
    }

    #[test]
    fn step_after_done_is_noop() {
        let mut sim = Simulator::new(&config(PolicyKind::Fcfs), Vec::new()).unwrap();
        sim.run_to_completion(5).unwrap();
        let clock = sim.clock();

        let tick = sim.step().unwrap();
        assert_eq!(tick.phase, SimPhase::Done);
        assert_eq!(sim.clock(), clock);
    }

    #[test]
    fn start_twice_is_harmless() {
        let mut sim = Simulator::new(&config(PolicyKind::Fcfs), Vec::new()).unwrap();
        sim.start();
        sim.start();
        assert_eq!(sim.phase(), SimPhase::Running);
    }

    #[test]
    fn invalid_tasks_rejected_at_construction() {
        let tasks = vec![Task::new(1, 0, 10.0, 10.0, 0.0)];
        assert!(matches!(
            Simulator::new(&config(PolicyKind::Fcfs), tasks),
            Err(SimError::Config(_))
        ));
    }

    #[test]
    fn empty_machine_set_rejected() {
        let result = Simulator::with_machines(&config(PolicyKind::Fcfs), Vec::new(), &[]);
        assert!(matches!(result, Err(SimError::Config(_))));
    }

    #[test]
    fn build_policy_names() {
        let encoder = StateEncoder::new(1, 2).unwrap();
        for (kind, name) in [
            (PolicyKind::Fcfs, "fcfs"),
            (PolicyKind::Heuristic, "heuristic"),
            (PolicyKind::Learned, "learned"),
        ] {
            let policy = build_policy(&config(kind), encoder).unwrap();
            assert_eq!(policy.name(), name);
        }
    }
}
