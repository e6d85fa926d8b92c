//! Scheduling policies.
//!
//! A policy looks at the encoded state, the machines and the waiting
//! queue, and proposes at most one (task, machine) pair per call. The
//! engine validates and applies the proposal; a policy never mutates
//! machine usage itself.

mod fcfs;
mod heuristic;

pub use fcfs::Fcfs;
pub use heuristic::HeuristicBalanced;

use serde::{Deserialize, Serialize};

use gridsim_core::{Machine, MachineId, Task, TaskId};

/// Everything a policy may look at when making one decision.
#[derive(Debug, Clone, Copy)]
pub struct DecisionContext<'a> {
    /// Encoded observation, length `2M + 3K`.
    pub state: &'a [f64],
    /// Machines in ascending id order.
    pub machines: &'a [Machine],
    /// Arrived, unassigned tasks in arrival order.
    pub waiting: &'a [Task],
    pub now: u64,
}

/// A proposed placement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub task_id: TaskId,
    pub machine_id: MachineId,
}

/// End-of-tick outcome, delivered to policies that learn.
#[derive(Debug, Clone, Copy)]
pub struct TickFeedback<'a> {
    /// Encoded observation before this tick's placements.
    pub state: &'a [f64],
    pub reward: f64,
    pub next_state: &'a [f64],
    pub done: bool,
}

pub trait SchedulingPolicy: Send {
    /// Short identifier used in logs and reports.
    fn name(&self) -> &'static str;

    /// Propose the next assignment, or `None` for a no-op.
    fn select(&mut self, ctx: &DecisionContext<'_>) -> Option<Assignment>;

    /// Maximum assignments the engine should attempt per tick.
    /// `None` means keep asking until the policy returns a no-op.
    fn assignments_per_tick(&self) -> Option<usize> {
        None
    }

    /// Called at the end of every tick the clock advances through,
    /// including the one that finishes the run.
    fn observe(&mut self, _feedback: &TickFeedback<'_>) {}

    /// Replay and update counters, for policies that train.
    fn training_stats(&self) -> Option<TrainingStats> {
        None
    }
}

/// Progress of a policy that trains online.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TrainingStats {
    /// Transitions currently held in replay.
    pub buffered: usize,
    /// Transitions recorded since the policy was built.
    pub recorded: u64,
    /// Terminal transitions recorded since the policy was built.
    pub terminal: u64,
    pub steps: u64,
}
