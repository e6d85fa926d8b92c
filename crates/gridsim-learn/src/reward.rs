//! Reward signal for the learned policy.

use gridsim_core::Task;

/// Negative sum of weighted turnaround over tasks completed this tick.
///
/// Ticks with no completions yield zero. Tasks without an execution
/// time (never started) contribute nothing.
pub fn weighted_turnaround_reward(completed: &[Task]) -> f64 {
    -completed
        .iter()
        .filter_map(Task::weighted_turnaround)
        .sum::<f64>()
}
