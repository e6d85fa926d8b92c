//! Metrics collector — accumulates completed tasks and utilization samples.

use serde::{Deserialize, Serialize};
use tracing::debug;

use gridsim_core::{Task, TaskId};

/// Point-in-time summary of a run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Mean of (completion − arrival) / execution over completed tasks.
    pub avg_weighted_turnaround: f64,
    /// Latest completion time over completed tasks.
    pub makespan: f64,
    pub completed_count: usize,
    /// Mean of (completion − arrival) over completed tasks.
    pub avg_turnaround: f64,
    /// Mean machine CPU utilization across sampled ticks, in [0, 1].
    pub avg_cpu_utilization: f64,
    /// Tasks dropped because no machine could ever run them.
    pub skipped_count: usize,
    /// Ticks simulated so far.
    pub ticks: u64,
}

#[derive(Debug, Clone, Default)]
pub struct MetricsCollector {
    completed: Vec<Task>,
    skipped: Vec<TaskId>,
    utilization_sum: f64,
    ticks: u64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record tasks released this tick. Tasks that never ran are ignored.
    pub fn record_completed(&mut self, tasks: &[Task]) {
        for task in tasks {
            if task.completion_time.is_some() && task.execution_time.is_some() {
                self.completed.push(task.clone());
            } else {
                debug!(task = task.id, "ignoring task without completion record");
            }
        }
    }

    pub fn record_skipped(&mut self, task_id: TaskId) {
        self.skipped.push(task_id);
    }

    /// Record one simulated tick and its mean CPU utilization.
    pub fn record_tick(&mut self, cpu_utilization: f64) {
        self.utilization_sum += cpu_utilization;
        self.ticks += 1;
    }

    pub fn completed(&self) -> &[Task] {
        &self.completed
    }

    pub fn skipped(&self) -> &[TaskId] {
        &self.skipped
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let avg_turnaround = mean(self.completed.iter().filter_map(Task::turnaround));
        let avg_cpu_utilization = if self.ticks > 0 {
            self.utilization_sum / self.ticks as f64
        } else {
            0.0
        };

        MetricsSnapshot {
            avg_weighted_turnaround: avg_weighted_turnaround(&self.completed),
            makespan: makespan(&self.completed),
            completed_count: self.completed.len(),
            avg_turnaround,
            avg_cpu_utilization,
            skipped_count: self.skipped.len(),
            ticks: self.ticks,
        }
    }
}

/// Mean weighted turnaround. Zero for an empty set.
pub fn avg_weighted_turnaround(tasks: &[Task]) -> f64 {
    mean(tasks.iter().filter_map(Task::weighted_turnaround))
}

/// Latest completion time. Zero for an empty set.
pub fn makespan(tasks: &[Task]) -> f64 {
    tasks
        .iter()
        .filter_map(|t| t.completion_time)
        .fold(0.0, f64::max)
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, count) = values.fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 { 0.0 } else { sum / count as f64 }
}
