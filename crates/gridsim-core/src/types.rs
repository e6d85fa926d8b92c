//! Shared types used across GridSim crates.
//!
//! A `Task` moves through waiting → running → completed exactly once.
//! `Machine` usage is only ever mutated by the resource pool; these types
//! carry the bookkeeping fields but no lifecycle logic of their own.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Unique identifier for a task within a single run.
pub type TaskId = u64;

/// Machine identifier. Machines are numbered `0..M` and always kept in
/// ascending id order.
pub type MachineId = usize;

/// Upper bound for a task's demand on either resource dimension.
pub const MAX_DEMAND: f64 = 100.0;

// ── Task ───────────────────────────────────────────────────────────

/// A unit of work with a resource demand and a nominal run length.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    /// Tick at which the task joins the waiting queue.
    pub arrival_time: u64,
    /// Percentage of a machine's CPU capacity (0-100).
    pub cpu_demand: f64,
    /// Percentage of a machine's memory capacity (0-100).
    pub memory_demand: f64,
    /// Nominal duration in ticks.
    pub estimated_duration: f64,
    /// Sampled actual duration, set at assignment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_time: Option<f64>,
    /// `assignment_time + execution_time`, set at assignment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_time: Option<f64>,
    /// Machine the task was placed on. Set once, never changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_machine: Option<MachineId>,
}

impl Task {
    pub fn new(
        id: TaskId,
        arrival_time: u64,
        cpu_demand: f64,
        memory_demand: f64,
        estimated_duration: f64,
    ) -> Self {
        Self {
            id,
            arrival_time,
            cpu_demand,
            memory_demand,
            estimated_duration,
            execution_time: None,
            completion_time: None,
            assigned_machine: None,
        }
    }

    pub fn is_assigned(&self) -> bool {
        self.assigned_machine.is_some()
    }

    /// `completion_time - arrival_time`, once the task has been assigned.
    pub fn turnaround(&self) -> Option<f64> {
        self.completion_time
            .map(|done| done - self.arrival_time as f64)
    }

    /// Turnaround normalized by the task's own execution time.
    pub fn weighted_turnaround(&self) -> Option<f64> {
        match (self.turnaround(), self.execution_time) {
            (Some(turnaround), Some(exec)) if exec > 0.0 => Some(turnaround / exec),
            _ => None,
        }
    }

    /// Check that the task is well-formed and not yet started.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let demand_ok = |d: f64| d.is_finite() && (0.0..=MAX_DEMAND).contains(&d);
        if !demand_ok(self.cpu_demand) || !demand_ok(self.memory_demand) {
            return Err(ConfigError::InvalidTask {
                task_id: self.id,
                reason: format!(
                    "demand out of range: cpu={} memory={}",
                    self.cpu_demand, self.memory_demand
                ),
            });
        }
        if !(self.estimated_duration.is_finite() && self.estimated_duration > 0.0) {
            return Err(ConfigError::InvalidTask {
                task_id: self.id,
                reason: format!("duration must be positive, got {}", self.estimated_duration),
            });
        }
        if self.is_assigned() || self.completion_time.is_some() {
            return Err(ConfigError::InvalidTask {
                task_id: self.id,
                reason: "task was already scheduled".to_string(),
            });
        }
        Ok(())
    }
}

// ── Machine ────────────────────────────────────────────────────────

/// Capacity description used to build a fresh `Machine` for every run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MachineSpec {
    pub cpu_capacity: f64,
    pub memory_capacity: f64,
}

impl Default for MachineSpec {
    fn default() -> Self {
        Self {
            cpu_capacity: 100.0,
            memory_capacity: 100.0,
        }
    }
}

/// A machine with two resource dimensions and the set of tasks it runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Machine {
    pub id: MachineId,
    pub cpu_capacity: f64,
    pub memory_capacity: f64,
    pub cpu_usage: f64,
    pub memory_usage: f64,
    /// Ids of running tasks. The pool owns the tasks themselves.
    pub running_tasks: BTreeSet<TaskId>,
}

impl Machine {
    pub fn new(id: MachineId, cpu_capacity: f64, memory_capacity: f64) -> Self {
        Self {
            id,
            cpu_capacity,
            memory_capacity,
            cpu_usage: 0.0,
            memory_usage: 0.0,
            running_tasks: BTreeSet::new(),
        }
    }

    pub fn from_spec(id: MachineId, spec: &MachineSpec) -> Self {
        Self::new(id, spec.cpu_capacity, spec.memory_capacity)
    }

    /// Whether the remaining capacity covers the task on both dimensions.
    pub fn can_admit(&self, task: &Task) -> bool {
        self.cpu_usage + task.cpu_demand <= self.cpu_capacity
            && self.memory_usage + task.memory_demand <= self.memory_capacity
    }

    /// Whether an empty machine of this size could ever run the task.
    pub fn could_ever_admit(&self, task: &Task) -> bool {
        task.cpu_demand <= self.cpu_capacity && task.memory_demand <= self.memory_capacity
    }

    /// CPU usage as a fraction of capacity, in [0, 1].
    pub fn cpu_utilization(&self) -> f64 {
        utilization(self.cpu_usage, self.cpu_capacity)
    }

    /// Memory usage as a fraction of capacity, in [0, 1].
    pub fn memory_utilization(&self) -> f64 {
        utilization(self.memory_usage, self.memory_capacity)
    }

    pub fn queue_length(&self) -> usize {
        self.running_tasks.len()
    }

    pub fn is_idle(&self) -> bool {
        self.running_tasks.is_empty()
    }
}

fn utilization(usage: f64, capacity: f64) -> f64 {
    if capacity > 0.0 {
        (usage / capacity).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_admit_checks_both_dimensions() {
        let mut m = Machine::new(0, 100.0, 100.0);
        m.cpu_usage = 50.0;
        m.memory_usage = 90.0;

        assert!(m.can_admit(&Task::new(1, 0, 50.0, 10.0, 5.0)));
        assert!(!m.can_admit(&Task::new(2, 0, 51.0, 10.0, 5.0)));
        assert!(!m.can_admit(&Task::new(3, 0, 10.0, 11.0, 5.0)));
    }

    #[test]
    fn could_ever_admit_ignores_usage() {
        let mut m = Machine::new(0, 80.0, 100.0);
        m.cpu_usage = 80.0;
        let task = Task::new(1, 0, 60.0, 10.0, 5.0);
        assert!(!m.can_admit(&task));
        assert!(m.could_ever_admit(&task));
        assert!(!m.could_ever_admit(&Task::new(2, 0, 90.0, 10.0, 5.0)));
    }

    #[test]
    fn utilization_is_normalized() {
        let mut m = Machine::new(0, 200.0, 100.0);
        m.cpu_usage = 50.0;
        m.memory_usage = 25.0;
        assert!((m.cpu_utilization() - 0.25).abs() < 1e-12);
        assert!((m.memory_utilization() - 0.25).abs() < 1e-12);
    }

    #[test]
    fn weighted_turnaround_requires_assignment() {
        let mut t = Task::new(1, 4, 10.0, 10.0, 10.0);
        assert_eq!(t.weighted_turnaround(), None);

        t.execution_time = Some(8.0);
        t.completion_time = Some(20.0);
        assert_eq!(t.turnaround(), Some(16.0));
        assert_eq!(t.weighted_turnaround(), Some(2.0));
    }

    #[test]
    fn validate_rejects_bad_tasks() {
        assert!(Task::new(1, 0, 10.0, 10.0, 10.0).validate().is_ok());
        assert!(Task::new(2, 0, 101.0, 10.0, 10.0).validate().is_err());
        assert!(Task::new(3, 0, 10.0, -1.0, 10.0).validate().is_err());
        assert!(Task::new(4, 0, 10.0, 10.0, 0.0).validate().is_err());
        assert!(Task::new(5, 0, f64::NAN, 10.0, 1.0).validate().is_err());

        let mut started = Task::new(6, 0, 10.0, 10.0, 10.0);
        started.assigned_machine = Some(0);
        assert!(started.validate().is_err());
    }

    #[test]
    fn task_json_omits_unset_fields() {
        let json = serde_json::to_string(&Task::new(7, 3, 20.0, 30.0, 40.0)).unwrap();
        assert!(!json.contains("completion_time"));
        let back: Task = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, 7);
        assert!(!back.is_assigned());
    }
}
