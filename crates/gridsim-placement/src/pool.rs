//! Resource pool — machine capacity bookkeeping.
//!
//! The pool is the only place machine usage changes. Every assignment
//! adds the task's demand to its machine; every release subtracts it, so
//! at all times a machine's usage equals the sum of demands over its
//! running tasks.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use gridsim_core::{
    ConfigResult, ExecutionConfig, Machine, MachineId, MachineSpec, Task, TaskId,
    validate_machine_specs,
};

use crate::error::{PoolError, PoolResult};

/// Samples actual run lengths as `estimated_duration × jitter`.
#[derive(Debug, Clone)]
pub struct ExecutionSampler {
    rng: StdRng,
    jitter_min: f64,
    jitter_max: f64,
}

impl ExecutionSampler {
    pub fn new(seed: u64, config: &ExecutionConfig) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            jitter_min: config.jitter_min,
            jitter_max: config.jitter_max,
        }
    }

    /// A sampler that always returns the nominal duration.
    pub fn exact() -> Self {
        Self {
            rng: StdRng::seed_from_u64(0),
            jitter_min: 1.0,
            jitter_max: 1.0,
        }
    }

    pub fn sample(&mut self, estimated_duration: f64) -> f64 {
        let factor = if self.jitter_max > self.jitter_min {
            self.rng.random_range(self.jitter_min..=self.jitter_max)
        } else {
            self.jitter_min
        };
        estimated_duration * factor
    }
}

/// Owns the machines and the running tasks. Released tasks are handed
/// back to the caller; the pool keeps no record of them.
#[derive(Debug, Clone)]
pub struct ResourcePool {
    machines: Vec<Machine>,
    running: BTreeMap<TaskId, Task>,
    sampler: ExecutionSampler,
}

impl ResourcePool {
    /// Build a fresh machine set, one machine per spec, ids `0..M`.
    pub fn new(specs: &[MachineSpec], sampler: ExecutionSampler) -> ConfigResult<Self> {
        validate_machine_specs(specs)?;
        let machines = specs
            .iter()
            .enumerate()
            .map(|(id, spec)| Machine::from_spec(id, spec))
            .collect();
        Ok(Self {
            machines,
            running: BTreeMap::new(),
            sampler,
        })
    }

    /// Machines in ascending id order.
    pub fn machines(&self) -> &[Machine] {
        &self.machines
    }

    pub fn machine(&self, id: MachineId) -> Option<&Machine> {
        self.machines.get(id)
    }

    /// Pure capacity check on both resource dimensions.
    pub fn can_admit(&self, machine: MachineId, task: &Task) -> bool {
        self.machines
            .get(machine)
            .is_some_and(|m| m.can_admit(task))
    }

    /// Whether any machine, even empty, is large enough for the task.
    pub fn could_ever_admit(&self, task: &Task) -> bool {
        self.machines.iter().any(|m| m.could_ever_admit(task))
    }

    /// Start `task` on `machine` at tick `now`.
    ///
    /// Samples the execution time and sets the completion time. Fails
    /// without touching any state if the task does not fit.
    pub fn assign(&mut self, machine: MachineId, mut task: Task, now: u64) -> PoolResult<&Task> {
        if task.is_assigned() {
            return Err(PoolError::AlreadyAssigned(task.id));
        }
        let m = self
            .machines
            .get_mut(machine)
            .ok_or(PoolError::UnknownMachine(machine))?;
        if !m.can_admit(&task) {
            return Err(PoolError::Inadmissible {
                task_id: task.id,
                machine,
            });
        }

        let execution_time = self.sampler.sample(task.estimated_duration);
        task.execution_time = Some(execution_time);
        task.completion_time = Some(now as f64 + execution_time);
        task.assigned_machine = Some(machine);

        m.cpu_usage += task.cpu_demand;
        m.memory_usage += task.memory_demand;
        m.running_tasks.insert(task.id);

        debug!(
            task = task.id,
            machine,
            now,
            execution_time,
            cpu_usage = m.cpu_usage,
            memory_usage = m.memory_usage,
            "task assigned"
        );

        let id = task.id;
        Ok(self.running.entry(id).or_insert(task))
    }

    /// Retire every task on `machine` whose completion time has passed.
    ///
    /// Returns the newly completed tasks. Releasing twice at the same
    /// tick is a no-op the second time.
    pub fn release(&mut self, machine: MachineId, now: u64) -> PoolResult<Vec<Task>> {
        let m = self
            .machines
            .get_mut(machine)
            .ok_or(PoolError::UnknownMachine(machine))?;

        let clock = now as f64;
        let finished: Vec<TaskId> = m
            .running_tasks
            .iter()
            .copied()
            .filter(|id| {
                self.running
                    .get(id)
                    .and_then(|t| t.completion_time)
                    .is_some_and(|done| done <= clock)
            })
            .collect();

        let mut released = Vec::with_capacity(finished.len());
        for id in finished {
            m.running_tasks.remove(&id);
            let Some(task) = self.running.remove(&id) else {
                continue;
            };
            m.cpu_usage -= task.cpu_demand;
            m.memory_usage -= task.memory_demand;
            debug!(task = id, machine, now, "task completed");
            released.push(task);
        }

        if m.running_tasks.is_empty() {
            // Integer-valued demands cancel exactly; this only clears
            // rounding residue from fractional ones.
            m.cpu_usage = 0.0;
            m.memory_usage = 0.0;
        }

        Ok(released)
    }

    /// Release every machine in ascending id order.
    pub fn release_all(&mut self, now: u64) -> Vec<Task> {
        let mut released = Vec::new();
        for id in 0..self.machines.len() {
            if let Ok(tasks) = self.release(id, now) {
                released.extend(tasks);
            }
        }
        released
    }

    pub fn has_running(&self) -> bool {
        !self.running.is_empty()
    }

    pub fn running_count(&self) -> usize {
        self.running.len()
    }

    /// Running tasks, ordered by id.
    pub fn running_tasks(&self) -> impl Iterator<Item = &Task> {
        self.running.values()
    }

    /// Mean CPU utilization across machines, in [0, 1].
    pub fn avg_cpu_utilization(&self) -> f64 {
        if self.machines.is_empty() {
            return 0.0;
        }
        let total: f64 = self.machines.iter().map(Machine::cpu_utilization).sum();
        total / self.machines.len() as f64
    }
}
