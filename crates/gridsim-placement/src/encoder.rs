//! State encoder — fixed-length observation of the cluster.
//!
//! Layout for M machines and K tracked task slots:
//!
//! ```text
//! [ cpu_util(m0), mem_util(m0), ..., cpu_util(mM-1), mem_util(mM-1),
//!   cpu/100(t0), mem/100(t0), dur/3600(t0), ..., (tK-1 triple) ]
//! ```
//!
//! Machines are ordered by ascending id, tasks by waiting-queue order.
//! Short queues are zero-padded; tasks beyond slot K are not observed.
//! The action space is `M × K` with `action = machine · K + task_slot`,
//! always against the padded K slots, never the live queue length.

use gridsim_core::{ConfigError, ConfigResult, Machine, Task};

const DEMAND_SCALE: f64 = 100.0;
const DURATION_SCALE: f64 = 3600.0;

const MACHINE_FEATURES: usize = 2;
const TASK_FEATURES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateEncoder {
    machine_count: usize,
    max_tracked: usize,
}

impl StateEncoder {
    pub fn new(machine_count: usize, max_tracked: usize) -> ConfigResult<Self> {
        if machine_count == 0 {
            return Err(ConfigError::NoMachines);
        }
        if max_tracked == 0 {
            return Err(ConfigError::NoTrackedTasks);
        }
        Ok(Self {
            machine_count,
            max_tracked,
        })
    }

    pub fn machine_count(&self) -> usize {
        self.machine_count
    }

    pub fn max_tracked(&self) -> usize {
        self.max_tracked
    }

    /// Observation length: `2M + 3K`.
    pub fn state_dim(&self) -> usize {
        MACHINE_FEATURES * self.machine_count + TASK_FEATURES * self.max_tracked
    }

    /// Action space size: `M × K`.
    pub fn action_dim(&self) -> usize {
        self.machine_count * self.max_tracked
    }

    pub fn encode(&self, machines: &[Machine], waiting: &[Task]) -> Vec<f64> {
        let mut state = vec![0.0; self.state_dim()];

        let mut ordered: Vec<&Machine> = machines.iter().collect();
        ordered.sort_by_key(|m| m.id);
        for (slot, m) in ordered.into_iter().take(self.machine_count).enumerate() {
            let base = slot * MACHINE_FEATURES;
            state[base] = m.cpu_utilization();
            state[base + 1] = m.memory_utilization();
        }

        let offset = self.task_offset();
        for (slot, t) in waiting.iter().take(self.max_tracked).enumerate() {
            let base = offset + slot * TASK_FEATURES;
            state[base] = t.cpu_demand / DEMAND_SCALE;
            state[base + 1] = t.memory_demand / DEMAND_SCALE;
            state[base + 2] = t.estimated_duration / DURATION_SCALE;
        }

        state
    }

    /// Read back `(cpu_util, mem_util)` for the machine in `slot`.
    pub fn machine_features(&self, state: &[f64], slot: usize) -> Option<(f64, f64)> {
        if slot >= self.machine_count || state.len() != self.state_dim() {
            return None;
        }
        let base = slot * MACHINE_FEATURES;
        Some((state[base], state[base + 1]))
    }

    /// Read back the normalized `(cpu, mem, duration)` triple for a task slot.
    pub fn task_features(&self, state: &[f64], slot: usize) -> Option<[f64; 3]> {
        if slot >= self.max_tracked || state.len() != self.state_dim() {
            return None;
        }
        let base = self.task_offset() + slot * TASK_FEATURES;
        Some([state[base], state[base + 1], state[base + 2]])
    }

    pub fn encode_action(&self, machine_index: usize, task_slot: usize) -> Option<usize> {
        (machine_index < self.machine_count && task_slot < self.max_tracked)
            .then_some(machine_index * self.max_tracked + task_slot)
    }

    /// Split an action index into `(machine_index, task_slot)`.
    pub fn decode_action(&self, action: usize) -> Option<(usize, usize)> {
        (action < self.action_dim())
            .then_some((action / self.max_tracked, action % self.max_tracked))
    }

    fn task_offset(&self) -> usize {
        MACHINE_FEATURES * self.machine_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    fn machine(id: usize, cpu: f64, mem: f64) -> Machine {
        let mut m = Machine::new(id, 100.0, 100.0);
        m.cpu_usage = cpu;
        m.memory_usage = mem;
        m
    }

    #[test]
    fn rejects_degenerate_dimensions() {
        assert!(matches!(StateEncoder::new(0, 4), Err(ConfigError::NoMachines)));
        assert!(matches!(StateEncoder::new(2, 0), Err(ConfigError::NoTrackedTasks)));
    }

    #[test]
    fn empty_queue_yields_zero_task_features() {
        let enc = StateEncoder::new(2, 3).unwrap();
        let state = enc.encode(&[machine(0, 50.0, 20.0), machine(1, 0.0, 0.0)], &[]);

        assert_eq!(state.len(), 2 * 2 + 3 * 3);
        assert!(state[4..].iter().all(|v| *v == 0.0));
    }

    #[test]
    fn round_trip_recovers_normalized_values() {
        let enc = StateEncoder::new(2, 2).unwrap();
        let machines = [machine(1, 90.0, 10.0), machine(0, 40.0, 60.0)];
        let tasks = [Task::new(1, 0, 25.0, 75.0, 1800.0)];
        let state = enc.encode(&machines, &tasks);

        // Ascending id, regardless of input order.
        let (cpu0, mem0) = enc.machine_features(&state, 0).unwrap();
        assert!((cpu0 - 0.4).abs() < EPS && (mem0 - 0.6).abs() < EPS);
        let (cpu1, mem1) = enc.machine_features(&state, 1).unwrap();
        assert!((cpu1 - 0.9).abs() < EPS && (mem1 - 0.1).abs() < EPS);

        let [c, m, d] = enc.task_features(&state, 0).unwrap();
        assert!((c - 0.25).abs() < EPS);
        assert!((m - 0.75).abs() < EPS);
        assert!((d - 0.5).abs() < EPS);
        assert_eq!(enc.task_features(&state, 1).unwrap(), [0.0; 3]);
    }

    #[test]
    fn overflowing_queue_is_truncated() {
        let enc = StateEncoder::new(1, 2).unwrap();
        let tasks: Vec<Task> = (0..5).map(|i| Task::new(i, 0, 10.0 * (i + 1) as f64, 5.0, 60.0)).collect();
        let state = enc.encode(&[machine(0, 0.0, 0.0)], &tasks);

        assert_eq!(state.len(), enc.state_dim());
        assert!((enc.task_features(&state, 1).unwrap()[0] - 0.2).abs() < EPS);
    }

    #[test]
    fn action_decoding_uses_fixed_slots() {
        let enc = StateEncoder::new(3, 4).unwrap();
        assert_eq!(enc.action_dim(), 12);
        assert_eq!(enc.decode_action(0), Some((0, 0)));
        assert_eq!(enc.decode_action(5), Some((1, 1)));
        assert_eq!(enc.decode_action(11), Some((2, 3)));
        assert_eq!(enc.decode_action(12), None);

        for action in 0..enc.action_dim() {
            let (m, t) = enc.decode_action(action).unwrap();
            assert_eq!(enc.encode_action(m, t), Some(action));
        }
        assert_eq!(enc.encode_action(3, 0), None);
    }
}
