//! gridsim.toml configuration parser.
//!
//! Every section is optional; missing keys fall back to the defaults
//! below. `validate()` must pass before a simulation is built from the
//! config; values are never silently clamped.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};
use crate::types::MachineSpec;

/// Which scheduling policy drives a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    /// First-come-first-served with head-of-line blocking.
    #[default]
    Fcfs,
    /// Weighted load-balancing score over every admissible pair.
    Heuristic,
    /// Actor/critic policy trained from a replay buffer.
    Learned,
}

impl PolicyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyKind::Fcfs => "fcfs",
            PolicyKind::Heuristic => "heuristic",
            PolicyKind::Learned => "learned",
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fcfs" => Ok(PolicyKind::Fcfs),
            "heuristic" | "heuristic_balanced" | "balanced" => Ok(PolicyKind::Heuristic),
            "learned" | "drl" => Ok(PolicyKind::Learned),
            other => Err(format!(
                "unknown policy '{other}' (expected fcfs, heuristic or learned)"
            )),
        }
    }
}

/// What to do with a task that no machine could ever run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NonAdmittableAction {
    /// Drop the task from the waiting queue, record it, keep running.
    #[default]
    Skip,
    /// Stop the run with an error.
    Abort,
}

/// How the learned policy's actor is initialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorInit {
    /// Zero weights with a bias that prefers low action indices
    /// (head task on the first machine).
    #[default]
    Prior,
    /// Small uniform random weights drawn from the run seed.
    Random,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub seed: u64,
    pub max_ticks: u64,
    pub policy: PolicyKind,
    /// Ticks a task may wait before it is checked for admittability.
    pub max_wait_ticks: u64,
    pub on_non_admittable: NonAdmittableAction,
    pub machines: MachinesConfig,
    pub encoder: EncoderConfig,
    pub execution: ExecutionConfig,
    pub heuristic: HeuristicConfig,
    pub learned: LearnedConfig,
    pub workload: WorkloadConfig,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            max_ticks: 100_000,
            policy: PolicyKind::default(),
            max_wait_ticks: 500,
            on_non_admittable: NonAdmittableAction::default(),
            machines: MachinesConfig::default(),
            encoder: EncoderConfig::default(),
            execution: ExecutionConfig::default(),
            heuristic: HeuristicConfig::default(),
            learned: LearnedConfig::default(),
            workload: WorkloadConfig::default(),
        }
    }
}

/// Homogeneous machine set: `count` machines of the same size.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MachinesConfig {
    pub count: usize,
    pub cpu_capacity: f64,
    pub memory_capacity: f64,
}

impl Default for MachinesConfig {
    fn default() -> Self {
        Self {
            count: 8,
            cpu_capacity: 100.0,
            memory_capacity: 100.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// K: number of waiting-task slots in the observation.
    pub max_tracked_tasks: usize,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            max_tracked_tasks: 10,
        }
    }
}

/// Bounds for the factor applied to `estimated_duration` at assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    pub jitter_min: f64,
    pub jitter_max: f64,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            jitter_min: 0.9,
            jitter_max: 1.1,
        }
    }
}

/// Target load and weights w1..w5 for the balanced heuristic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicConfig {
    /// Preferred machine utilization in percent.
    pub target_load: f64,
    /// w1: distance of CPU usage from the target.
    pub cpu_balance: f64,
    /// w2: distance of memory usage from the target.
    pub memory_balance: f64,
    /// w3: duration per unit of demand.
    pub efficiency: f64,
    /// w4: tasks already running on the machine.
    pub queue_length: f64,
    /// w5: imbalance between the task's CPU and memory demand.
    pub resource_match: f64,
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            target_load: 70.0,
            cpu_balance: 0.3,
            memory_balance: 0.3,
            efficiency: 15.0,
            queue_length: 8.0,
            resource_match: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LearnedConfig {
    pub replay_capacity: usize,
    pub batch_size: usize,
    pub gamma: f64,
    pub actor_learning_rate: f64,
    pub critic_learning_rate: f64,
    /// When false the actor is evaluated greedily and never updated.
    pub training: bool,
    pub init: ActorInit,
}

impl Default for LearnedConfig {
    fn default() -> Self {
        Self {
            replay_capacity: 1000,
            batch_size: 32,
            gamma: 0.99,
            actor_learning_rate: 0.001,
            critic_learning_rate: 0.002,
            training: true,
            init: ActorInit::default(),
        }
    }
}

/// Parameters for the synthetic arrival stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadConfig {
    pub task_count: usize,
    /// Ticks between consecutive arrivals.
    pub arrival_interval: u64,
    /// Inclusive [min, max] CPU demand.
    pub cpu_demand: [f64; 2],
    /// Inclusive [min, max] memory demand.
    pub memory_demand: [f64; 2],
    /// Inclusive [min, max] nominal duration in ticks.
    pub duration: [u64; 2],
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            task_count: 80,
            arrival_interval: 15,
            cpu_demand: [15.0, 60.0],
            memory_demand: [15.0, 60.0],
            duration: [30, 300],
        }
    }
}

impl SimConfig {
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml_string(&self) -> ConfigResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Number of machines (M).
    pub fn machine_count(&self) -> usize {
        self.machines.count
    }

    /// Number of tracked waiting-task slots (K).
    pub fn tracked_tasks(&self) -> usize {
        self.encoder.max_tracked_tasks
    }

    /// One spec per machine, in id order.
    pub fn machine_specs(&self) -> Vec<MachineSpec> {
        vec![
            MachineSpec {
                cpu_capacity: self.machines.cpu_capacity,
                memory_capacity: self.machines.memory_capacity,
            };
            self.machines.count
        ]
    }

    /// Reject any parameter combination a run cannot honor.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.machines.count == 0 {
            return Err(ConfigError::NoMachines);
        }
        validate_machine_specs(&self.machine_specs())?;

        if self.encoder.max_tracked_tasks == 0 {
            return Err(ConfigError::NoTrackedTasks);
        }
        if self.max_ticks == 0 {
            return Err(ConfigError::invalid("max_ticks", "must be at least 1"));
        }

        let exec = &self.execution;
        if !(exec.jitter_min.is_finite() && exec.jitter_min > 0.0) {
            return Err(ConfigError::invalid(
                "execution.jitter_min",
                format!("must be positive, got {}", exec.jitter_min),
            ));
        }
        if !exec.jitter_max.is_finite() || exec.jitter_max < exec.jitter_min {
            return Err(ConfigError::invalid(
                "execution.jitter_max",
                format!("must be >= jitter_min ({}), got {}", exec.jitter_min, exec.jitter_max),
            ));
        }

        self.validate_heuristic()?;
        self.validate_learned()?;
        self.validate_workload()
    }

    fn validate_heuristic(&self) -> ConfigResult<()> {
        let h = &self.heuristic;
        if !(0.0..=100.0).contains(&h.target_load) {
            return Err(ConfigError::invalid(
                "heuristic.target_load",
                format!("must be within 0..=100, got {}", h.target_load),
            ));
        }
        let weights = [
            ("heuristic.cpu_balance", h.cpu_balance),
            ("heuristic.memory_balance", h.memory_balance),
            ("heuristic.efficiency", h.efficiency),
            ("heuristic.queue_length", h.queue_length),
            ("heuristic.resource_match", h.resource_match),
        ];
        for (field, w) in weights {
            if !(w.is_finite() && w >= 0.0) {
                return Err(ConfigError::invalid(field, format!("must be >= 0, got {w}")));
            }
        }
        Ok(())
    }

    fn validate_learned(&self) -> ConfigResult<()> {
        let l = &self.learned;
        if l.replay_capacity == 0 {
            return Err(ConfigError::invalid("learned.replay_capacity", "must be at least 1"));
        }
        if l.batch_size == 0 || l.batch_size > l.replay_capacity {
            return Err(ConfigError::invalid(
                "learned.batch_size",
                format!(
                    "must be within 1..={}, got {}",
                    l.replay_capacity, l.batch_size
                ),
            ));
        }
        if !(0.0..=1.0).contains(&l.gamma) {
            return Err(ConfigError::invalid(
                "learned.gamma",
                format!("must be within 0..=1, got {}", l.gamma),
            ));
        }
        for (field, lr) in [
            ("learned.actor_learning_rate", l.actor_learning_rate),
            ("learned.critic_learning_rate", l.critic_learning_rate),
        ] {
            if !(lr.is_finite() && lr > 0.0) {
                return Err(ConfigError::invalid(field, format!("must be positive, got {lr}")));
            }
        }
        Ok(())
    }

    fn validate_workload(&self) -> ConfigResult<()> {
        let w = &self.workload;
        for (field, [lo, hi]) in [
            ("workload.cpu_demand", w.cpu_demand),
            ("workload.memory_demand", w.memory_demand),
        ] {
            if !(lo.is_finite() && hi.is_finite() && 0.0 <= lo && lo <= hi && hi <= 100.0) {
                return Err(ConfigError::invalid(
                    field,
                    format!("expected 0 <= min <= max <= 100, got [{lo}, {hi}]"),
                ));
            }
            if lo.ceil() > hi.floor() {
                return Err(ConfigError::invalid(
                    field,
                    format!("range [{lo}, {hi}] contains no whole number"),
                ));
            }
        }
        let [lo, hi] = w.duration;
        if lo == 0 || lo > hi {
            return Err(ConfigError::invalid(
                "workload.duration",
                format!("expected 1 <= min <= max, got [{lo}, {hi}]"),
            ));
        }
        Ok(())
    }

    /// Scaffold a starting config for the given policy.
    pub fn scaffold(policy: PolicyKind) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }
}

/// Check an explicit machine set: non-empty with positive capacities.
pub fn validate_machine_specs(specs: &[MachineSpec]) -> ConfigResult<()> {
    if specs.is_empty() {
        return Err(ConfigError::NoMachines);
    }
    for (machine, spec) in specs.iter().enumerate() {
        let ok = |c: f64| c.is_finite() && c > 0.0;
        if !ok(spec.cpu_capacity) || !ok(spec.memory_capacity) {
            return Err(ConfigError::InvalidCapacity {
                machine,
                cpu: spec.cpu_capacity,
                memory: spec.memory_capacity,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        SimConfig::default().validate().unwrap();
    }

    #[test]
    fn parse_minimal() {
        let config = SimConfig::from_toml_str(
            r#"
seed = 7
policy = "heuristic"

[machines]
count = 3
"#,
        )
        .unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.policy, PolicyKind::Heuristic);
        assert_eq!(config.machine_count(), 3);
        assert_eq!(config.machines.cpu_capacity, 100.0);
        assert_eq!(config.learned.batch_size, 32);
    }

    #[test]
    fn scaffold_round_trips() {
        let config = SimConfig::scaffold(PolicyKind::Learned);
        let toml_str = config.to_toml_string().unwrap();
        assert!(toml_str.contains("learned"));

        let back = SimConfig::from_toml_str(&toml_str).unwrap();
        assert_eq!(back.policy, PolicyKind::Learned);
        assert_eq!(back.workload.duration, [30, 300]);
    }

    #[test]
    fn from_file_reads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gridsim.toml");
        std::fs::write(&path, "max_ticks = 50\n[encoder]\nmax_tracked_tasks = 4\n").unwrap();

        let config = SimConfig::from_file(&path).unwrap();
        assert_eq!(config.max_ticks, 50);
        assert_eq!(config.tracked_tasks(), 4);
    }

    #[test]
    fn zero_machines_rejected() {
        let mut config = SimConfig::default();
        config.machines.count = 0;
        assert!(matches!(config.validate(), Err(ConfigError::NoMachines)));
    }

    #[test]
    fn negative_capacity_rejected() {
        let mut config = SimConfig::default();
        config.machines.cpu_capacity = -5.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidCapacity { .. })
        ));
    }

    #[test]
    fn zero_tracked_tasks_rejected() {
        let mut config = SimConfig::default();
        config.encoder.max_tracked_tasks = 0;
        assert!(matches!(config.validate(), Err(ConfigError::NoTrackedTasks)));
    }

    #[test]
    fn batch_larger_than_buffer_rejected() {
        let mut config = SimConfig::default();
        config.learned.replay_capacity = 16;
        config.learned.batch_size = 32;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("learned.batch_size"), "{err}");
    }

    #[test]
    fn inverted_jitter_rejected() {
        let mut config = SimConfig::default();
        config.execution.jitter_min = 1.2;
        config.execution.jitter_max = 1.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn demand_range_without_whole_number_rejected() {
        let mut config = SimConfig::default();
        config.workload.cpu_demand = [15.5, 15.7];
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("workload.cpu_demand"), "{err}");

        config.workload.cpu_demand = [15.5, 16.0];
        config.validate().unwrap();
    }

    #[test]
    fn gamma_out_of_range_rejected() {
        let mut config = SimConfig::default();
        config.learned.gamma = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn negative_weight_rejected() {
        let mut config = SimConfig::default();
        config.heuristic.queue_length = -1.0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("heuristic.queue_length"));
    }

    #[test]
    fn policy_kind_parses_aliases() {
        assert_eq!("FCFS".parse::<PolicyKind>(), Ok(PolicyKind::Fcfs));
        assert_eq!("drl".parse::<PolicyKind>(), Ok(PolicyKind::Learned));
        assert_eq!("balanced".parse::<PolicyKind>(), Ok(PolicyKind::Heuristic));
        assert!("random".parse::<PolicyKind>().is_err());
    }
}
