//! Pair scoring for balanced placement.
//!
//! Evaluates every admissible (task, machine) pair with a weighted sum
//! of penalties. Lower is better:
//!
//! ```text
//! score = w1·|cpu_usage − target| + w2·|mem_usage − target|
//!       + w3·duration / (cpu_demand + mem_demand)
//!       + w4·running_tasks(machine)
//!       + w5·|cpu_demand − mem_demand|
//! ```
//!
//! Usage is expressed in percent of the machine's capacity so the target
//! load means the same thing on machines of different sizes.

use gridsim_core::{HeuristicConfig, Machine, MachineId, Task, TaskId};

/// Weights w1..w5 and the preferred utilization.
#[derive(Debug, Clone)]
pub struct ScoringWeights {
    pub target_load: f64,
    pub cpu_balance: f64,
    pub memory_balance: f64,
    pub efficiency: f64,
    pub queue_length: f64,
    pub resource_match: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self::from(&HeuristicConfig::default())
    }
}

impl From<&HeuristicConfig> for ScoringWeights {
    fn from(config: &HeuristicConfig) -> Self {
        Self {
            target_load: config.target_load,
            cpu_balance: config.cpu_balance,
            memory_balance: config.memory_balance,
            efficiency: config.efficiency,
            queue_length: config.queue_length,
            resource_match: config.resource_match,
        }
    }
}

/// Scored candidate pair.
#[derive(Debug, Clone)]
pub struct PairScore {
    pub task_id: TaskId,
    pub machine_id: MachineId,
    /// Composite penalty (lower = better).
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

/// Unweighted score components, for debugging.
#[derive(Debug, Clone)]
pub struct ScoreBreakdown {
    pub cpu_balance: f64,
    pub memory_balance: f64,
    pub efficiency: f64,
    pub queue_length: f64,
    pub resource_match: f64,
}

/// Score one pair, or `None` if the machine cannot take the task now.
pub fn score_pair(machine: &Machine, task: &Task, weights: &ScoringWeights) -> Option<PairScore> {
    if !machine.can_admit(task) {
        return None;
    }

    let cpu_balance = (machine.cpu_utilization() * 100.0 - weights.target_load).abs();
    let memory_balance = (machine.memory_utilization() * 100.0 - weights.target_load).abs();
    // Zero-demand tasks would divide by zero; treat their demand as one unit.
    let efficiency = task.estimated_duration / (task.cpu_demand + task.memory_demand).max(1.0);
    let queue_length = machine.queue_length() as f64;
    let resource_match = (task.cpu_demand - task.memory_demand).abs();

    let score = weights.cpu_balance * cpu_balance
        + weights.memory_balance * memory_balance
        + weights.efficiency * efficiency
        + weights.queue_length * queue_length
        + weights.resource_match * resource_match;

    Some(PairScore {
        task_id: task.id,
        machine_id: machine.id,
        score,
        breakdown: ScoreBreakdown {
            cpu_balance,
            memory_balance,
            efficiency,
            queue_length,
            resource_match,
        },
    })
}

/// Score all admissible pairs and return them best first.
///
/// Ties keep waiting-queue order, then machine id order.
pub fn rank_pairs(machines: &[Machine], waiting: &[Task], weights: &ScoringWeights) -> Vec<PairScore> {
    let mut scores: Vec<PairScore> = waiting
        .iter()
        .flat_map(|task| machines.iter().filter_map(move |m| score_pair(m, task, weights)))
        .collect();

    // Stable sort preserves queue/machine order among equal scores.
    scores.sort_by(|a, b| a.score.partial_cmp(&b.score).unwrap_or(std::cmp::Ordering::Equal));
    scores
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_machine(id: usize, cpu: f64, mem: f64, running: u64) -> Machine {
        let mut m = Machine::new(id, 100.0, 100.0);
        m.cpu_usage = cpu;
        m.memory_usage = mem;
        m.running_tasks.extend(0..running);
        m
    }

    fn only(weights: impl FnOnce(&mut ScoringWeights)) -> ScoringWeights {
        let mut w = ScoringWeights {
            target_load: 70.0,
            cpu_balance: 0.0,
            memory_balance: 0.0,
            efficiency: 0.0,
            queue_length: 0.0,
            resource_match: 0.0,
        };
        weights(&mut w);
        w
    }

    #[test]
    fn rejects_machine_without_room() {
        let m = make_machine(0, 95.0, 10.0, 1);
        let t = Task::new(1, 0, 10.0, 10.0, 10.0);
        assert!(score_pair(&m, &t, &ScoringWeights::default()).is_none());
    }

    #[test]
    fn balance_prefers_machine_near_target() {
        let low = make_machine(0, 40.0, 40.0, 1);
        let high = make_machine(1, 90.0, 90.0, 1);
        let t = Task::new(1, 0, 5.0, 5.0, 10.0);
        let w = only(|w| {
            w.cpu_balance = 1.0;
            w.memory_balance = 1.0;
        });

        let s_low = score_pair(&low, &t, &w).unwrap();
        let s_high = score_pair(&high, &t, &w).unwrap();
        assert!((s_low.score - 60.0).abs() < 1e-9);
        assert!((s_high.score - 40.0).abs() < 1e-9);
    }

    #[test]
    fn queue_length_penalizes_busy_machines() {
        let busy = make_machine(0, 10.0, 10.0, 3);
        let idle = make_machine(1, 10.0, 10.0, 0);
        let t = Task::new(1, 0, 5.0, 5.0, 10.0);
        let w = only(|w| w.queue_length = 8.0);

        assert_eq!(score_pair(&busy, &t, &w).unwrap().score, 24.0);
        assert_eq!(score_pair(&idle, &t, &w).unwrap().score, 0.0);
    }

    #[test]
    fn efficiency_handles_zero_demand() {
        let m = make_machine(0, 0.0, 0.0, 0);
        let t = Task::new(1, 0, 0.0, 0.0, 12.0);
        let s = score_pair(&m, &t, &only(|w| w.efficiency = 1.0)).unwrap();
        assert_eq!(s.breakdown.efficiency, 12.0);
    }

    #[test]
    fn rank_pairs_returns_sorted_and_stable() {
        let machines = vec![make_machine(0, 0.0, 0.0, 0), make_machine(1, 0.0, 0.0, 0)];
        let waiting = vec![
            Task::new(1, 0, 10.0, 30.0, 10.0), // Imbalanced demand.
            Task::new(2, 0, 20.0, 20.0, 10.0),
        ];
        let ranked = rank_pairs(&machines, &waiting, &only(|w| w.resource_match = 1.0));

        assert_eq!(ranked.len(), 4);
        assert_eq!((ranked[0].task_id, ranked[0].machine_id), (2, 0));
        assert_eq!((ranked[1].task_id, ranked[1].machine_id), (2, 1));
        assert!(ranked.windows(2).all(|p| p[0].score <= p[1].score));
    }
}
