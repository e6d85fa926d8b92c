//! Balanced heuristic placement.

use tracing::trace;

use gridsim_core::HeuristicConfig;

use super::{Assignment, DecisionContext, SchedulingPolicy};
use crate::scorer::{ScoringWeights, rank_pairs};

/// Picks the minimum-score admissible pair across the whole waiting
/// queue and every machine.
#[derive(Debug, Clone, Default)]
pub struct HeuristicBalanced {
    weights: ScoringWeights,
}

impl HeuristicBalanced {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    pub fn from_config(config: &HeuristicConfig) -> Self {
        Self::new(ScoringWeights::from(config))
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }
}

impl SchedulingPolicy for HeuristicBalanced {
    fn name(&self) -> &'static str {
        "heuristic"
    }

    fn select(&mut self, ctx: &DecisionContext<'_>) -> Option<Assignment> {
        let best = rank_pairs(ctx.machines, ctx.waiting, &self.weights)
            .into_iter()
            .next()?;
        trace!(
            task = best.task_id,
            machine = best.machine_id,
            score = best.score,
            "heuristic pick"
        );
        Some(Assignment {
            task_id: best.task_id,
            machine_id: best.machine_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridsim_core::{Machine, Task};

    fn loaded(id: usize, load: f64, running: u64) -> Machine {
        let mut m = Machine::new(id, 100.0, 100.0);
        m.cpu_usage = load;
        m.memory_usage = load;
        m.running_tasks.insert(running);
        m
    }

    #[test]
    fn prefers_machine_closer_to_target_load() {
        let machines = [loaded(0, 40.0, 100), loaded(1, 90.0, 101)];
        let waiting = [Task::new(1, 0, 5.0, 5.0, 10.0)];
        let mut policy = HeuristicBalanced::from_config(&HeuristicConfig {
            target_load: 70.0,
            ..HeuristicConfig::default()
        });

        let pick = policy
            .select(&DecisionContext {
                state: &[],
                machines: &machines,
                waiting: &waiting,
                now: 0,
            })
            .unwrap();
        assert_eq!(pick.machine_id, 1);
    }

    #[test]
    fn considers_tasks_behind_a_blocked_head() {
        let machines = [loaded(0, 50.0, 100)];
        let waiting = [
            Task::new(1, 0, 60.0, 10.0, 10.0),
            Task::new(2, 0, 10.0, 10.0, 10.0),
        ];
        let pick = HeuristicBalanced::default()
            .select(&DecisionContext {
                state: &[],
                machines: &machines,
                waiting: &waiting,
                now: 0,
            })
            .unwrap();
        assert_eq!(pick.task_id, 2);
    }

    #[test]
    fn no_admissible_pair_is_noop() {
        let machines = [loaded(0, 95.0, 100)];
        let waiting = [Task::new(1, 0, 10.0, 10.0, 10.0)];
        let pick = HeuristicBalanced::default().select(&DecisionContext {
            state: &[],
            machines: &machines,
            waiting: &waiting,
            now: 0,
        });
        assert!(pick.is_none());
    }
}
