//! Property tests over whole runs.

use gridsim_core::{PolicyKind, SimConfig, Task};
use gridsim_engine::{SimPhase, Simulator};
use proptest::prelude::*;

fn tasks() -> impl Strategy<Value = Vec<Task>> {
    proptest::collection::vec((0u64..40, 1u8..=100, 1u8..=100, 1u8..=25), 1..30).prop_map(|specs| {
        specs
            .into_iter()
            .enumerate()
            .map(|(i, (arrival, cpu, mem, duration))| {
                Task::new(i as u64, arrival, f64::from(cpu), f64::from(mem), f64::from(duration))
            })
            .collect()
    })
}

fn policy() -> impl Strategy<Value = PolicyKind> {
    prop_oneof![
        Just(PolicyKind::Fcfs),
        Just(PolicyKind::Heuristic),
        Just(PolicyKind::Learned),
    ]
}

fn config(policy: PolicyKind, machines: usize, seed: u64) -> SimConfig {
    let mut config = SimConfig::scaffold(policy);
    config.seed = seed;
    config.machines.count = machines;
    config.encoder.max_tracked_tasks = 5;
    config.learned.replay_capacity = 16;
    config.learned.batch_size = 4;
    config
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn usage_matches_running_tasks_every_tick(
        tasks in tasks(),
        policy in policy(),
        machines in 1usize..4,
        seed in any::<u64>(),
    ) {
        let mut sim = Simulator::new(&config(policy, machines, seed), tasks).unwrap();

        for _ in 0..400 {
            if sim.phase() == SimPhase::Done {
                break;
            }
            sim.step().unwrap();

            let pool = sim.pool();
            for m in pool.machines() {
                let running: Vec<&Task> = pool
                    .running_tasks()
                    .filter(|t| t.assigned_machine == Some(m.id))
                    .collect();
                let cpu: f64 = running.iter().map(|t| t.cpu_demand).sum();
                let mem: f64 = running.iter().map(|t| t.memory_demand).sum();
                prop_assert!((m.cpu_usage - cpu).abs() < 1e-9);
                prop_assert!((m.memory_usage - mem).abs() < 1e-9);
                prop_assert!(m.cpu_usage <= m.cpu_capacity + 1e-9);
                prop_assert_eq!(running.len(), m.running_tasks.len());
            }
        }

        for t in sim.collector().completed() {
            let exec = t.execution_time.unwrap();
            prop_assert!(exec > 0.0);
            prop_assert!(t.completion_time.unwrap() > t.arrival_time as f64);
        }
    }

    #[test]
    fn fcfs_assigns_in_arrival_order(
        tasks in tasks(),
        machines in 1usize..4,
        seed in any::<u64>(),
    ) {
        let mut expected: Vec<(u64, u64)> = tasks.iter().map(|t| (t.arrival_time, t.id)).collect();
        expected.sort();
        let expected: Vec<u64> = expected.into_iter().map(|(_, id)| id).collect();

        let mut sim = Simulator::new(&config(PolicyKind::Fcfs, machines, seed), tasks).unwrap();
        let mut order = Vec::new();
        while sim.phase() != SimPhase::Done {
            let tick = sim.step().unwrap();
            prop_assert!(tick.assigned.len() <= 1);
            order.extend(tick.assigned.iter().map(|a| a.task_id));
            prop_assert!(tick.tick < 5_000);
        }

        prop_assert_eq!(order, expected);
    }
}
