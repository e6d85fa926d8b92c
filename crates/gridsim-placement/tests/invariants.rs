//! Property tests for pool bookkeeping and encoder shape.

use gridsim_core::{ExecutionConfig, MachineSpec, Task};
use gridsim_placement::{ExecutionSampler, ResourcePool, StateEncoder};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Assign { machine: usize, cpu: u8, mem: u8, duration: u8 },
    Advance(u8),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..4, 0u8..=100, 0u8..=100, 1u8..=30).prop_map(|(machine, cpu, mem, duration)| {
            Op::Assign {
                machine,
                cpu,
                mem,
                duration,
            }
        }),
        (0u8..10).prop_map(Op::Advance),
    ]
}

fn check_usage(pool: &ResourcePool) -> Result<(), TestCaseError> {
    for m in pool.machines() {
        let (cpu, mem) = pool
            .running_tasks()
            .filter(|t| t.assigned_machine == Some(m.id))
            .fold((0.0, 0.0), |(c, r), t| (c + t.cpu_demand, r + t.memory_demand));
        prop_assert!((m.cpu_usage - cpu).abs() < 1e-9, "cpu {} != {}", m.cpu_usage, cpu);
        prop_assert!((m.memory_usage - mem).abs() < 1e-9, "mem {} != {}", m.memory_usage, mem);
        prop_assert!(m.cpu_usage <= m.cpu_capacity + 1e-9);
        prop_assert!(m.memory_usage <= m.memory_capacity + 1e-9);

        let ids: Vec<u64> = pool
            .running_tasks()
            .filter(|t| t.assigned_machine == Some(m.id))
            .map(|t| t.id)
            .collect();
        prop_assert_eq!(ids, m.running_tasks.iter().copied().collect::<Vec<_>>());
    }
    Ok(())
}

proptest! {
    #[test]
    fn usage_equals_sum_of_running_demands(ops in proptest::collection::vec(op(), 1..200), seed in any::<u64>()) {
        let specs = vec![MachineSpec::default(); 4];
        let mut pool = ResourcePool::new(&specs, ExecutionSampler::new(seed, &ExecutionConfig::default())).unwrap();
        let mut now = 0u64;
        let mut next_id = 0u64;

        for op in ops {
            match op {
                Op::Assign { machine, cpu, mem, duration } => {
                    let task = Task::new(next_id, now, f64::from(cpu), f64::from(mem), f64::from(duration));
                    next_id += 1;
                    if pool.can_admit(machine, &task) {
                        pool.assign(machine, task, now).unwrap();
                    } else {
                        prop_assert!(pool.assign(machine, task, now).is_err());
                    }
                }
                Op::Advance(ticks) => {
                    now += u64::from(ticks);
                    for t in pool.release_all(now) {
                        let done = t.completion_time.unwrap();
                        prop_assert!(done <= now as f64);
                        prop_assert!(done > t.arrival_time as f64);
                        prop_assert!(t.execution_time.unwrap() > 0.0);
                    }
                }
            }
            check_usage(&pool)?;
        }
    }

    #[test]
    fn encoded_length_is_constant(machines in 1usize..6, k in 1usize..8, queue in 0usize..20) {
        let enc = StateEncoder::new(machines, k).unwrap();
        let pool = ResourcePool::new(&vec![MachineSpec::default(); machines], ExecutionSampler::exact()).unwrap();
        let waiting: Vec<Task> = (0..queue as u64).map(|i| Task::new(i, i, 10.0, 10.0, 60.0)).collect();

        let state = enc.encode(pool.machines(), &waiting);
        prop_assert_eq!(state.len(), 2 * machines + 3 * k);
        prop_assert!(state.iter().all(|v| (0.0..=1.0).contains(v)));
    }
}
