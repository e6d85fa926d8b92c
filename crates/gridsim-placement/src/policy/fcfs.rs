//! First-come-first-served placement.

use super::{Assignment, DecisionContext, SchedulingPolicy};

/// Places the head of the waiting queue on the lowest-id machine that
/// can take it. While the head does not fit anywhere, nothing behind it
/// is considered: the same head is retried on the next tick.
#[derive(Debug, Clone, Default)]
pub struct Fcfs;

impl Fcfs {
    pub fn new() -> Self {
        Self
    }
}

impl SchedulingPolicy for Fcfs {
    fn name(&self) -> &'static str {
        "fcfs"
    }

    fn select(&mut self, ctx: &DecisionContext<'_>) -> Option<Assignment> {
        let head = ctx.waiting.first()?;
        ctx.machines
            .iter()
            .find(|m| m.can_admit(head))
            .map(|m| Assignment {
                task_id: head.id,
                machine_id: m.id,
            })
    }

    fn assignments_per_tick(&self) -> Option<usize> {
        Some(1)
    }
}
