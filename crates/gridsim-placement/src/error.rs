//! Resource pool error types.

use thiserror::Error;

use gridsim_core::{MachineId, TaskId};

/// Bookkeeping violations. These indicate a caller bug, not a workload
/// condition: callers are expected to check `can_admit` first.
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("unknown machine: {0}")]
    UnknownMachine(MachineId),

    #[error("task {task_id} does not fit on machine {machine}")]
    Inadmissible { task_id: TaskId, machine: MachineId },

    #[error("task {0} is already assigned")]
    AlreadyAssigned(TaskId),
}

pub type PoolResult<T> = Result<T, PoolError>;
