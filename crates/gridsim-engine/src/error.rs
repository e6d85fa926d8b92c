//! Simulation error types.

use thiserror::Error;

use gridsim_core::{ConfigError, TaskId};
use gridsim_metrics::MetricsSnapshot;
use gridsim_placement::PoolError;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("resource pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("task {task_id} fits no machine (waited {waited} ticks, at tick {tick})")]
    NonAdmittable { task_id: TaskId, waited: u64, tick: u64 },

    #[error("run did not finish within {max_ticks} ticks")]
    ExhaustedTicks {
        max_ticks: u64,
        partial: Box<MetricsSnapshot>,
    },

    #[error("run cancelled at tick {tick}")]
    Cancelled {
        tick: u64,
        partial: Box<MetricsSnapshot>,
    },

    #[error("failed to read trace: {0}")]
    TraceIo(#[from] std::io::Error),

    #[error("failed to parse trace: {0}")]
    TraceParse(#[from] serde_json::Error),
}

impl SimError {
    /// Metrics gathered before the run stopped, if it stopped early.
    pub fn partial(&self) -> Option<&MetricsSnapshot> {
        match self {
            Self::ExhaustedTicks { partial, .. } | Self::Cancelled { partial, .. } => Some(partial),
            _ => None,
        }
    }
}

pub type SimResult<T> = Result<T, SimError>;
