//! Configuration error types.

use thiserror::Error;

use crate::types::TaskId;

/// Invalid simulation parameters. Always fatal, raised at construction.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("at least one machine is required")]
    NoMachines,

    #[error("machine {machine}: capacity must be positive (cpu={cpu}, memory={memory})")]
    InvalidCapacity { machine: usize, cpu: f64, memory: f64 },

    #[error("max tracked tasks (K) must be at least 1")]
    NoTrackedTasks,

    #[error("invalid {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("invalid task {task_id}: {reason}")]
    InvalidTask { task_id: TaskId, reason: String },

    #[error("duplicate task id {0}")]
    DuplicateTask(TaskId),

    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

impl ConfigError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
