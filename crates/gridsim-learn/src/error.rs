//! Training error types.

use thiserror::Error;

/// A training step that could not run. Never fatal to a simulation:
/// the caller logs it and carries on without updating.
#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("replay buffer holds {available} transitions, batch needs {required}")]
    InsufficientSamples { available: usize, required: usize },

    #[error("transition shape mismatch: expected state length {expected}, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },

    #[error("non-finite {quantity} during training step")]
    NonFinite { quantity: &'static str },
}

pub type TrainingResult<T> = Result<T, TrainingError>;
