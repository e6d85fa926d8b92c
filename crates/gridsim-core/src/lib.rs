//! gridsim-core — shared types and configuration for GridSim.
//!
//! Holds the data model every other crate builds on: tasks, machines,
//! and the `SimConfig` document that parameterizes a run.

pub mod config;
pub mod error;
pub mod types;

pub use config::{
    ActorInit, EncoderConfig, ExecutionConfig, HeuristicConfig, LearnedConfig, MachinesConfig,
    NonAdmittableAction, PolicyKind, SimConfig, WorkloadConfig, validate_machine_specs,
};
pub use error::{ConfigError, ConfigResult};
pub use types::*;
