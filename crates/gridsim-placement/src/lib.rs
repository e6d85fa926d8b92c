//! GridSim placement — deciding where waiting tasks run.
//!
//! This crate owns machine capacity bookkeeping and the placement
//! policies that do not learn. It does NOT drive the clock (that's
//! `gridsim-engine`) and it does NOT train anything (that's
//! `gridsim-learn`).
//!
//! # Components
//!
//! - **`pool`** — Resource pool (admit, assign, release)
//! - **`encoder`** — Fixed-length observation of machines and the waiting queue
//! - **`scorer`** — Pair scoring for the balanced heuristic
//! - **`policy`** — `SchedulingPolicy` contract, FCFS and HeuristicBalanced

pub mod encoder;
pub mod error;
pub mod policy;
pub mod pool;
pub mod scorer;

pub use encoder::StateEncoder;
pub use error::{PoolError, PoolResult};
pub use policy::{
    Assignment, DecisionContext, Fcfs, HeuristicBalanced, SchedulingPolicy, TickFeedback, TrainingStats,
};
pub use pool::{ExecutionSampler, ResourcePool};
pub use scorer::{PairScore, ScoreBreakdown, ScoringWeights, rank_pairs, score_pair};
