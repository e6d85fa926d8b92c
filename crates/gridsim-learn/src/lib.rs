//! GridSim learned placement.
//!
//! An actor maps the encoded state to a preference over the fixed
//! `M × K` action space; a critic scores (state, action) pairs. Both sit
//! behind the `FunctionApproximator` trait so the linear models shipped
//! here can be swapped for anything that can predict and take a gradient
//! step.
//!
//! # Components
//!
//! - **`approx`** — `FunctionApproximator`, `LinearModel`, `SoftmaxActor`
//! - **`replay`** — Bounded FIFO of transitions
//! - **`trainer`** — Minibatch TD update of critic, then actor
//! - **`reward`** — Weighted-turnaround reward
//! - **`policy`** — `LearnedPolicy`, the greedy `SchedulingPolicy`
//!
//! Action selection is always greedy: there is no exploration noise and
//! no target network.

pub mod approx;
pub mod error;
pub mod policy;
pub mod replay;
pub mod reward;
pub mod trainer;

pub use approx::{FunctionApproximator, LinearModel, SoftmaxActor};
pub use error::{TrainingError, TrainingResult};
pub use policy::LearnedPolicy;
pub use replay::{ReplayBuffer, Transition};
pub use reward::weighted_turnaround_reward;
pub use trainer::{TrainReport, Trainer};
