//! Learned placement policy.
//!
//! `select` evaluates the actor on the encoded state and takes the
//! highest-preference action. The action decodes to
//! `(machine_index, task_slot)` against the fixed K slots; if the slot is
//! empty or the pair does not fit, the decision is a no-op.

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, warn};

use gridsim_core::{ActorInit, ConfigResult, LearnedConfig};
use gridsim_placement::{
    Assignment, DecisionContext, SchedulingPolicy, StateEncoder, TickFeedback, TrainingStats,
};

use crate::approx::{FunctionApproximator, LinearModel, SoftmaxActor, argmax};
use crate::replay::Transition;
use crate::trainer::Trainer;

/// Actor/critic policy with optional online training.
pub struct LearnedPolicy<A = SoftmaxActor, C = LinearModel> {
    encoder: StateEncoder,
    actor: A,
    critic: C,
    /// `None` when the policy is frozen.
    trainer: Option<Trainer>,
    /// First decision of the current tick, awaiting its outcome. Ticks
    /// without a decision fall back to the tick's opening state.
    pending: Option<(Vec<f64>, usize)>,
}

impl LearnedPolicy {
    /// Build the default linear actor/critic pair for `encoder`'s shape.
    pub fn from_config(encoder: StateEncoder, config: &LearnedConfig, seed: u64) -> ConfigResult<Self> {
        let state_dim = encoder.state_dim();
        let action_dim = encoder.action_dim();
        let actor = match config.init {
            ActorInit::Prior => SoftmaxActor::prior(state_dim, action_dim),
            ActorInit::Random => {
                SoftmaxActor::random(state_dim, action_dim, &mut StdRng::seed_from_u64(seed))
            }
        };
        let critic = LinearModel::zeros(state_dim + action_dim, 1);
        let trainer = if config.training {
            Some(Trainer::new(config, seed.wrapping_add(1))?)
        } else {
            None
        };
        Ok(Self::with_models(encoder, actor, critic, trainer))
    }
}

impl<A: FunctionApproximator, C: FunctionApproximator> LearnedPolicy<A, C> {
    pub fn with_models(encoder: StateEncoder, actor: A, critic: C, trainer: Option<Trainer>) -> Self {
        Self {
            encoder,
            actor,
            critic,
            trainer,
            pending: None,
        }
    }

    pub fn actor(&self) -> &A {
        &self.actor
    }

    pub fn critic(&self) -> &C {
        &self.critic
    }

    pub fn trainer(&self) -> Option<&Trainer> {
        self.trainer.as_ref()
    }

    pub fn is_training(&self) -> bool {
        self.trainer.is_some()
    }

    /// Greedy action index for a state.
    pub fn best_action(&self, state: &[f64]) -> Option<usize> {
        argmax(&self.actor.predict(state))
    }
}

impl<A: FunctionApproximator, C: FunctionApproximator> SchedulingPolicy for LearnedPolicy<A, C> {
    fn name(&self) -> &'static str {
        "learned"
    }

    fn select(&mut self, ctx: &DecisionContext<'_>) -> Option<Assignment> {
        if ctx.state.len() != self.actor.input_dim() {
            warn!(
                expected = self.actor.input_dim(),
                actual = ctx.state.len(),
                "state length does not match actor input"
            );
            return None;
        }

        let action = self.best_action(ctx.state)?;
        if self.pending.is_none() {
            self.pending = Some((ctx.state.to_vec(), action));
        }

        let (machine_index, task_slot) = self.encoder.decode_action(action)?;
        let machine = ctx.machines.get(machine_index)?;
        let task = ctx.waiting.get(task_slot)?;
        if !machine.can_admit(task) {
            debug!(action, machine = machine.id, task = task.id, "learned pick not admissible");
            return None;
        }

        Some(Assignment {
            task_id: task.id,
            machine_id: machine.id,
        })
    }

    fn observe(&mut self, feedback: &TickFeedback<'_>) {
        let pending = self.pending.take();
        if self.trainer.is_none() {
            return;
        }
        let (state, action) = match pending {
            Some(decision) => decision,
            None => {
                if feedback.state.len() != self.actor.input_dim() {
                    return;
                }
                let Some(action) = self.best_action(feedback.state) else {
                    return;
                };
                (feedback.state.to_vec(), action)
            }
        };
        let Some(trainer) = self.trainer.as_mut() else {
            return;
        };
        trainer.remember(Transition {
            state,
            action,
            reward: feedback.reward,
            next_state: feedback.next_state.to_vec(),
            done: feedback.done,
        });
        trainer.maybe_train(&mut self.actor, &mut self.critic);
    }

    fn training_stats(&self) -> Option<TrainingStats> {
        self.trainer.as_ref().map(|t| TrainingStats {
            buffered: t.buffer().len(),
            recorded: t.recorded(),
            terminal: t.terminal(),
            steps: t.steps(),
        })
    }
}
