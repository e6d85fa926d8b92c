//! Trainer — periodic minibatch updates from the replay buffer.
//!
//! Each step:
//!
//! ```text
//! y      = r + γ · critic(s', actor(s')) · (1 − done)
//! critic ← critic − α_c · ∇ mean (critic(s, onehot(a)) − y)²
//! actor  ← actor  + α_a · ∇ mean critic(s, actor(s))
//! ```
//!
//! The same critic produces the targets it is trained toward; there is
//! no frozen target copy.

use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, warn};

use gridsim_core::{ConfigResult, LearnedConfig};

use crate::approx::FunctionApproximator;
use crate::error::{TrainingError, TrainingResult};
use crate::replay::{ReplayBuffer, Transition};

/// Summary of one completed training step.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainReport {
    pub step: u64,
    pub batch_size: usize,
    /// Mean squared TD error before the critic update.
    pub critic_loss: f64,
    /// Mean critic value of the actor's own output, before the actor update.
    pub mean_q: f64,
}

#[derive(Debug, Clone)]
pub struct Trainer {
    buffer: ReplayBuffer,
    batch_size: usize,
    gamma: f64,
    actor_learning_rate: f64,
    critic_learning_rate: f64,
    rng: StdRng,
    steps: u64,
    recorded: u64,
    terminal: u64,
}

impl Trainer {
    pub fn new(config: &LearnedConfig, seed: u64) -> ConfigResult<Self> {
        Ok(Self {
            buffer: ReplayBuffer::new(config.replay_capacity)?,
            batch_size: config.batch_size,
            gamma: config.gamma,
            actor_learning_rate: config.actor_learning_rate,
            critic_learning_rate: config.critic_learning_rate,
            rng: StdRng::seed_from_u64(seed),
            steps: 0,
            recorded: 0,
            terminal: 0,
        })
    }

    pub fn remember(&mut self, transition: Transition) {
        self.recorded += 1;
        if transition.done {
            self.terminal += 1;
        }
        self.buffer.push(transition);
    }

    pub fn buffer(&self) -> &ReplayBuffer {
        &self.buffer
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Transitions remembered so far, including any since evicted.
    pub fn recorded(&self) -> u64 {
        self.recorded
    }

    /// Remembered transitions that ended a run.
    pub fn terminal(&self) -> u64 {
        self.terminal
    }

    /// Train once if the buffer holds at least one batch.
    ///
    /// Failures are logged and swallowed: a missed update never stops a run.
    pub fn maybe_train<A, C>(&mut self, actor: &mut A, critic: &mut C) -> Option<TrainReport>
    where
        A: FunctionApproximator + ?Sized,
        C: FunctionApproximator + ?Sized,
    {
        if self.buffer.len() < self.batch_size {
            debug!(
                available = self.buffer.len(),
                required = self.batch_size,
                "not enough samples to train"
            );
            return None;
        }
        match self.train_step(actor, critic) {
            Ok(report) => {
                debug!(
                    step = report.step,
                    critic_loss = report.critic_loss,
                    mean_q = report.mean_q,
                    "training step"
                );
                Some(report)
            }
            Err(e) => {
                warn!(error = %e, "training step skipped");
                None
            }
        }
    }

    /// Run one minibatch update of the critic, then the actor.
    pub fn train_step<A, C>(&mut self, actor: &mut A, critic: &mut C) -> TrainingResult<TrainReport>
    where
        A: FunctionApproximator + ?Sized,
        C: FunctionApproximator + ?Sized,
    {
        if self.buffer.len() < self.batch_size {
            return Err(TrainingError::InsufficientSamples {
                available: self.buffer.len(),
                required: self.batch_size,
            });
        }

        let state_dim = actor.input_dim();
        let action_dim = actor.output_dim();
        let batch: Vec<Transition> = self
            .buffer
            .sample(&mut self.rng, self.batch_size)
            .into_iter()
            .cloned()
            .collect();

        for t in &batch {
            for len in [t.state.len(), t.next_state.len()] {
                if len != state_dim {
                    return Err(TrainingError::ShapeMismatch {
                        expected: state_dim,
                        actual: len,
                    });
                }
            }
        }

        // Critic: regress Q(s, a) toward the TD target.
        let mut critic_inputs = Vec::with_capacity(batch.len());
        let mut critic_grads = Vec::with_capacity(batch.len());
        let mut loss = 0.0;
        for t in &batch {
            let next_action = actor.predict(&t.next_state);
            let next_q = critic.predict(&concat(&t.next_state, &next_action))[0];
            let not_done = if t.done { 0.0 } else { 1.0 };
            let target = t.reward + self.gamma * next_q * not_done;

            let input = concat(&t.state, &one_hot(t.action, action_dim));
            let q = critic.predict(&input)[0];
            let err = q - target;
            loss += err * err;
            critic_inputs.push(input);
            critic_grads.push(vec![err]);
        }
        let critic_loss = loss / batch.len() as f64;
        if !critic_loss.is_finite() {
            return Err(TrainingError::NonFinite {
                quantity: "critic loss",
            });
        }
        critic.update(&critic_inputs, &critic_grads, self.critic_learning_rate);

        // Actor: ascend the critic's value of the actor's own output.
        let states: Vec<Vec<f64>> = batch.iter().map(|t| t.state.clone()).collect();
        let mut actor_grads = Vec::with_capacity(states.len());
        let mut total_q = 0.0;
        for s in &states {
            let probs = actor.predict(s);
            let input = concat(s, &probs);
            total_q += critic.predict(&input)[0];
            let dq = critic.input_gradient(&input, &[1.0]);
            // Minimizing -Q: negate the action part of dQ/d(input).
            actor_grads.push(dq[state_dim..].iter().map(|g| -g).collect());
        }
        let mean_q = total_q / states.len() as f64;
        if !mean_q.is_finite() {
            return Err(TrainingError::NonFinite { quantity: "critic value" });
        }
        actor.update(&states, &actor_grads, self.actor_learning_rate);

        self.steps += 1;
        Ok(TrainReport {
            step: self.steps,
            batch_size: batch.len(),
            critic_loss,
            mean_q,
        })
    }
}

fn concat(a: &[f64], b: &[f64]) -> Vec<f64> {
    let mut v = Vec::with_capacity(a.len() + b.len());
    v.extend_from_slice(a);
    v.extend_from_slice(b);
    v
}

fn one_hot(index: usize, len: usize) -> Vec<f64> {
    let mut v = vec![0.0; len];
    if let Some(slot) = v.get_mut(index) {
        *slot = 1.0;
    }
    v
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::approx::{LinearModel, SoftmaxActor};

    const STATE_DIM: usize = 3;
    const ACTIONS: usize = 2;

    fn config(capacity: usize, batch: usize) -> LearnedConfig {
        LearnedConfig {
            replay_capacity: capacity,
            batch_size: batch,
            gamma: 0.9,
            actor_learning_rate: 0.1,
            critic_learning_rate: 0.1,
            ..LearnedConfig::default()
        }
    }

    fn models() -> (SoftmaxActor, LinearModel) {
        (
            SoftmaxActor::prior(STATE_DIM, ACTIONS),
            LinearModel::zeros(STATE_DIM + ACTIONS, 1),
        )
    }

    fn transition(action: usize, reward: f64) -> Transition {
        Transition {
            state: vec![0.5, 0.2, 0.1],
            action,
            reward,
            next_state: vec![0.5, 0.2, 0.1],
            done: true,
        }
    }

    #[test]
    fn below_batch_size_is_noop() {
        let mut trainer = Trainer::new(&config(10, 4), 1).unwrap();
        let (mut actor, mut critic) = models();
        for _ in 0..3 {
            trainer.remember(transition(0, -1.0));
        }

        let before = actor.clone();
        assert!(trainer.maybe_train(&mut actor, &mut critic).is_none());
        assert_eq!(actor, before);
        assert_eq!(trainer.steps(), 0);
        assert!(matches!(
            trainer.train_step(&mut actor, &mut critic),
            Err(TrainingError::InsufficientSamples { available: 3, required: 4 })
        ));
    }

    #[test]
    fn counters_survive_eviction() {
        let mut trainer = Trainer::new(&config(2, 1), 1).unwrap();
        trainer.remember(transition(0, -1.0));
        trainer.remember(Transition {
            done: false,
            ..transition(1, -2.0)
        });
        trainer.remember(transition(0, -3.0));

        assert_eq!(trainer.buffer().len(), 2);
        assert_eq!(trainer.recorded(), 3);
        assert_eq!(trainer.terminal(), 2);
    }

    #[test]
    fn shape_mismatch_is_reported_not_applied() {
        let mut trainer = Trainer::new(&config(4, 1), 1).unwrap();
        let (mut actor, mut critic) = models();
        trainer.remember(Transition {
            state: vec![1.0],
            ..transition(0, 0.0)
        });
        assert!(trainer.maybe_train(&mut actor, &mut critic).is_none());
        assert!(matches!(
            trainer.train_step(&mut actor, &mut critic),
            Err(TrainingError::ShapeMismatch { expected: 3, actual: 1 })
        ));
    }

    #[test]
    fn critic_loss_decreases_on_terminal_rewards() {
        let mut trainer = Trainer::new(&config(8, 8), 5).unwrap();
        let (mut actor, mut critic) = models();
        for i in 0..8 {
            trainer.remember(transition(i % 2, if i % 2 == 0 { -4.0 } else { -1.0 }));
        }

        let first = trainer.train_step(&mut actor, &mut critic).unwrap();
        let mut last = first.clone();
        for _ in 0..50 {
            last = trainer.train_step(&mut actor, &mut critic).unwrap();
        }
        assert!(last.critic_loss < first.critic_loss);
        assert_eq!(last.step, 51);
    }

    #[test]
    fn actor_moves_toward_better_action() {
        let mut trainer = Trainer::new(&config(8, 8), 5).unwrap();
        let (mut actor, mut critic) = models();
        // Action 1 is far less costly than action 0.
        for i in 0..8 {
            trainer.remember(transition(i % 2, if i % 2 == 0 { -10.0 } else { 0.0 }));
        }
        let state = [0.5, 0.2, 0.1];
        assert!(actor.predict(&state)[0] > actor.predict(&state)[1]);

        for _ in 0..300 {
            trainer.train_step(&mut actor, &mut critic).unwrap();
        }
        let probs = actor.predict(&state);
        assert!(probs[1] > probs[0], "probs {probs:?}");
    }

    #[test]
    fn one_hot_ignores_out_of_range() {
        assert_eq!(one_hot(1, 3), vec![0.0, 1.0, 0.0]);
        assert_eq!(one_hot(5, 2), vec![0.0, 0.0]);
    }
}
