//! Experience replay buffer.
//!
//! A fixed-capacity FIFO: once full, every push evicts the oldest
//! transition. Sampling is uniform and without replacement.

use std::collections::VecDeque;

use rand::Rng;
use serde::{Deserialize, Serialize};

use gridsim_core::{ConfigError, ConfigResult};

/// One decision and what followed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub state: Vec<f64>,
    /// Index into the `M × K` action space.
    pub action: usize,
    pub reward: f64,
    pub next_state: Vec<f64>,
    pub done: bool,
}

#[derive(Debug, Clone)]
pub struct ReplayBuffer {
    capacity: usize,
    buffer: VecDeque<Transition>,
}

impl ReplayBuffer {
    pub fn new(capacity: usize) -> ConfigResult<Self> {
        if capacity == 0 {
            return Err(ConfigError::invalid("learned.replay_capacity", "must be at least 1"));
        }
        Ok(Self {
            capacity,
            buffer: VecDeque::with_capacity(capacity),
        })
    }

    /// Append a transition, evicting the oldest when full.
    pub fn push(&mut self, transition: Transition) {
        if self.buffer.len() == self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(transition);
    }

    /// Draw `batch_size` distinct transitions uniformly at random.
    ///
    /// Returns fewer when the buffer holds fewer.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R, batch_size: usize) -> Vec<&Transition> {
        let amount = batch_size.min(self.buffer.len());
        rand::seq::index::sample(rng, self.buffer.len(), amount)
            .into_iter()
            .filter_map(|i| self.buffer.get(i))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Transition> {
        self.buffer.iter()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn transition(n: usize) -> Transition {
        Transition {
            state: vec![n as f64],
            action: n,
            reward: -(n as f64),
            next_state: vec![n as f64 + 1.0],
            done: false,
        }
    }

    #[test]
    fn zero_capacity_rejected() {
        assert!(ReplayBuffer::new(0).is_err());
    }

    #[test]
    fn evicts_oldest_when_full() {
        let mut buf = ReplayBuffer::new(3).unwrap();
        for n in 1..=5 {
            buf.push(transition(n));
        }

        assert_eq!(buf.len(), 3);
        let actions: Vec<usize> = buf.iter().map(|t| t.action).collect();
        assert_eq!(actions, vec![3, 4, 5]);
    }

    #[test]
    fn capacity_plus_one_drops_first() {
        let mut buf = ReplayBuffer::new(4).unwrap();
        for n in 0..5 {
            buf.push(transition(n));
        }
        assert!(buf.iter().all(|t| t.action != 0));
    }

    #[test]
    fn sample_is_without_replacement() {
        let mut buf = ReplayBuffer::new(10).unwrap();
        for n in 0..10 {
            buf.push(transition(n));
        }
        let mut rng = StdRng::seed_from_u64(3);
        let batch = buf.sample(&mut rng, 10);
        let distinct: HashSet<usize> = batch.iter().map(|t| t.action).collect();
        assert_eq!(distinct.len(), 10);
    }

    #[test]
    fn sample_caps_at_buffer_len() {
        let mut buf = ReplayBuffer::new(10).unwrap();
        buf.push(transition(1));
        let mut rng = StdRng::seed_from_u64(3);
        assert_eq!(buf.sample(&mut rng, 4).len(), 1);
    }
}
