//! Bounded FIFO experience store sampled uniformly during training.

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::environment::StateVector;
use crate::domain::HeaterAction;

/// One environment interaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transition {
    pub state: StateVector,
    pub action: HeaterAction,
    pub reward: f64,
    pub next_state: StateVector,
    pub done: bool,
}

/// FIFO replay memory; oldest transitions are evicted once `capacity` is
/// reached.
pub struct ReplayBuffer {
    buffer: VecDeque<Transition>,
    capacity: usize,
}

impl ReplayBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, transition: Transition) {
        if self.buffer.len() == self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(transition);
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Uniform sample of `amount` distinct transitions. Panics if the
    /// buffer holds fewer; callers gate on `len()` first.
    pub fn sample(&self, amount: usize, rng: &mut StdRng) -> Vec<&Transition> {
        rand::seq::index::sample(rng, self.buffer.len(), amount)
            .into_iter()
            .map(|i| &self.buffer[i])
            .collect()
    }
}
