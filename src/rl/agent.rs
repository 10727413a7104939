//! # Value-Based Heater Controller
//!
//! Double-network Q-learning agent: an online approximator picks actions
//! and is fitted against Bellman targets computed from a periodically
//! synchronized target copy. The staleness of the target copy is
//! intentional; it keeps the regression target stable between syncs.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::environment::{StateVector, STATE_DIM};
use super::network::QNetwork;
use super::replay::{ReplayBuffer, Transition};
use crate::domain::HeaterAction;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub gamma: f64,
    pub epsilon_start: f64,
    pub epsilon_min: f64,
    pub epsilon_decay: f64,
    pub learning_rate: f64,
    pub hidden_units: usize,
    pub replay_capacity: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            gamma: 0.99,
            epsilon_start: 1.0,
            epsilon_min: 0.05,
            epsilon_decay: 0.995,
            learning_rate: 5e-4,
            hidden_units: 128,
            replay_capacity: 5000,
        }
    }
}

/// Serialized policy state: enough to resume training or run greedy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyCheckpoint {
    pub network: QNetwork,
    pub episodes_trained: u32,
    pub epsilon: f64,
}

pub struct DqnAgent {
    config: AgentConfig,
    online: QNetwork,
    target: QNetwork,
    memory: ReplayBuffer,
    epsilon: f64,
    rng: StdRng,
}

impl DqnAgent {
    pub fn new(config: AgentConfig, seed: Option<u64>) -> Self {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let sizes = [
            STATE_DIM,
            config.hidden_units,
            config.hidden_units,
            HeaterAction::COUNT,
        ];
        let online = QNetwork::new(&sizes, &mut rng);
        let mut target = QNetwork::new(&sizes, &mut rng);
        target.copy_weights_from(&online);

        let epsilon = config.epsilon_start;
        let memory = ReplayBuffer::new(config.replay_capacity);

        Self {
            config,
            online,
            target,
            memory,
            epsilon,
            rng,
        }
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn memory_len(&self) -> usize {
        self.memory.len()
    }

    pub fn online_network(&self) -> &QNetwork {
        &self.online
    }

    /// Epsilon-greedy action selection.
    pub fn act(&mut self, state: &StateVector) -> HeaterAction {
        if self.rng.gen::<f64>() <= self.epsilon {
            return HeaterAction::from_index(self.rng.gen_range(0..HeaterAction::COUNT));
        }
        self.greedy_action(state)
    }

    /// Pure exploitation; used for evaluation and live control.
    pub fn greedy_action(&self, state: &StateVector) -> HeaterAction {
        HeaterAction::from_index(self.online.argmax(state))
    }

    pub fn remember(&mut self, transition: Transition) {
        self.memory.push(transition);
    }

    /// One training step over a uniformly sampled minibatch.
    ///
    /// A defined no-op while the buffer holds fewer than `batch_size`
    /// transitions. Per sample the regression target equals the online
    /// prediction except at the taken action, which becomes
    /// `reward` (terminal) or `reward + gamma·max_a Q_target(next)`.
    /// Epsilon decays after each successful fit.
    pub fn replay(&mut self, batch_size: usize) {
        if self.memory.len() < batch_size {
            return;
        }

        let minibatch = self.memory.sample(batch_size, &mut self.rng);

        let mut inputs = Vec::with_capacity(batch_size);
        let mut targets = Vec::with_capacity(batch_size);

        for transition in minibatch {
            let mut target = self.online.predict(&transition.state);

            let value = if transition.done {
                transition.reward
            } else {
                transition.reward + self.config.gamma * self.target.max_value(&transition.next_state)
            };
            target[transition.action.index()] = value;

            inputs.push(transition.state.to_vec());
            targets.push(target);
        }

        self.online
            .fit_batch(&inputs, &targets, self.config.learning_rate);

        self.epsilon = (self.epsilon * self.config.epsilon_decay).max(self.config.epsilon_min);
    }

    /// Copy online parameters into the target approximator. Called on an
    /// episode cadence by the trainer, never per step.
    pub fn update_target(&mut self) {
        self.target.copy_weights_from(&self.online);
    }

    pub fn checkpoint(&self, episodes_trained: u32) -> PolicyCheckpoint {
        PolicyCheckpoint {
            network: self.online.clone(),
            episodes_trained,
            epsilon: self.epsilon,
        }
    }

    /// Restore a persisted policy: online and target parameters plus the
    /// exploration rate.
    pub fn restore(&mut self, checkpoint: &PolicyCheckpoint) {
        self.online.copy_weights_from(&checkpoint.network);
        self.target.copy_weights_from(&checkpoint.network);
        self.epsilon = checkpoint.epsilon;
    }
}
