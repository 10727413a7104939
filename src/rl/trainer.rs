//! Episode loop for the value-based controller.
//!
//! Trains [`DqnAgent`] against [`BoilerEnvironment`], tracking the best
//! cumulative reward, persisting resumable checkpoints on a fixed cadence
//! and stopping early once a patience window passes without improvement.

use anyhow::{Context, Result};
use rand::Rng;
use tracing::{info, warn};

use super::agent::{DqnAgent, PolicyCheckpoint};
use super::environment::BoilerEnvironment;
use super::replay::Transition;
use crate::storage::CheckpointStore;

#[derive(Debug, Clone)]
pub struct TrainingConfig {
    pub episodes: u32,
    /// Steps per episode (hours of simulated time).
    pub episode_length: usize,
    pub batch_size: usize,
    /// Replay every this many steps.
    pub replay_interval: usize,
    /// Sync the target network every this many episodes.
    pub target_sync_interval: u32,
    /// Persist a checkpoint every this many episodes.
    pub checkpoint_interval: u32,
    /// Episodes without a new best reward before stopping early.
    pub patience: u32,
    pub model_name: String,
    /// Episode targets are drawn uniformly from this range (°C).
    pub target_temp_range: (f64, f64),
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            episodes: 300,
            episode_length: 24 * 3,
            batch_size: 32,
            replay_interval: 10,
            target_sync_interval: 5,
            checkpoint_interval: 10,
            patience: 30,
            model_name: "dql_boiler".to_string(),
            target_temp_range: (60.0, 70.0),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TrainingSummary {
    pub episodes_run: u32,
    pub best_reward: f64,
    pub stopped_early: bool,
    pub rewards_per_episode: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct EvaluationSummary {
    pub episodes: u32,
    pub mean_reward: f64,
    pub best_reward: f64,
}

pub struct Trainer<'a> {
    env: BoilerEnvironment,
    agent: DqnAgent,
    store: &'a dyn CheckpointStore,
    config: TrainingConfig,
}

impl<'a> Trainer<'a> {
    pub fn new(
        env: BoilerEnvironment,
        agent: DqnAgent,
        store: &'a dyn CheckpointStore,
        config: TrainingConfig,
    ) -> Self {
        Self {
            env,
            agent,
            store,
            config,
        }
    }

    /// Load a previous checkpoint for this model, if one exists.
    ///
    /// A corrupt or unreadable checkpoint is a fatal error; training must
    /// not silently restart from scratch on damaged state.
    pub fn resume(&mut self) -> Result<u32> {
        let blob = self
            .store
            .load(&self.config.model_name)
            .with_context(|| format!("loading checkpoint '{}'", self.config.model_name))?;

        let Some(blob) = blob else {
            info!(model = %self.config.model_name, "no checkpoint found, starting fresh");
            return Ok(0);
        };

        let checkpoint: PolicyCheckpoint = bincode::deserialize(&blob)
            .with_context(|| format!("corrupt checkpoint '{}'", self.config.model_name))?;

        self.agent.restore(&checkpoint);
        info!(
            model = %self.config.model_name,
            episodes = checkpoint.episodes_trained,
            epsilon = checkpoint.epsilon,
            "resumed from checkpoint"
        );
        Ok(checkpoint.episodes_trained)
    }

    /// Run the training loop from `start_episode` up to the configured
    /// episode count, or until early stopping triggers.
    pub fn run(&mut self, start_episode: u32, rng: &mut rand::rngs::StdRng) -> Result<TrainingSummary> {
        if start_episode >= self.config.episodes {
            info!(
                start_episode,
                episodes = self.config.episodes,
                "checkpoint already covers the configured episode count"
            );
            return Ok(TrainingSummary {
                episodes_run: 0,
                best_reward: f64::NEG_INFINITY,
                stopped_early: false,
                rewards_per_episode: Vec::new(),
            });
        }

        let mut best_reward = f64::NEG_INFINITY;
        let mut no_improvement = 0u32;
        let mut rewards = Vec::new();
        let mut stopped_early = false;
        let mut last_episode = start_episode;

        for episode in start_episode..self.config.episodes {
            last_episode = episode;

            let (lo, hi) = self.config.target_temp_range;
            let target_temp = rng.gen_range(lo..hi).round();
            let mut state = self.env.reset(Some(target_temp));
            let mut episode_reward = 0.0;

            for step in 0..self.config.episode_length {
                let action = self.agent.act(&state);
                let (next_state, reward, done) = self.env.step(action);

                self.agent.remember(Transition {
                    state,
                    action,
                    reward,
                    next_state,
                    done,
                });

                state = next_state;
                episode_reward += reward;

                if step % self.config.replay_interval == 0 {
                    self.agent.replay(self.config.batch_size);
                }

                if done {
                    break;
                }
            }

            if episode % self.config.target_sync_interval == 0 {
                self.agent.update_target();
            }

            rewards.push(episode_reward);

            if (episode + 1) % self.config.checkpoint_interval == 0 {
                self.persist(episode + 1)?;
            }

            if episode_reward > best_reward {
                best_reward = episode_reward;
                no_improvement = 0;
                info!(episode = episode + 1, reward = episode_reward, "new best reward");
            } else {
                no_improvement += 1;
            }

            if no_improvement >= self.config.patience {
                warn!(
                    episode = episode + 1,
                    patience = self.config.patience,
                    "early stopping: no improvement"
                );
                stopped_early = true;
                break;
            }

            if (episode + 1) % 5 == 0 {
                info!(
                    episode = episode + 1,
                    total = self.config.episodes,
                    reward = episode_reward,
                    epsilon = self.agent.epsilon(),
                    "training progress"
                );
            }
        }

        let episodes_run = last_episode + 1 - start_episode;
        self.persist(last_episode + 1)?;

        Ok(TrainingSummary {
            episodes_run,
            best_reward,
            stopped_early,
            rewards_per_episode: rewards,
        })
    }

    /// Greedy rollout of the current policy: epsilon is ignored and the
    /// online approximator picks every action.
    pub fn evaluate(&mut self, episodes: u32, target_temp: f64) -> EvaluationSummary {
        let mut total = 0.0;
        let mut best = f64::NEG_INFINITY;

        for _ in 0..episodes {
            let mut state = self.env.reset(Some(target_temp));
            let mut episode_reward = 0.0;

            for _ in 0..self.config.episode_length {
                let action = self.agent.greedy_action(&state);
                let (next_state, reward, done) = self.env.step(action);
                state = next_state;
                episode_reward += reward;
                if done {
                    break;
                }
            }

            total += episode_reward;
            best = best.max(episode_reward);
        }

        EvaluationSummary {
            episodes,
            mean_reward: total / episodes.max(1) as f64,
            best_reward: best,
        }
    }

    fn persist(&self, episodes_trained: u32) -> Result<()> {
        let checkpoint = self.agent.checkpoint(episodes_trained);
        let blob = bincode::serialize(&checkpoint).context("encoding checkpoint")?;
        self.store.save(&self.config.model_name, &blob)?;
        Ok(())
    }

    pub fn agent(&self) -> &DqnAgent {
        &self.agent
    }
}
