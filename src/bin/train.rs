//! Offline training entry point for the learned heater policy.
//!
//! Resumes from the latest checkpoint when one exists, trains against the
//! simulated boiler and finishes with a greedy evaluation pass.

use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use boiler_controller::config::Config;
use boiler_controller::rl::{
    synthetic_outside_temps, AgentConfig, BoilerEnvironment, DqnAgent, EnvironmentConfig, Trainer,
    TrainingConfig,
};
use boiler_controller::storage::FileCheckpointStore;
use boiler_controller::telemetry::init_tracing;

fn main() -> Result<()> {
    init_tracing();

    let cfg = Config::load()?;

    let mut rng = match cfg.training.random_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    // One simulated week of hourly outside temperatures per episode pool.
    let outside_temps = synthetic_outside_temps(&mut rng, 24 * 7);

    let env_config = EnvironmentConfig {
        capacity_liters: cfg.boiler.capacity_liters,
        power_kw: cfg
            .boiler
            .power_kw
            .unwrap_or_else(|| boiler_controller::domain::default_power_kw(cfg.boiler.capacity_liters)),
        has_solar: cfg.boiler.has_solar,
        num_users: cfg.demand.iter().map(|d| d.users).max().unwrap_or(2),
        target_temp: 65.0,
        random_seed: cfg.training.random_seed,
    };
    let env = BoilerEnvironment::new(env_config, outside_temps);

    let agent = DqnAgent::new(AgentConfig::default(), cfg.training.random_seed);

    let training_config = TrainingConfig {
        episodes: cfg.training.episodes,
        episode_length: cfg.training.episode_length,
        batch_size: cfg.training.batch_size,
        replay_interval: cfg.training.replay_interval,
        target_sync_interval: cfg.training.target_sync_interval,
        checkpoint_interval: cfg.training.checkpoint_interval,
        patience: cfg.training.patience,
        model_name: cfg.training.model_name.clone(),
        target_temp_range: (60.0, 70.0),
    };

    let store = FileCheckpointStore::new(&cfg.training.checkpoint_dir);
    let mut trainer = Trainer::new(env, agent, &store, training_config);

    let start_episode = trainer.resume()?;
    let summary = trainer.run(start_episode, &mut rng)?;

    info!(
        episodes = summary.episodes_run,
        best_reward = summary.best_reward,
        stopped_early = summary.stopped_early,
        "training finished"
    );

    let eval = trainer.evaluate(10, 65.0);
    info!(
        episodes = eval.episodes,
        mean_reward = eval.mean_reward,
        best_reward = eval.best_reward,
        "greedy evaluation"
    );

    Ok(())
}
