//! # Simulated Boiler Environment
//!
//! A self-contained discrete-time re-implementation of the boiler thermal
//! dynamics used only for training and evaluating a control policy. It is
//! deliberately decoupled from the production thermal model so episodes
//! can be randomized and replayed exactly under a seeded RNG.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::domain::HeaterAction;

/// Scalars in the observation vector.
pub const STATE_DIM: usize = 7;

pub type StateVector = [f64; STATE_DIM];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub capacity_liters: f64,
    pub power_kw: f64,
    pub has_solar: bool,
    pub num_users: u32,
    pub target_temp: f64,
    /// Fixed seed for reproducible episodes; `None` seeds from entropy.
    pub random_seed: Option<u64>,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            capacity_liters: 100.0,
            power_kw: 3.0,
            has_solar: true,
            num_users: 2,
            target_temp: 65.0,
            random_seed: None,
        }
    }
}

/// Discrete-time boiler simulator driven by an hourly outside-temperature
/// series. One `step` is one hour; the episode ends when the series is
/// exhausted.
pub struct BoilerEnvironment {
    config: EnvironmentConfig,
    outside_temps: Vec<f64>,
    target_temp: f64,
    boiler_temp: f64,
    hour: usize,
    rng: StdRng,
}

impl BoilerEnvironment {
    pub fn new(config: EnvironmentConfig, outside_temps: Vec<f64>) -> Self {
        let rng = match config.random_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let target_temp = config.target_temp;

        let mut env = Self {
            config,
            outside_temps,
            target_temp,
            boiler_temp: 25.0,
            hour: 0,
            rng,
        };
        env.reset(None);
        env
    }

    /// Start a new episode; optionally retarget it. The start temperature
    /// is re-drawn around 25°C.
    pub fn reset(&mut self, target_temp: Option<f64>) -> StateVector {
        if let Some(target) = target_temp {
            self.target_temp = target;
        }
        self.hour = 0;
        self.boiler_temp = 25.0 + self.rng.gen_range(-2.0..2.0);
        self.state()
    }

    pub fn episode_len(&self) -> usize {
        self.outside_temps.len()
    }

    pub fn target_temp(&self) -> f64 {
        self.target_temp
    }

    pub fn boiler_temp(&self) -> f64 {
        self.boiler_temp
    }

    /// Advance one hour. Returns (next state, reward, done).
    pub fn step(&mut self, action: HeaterAction) -> (StateVector, f64, bool) {
        let outside_temp = self.outside_temps[self.hour % self.outside_temps.len()];
        let hour_of_day = self.hour % 24;

        // Solar collector contribution during daylight.
        if self.config.has_solar && (8..=17).contains(&hour_of_day) {
            self.boiler_temp += 0.05 * (outside_temp - self.boiler_temp);
        }

        if action == HeaterAction::Heat {
            self.boiler_temp += self.config.power_kw * 0.5;
        }

        // Passive drift toward ambient.
        self.boiler_temp += 0.02 * (outside_temp - self.boiler_temp);

        // Morning and evening draw.
        if (6..=8).contains(&hour_of_day) || (18..=21).contains(&hour_of_day) {
            self.boiler_temp -= 0.3 * self.config.num_users as f64;
        }

        self.boiler_temp = self.boiler_temp.clamp(0.0, 100.0);

        let reward = self.reward_for(action);

        self.hour += 1;
        let done = self.hour >= self.outside_temps.len();

        (self.state(), reward, done)
    }

    /// Piecewise comfort/cost shaping around the target temperature.
    fn reward_for(&self, action: HeaterAction) -> f64 {
        let mut reward = 0.0;
        let diff = self.boiler_temp - self.target_temp;

        if diff < 0.0 {
            reward -= diff.abs() * 0.3;
        } else if diff <= 3.0 {
            reward += 2.0;
        } else if diff > 10.0 {
            reward -= 3.0;
        } else {
            reward -= 0.5;
        }

        if action == HeaterAction::Heat {
            reward -= 0.5;
        }

        // Evening peak: being hot enough matters most here.
        let hour_of_day = self.hour % 24;
        if (18..=21).contains(&hour_of_day) {
            if self.boiler_temp >= self.target_temp {
                reward += 3.0;
            } else {
                reward -= 1.0;
            }
        }

        reward
    }

    pub fn state(&self) -> StateVector {
        [
            self.boiler_temp,
            self.outside_temps[self.hour % self.outside_temps.len()],
            (self.hour % 24) as f64,
            if self.config.has_solar { 1.0 } else { 0.0 },
            self.config.num_users as f64,
            self.config.capacity_liters,
            self.target_temp,
        ]
    }
}

/// Hourly outside temperatures for training episodes, uniform in
/// [10, 30) like the recorded feeds the simulator stands in for.
pub fn synthetic_outside_temps(rng: &mut StdRng, hours: usize) -> Vec<f64> {
    (0..hours).map(|_| rng.gen_range(10.0..30.0)).collect()
}
