use anyhow::Result;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;

use crate::controller::service::DailyDemand;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub boiler: BoilerConfig,
    pub scheduler: SchedulerSection,
    pub forecast: ForecastConfig,
    pub service: ServiceConfig,
    pub training: TrainingSection,
    #[serde(default)]
    pub demand: Vec<DailyDemand>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BoilerConfig {
    pub name: String,
    pub capacity_liters: f64,
    pub has_solar: bool,
    /// Heater element rating; defaulted from the tank size when absent.
    pub power_kw: Option<f64>,
    pub initial_temperature: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerSection {
    pub cold_water_temp: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ForecastConfig {
    pub latitude: f64,
    pub longitude: f64,
    pub horizon_hours: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub tick_seconds: u64,
    pub ambient_temp_c: f64,
    pub history_path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TrainingSection {
    pub episodes: u32,
    pub episode_length: usize,
    pub batch_size: usize,
    pub replay_interval: usize,
    pub target_sync_interval: u32,
    pub checkpoint_interval: u32,
    pub patience: u32,
    pub model_name: String,
    pub checkpoint_dir: String,
    /// Fixed seed for reproducible training runs; entropy when absent.
    pub random_seed: Option<u64>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let figment = Figment::new()
            .merge(Toml::file("config/default.toml"))
            .merge(Env::prefixed("BOILER__").split("__"));
        Ok(figment.extract()?)
    }
}
