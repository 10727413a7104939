use anyhow::Result;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use boiler_controller::config::Config;
use boiler_controller::controller::{ControllerService, RuleBasedPolicy, ServiceSettings};
use boiler_controller::domain::{BoilerKey, BoilerState, TemperatureHistory};
use boiler_controller::forecast::{GeoLocation, SyntheticForecastProvider};
use boiler_controller::scheduler::{ForecastScheduler, SchedulerConfig};
use boiler_controller::storage::{FileHistoryStore, HistoryStore};
use boiler_controller::telemetry::{init_tracing, shutdown_signal};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cfg = Config::load()?;

    let mut boiler = BoilerState::new(
        cfg.boiler.name.clone(),
        cfg.boiler.capacity_liters,
        cfg.boiler.has_solar,
        cfg.boiler.power_kw,
    )?;
    boiler.set_temperature(cfg.boiler.initial_temperature);

    // Re-seed the rolling history from the previous run.
    let history = Arc::new(FileHistoryStore::new(&cfg.service.history_path));
    match history.load() {
        Ok(samples) if !samples.is_empty() => {
            info!(samples = samples.len(), "restored temperature history");
            if let Some(latest) = samples.last() {
                boiler.set_temperature(*latest);
            }
            boiler.history = TemperatureHistory::from_samples(samples);
        }
        Ok(_) => info!("no persisted temperature history, starting empty"),
        Err(e) => warn!(error = %e, "could not restore temperature history"),
    }

    let key = BoilerKey::new(
        cfg.boiler.capacity_liters.round() as u32,
        cfg.boiler.has_solar,
    );
    let provider = Arc::new(SyntheticForecastProvider::new(vec![key]));

    let scheduler_config = SchedulerConfig {
        cold_water_temp: cfg.scheduler.cold_water_temp,
    };
    let settings = ServiceSettings {
        tick_seconds: cfg.service.tick_seconds,
        horizon_hours: cfg.forecast.horizon_hours,
        location: GeoLocation {
            latitude: cfg.forecast.latitude,
            longitude: cfg.forecast.longitude,
            name: Some(cfg.boiler.name.clone()),
        },
        ambient_temp_c: cfg.service.ambient_temp_c,
        daily_demands: cfg.demand.clone(),
    };

    info!(
        boiler = %cfg.boiler.name,
        capacity = cfg.boiler.capacity_liters,
        has_solar = cfg.boiler.has_solar,
        "starting boiler controller"
    );

    let service = Arc::new(ControllerService::new(
        settings,
        Arc::new(RwLock::new(boiler)),
        provider,
        history,
        ForecastScheduler::new(scheduler_config.clone()),
        Box::new(RuleBasedPolicy::new(ForecastScheduler::new(scheduler_config))),
    ));
    service.start();

    shutdown_signal().await;
    warn!("shutdown complete");
    Ok(())
}
