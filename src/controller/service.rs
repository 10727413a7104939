//! Periodic controller task.
//!
//! The daemon's single writer for the shared [`BoilerState`]: every tick
//! it refreshes the forecast snapshot, re-runs the day scheduling batch,
//! lets the active policy decide the heater action and applies the
//! thermal consequences (heating, usage draw, history sample).

use anyhow::{bail, Result};
use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::{interval, Duration};
use tracing::{error, info};

use super::ControlPolicy;
use crate::controller::ControlContext;
use crate::domain::{BoilerState, DemandEvent, HeaterAction};
use crate::forecast::{ForecastProvider, GeoLocation};
use crate::scheduler::{DayUsageReport, ForecastScheduler};
use crate::storage::HistoryStore;
use crate::thermal::ThermalModel;

/// A demand event template that recurs daily at a fixed local time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyDemand {
    pub hour: u32,
    pub minute: u32,
    pub users: u32,
    pub temperature: f64,
    pub liters_per_use: f64,
}

impl DailyDemand {
    /// Materialize this template on the given day.
    pub fn on_day(&self, day: DateTime<Utc>) -> DemandEvent {
        let at = Utc
            .with_ymd_and_hms(day.year(), day.month(), day.day(), self.hour, self.minute, 0)
            .single()
            .unwrap_or(day);
        DemandEvent::new(at, self.temperature, self.users, self.liters_per_use)
    }
}

#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub tick_seconds: u64,
    pub horizon_hours: u32,
    pub location: GeoLocation,
    /// Ambient temperature assumed when building policy observations; the
    /// live weather feed belongs to the excluded weather service.
    pub ambient_temp_c: f64,
    pub daily_demands: Vec<DailyDemand>,
}

/// Task bookkeeping, one per periodic task.
#[derive(Debug, Clone, Default)]
pub struct TaskStatus {
    pub last_run: Option<DateTime<Utc>>,
    pub last_success: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub run_count: u64,
    pub success_count: u64,
    pub error_count: u64,
}

pub struct ControllerService {
    settings: ServiceSettings,
    boiler: Arc<RwLock<BoilerState>>,
    provider: Arc<dyn ForecastProvider>,
    history: Arc<dyn HistoryStore>,
    scheduler: ForecastScheduler,
    policy: Box<dyn ControlPolicy>,
    schedule_status: Arc<RwLock<TaskStatus>>,
    latest_report: Arc<RwLock<Option<DayUsageReport>>>,
}

impl ControllerService {
    pub fn new(
        settings: ServiceSettings,
        boiler: Arc<RwLock<BoilerState>>,
        provider: Arc<dyn ForecastProvider>,
        history: Arc<dyn HistoryStore>,
        scheduler: ForecastScheduler,
        policy: Box<dyn ControlPolicy>,
    ) -> Self {
        Self {
            settings,
            boiler,
            provider,
            history,
            scheduler,
            policy,
            schedule_status: Arc::new(RwLock::new(TaskStatus::default())),
            latest_report: Arc::new(RwLock::new(None)),
        }
    }

    /// Spawn the periodic tick task.
    pub fn start(self: Arc<Self>) {
        let service = self.clone();
        tokio::spawn(async move {
            service.run_tick_loop().await;
        });
        info!(
            tick_seconds = self.settings.tick_seconds,
            "controller service started"
        );
    }

    async fn run_tick_loop(&self) {
        let mut ticker = interval(Duration::from_secs(self.settings.tick_seconds));

        loop {
            ticker.tick().await;

            let now = Utc::now();
            {
                let mut status = self.schedule_status.write().await;
                status.last_run = Some(now);
                status.run_count += 1;
            }

            match self.run_tick(now).await {
                Ok(()) => {
                    let mut status = self.schedule_status.write().await;
                    status.last_success = Some(now);
                    status.success_count += 1;
                    status.last_error = None;
                }
                Err(e) => {
                    let mut status = self.schedule_status.write().await;
                    status.error_count += 1;
                    status.last_error = Some(e.to_string());
                    error!(error = %e, "controller tick failed");
                }
            }
        }
    }

    /// One control cycle: forecast → schedule → act → record.
    pub async fn run_tick(&self, now: DateTime<Utc>) -> Result<()> {
        let forecast = self
            .provider
            .get_series(&self.settings.location, self.settings.horizon_hours)
            .await?;
        if forecast.is_empty() {
            bail!("forecaster returned an empty series for the whole horizon");
        }

        let events: Vec<DemandEvent> = self
            .settings
            .daily_demands
            .iter()
            .map(|d| d.on_day(now))
            .collect();

        let mut boiler = self.boiler.write().await;
        boiler.expire_override(now);

        // Seed the tracked temperature from the forecast unless a manual
        // override is active.
        if boiler.temperature_override.is_none() {
            let key = crate::domain::BoilerKey::new(
                boiler.capacity_liters.round() as u32,
                boiler.has_solar,
            );
            if let Some(temp) = forecast.latest_at(now).and_then(|p| p.temperature_for(&key)) {
                boiler.set_temperature(temp);
            }
        }

        let report = self.scheduler.simulate_day_usage(&boiler, &events, &forecast);

        let next_event = events.iter().find(|e| e.at > now);
        let ctx = ControlContext {
            now,
            boiler: &boiler,
            forecast: &forecast,
            outside_temp_c: self.settings.ambient_temp_c,
            next_event,
        };
        let action = self.policy.decide(&ctx)?;

        if action == HeaterAction::Heat {
            let start_temp = boiler.effective_temperature(now);
            let tick_minutes = self.settings.tick_seconds as f64 / 60.0;
            ThermalModel::heat(&mut boiler, tick_minutes, start_temp);
        }

        // Apply the usage draw of any event inside this tick window.
        let tick = chrono::Duration::seconds(self.settings.tick_seconds as i64);
        for event in events.iter().filter(|e| e.at > now - tick && e.at <= now) {
            let used = event.user_count as f64 * event.liters_per_use;
            let current = boiler.effective_temperature(now);
            ThermalModel::cool(&mut boiler, current, used, self.scheduler_cold_temp());
        }

        self.history.append(boiler.current_temperature())?;
        drop(boiler);

        *self.latest_report.write().await = Some(report);
        Ok(())
    }

    fn scheduler_cold_temp(&self) -> f64 {
        self.scheduler.cold_water_temp()
    }

    /// Most recent recommendation table, for the API layer to serve.
    pub async fn latest_report(&self) -> Option<DayUsageReport> {
        self.latest_report.read().await.clone()
    }

    pub async fn status(&self) -> TaskStatus {
        self.schedule_status.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::RuleBasedPolicy;
    use crate::forecast::SyntheticForecastProvider;
    use crate::scheduler::SchedulerConfig;
    use crate::storage::InMemoryHistoryStore;

    fn service() -> Arc<ControllerService> {
        let boiler = BoilerState::new("home", 100.0, true, None).unwrap();
        let key = crate::domain::BoilerKey::new(100, true);

        let settings = ServiceSettings {
            tick_seconds: 300,
            horizon_hours: 24,
            location: GeoLocation {
                latitude: 31.25,
                longitude: 34.79,
                name: Some("home".to_string()),
            },
            ambient_temp_c: 22.0,
            daily_demands: vec![DailyDemand {
                hour: 19,
                minute: 30,
                users: 2,
                temperature: 42.0,
                liters_per_use: 40.0,
            }],
        };

        Arc::new(ControllerService::new(
            settings,
            Arc::new(RwLock::new(boiler)),
            Arc::new(SyntheticForecastProvider::new(vec![key])),
            Arc::new(InMemoryHistoryStore::new()),
            ForecastScheduler::new(SchedulerConfig::default()),
            Box::new(RuleBasedPolicy::new(ForecastScheduler::new(
                SchedulerConfig::default(),
            ))),
        ))
    }

    #[tokio::test]
    async fn test_tick_produces_report_and_history() {
        let service = service();
        service.run_tick(Utc::now()).await.unwrap();

        let report = service.latest_report().await.expect("report after tick");
        assert_eq!(report.records.len() + report.skipped.len(), 1);
        assert!(!service.history.load().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_status_starts_clean() {
        let service = service();
        let status = service.status().await;
        assert_eq!(status.run_count, 0);
        assert_eq!(status.error_count, 0);
    }
}
