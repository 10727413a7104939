//! # Forecast-Driven Heating Scheduler
//!
//! Given a forecast snapshot and a set of demand events, computes when to
//! start heating so each event's target temperature is reached in time.
//!
//! The search is a greedy backward scan over forecast points: it accepts
//! the first (most recent) point that either already satisfies the target
//! or leaves enough lead time to heat, and stops there. An earlier point
//! might allow a cheaper heating window; the scan deliberately does not
//! look for it.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::domain::{
    BoilerKey, BoilerState, DemandEvent, ForecastSeries, HeatingDecision, ScheduleStatus,
    SkippedEvent, UsageRecord,
};
use crate::forecast::ForecastError;
use crate::thermal::ThermalModel;

/// Effective-volume fraction available from a solar-assisted tank at the
/// start of a day.
const SOLAR_EFFECTIVE_FRACTION: f64 = 0.7;

/// Result of the backward start-time search for one target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StartHeating {
    /// Forecast temperature already meets the target; no heating needed.
    NotNeeded { forecast_temp: f64 },
    /// Heating must start at `start` to reach the target in time.
    StartAt {
        start: DateTime<Utc>,
        forecast_temp: f64,
    },
    /// No forecast point leaves enough lead time before the target.
    Unreachable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Temperature of inlet cold water (°C).
    pub cold_water_temp: f64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            cold_water_temp: 20.0,
        }
    }
}

/// Per-event recommendation table plus the forecast snapshot it was
/// derived from; both are handed to the API layer as-is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayUsageReport {
    pub records: Vec<UsageRecord>,
    pub skipped: Vec<SkippedEvent>,
    pub forecast: ForecastSeries,
    /// Effective hot volume left after serving the sufficient events.
    pub effective_liters_remaining: f64,
}

pub struct ForecastScheduler {
    config: SchedulerConfig,
}

impl ForecastScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        Self { config }
    }

    pub fn cold_water_temp(&self) -> f64 {
        self.config.cold_water_temp
    }

    /// Find when heating must start so the boiler reaches
    /// `target_temperature` by `target_time`.
    ///
    /// Scans forecast points at or before `target_time`, most recent
    /// first. The first point whose temperature meets the target ends the
    /// search with [`StartHeating::NotNeeded`]; otherwise the first point
    /// leaving enough lead time wins. This is an accept condition, not a
    /// global optimum search — later feasible points shadow earlier,
    /// possibly cheaper ones.
    pub fn calc_start_heating_time(
        &self,
        boiler: &BoilerState,
        forecast: &ForecastSeries,
        target_time: DateTime<Utc>,
        target_temperature: f64,
    ) -> Result<StartHeating, ForecastError> {
        let key = boiler_key(boiler);

        for point in forecast.backward_from(target_time) {
            let forecast_temp = point
                .temperature_for(&key)
                .ok_or(ForecastError::ConfigurationUnavailable(key))?;

            let delta_t = target_temperature - forecast_temp;
            if delta_t <= 0.0 {
                return Ok(StartHeating::NotNeeded { forecast_temp });
            }

            let minutes_needed =
                ThermalModel::heating_minutes(boiler.capacity_liters, boiler.power_rating_kw, delta_t);
            let start = target_time - minutes_from_f64(minutes_needed);

            if start >= point.timestamp {
                return Ok(StartHeating::StartAt {
                    start,
                    forecast_temp,
                });
            }
        }

        Ok(StartHeating::Unreachable)
    }

    /// Schedule a full day of demand events against one forecast snapshot.
    ///
    /// Events are processed independently: a failure on one is recorded
    /// under `skipped` and the batch continues.
    pub fn simulate_day_usage(
        &self,
        boiler: &BoilerState,
        events: &[DemandEvent],
        forecast: &ForecastSeries,
    ) -> DayUsageReport {
        let mut effective_liters = boiler.capacity_liters
            * if boiler.has_solar {
                SOLAR_EFFECTIVE_FRACTION
            } else {
                1.0
            };

        let mut records = Vec::with_capacity(events.len());
        let mut skipped = Vec::new();

        for event in events {
            match self.schedule_event(boiler, event, forecast) {
                Ok((record, served_from_store)) => {
                    if served_from_store {
                        effective_liters -= record.needed_liters;
                    }
                    debug!(
                        time = %record.time,
                        status = %record.status,
                        heating_minutes = record.heating_minutes,
                        "scheduled demand event"
                    );
                    records.push(record);
                }
                Err(e) => {
                    error!(time = %event.at, error = %e, "failed to schedule demand event");
                    skipped.push(SkippedEvent {
                        time: event.at,
                        reason: e.to_string(),
                    });
                }
            }
        }

        DayUsageReport {
            records,
            skipped,
            forecast: forecast.clone(),
            effective_liters_remaining: effective_liters,
        }
    }

    /// Decide one event. The boolean marks whether the demand is served
    /// from stored hot water (sufficient, no heating), which decrements
    /// the shared effective volume.
    fn schedule_event(
        &self,
        boiler: &BoilerState,
        event: &DemandEvent,
        forecast: &ForecastSeries,
    ) -> Result<(UsageRecord, bool), ForecastError> {
        let (decision, usable_liters) = self.decide(boiler, event, forecast)?;
        let served_from_store = matches!(decision.status, ScheduleStatus::Sufficient);

        let record = UsageRecord {
            time: event.at,
            users: event.user_count,
            target_temp: event.required_temperature,
            forecast_temp: round2(decision.forecast_temperature.unwrap_or(0.0)),
            usable_liters: round2(usable_liters),
            needed_liters: round2(event.needed_liters()),
            heating_minutes: decision.heating_minutes,
            status: decision.status,
        };

        Ok((record, served_from_store))
    }

    /// Map the backward-scan outcome to a per-event decision, including
    /// the usable-volume check for already-hot forecasts. Returns the
    /// decision and the usable hot volume at the forecast temperature
    /// (0 when heating is required anyway).
    fn decide(
        &self,
        boiler: &BoilerState,
        event: &DemandEvent,
        forecast: &ForecastSeries,
    ) -> Result<(HeatingDecision, f64), ForecastError> {
        let search =
            self.calc_start_heating_time(boiler, forecast, event.at, event.required_temperature)?;

        let decision = match search {
            StartHeating::Unreachable => (
                HeatingDecision {
                    heating_start: None,
                    heating_minutes: 0.0,
                    forecast_temperature: None,
                    status: ScheduleStatus::NotEnoughTime,
                },
                0.0,
            ),
            StartHeating::StartAt {
                start,
                forecast_temp,
            } => {
                let minutes = self.heating_minutes_for(boiler, event, forecast_temp);
                (
                    HeatingDecision {
                        heating_start: Some(start),
                        heating_minutes: minutes,
                        forecast_temperature: Some(forecast_temp),
                        status: ScheduleStatus::StartHeatingAt { start, minutes },
                    },
                    0.0,
                )
            }
            StartHeating::NotNeeded { forecast_temp } => {
                let usable_liters = boiler.capacity_liters
                    * (forecast_temp - self.config.cold_water_temp)
                    / (event.required_temperature - self.config.cold_water_temp);

                if usable_liters >= event.needed_liters() {
                    (
                        HeatingDecision {
                            heating_start: None,
                            heating_minutes: 0.0,
                            forecast_temperature: Some(forecast_temp),
                            status: ScheduleStatus::Sufficient,
                        },
                        usable_liters,
                    )
                } else {
                    // Hot enough per degree, but not enough usable volume.
                    // The scan produced no start time to top the tank up,
                    // so the forecast cannot be banked on.
                    let minutes = self.heating_minutes_for(boiler, event, forecast_temp);
                    (
                        HeatingDecision {
                            heating_start: None,
                            heating_minutes: minutes,
                            forecast_temperature: Some(forecast_temp),
                            status: ScheduleStatus::ForecastTooCold,
                        },
                        usable_liters,
                    )
                }
            }
        };

        Ok(decision)
    }

    fn heating_minutes_for(
        &self,
        boiler: &BoilerState,
        event: &DemandEvent,
        forecast_temp: f64,
    ) -> f64 {
        let delta_t = (event.required_temperature - forecast_temp).max(0.0);
        let minutes =
            ThermalModel::heating_minutes(boiler.capacity_liters, boiler.power_rating_kw, delta_t);
        (minutes * 10.0).round() / 10.0
    }
}

fn boiler_key(boiler: &BoilerState) -> BoilerKey {
    BoilerKey::new(boiler.capacity_liters.round() as u32, boiler.has_solar)
}

fn minutes_from_f64(minutes: f64) -> Duration {
    Duration::seconds((minutes * 60.0).round() as i64)
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ForecastPoint;
    use chrono::TimeZone;

    fn ts(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, hour, minute, 0).unwrap()
    }

    fn boiler() -> BoilerState {
        BoilerState::new("b", 100.0, false, Some(3.0)).unwrap()
    }

    fn series(points: &[(u32, f64)]) -> ForecastSeries {
        let key = BoilerKey::new(100, false);
        ForecastSeries::new(
            points
                .iter()
                .map(|(hour, temp)| ForecastPoint::new(ts(*hour, 0)).with_temperature(key, *temp))
                .collect(),
        )
    }

    #[test]
    fn test_accepts_most_recent_sufficient_point() {
        let scheduler = ForecastScheduler::new(SchedulerConfig::default());
        // Both 10:00 and 12:00 are hot enough; the scan must stop at the
        // most recent one without visiting the earlier (hotter) one.
        let forecast = series(&[(10, 60.0), (12, 55.0)]);

        let result = scheduler
            .calc_start_heating_time(&boiler(), &forecast, ts(12, 0), 50.0)
            .unwrap();

        assert_eq!(
            result,
            StartHeating::NotNeeded {
                forecast_temp: 55.0
            }
        );
    }

    #[test]
    fn test_start_time_arithmetic() {
        let scheduler = ForecastScheduler::new(SchedulerConfig::default());
        let forecast = series(&[(10, 40.0)]);

        // ΔT = 10°C on a 100L/3kW tank → 93.02 minutes of lead time.
        let result = scheduler
            .calc_start_heating_time(&boiler(), &forecast, ts(12, 0), 50.0)
            .unwrap();

        match result {
            StartHeating::StartAt {
                start,
                forecast_temp,
            } => {
                assert_eq!(forecast_temp, 40.0);
                let lead = (ts(12, 0) - start).num_seconds() as f64 / 60.0;
                assert!((lead - 93.02).abs() < 0.1);
            }
            other => panic!("expected StartAt, got {:?}", other),
        }
    }

    #[test]
    fn test_greedy_scan_prefers_later_feasible_point() {
        let scheduler = ForecastScheduler::new(SchedulerConfig::default());
        // The 08:00 point (49°C) would need ~9 minutes of heating, far
        // cheaper than the ~47 minutes from 11:00 (45°C). The backward
        // scan must still accept the later point.
        let forecast = series(&[(8, 49.0), (11, 45.0)]);

        let result = scheduler
            .calc_start_heating_time(&boiler(), &forecast, ts(12, 0), 50.0)
            .unwrap();

        match result {
            StartHeating::StartAt { forecast_temp, .. } => assert_eq!(forecast_temp, 45.0),
            other => panic!("expected StartAt from the 11:00 point, got {:?}", other),
        }
    }

    #[test]
    fn test_unreachable_without_lead_time() {
        let scheduler = ForecastScheduler::new(SchedulerConfig::default());
        // 20°C at 11:55 needs ~7 hours of heating before a 12:00 target.
        let forecast = ForecastSeries::new(vec![ForecastPoint::new(ts(11, 55))
            .with_temperature(BoilerKey::new(100, false), 20.0)]);

        let result = scheduler
            .calc_start_heating_time(&boiler(), &forecast, ts(12, 0), 65.0)
            .unwrap();

        assert_eq!(result, StartHeating::Unreachable);
    }

    #[test]
    fn test_empty_forecast_is_unreachable() {
        let scheduler = ForecastScheduler::new(SchedulerConfig::default());
        let forecast = ForecastSeries::default();

        let result = scheduler
            .calc_start_heating_time(&boiler(), &forecast, ts(12, 0), 50.0)
            .unwrap();

        assert_eq!(result, StartHeating::Unreachable);
    }

    #[test]
    fn test_missing_configuration_column_is_an_error() {
        let scheduler = ForecastScheduler::new(SchedulerConfig::default());
        // Series only carries the 150L column; the 100L boiler cannot be
        // scheduled against it.
        let forecast = ForecastSeries::new(vec![ForecastPoint::new(ts(10, 0))
            .with_temperature(BoilerKey::new(150, false), 40.0)]);

        let result = scheduler.calc_start_heating_time(&boiler(), &forecast, ts(12, 0), 50.0);
        assert!(matches!(
            result,
            Err(ForecastError::ConfigurationUnavailable(_))
        ));
    }

    #[test]
    fn test_batch_continues_past_failing_events() {
        let scheduler = ForecastScheduler::new(SchedulerConfig::default());
        let forecast = ForecastSeries::new(vec![ForecastPoint::new(ts(10, 0))
            .with_temperature(BoilerKey::new(150, false), 40.0)]);

        let events = vec![
            DemandEvent::new(ts(12, 0), 40.0, 1, 40.0),
            DemandEvent::new(ts(19, 0), 42.0, 2, 40.0),
        ];

        let report = scheduler.simulate_day_usage(&boiler(), &events, &forecast);
        assert!(report.records.is_empty());
        assert_eq!(report.skipped.len(), 2);
    }

    #[test]
    fn test_sufficient_events_decrement_effective_volume() {
        let scheduler = ForecastScheduler::new(SchedulerConfig::default());
        // 65°C forecast against 40°C targets: plenty of usable volume.
        let forecast = series(&[(8, 65.0), (20, 65.0)]);

        let events = vec![
            DemandEvent::new(ts(8, 0), 40.0, 1, 40.0),
            DemandEvent::new(ts(20, 0), 40.0, 1, 40.0),
        ];

        let b = boiler();
        let report = scheduler.simulate_day_usage(&b, &events, &forecast);

        assert_eq!(report.records.len(), 2);
        for record in &report.records {
            assert_eq!(record.status, ScheduleStatus::Sufficient);
        }
        // Non-solar tank starts at full capacity; two events consume
        // 44L each (1 user · 40L · 1.1).
        assert!((report.effective_liters_remaining - (100.0 - 88.0)).abs() < 1e-9);
    }

    #[test]
    fn test_insufficient_volume_without_start_is_too_cold() {
        let scheduler = ForecastScheduler::new(SchedulerConfig::default());
        // 41°C meets the 40°C target per degree, but six users need far
        // more usable volume than a 100L tank holds at that temperature.
        let forecast = series(&[(20, 41.0)]);
        let events = vec![DemandEvent::new(ts(20, 0), 40.0, 6, 40.0)];

        let report = scheduler.simulate_day_usage(&boiler(), &events, &forecast);
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].status, ScheduleStatus::ForecastTooCold);
        assert!(report.records[0].usable_liters > 0.0);
    }
}
