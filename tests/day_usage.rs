//! End-to-end scheduling run: a fixed synthetic forecast against a day of
//! demand events covering every scheduling outcome.

use chrono::{DateTime, TimeZone, Utc};
use rstest::rstest;

use boiler_controller::domain::{
    default_power_kw, BoilerKey, BoilerState, DemandEvent, ForecastPoint, ForecastSeries,
    ScheduleStatus,
};
use boiler_controller::scheduler::{ForecastScheduler, SchedulerConfig};

fn ts(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 1, hour, minute, 0).unwrap()
}

/// Hourly forecast for a 100L tank without solar, 06:00–21:00.
fn fixed_forecast() -> ForecastSeries {
    let key = BoilerKey::new(100, false);
    let temps = [
        (6, 35.0),
        (7, 38.0),
        (8, 65.0), // morning event: already hot
        (9, 42.0),
        (10, 40.0),
        (11, 40.0),
        (12, 40.0), // midday event: needs heating, lead time exists
        (13, 39.0),
        (14, 39.0),
        (15, 39.0),
        (16, 40.0),
        (17, 40.0),
        (18, 41.0),
        (19, 41.0),
        (20, 41.0), // evening event: warm but not enough usable volume
        (21, 40.0),
    ];

    ForecastSeries::new(
        temps
            .iter()
            .map(|(h, t)| ForecastPoint::new(ts(*h, 0)).with_temperature(key, *t))
            .collect(),
    )
}

#[test]
fn full_day_produces_all_three_statuses() {
    let boiler = BoilerState::new("home", 100.0, false, Some(3.0)).unwrap();
    let scheduler = ForecastScheduler::new(SchedulerConfig {
        cold_water_temp: 20.0,
    });

    let events = vec![
        // 1 user at 40°C against a 65°C forecast: served from storage.
        DemandEvent::new(ts(8, 0), 40.0, 1, 40.0),
        // 50°C at noon against a 40°C forecast: 10°C to heat.
        DemandEvent::new(ts(12, 0), 50.0, 2, 40.0),
        // 6 users at 40°C against a 41°C forecast: hot enough per degree
        // but the tank cannot hold the needed usable volume.
        DemandEvent::new(ts(20, 0), 40.0, 6, 40.0),
    ];

    let report = scheduler.simulate_day_usage(&boiler, &events, &fixed_forecast());

    assert!(report.skipped.is_empty());
    assert_eq!(report.records.len(), 3);

    // Morning: sufficient, no heating.
    let morning = &report.records[0];
    assert_eq!(morning.status, ScheduleStatus::Sufficient);
    assert_eq!(morning.forecast_temp, 65.0);
    assert_eq!(morning.heating_minutes, 0.0);
    assert!((morning.needed_liters - 44.0).abs() < 1e-9);
    assert!((morning.usable_liters - 225.0).abs() < 1e-9);

    // Midday: heating required, enough lead time from the 10:00 point.
    // ΔT = 10°C on 100L at 3kW → (100·4.186·10)/((3000/60)·0.9) ≈ 93.0 min.
    let midday = &report.records[1];
    match midday.status {
        ScheduleStatus::StartHeatingAt { start, minutes } => {
            assert!((minutes - 93.0).abs() < 0.1);
            let lead = (ts(12, 0) - start).num_seconds() as f64 / 60.0;
            assert!((lead - 93.02).abs() < 0.1);
            assert!(start >= ts(10, 0));
        }
        ref other => panic!("expected StartHeatingAt, got {:?}", other),
    }
    assert_eq!(midday.forecast_temp, 40.0);
    assert!((midday.heating_minutes - 93.0).abs() < 0.1);

    // Evening: forecast too cold to bank on for six users.
    let evening = &report.records[2];
    assert_eq!(evening.status, ScheduleStatus::ForecastTooCold);
    assert_eq!(evening.forecast_temp, 41.0);
    assert!((evening.needed_liters - 264.0).abs() < 1e-9);
    assert!((evening.usable_liters - 105.0).abs() < 1e-9);
    assert_eq!(evening.heating_minutes, 0.0);

    // The annotated forecast snapshot rides along with the table.
    assert_eq!(report.forecast.len(), 16);
}

#[test]
fn sufficient_event_consumes_effective_volume() {
    let boiler = BoilerState::new("home", 100.0, false, Some(3.0)).unwrap();
    let scheduler = ForecastScheduler::new(SchedulerConfig {
        cold_water_temp: 20.0,
    });

    let events = vec![DemandEvent::new(ts(8, 0), 40.0, 1, 40.0)];
    let report = scheduler.simulate_day_usage(&boiler, &events, &fixed_forecast());

    // Non-solar tank starts from full capacity; one 44L draw remains.
    assert!((report.effective_liters_remaining - 56.0).abs() < 1e-9);
}

#[rstest]
#[case(50.0, 2.0)]
#[case(100.0, 3.0)]
#[case(150.0, 4.0)]
#[case(120.0, 3.0)]
fn power_rating_defaults_from_capacity(#[case] capacity: f64, #[case] expected_kw: f64) {
    assert_eq!(default_power_kw(capacity), expected_kw);
    let boiler = BoilerState::new("b", capacity, false, None).unwrap();
    assert_eq!(boiler.power_rating_kw, expected_kw);
}
