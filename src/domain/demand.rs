use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Extra hot water planned on top of the nominal per-use volume.
pub const SAFETY_MARGIN: f64 = 1.10;

/// A scheduled water-use occurrence (e.g. showers at a known time).
///
/// Immutable once built; consumed once per scheduling run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DemandEvent {
    pub at: DateTime<Utc>,
    pub required_temperature: f64,
    pub user_count: u32,
    pub liters_per_use: f64,
}

impl DemandEvent {
    pub fn new(
        at: DateTime<Utc>,
        required_temperature: f64,
        user_count: u32,
        liters_per_use: f64,
    ) -> Self {
        Self {
            at,
            required_temperature,
            user_count: user_count.max(1),
            liters_per_use,
        }
    }

    /// Hot water volume to plan for, including the safety margin.
    pub fn needed_liters(&self) -> f64 {
        self.user_count as f64 * self.liters_per_use * SAFETY_MARGIN
    }
}

/// Outcome of scheduling a single demand event. Closed set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ScheduleStatus {
    /// Stored water already covers the demand; heater stays off.
    Sufficient,
    /// Heating is required and there is enough lead time.
    StartHeatingAt {
        start: DateTime<Utc>,
        minutes: f64,
    },
    /// Heating is required but no forecast point leaves enough lead time
    /// before the event while still reaching the target.
    ForecastTooCold,
    /// The forecast horizon holds no usable point before the event.
    NotEnoughTime,
}

impl fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScheduleStatus::Sufficient => write!(f, "Sufficient - no heating"),
            ScheduleStatus::StartHeatingAt { start, minutes } => write!(
                f,
                "Insufficient - start heating at: {} (need {:.1} min)",
                start.format("%H:%M"),
                minutes
            ),
            ScheduleStatus::ForecastTooCold => write!(f, "Insufficient - forecast too cold"),
            ScheduleStatus::NotEnoughTime => {
                write!(f, "Insufficient - not enough time to heat")
            }
        }
    }
}

/// Per-event heating recommendation derived from the forecast scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeatingDecision {
    pub heating_start: Option<DateTime<Utc>>,
    pub heating_minutes: f64,
    pub forecast_temperature: Option<f64>,
    pub status: ScheduleStatus,
}

/// One row of the per-event recommendation table handed to the API layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    pub time: DateTime<Utc>,
    pub users: u32,
    pub target_temp: f64,
    pub forecast_temp: f64,
    pub usable_liters: f64,
    pub needed_liters: f64,
    pub heating_minutes: f64,
    pub status: ScheduleStatus,
}

/// A demand event that could not be scheduled; recorded so one failure
/// never aborts the batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedEvent {
    pub time: DateTime<Utc>,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_needed_liters_includes_margin() {
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 19, 0, 0).unwrap();
        let event = DemandEvent::new(at, 40.0, 2, 40.0);
        assert!((event.needed_liters() - 88.0).abs() < 1e-9);
    }

    #[test]
    fn test_user_count_floors_at_one() {
        let at = Utc.with_ymd_and_hms(2025, 6, 1, 19, 0, 0).unwrap();
        let event = DemandEvent::new(at, 40.0, 0, 40.0);
        assert_eq!(event.user_count, 1);
    }

    #[test]
    fn test_status_rendering() {
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 18, 12, 0).unwrap();
        let status = ScheduleStatus::StartHeatingAt {
            start,
            minutes: 34.7,
        };
        assert_eq!(
            status.to_string(),
            "Insufficient - start heating at: 18:12 (need 34.7 min)"
        );
        assert_eq!(ScheduleStatus::Sufficient.to_string(), "Sufficient - no heating");
    }
}
