use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Forecast column key: one predicted temperature series exists per
/// (tank size, solar) configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoilerKey {
    pub capacity_liters: u32,
    pub has_solar: bool,
}

impl BoilerKey {
    pub fn new(capacity_liters: u32, has_solar: bool) -> Self {
        Self {
            capacity_liters,
            has_solar,
        }
    }
}

impl fmt::Display for BoilerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "boiler temp for {} L {} solar system",
            self.capacity_liters,
            if self.has_solar { "with" } else { "without" }
        )
    }
}

/// One timestamped prediction from the external forecaster, carrying a
/// temperature per boiler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub timestamp: DateTime<Utc>,
    pub temperatures: HashMap<BoilerKey, f64>,
}

impl ForecastPoint {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            temperatures: HashMap::new(),
        }
    }

    pub fn with_temperature(mut self, key: BoilerKey, temperature: f64) -> Self {
        self.temperatures.insert(key, temperature);
        self
    }

    pub fn temperature_for(&self, key: &BoilerKey) -> Option<f64> {
        self.temperatures.get(key).copied()
    }
}

/// Immutable snapshot of forecast points, ascending by timestamp.
///
/// A scheduling run works against one snapshot; no interleaved mutation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForecastSeries {
    points: Vec<ForecastPoint>,
}

impl ForecastSeries {
    /// Build a series, sorting points into ascending timestamp order.
    pub fn new(mut points: Vec<ForecastPoint>) -> Self {
        points.sort_by_key(|p| p.timestamp);
        Self { points }
    }

    pub fn points(&self) -> &[ForecastPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Most recent point at or before `time`.
    pub fn latest_at(&self, time: DateTime<Utc>) -> Option<&ForecastPoint> {
        self.points.iter().rev().find(|p| p.timestamp <= time)
    }

    /// Points at or before `time`, most recent first. This is the scan
    /// order used by the backward scheduling search.
    pub fn backward_from(&self, time: DateTime<Utc>) -> impl Iterator<Item = &ForecastPoint> {
        self.points
            .iter()
            .rev()
            .filter(move |p| p.timestamp <= time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, hour, 0, 0).unwrap()
    }

    #[test]
    fn test_key_rendering() {
        assert_eq!(
            BoilerKey::new(100, true).to_string(),
            "boiler temp for 100 L with solar system"
        );
        assert_eq!(
            BoilerKey::new(50, false).to_string(),
            "boiler temp for 50 L without solar system"
        );
    }

    #[test]
    fn test_series_sorts_ascending() {
        let key = BoilerKey::new(100, true);
        let series = ForecastSeries::new(vec![
            ForecastPoint::new(ts(12)).with_temperature(key, 40.0),
            ForecastPoint::new(ts(8)).with_temperature(key, 35.0),
            ForecastPoint::new(ts(10)).with_temperature(key, 38.0),
        ]);

        let stamps: Vec<_> = series.points().iter().map(|p| p.timestamp).collect();
        assert_eq!(stamps, vec![ts(8), ts(10), ts(12)]);
    }

    #[test]
    fn test_backward_scan_order() {
        let key = BoilerKey::new(100, true);
        let series = ForecastSeries::new(vec![
            ForecastPoint::new(ts(8)).with_temperature(key, 35.0),
            ForecastPoint::new(ts(10)).with_temperature(key, 38.0),
            ForecastPoint::new(ts(12)).with_temperature(key, 40.0),
        ]);

        let scanned: Vec<_> = series.backward_from(ts(11)).map(|p| p.timestamp).collect();
        assert_eq!(scanned, vec![ts(10), ts(8)]);
    }

    #[test]
    fn test_missing_configuration_column() {
        let key = BoilerKey::new(100, true);
        let other = BoilerKey::new(150, false);
        let point = ForecastPoint::new(ts(8)).with_temperature(key, 35.0);

        assert_eq!(point.temperature_for(&key), Some(35.0));
        assert_eq!(point.temperature_for(&other), None);
    }
}
