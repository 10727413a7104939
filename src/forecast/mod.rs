//! Forecast provider boundary.
//!
//! The temperature-prediction model is an external collaborator; the core
//! consumes it through [`ForecastProvider`] as an opaque, ordered time
//! series. [`SyntheticForecastProvider`] is the in-repo fallback used by
//! the daemon when no real forecaster is wired up, and by tests.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Timelike, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{BoilerKey, ForecastPoint, ForecastSeries};

/// Geographic location of the installation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoLocation {
    pub latitude: f64,
    pub longitude: f64,
    pub name: Option<String>,
}

#[derive(Debug, Error)]
pub enum ForecastError {
    /// The forecaster exposes no temperature column for this boiler
    /// configuration.
    #[error("forecast unavailable for configuration: {0}")]
    ConfigurationUnavailable(BoilerKey),
    /// The provider produced no points for the requested horizon.
    #[error("forecaster returned no points for a {0}h horizon")]
    HorizonUnavailable(u32),
    /// Provider-side failure (network, parsing, model load).
    #[error("forecast provider error: {0}")]
    Provider(String),
}

/// Black-box source of predicted boiler temperatures.
///
/// Implementations must return points ascending by timestamp, covering at
/// least `horizon_hours`, with one temperature per configuration they
/// support. A missing configuration surfaces later as
/// [`ForecastError::ConfigurationUnavailable`] when queried, not a crash.
#[async_trait]
pub trait ForecastProvider: Send + Sync {
    async fn get_series(
        &self,
        location: &GeoLocation,
        horizon_hours: u32,
    ) -> Result<ForecastSeries, ForecastError>;
}

/// Deterministic stand-in forecaster.
///
/// Produces an hourly daily curve per configuration: a sinusoid that
/// bottoms out before dawn and peaks mid-afternoon, with a solar bump for
/// solar-equipped tanks. Good enough to drive the scheduler end to end.
pub struct SyntheticForecastProvider {
    keys: Vec<BoilerKey>,
    base_temp: f64,
    swing: f64,
}

impl SyntheticForecastProvider {
    pub fn new(keys: Vec<BoilerKey>) -> Self {
        Self {
            keys,
            base_temp: 38.0,
            swing: 8.0,
        }
    }

    pub fn with_profile(mut self, base_temp: f64, swing: f64) -> Self {
        self.base_temp = base_temp;
        self.swing = swing;
        self
    }

    fn temperature_at(&self, key: &BoilerKey, hour: f64) -> f64 {
        use std::f64::consts::PI;

        // Coldest around 03:00, warmest around 15:00.
        let phase = (hour - 9.0) / 24.0 * 2.0 * PI;
        let mut temp = self.base_temp + self.swing * phase.sin();

        if key.has_solar && (8.0..=17.0).contains(&hour) {
            temp += 6.0 * ((hour - 8.0) / 9.0 * PI).sin();
        }

        // Bigger tanks hold their overnight temperature slightly better.
        temp + (key.capacity_liters as f64 - 100.0) * 0.01
    }
}

#[async_trait]
impl ForecastProvider for SyntheticForecastProvider {
    async fn get_series(
        &self,
        _location: &GeoLocation,
        horizon_hours: u32,
    ) -> Result<ForecastSeries, ForecastError> {
        if horizon_hours == 0 {
            return Err(ForecastError::HorizonUnavailable(horizon_hours));
        }

        let start = truncate_to_hour(Utc::now());
        let mut points = Vec::with_capacity(horizon_hours as usize);

        for h in 0..horizon_hours {
            let timestamp = start + Duration::hours(h as i64);
            let hour = timestamp.hour() as f64;
            let mut point = ForecastPoint::new(timestamp);
            for key in &self.keys {
                point = point.with_temperature(*key, self.temperature_at(key, hour));
            }
            points.push(point);
        }

        Ok(ForecastSeries::new(points))
    }
}

fn truncate_to_hour(t: DateTime<Utc>) -> DateTime<Utc> {
    t.with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(t)
}
