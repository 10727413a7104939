use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use thiserror::Error;

/// Hard ceiling on stored water temperature (°C). The heater element cuts
/// out at this point regardless of demand.
pub const MAX_TEMP_C: f64 = 68.0;

/// Number of temperature samples retained in the rolling history.
pub const HISTORY_CAPACITY: usize = 24;

/// Boiler-specific errors
#[derive(Debug, Error)]
pub enum BoilerError {
    #[error("invalid capacity: {0} liters (must be > 0)")]
    InvalidCapacity(f64),
    #[error("invalid power rating: {0} kW (must be > 0)")]
    InvalidPower(f64),
}

/// Heater action requested by a control policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeaterAction {
    Idle,
    Heat,
}

impl HeaterAction {
    pub const COUNT: usize = 2;

    pub fn index(&self) -> usize {
        match self {
            HeaterAction::Idle => 0,
            HeaterAction::Heat => 1,
        }
    }

    pub fn from_index(index: usize) -> Self {
        match index {
            1 => HeaterAction::Heat,
            _ => HeaterAction::Idle,
        }
    }
}

/// A manually injected temperature reading that takes precedence over
/// model-predicted values until it expires.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TemperatureOverride {
    pub value: f64,
    pub valid_until: DateTime<Utc>,
}

/// Bounded FIFO of recent temperature samples.
///
/// Oldest sample is evicted once the buffer holds `HISTORY_CAPACITY`
/// entries. Samples are stored rounded to 2 decimals.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemperatureHistory {
    samples: VecDeque<f64>,
}

impl TemperatureHistory {
    pub fn new() -> Self {
        Self {
            samples: VecDeque::with_capacity(HISTORY_CAPACITY),
        }
    }

    /// Seed the buffer from persisted samples, keeping only the most
    /// recent `HISTORY_CAPACITY` of them.
    pub fn from_samples(samples: impl IntoIterator<Item = f64>) -> Self {
        let mut history = Self::new();
        for sample in samples {
            history.push(sample);
        }
        history
    }

    pub fn push(&mut self, sample: f64) {
        if self.samples.len() == HISTORY_CAPACITY {
            self.samples.pop_front();
        }
        self.samples.push_back((sample * 100.0).round() / 100.0);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn latest(&self) -> Option<f64> {
        self.samples.back().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &f64> {
        self.samples.iter()
    }
}

/// Mutable physical state of a single hot-water storage tank.
///
/// One logical instance per physical boiler. Thermal operations mutate it
/// in place; callers that share an instance across tasks must serialize
/// access themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoilerState {
    pub name: String,
    pub capacity_liters: f64,
    pub has_solar: bool,
    pub power_rating_kw: f64,
    current_temperature: f64,
    is_on: bool,
    pub history: TemperatureHistory,
    pub temperature_override: Option<TemperatureOverride>,
}

impl BoilerState {
    pub fn new(
        name: impl Into<String>,
        capacity_liters: f64,
        has_solar: bool,
        power_rating_kw: Option<f64>,
    ) -> Result<Self, BoilerError> {
        if capacity_liters <= 0.0 {
            return Err(BoilerError::InvalidCapacity(capacity_liters));
        }
        let power = power_rating_kw.unwrap_or_else(|| default_power_kw(capacity_liters));
        if power <= 0.0 {
            return Err(BoilerError::InvalidPower(power));
        }

        Ok(Self {
            name: name.into(),
            capacity_liters,
            has_solar,
            power_rating_kw: power,
            current_temperature: 25.0,
            is_on: true,
            history: TemperatureHistory::new(),
            temperature_override: None,
        })
    }

    pub fn current_temperature(&self) -> f64 {
        self.current_temperature
    }

    /// Set the stored temperature, clamped to the physically valid range.
    pub fn set_temperature(&mut self, temperature: f64) {
        self.current_temperature = temperature.clamp(0.0, MAX_TEMP_C);
    }

    pub fn is_on(&self) -> bool {
        self.is_on
    }

    pub fn turn_on(&mut self) {
        self.is_on = true;
    }

    pub fn turn_off(&mut self) {
        self.is_on = false;
    }

    /// Temperature to use for the next physical step: an unexpired manual
    /// override wins over the model-tracked value.
    pub fn effective_temperature(&self, now: DateTime<Utc>) -> f64 {
        match self.temperature_override {
            Some(ovr) if ovr.valid_until > now => ovr.value,
            _ => self.current_temperature,
        }
    }

    pub fn set_override(&mut self, value: f64, valid_until: DateTime<Utc>) {
        self.temperature_override = Some(TemperatureOverride { value, valid_until });
    }

    /// Drop the override if it has expired.
    pub fn expire_override(&mut self, now: DateTime<Utc>) {
        if let Some(ovr) = self.temperature_override {
            if ovr.valid_until <= now {
                self.temperature_override = None;
            }
        }
    }
}

/// Default heater element rating by tank size. Unlisted sizes get the
/// mid-range 3 kW element.
pub fn default_power_kw(capacity_liters: f64) -> f64 {
    match capacity_liters as i64 {
        50 => 2.0,
        100 => 3.0,
        150 => 4.0,
        _ => 3.0,
    }
}
