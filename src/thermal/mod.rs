//! # Boiler Thermal Model
//!
//! Heating and cooling physics over a [`BoilerState`]. Both operations are
//! deterministic given their inputs; out-of-range inputs are clamped to
//! physically valid bounds and logged, never fatal.

use tracing::warn;

use crate::domain::{BoilerState, MAX_TEMP_C};

/// Specific heat capacity of water (kJ/kg°C).
pub const SPECIFIC_HEAT_KJ_PER_KG_C: f64 = 4.186;

/// Fraction of electrical input that ends up in the water.
pub const HEATER_EFFICIENCY: f64 = 0.9;

/// Upper bound on a single heating integration step (minutes).
pub const MAX_STEP_MINUTES: f64 = 60.0;

pub struct ThermalModel;

impl ThermalModel {
    /// Heat the tank for `duration_minutes` starting from
    /// `start_temperature`, integrating in steps of at most
    /// [`MAX_STEP_MINUTES`].
    ///
    /// Per step: ΔT = (P·1000/60)·step·η / (m·c), clamped at
    /// [`MAX_TEMP_C`]. The loop stops when the duration is exhausted or
    /// the ceiling is reached. Each step's temperature is appended to the
    /// boiler's rolling history.
    ///
    /// A powered-off boiler is a reported no-op: the start temperature is
    /// returned unchanged.
    pub fn heat(boiler: &mut BoilerState, duration_minutes: f64, start_temperature: f64) -> f64 {
        if !boiler.is_on() {
            warn!(boiler = %boiler.name, "boiler is off, cannot heat");
            return start_temperature;
        }

        let mass_kg = boiler.capacity_liters;
        let power_kj_per_min = boiler.power_rating_kw * 1000.0 / 60.0;

        let mut current_temp = start_temperature;
        let mut remaining = duration_minutes;

        while remaining > 0.0 && current_temp < MAX_TEMP_C {
            let step = remaining.min(MAX_STEP_MINUTES);
            let energy_kj = power_kj_per_min * step * HEATER_EFFICIENCY;
            let delta_t = energy_kj / (mass_kg * SPECIFIC_HEAT_KJ_PER_KG_C);

            current_temp = (current_temp + delta_t).min(MAX_TEMP_C);
            remaining -= step;

            boiler.history.push(current_temp);
        }

        boiler.set_temperature(current_temp);
        current_temp
    }

    /// Cool the tank after `used_liters` of hot water are replaced by cold
    /// inlet water, by conservation-of-heat mixing:
    ///
    /// new = (remaining·current + used·cold) / capacity
    ///
    /// `used_liters` is clamped to `[0, capacity]`. The result is rounded
    /// to 2 decimals and appended to the history.
    pub fn cool(
        boiler: &mut BoilerState,
        current_temperature: f64,
        used_liters: f64,
        cold_water_temperature: f64,
    ) -> f64 {
        let capacity = boiler.capacity_liters;

        let used = if used_liters < 0.0 {
            warn!(
                boiler = %boiler.name,
                used_liters, "negative usage volume, clamping to 0"
            );
            0.0
        } else if used_liters > capacity {
            warn!(
                boiler = %boiler.name,
                used_liters, capacity, "used more water than boiler capacity"
            );
            capacity
        } else {
            used_liters
        };

        let remaining = capacity - used;
        let new_temp =
            (remaining * current_temperature + used * cold_water_temperature) / capacity;
        let new_temp = (new_temp * 100.0).round() / 100.0;

        boiler.set_temperature(new_temp);
        boiler.history.push(new_temp);
        new_temp
    }

    /// Minutes of heater runtime to raise this boiler's full tank by
    /// `delta_t` degrees. Shared by the scheduler's backward search and
    /// duration bookkeeping.
    pub fn heating_minutes(capacity_liters: f64, power_kw: f64, delta_t: f64) -> f64 {
        let energy_needed_kj = capacity_liters * SPECIFIC_HEAT_KJ_PER_KG_C * delta_t;
        let power_kj_per_min = power_kw * 1000.0 / 60.0;
        energy_needed_kj / (power_kj_per_min * HEATER_EFFICIENCY)
    }
}
