//! # Heater Control Policies
//!
//! One boiler, interchangeable controllers. [`ControlPolicy`] is the seam
//! between "what the tank looks like now" and "should the heater run":
//! the rule-based implementation defers to the forecast scheduler's
//! backward search, the learned one to a trained value network.

pub mod service;

use anyhow::{Context, Result};
use chrono::{DateTime, Timelike, Utc};

use crate::domain::{BoilerState, DemandEvent, ForecastSeries, HeaterAction};
use crate::rl::{PolicyCheckpoint, QNetwork, StateVector};
use crate::scheduler::{ForecastScheduler, StartHeating};

pub use service::{ControllerService, ServiceSettings, TaskStatus};

/// Everything a policy may consult for one decision.
pub struct ControlContext<'a> {
    pub now: DateTime<Utc>,
    pub boiler: &'a BoilerState,
    pub forecast: &'a ForecastSeries,
    pub outside_temp_c: f64,
    pub next_event: Option<&'a DemandEvent>,
}

/// State → heater action.
pub trait ControlPolicy: Send + Sync {
    fn decide(&self, ctx: &ControlContext<'_>) -> Result<HeaterAction>;
}

/// Heats exactly inside the window computed by the backward forecast
/// scan: from the recommended start time until the demand event.
pub struct RuleBasedPolicy {
    scheduler: ForecastScheduler,
}

impl RuleBasedPolicy {
    pub fn new(scheduler: ForecastScheduler) -> Self {
        Self { scheduler }
    }
}

impl ControlPolicy for RuleBasedPolicy {
    fn decide(&self, ctx: &ControlContext<'_>) -> Result<HeaterAction> {
        let Some(event) = ctx.next_event else {
            return Ok(HeaterAction::Idle);
        };

        let search = self.scheduler.calc_start_heating_time(
            ctx.boiler,
            ctx.forecast,
            event.at,
            event.required_temperature,
        )?;

        let action = match search {
            StartHeating::StartAt { start, .. } if ctx.now >= start && ctx.now < event.at => {
                HeaterAction::Heat
            }
            _ => HeaterAction::Idle,
        };
        Ok(action)
    }
}

/// Greedy rollout of a trained value network.
pub struct LearnedPolicy {
    network: QNetwork,
    default_target_temp: f64,
    default_users: u32,
}

impl LearnedPolicy {
    pub fn new(network: QNetwork, default_target_temp: f64, default_users: u32) -> Self {
        Self {
            network,
            default_target_temp,
            default_users,
        }
    }

    /// Build from a persisted checkpoint blob. Corruption is fatal.
    pub fn from_checkpoint_blob(
        blob: &[u8],
        default_target_temp: f64,
        default_users: u32,
    ) -> Result<Self> {
        let checkpoint: PolicyCheckpoint =
            bincode::deserialize(blob).context("corrupt policy checkpoint")?;
        Ok(Self::new(
            checkpoint.network,
            default_target_temp,
            default_users,
        ))
    }

    fn observation(&self, ctx: &ControlContext<'_>) -> StateVector {
        let target = ctx
            .next_event
            .map(|e| e.required_temperature)
            .unwrap_or(self.default_target_temp);
        let users = ctx
            .next_event
            .map(|e| e.user_count)
            .unwrap_or(self.default_users);

        [
            ctx.boiler.effective_temperature(ctx.now),
            ctx.outside_temp_c,
            ctx.now.hour() as f64,
            if ctx.boiler.has_solar { 1.0 } else { 0.0 },
            users as f64,
            ctx.boiler.capacity_liters,
            target,
        ]
    }
}

impl ControlPolicy for LearnedPolicy {
    fn decide(&self, ctx: &ControlContext<'_>) -> Result<HeaterAction> {
        let observation = self.observation(ctx);
        Ok(HeaterAction::from_index(self.network.argmax(&observation)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BoilerKey, ForecastPoint};
    use crate::scheduler::SchedulerConfig;
    use chrono::TimeZone;

    fn ts(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, hour, minute, 0).unwrap()
    }

    fn boiler() -> BoilerState {
        BoilerState::new("b", 100.0, false, Some(3.0)).unwrap()
    }

    fn forecast(points: &[(u32, f64)]) -> ForecastSeries {
        let key = BoilerKey::new(100, false);
        ForecastSeries::new(
            points
                .iter()
                .map(|(h, t)| ForecastPoint::new(ts(*h, 0)).with_temperature(key, *t))
                .collect(),
        )
    }

    #[test]
    fn test_rule_policy_heats_inside_window() {
        let policy = RuleBasedPolicy::new(ForecastScheduler::new(SchedulerConfig::default()));
        let b = boiler();
        // 40°C at 10:00 against a 50°C 12:00 target → start ≈ 10:27.
        let series = forecast(&[(10, 40.0)]);
        let event = DemandEvent::new(ts(12, 0), 50.0, 2, 40.0);

        let before = ControlContext {
            now: ts(10, 10),
            boiler: &b,
            forecast: &series,
            outside_temp_c: 20.0,
            next_event: Some(&event),
        };
        assert_eq!(policy.decide(&before).unwrap(), HeaterAction::Idle);

        let inside = ControlContext {
            now: ts(11, 0),
            boiler: &b,
            forecast: &series,
            outside_temp_c: 20.0,
            next_event: Some(&event),
        };
        assert_eq!(policy.decide(&inside).unwrap(), HeaterAction::Heat);
    }

    #[test]
    fn test_rule_policy_idle_without_demand() {
        let policy = RuleBasedPolicy::new(ForecastScheduler::new(SchedulerConfig::default()));
        let b = boiler();
        let series = forecast(&[(10, 40.0)]);

        let ctx = ControlContext {
            now: ts(11, 0),
            boiler: &b,
            forecast: &series,
            outside_temp_c: 20.0,
            next_event: None,
        };
        assert_eq!(policy.decide(&ctx).unwrap(), HeaterAction::Idle);
    }

    #[test]
    fn test_learned_policy_round_trips_checkpoint() {
        use crate::rl::{AgentConfig, DqnAgent};

        let agent = DqnAgent::new(
            AgentConfig {
                hidden_units: 8,
                ..Default::default()
            },
            Some(5),
        );
        let blob = bincode::serialize(&agent.checkpoint(1)).unwrap();

        let policy = LearnedPolicy::from_checkpoint_blob(&blob, 65.0, 2).unwrap();
        let b = boiler();
        let series = forecast(&[(10, 40.0)]);
        let ctx = ControlContext {
            now: ts(11, 0),
            boiler: &b,
            forecast: &series,
            outside_temp_c: 20.0,
            next_event: None,
        };

        // Decision must match the agent's greedy action on the same state.
        let observation = policy.observation(&ctx);
        assert_eq!(
            policy.decide(&ctx).unwrap(),
            agent.greedy_action(&observation)
        );
    }

    #[test]
    fn test_learned_policy_rejects_corrupt_blob() {
        assert!(LearnedPolicy::from_checkpoint_blob(b"garbage", 65.0, 2).is_err());
    }
}
