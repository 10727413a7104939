//! # Boiler Heating Controller
//!
//! Decides when to run the heater of a hot-water storage tank so that
//! scheduled demand (showers at known times, user counts, target
//! temperatures) is met at minimum energy cost.
//!
//! Two controllers share one boiler model:
//! - [`scheduler`]: a rule-based backward search over an external
//!   temperature forecast, producing a per-event recommendation table.
//! - [`rl`]: a value-based agent trained against a simulated rendition of
//!   the same thermal dynamics.

pub mod config;
pub mod controller;
pub mod domain;
pub mod forecast;
pub mod rl;
pub mod scheduler;
pub mod storage;
pub mod telemetry;
pub mod thermal;
