//! # Reinforcement-Learning Controller
//!
//! A learned alternative to the rule-based forecast scheduler: a
//! value-based agent trained against a simulated rendition of the boiler
//! thermal dynamics. Training is an offline batch process; the resulting
//! policy checkpoint can drive the heater through
//! [`crate::controller::LearnedPolicy`].

pub mod agent;
pub mod environment;
pub mod network;
pub mod replay;
pub mod trainer;

pub use agent::{AgentConfig, DqnAgent, PolicyCheckpoint};
pub use environment::{
    synthetic_outside_temps, BoilerEnvironment, EnvironmentConfig, StateVector, STATE_DIM,
};
pub use network::QNetwork;
pub use replay::{ReplayBuffer, Transition};
pub use trainer::{EvaluationSummary, Trainer, TrainingConfig, TrainingSummary};
