#![deny(warnings)]

//! Core model of a periodic-review replenishment policy.
//!
//! A [`SimulationConfig`] is driven day by day through the
//! [`ReplenishmentSimulator`], producing a [`SimulationResult`] with one
//! [`DayRecord`] per calendar day, every [`Order`] placed and a chronological
//! event log. [`analyze_trend`] classifies the tail of that trajectory.
//!
//! Everything here is deterministic: the same configuration (with a fixed
//! start date) always yields the same trajectory.

pub mod calendar;
pub mod config;
pub mod simulator;
pub mod trend;

pub use calendar::{advance_working_days, is_working_day};
pub use config::{check_structure, validate_config, ConfigurationError, SimulationConfig};
pub use simulator::{
    order_quantity, simulate, DayRecord, EventKind, Order, ReplenishmentSimulator,
    SimulationEvent, SimulationResult, SimulationState, SimulationStatistics,
};
pub use trend::{analyze_trend, Trend, TrendAnalysis, DEFAULT_TREND_WINDOW_DAYS};
