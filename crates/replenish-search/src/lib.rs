#![deny(warnings)]

//! Parameter searches over the replenishment simulator.
//!
//! Each search treats [`replenish_core::simulate`] plus a [`ViabilityCheck`]
//! as an oracle and probes mutated copies of one base configuration.
//! [`calculate_equilibrium`] uses the block-trend oracle;
//! [`find_stability_solutions`] and [`analyze_configuration`] use the
//! trailing-window one.

pub mod analysis;
pub mod equilibrium;
pub mod stability;
pub mod viability;

pub use analysis::{analyze_configuration, AnalysisMetrics, ConfigurationAnalysis};
pub use equilibrium::{
    calculate_equilibrium, CapacitySearch, ConsumptionSearch, CurrentStatus, EquilibriumAnalysis,
    EquilibriumReport, EquilibriumSearch, Improvement, OptimalConfiguration, TestedScenarios,
    EQUILIBRIUM_HORIZON_DAYS,
};
pub use stability::{
    find_stability_solutions, find_stability_solutions_with, Solution, StabilitySolutions,
    StabilityStatus,
};
pub use viability::{run_probe, BlockTrendViability, Probe, ViabilityCheck, WindowTrendViability};
