//! Equilibrium search: how far consumption can rise, and how small the
//! order capacity can get, before the policy stops being sustainable.

use crate::viability::{run_probe, BlockTrendViability, Probe, ViabilityCheck};
use replenish_core::{
    analyze_trend, simulate, ConfigurationError, SimulationConfig, SimulationResult, Trend,
    DEFAULT_TREND_WINDOW_DAYS,
};
use serde::Serialize;
use tracing::{debug, info};

/// Every probe runs over this many days, whatever the caller configured.
pub const EQUILIBRIUM_HORIZON_DAYS: u32 = 60;
/// Lower end of the consumption bracket.
pub const CONSUMPTION_FLOOR: f64 = 0.1;
/// Bisection stops once the bracket is this narrow.
pub const CONSUMPTION_PRECISION: f64 = 0.1;
/// A non-viable capacity is scanned up to this multiple of itself.
const CAPACITY_SCAN_FACTOR: u32 = 3;

/// Trace of the consumption bisection.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConsumptionSearch {
    /// Bracket after seeding with the current consumption.
    pub lower_bound: f64,
    pub upper_bound: f64,
    /// First probe is always the current consumption.
    pub probes: Vec<Probe<f64>>,
    /// Largest probed consumption found viable.
    pub max_viable: Option<f64>,
}

/// Trace of the max-order capacity scan.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CapacitySearch {
    pub current_viable: bool,
    pub first: u32,
    pub last: u32,
    pub step: u32,
    pub probes: Vec<Probe<u32>>,
    /// Smallest scanned capacity found viable.
    pub min_required: Option<u32>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Improvement {
    pub consumption_increase: f64,
    pub consumption_increase_percent: f64,
    pub order_adjustment: i64,
    pub order_adjustment_percent: f64,
}

/// The configuration combining both search results, re-simulated.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OptimalConfiguration {
    pub daily_consumption: f64,
    pub max_order_quantity: u32,
    pub is_viable: bool,
    pub final_stock: f64,
    pub stockouts: u32,
    pub trend: Trend,
    pub improvement: Improvement,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CurrentStatus {
    pub is_viable: bool,
    pub daily_consumption: f64,
    pub max_order_quantity: u32,
    pub final_stock: f64,
    pub average_stock: f64,
    pub min_stock: f64,
    pub stockouts: u32,
    pub trend: Trend,
    pub trend_description: String,
    pub reorder_threshold: f64,
    pub days_above_threshold: usize,
    pub days_above_threshold_percent: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EquilibriumAnalysis {
    pub max_viable_consumption: Option<f64>,
    pub min_required_max_order: Option<u32>,
    /// Current consumption as a percentage of the maximum viable one.
    pub consumption_utilization_rate: f64,
    /// Current capacity as a percentage of the minimum required one.
    pub order_capacity_rate: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TestedScenarios {
    pub oracle: &'static str,
    pub horizon_days: u32,
    pub consumption: ConsumptionSearch,
    pub max_order: CapacitySearch,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EquilibriumReport {
    pub current_status: CurrentStatus,
    pub equilibrium_analysis: EquilibriumAnalysis,
    pub optimal_configuration: Option<OptimalConfiguration>,
    pub tested_scenarios: TestedScenarios,
}

fn percent_of(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}

/// Searches one base configuration with a fixed oracle.
///
/// The base is cloned once with the horizon forced to
/// [`EQUILIBRIUM_HORIZON_DAYS`]; each probe clones it again and changes a
/// single parameter.
#[derive(Clone, Debug)]
pub struct EquilibriumSearch<V = BlockTrendViability> {
    base: SimulationConfig,
    oracle: V,
}

impl EquilibriumSearch {
    pub fn new(config: &SimulationConfig) -> Self {
        Self::with_oracle(config, BlockTrendViability::default())
    }
}

impl<V: ViabilityCheck> EquilibriumSearch<V> {
    pub fn with_oracle(config: &SimulationConfig, oracle: V) -> Self {
        let mut base = config.clone();
        base.simulation_days = EQUILIBRIUM_HORIZON_DAYS;
        Self { base, oracle }
    }

    pub fn base(&self) -> &SimulationConfig {
        &self.base
    }

    pub fn oracle(&self) -> &V {
        &self.oracle
    }

    fn probe_with(
        &self,
        adjust: impl FnOnce(&mut SimulationConfig),
    ) -> Result<(SimulationResult, bool), ConfigurationError> {
        let mut config = self.base.clone();
        adjust(&mut config);
        run_probe(&config, &self.oracle)
    }

    /// Bisect daily consumption over `[0.1, 2 * max_order_quantity]`.
    ///
    /// The current consumption is probed first: if viable it becomes the
    /// lower bound and the initial answer, otherwise the upper bound. The
    /// returned value is always one that was probed, so re-simulating it
    /// yields a viable run.
    pub fn max_viable_consumption(&self) -> Result<ConsumptionSearch, ConfigurationError> {
        let current = self.base.daily_consumption;
        let (result, current_viable) = self.probe_with(|_| {})?;
        let mut probes = vec![Probe::new(current, current_viable, &result)];

        let mut low = CONSUMPTION_FLOOR;
        let mut high = f64::from(self.base.max_order_quantity) * 2.0;
        let mut max_viable = None;
        if current_viable {
            low = current;
            max_viable = Some(current);
        } else {
            high = current;
        }
        let (lower_bound, upper_bound) = (low, high);

        while high - low > CONSUMPTION_PRECISION {
            let mid = (low + high) / 2.0;
            let (result, viable) = self.probe_with(|c| c.daily_consumption = mid)?;
            debug!(
                consumption = mid,
                viable,
                stockouts = result.statistics.stockouts_count,
                "consumption probe"
            );
            probes.push(Probe::new(mid, viable, &result));
            if viable {
                max_viable = Some(mid);
                low = mid;
            } else {
                high = mid;
            }
        }

        Ok(ConsumptionSearch {
            lower_bound,
            upper_bound,
            probes,
            max_viable,
        })
    }

    /// Scan max-order capacities in lot steps, returning the first viable.
    ///
    /// A viable current capacity is scanned from one lot up to itself; a
    /// non-viable one from itself up to three times itself. `None` when no
    /// scanned capacity is viable.
    pub fn min_required_max_order(&self) -> Result<CapacitySearch, ConfigurationError> {
        // runs the structural guards, so `lot` is non-zero below
        let (_, current_viable) = self.probe_with(|_| {})?;
        let lot = self.base.lot_size;
        let current = self.base.max_order_quantity;
        let (first, last) = if current_viable {
            (lot, current)
        } else {
            (current, current.saturating_mul(CAPACITY_SCAN_FACTOR))
        };

        let mut probes = Vec::new();
        let mut min_required = None;
        // the final step may overshoot `last` when the span is not lot-aligned
        for candidate in (first..last.saturating_add(lot)).step_by(lot as usize) {
            let (result, viable) = self.probe_with(|c| c.max_order_quantity = candidate)?;
            debug!(max_order = candidate, viable, "capacity probe");
            probes.push(Probe::new(candidate, viable, &result));
            if viable {
                min_required = Some(candidate);
                break;
            }
        }

        Ok(CapacitySearch {
            current_viable,
            first,
            last,
            step: lot,
            probes,
            min_required,
        })
    }

    /// Re-simulate the base with both search results applied. `None` unless
    /// both searches found a value.
    pub fn optimal_configuration(
        &self,
        max_viable_consumption: Option<f64>,
        min_required_max_order: Option<u32>,
    ) -> Result<Option<OptimalConfiguration>, ConfigurationError> {
        let (Some(consumption), Some(max_order)) = (max_viable_consumption, min_required_max_order)
        else {
            return Ok(None);
        };
        let (result, is_viable) = self.probe_with(|c| {
            c.daily_consumption = consumption;
            c.max_order_quantity = max_order;
        })?;
        let trend = analyze_trend(&result.days, DEFAULT_TREND_WINDOW_DAYS);

        let base_consumption = self.base.daily_consumption;
        let base_order = self.base.max_order_quantity;
        let order_adjustment = i64::from(max_order) - i64::from(base_order);
        Ok(Some(OptimalConfiguration {
            daily_consumption: consumption,
            max_order_quantity: max_order,
            is_viable,
            final_stock: result.statistics.final_stock,
            stockouts: result.statistics.stockouts_count,
            trend: trend.trend,
            improvement: Improvement {
                consumption_increase: consumption - base_consumption,
                consumption_increase_percent: percent_of(
                    consumption - base_consumption,
                    base_consumption,
                ),
                order_adjustment,
                order_adjustment_percent: percent_of(order_adjustment as f64, f64::from(base_order)),
            },
        }))
    }

    /// Evaluate the current configuration and run both searches.
    pub fn run(&self) -> Result<EquilibriumReport, ConfigurationError> {
        info!(
            consumption = self.base.daily_consumption,
            max_order = self.base.max_order_quantity,
            oracle = self.oracle.name(),
            "equilibrium search started"
        );
        let current = simulate(&self.base)?;
        let is_viable = self.oracle.is_viable(&current);
        let trend = analyze_trend(&current.days, DEFAULT_TREND_WINDOW_DAYS);
        let threshold = self.base.reorder_threshold;
        let days_above_threshold = current.days_at_or_above(threshold);
        let stats = &current.statistics;
        let current_status = CurrentStatus {
            is_viable,
            daily_consumption: self.base.daily_consumption,
            max_order_quantity: self.base.max_order_quantity,
            final_stock: stats.final_stock,
            average_stock: stats.average_stock,
            min_stock: stats.min_stock,
            stockouts: stats.stockouts_count,
            trend: trend.trend,
            trend_description: trend.description,
            reorder_threshold: threshold,
            days_above_threshold,
            days_above_threshold_percent: percent_of(
                days_above_threshold as f64,
                current.days.len() as f64,
            ),
        };

        let consumption = self.max_viable_consumption()?;
        let max_order = self.min_required_max_order()?;
        let max_viable_consumption = consumption.max_viable;
        let min_required_max_order = max_order.min_required;
        let equilibrium_analysis = EquilibriumAnalysis {
            max_viable_consumption,
            min_required_max_order,
            consumption_utilization_rate: max_viable_consumption
                .map_or(0.0, |max| percent_of(self.base.daily_consumption, max)),
            order_capacity_rate: min_required_max_order.map_or(0.0, |min| {
                percent_of(f64::from(self.base.max_order_quantity), f64::from(min))
            }),
        };
        let optimal_configuration =
            self.optimal_configuration(max_viable_consumption, min_required_max_order)?;

        info!(
            viable = is_viable,
            max_viable_consumption = ?max_viable_consumption,
            min_required_max_order = ?min_required_max_order,
            probes = consumption.probes.len() + max_order.probes.len(),
            "equilibrium search finished"
        );

        Ok(EquilibriumReport {
            current_status,
            equilibrium_analysis,
            optimal_configuration,
            tested_scenarios: TestedScenarios {
                oracle: self.oracle.name(),
                horizon_days: EQUILIBRIUM_HORIZON_DAYS,
                consumption,
                max_order,
            },
        })
    }
}

/// Run the equilibrium search with the block-trend oracle.
pub fn calculate_equilibrium(
    config: &SimulationConfig,
) -> Result<EquilibriumReport, ConfigurationError> {
    EquilibriumSearch::new(config).run()
}
