//! Step-wise stability suggestions.
//!
//! A coarser search than [`crate::equilibrium`]: consumption is lowered in
//! half-unit steps and order capacity raised one lot at a time, each probe
//! judged by the trailing-window oracle.

use crate::viability::{run_probe, ViabilityCheck, WindowTrendViability};
use replenish_core::{check_structure, ConfigurationError, SimulationConfig};
use serde::Serialize;
use tracing::debug;

pub const STABILITY_HORIZON_DAYS: u32 = 60;
pub const CONSUMPTION_STEP: f64 = 0.5;
/// Consumption is not lowered below this.
pub const MIN_TESTED_CONSUMPTION: f64 = 0.5;
/// Order capacity is not raised above this.
pub const MAX_ORDER_CEILING: u32 = 50;

/// One suggested (or confirmed) parameter value.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Solution {
    ReduceConsumption {
        current_value: f64,
        suggested_value: f64,
    },
    ConsumptionOk {
        current_value: f64,
    },
    IncreaseMaxOrder {
        current_value: u32,
        suggested_value: u32,
    },
    MaxOrderOk {
        current_value: u32,
    },
}

impl Solution {
    /// Whether applying this solution changes the configuration.
    pub fn is_change(&self) -> bool {
        matches!(
            self,
            Solution::ReduceConsumption { .. } | Solution::IncreaseMaxOrder { .. }
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StabilityStatus {
    /// Current values already pass.
    Stable,
    /// At least one parameter should change.
    Adjust,
    /// Neither search found a passing value.
    NoSolution,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StabilitySolutions {
    pub current_consumption: f64,
    pub current_max_order: u32,
    pub max_viable_consumption: Option<f64>,
    pub min_required_max_order: Option<u32>,
    pub solutions: Vec<Solution>,
    pub status: StabilityStatus,
}

/// Suggest stabilising changes using the trailing-window oracle.
pub fn find_stability_solutions(
    config: &SimulationConfig,
) -> Result<StabilitySolutions, ConfigurationError> {
    find_stability_solutions_with(config, &WindowTrendViability::default())
}

pub fn find_stability_solutions_with<V: ViabilityCheck + ?Sized>(
    config: &SimulationConfig,
    oracle: &V,
) -> Result<StabilitySolutions, ConfigurationError> {
    check_structure(config)?;
    let mut base = config.clone();
    base.simulation_days = STABILITY_HORIZON_DAYS;

    let current_consumption = base.daily_consumption;
    let mut candidate = current_consumption;
    let max_viable_consumption = loop {
        let probe = SimulationConfig {
            daily_consumption: candidate,
            ..base.clone()
        };
        let (_, viable) = run_probe(&probe, oracle)?;
        debug!(consumption = candidate, viable, "stability consumption probe");
        if viable {
            break Some(candidate);
        }
        candidate -= CONSUMPTION_STEP;
        if candidate < MIN_TESTED_CONSUMPTION {
            break None;
        }
    };

    let lot = base.lot_size;
    let current_max_order = base.max_order_quantity;
    let mut capacity = current_max_order;
    let mut min_required_max_order = None;
    while capacity <= MAX_ORDER_CEILING {
        if capacity % lot != 0 {
            capacity += 1;
            continue;
        }
        let probe = SimulationConfig {
            max_order_quantity: capacity,
            ..base.clone()
        };
        let (_, viable) = run_probe(&probe, oracle)?;
        debug!(max_order = capacity, viable, "stability capacity probe");
        if viable {
            min_required_max_order = Some(capacity);
            break;
        }
        capacity += lot;
    }

    let mut solutions = Vec::new();
    if let Some(value) = max_viable_consumption {
        solutions.push(if value < current_consumption {
            Solution::ReduceConsumption {
                current_value: current_consumption,
                suggested_value: value,
            }
        } else {
            Solution::ConsumptionOk {
                current_value: current_consumption,
            }
        });
    }
    if let Some(value) = min_required_max_order {
        solutions.push(if value > current_max_order {
            Solution::IncreaseMaxOrder {
                current_value: current_max_order,
                suggested_value: value,
            }
        } else {
            Solution::MaxOrderOk {
                current_value: current_max_order,
            }
        });
    }

    let status = if solutions.is_empty() {
        StabilityStatus::NoSolution
    } else if solutions.iter().any(Solution::is_change) {
        StabilityStatus::Adjust
    } else {
        StabilityStatus::Stable
    };

    Ok(StabilitySolutions {
        current_consumption,
        current_max_order,
        max_viable_consumption,
        min_required_max_order,
        solutions,
        status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use replenish_core::simulate;

    fn overloaded() -> SimulationConfig {
        SimulationConfig {
            daily_consumption: 14.0,
            initial_stock: 0.0,
            reorder_threshold: 36.0,
            max_stock: 45.0,
            min_order_quantity: 2,
            max_order_quantity: 10,
            lot_size: 2,
            delivery_lead_time_days: 3,
            simulation_days: 60,
            min_stock_to_start_sales: 36.0,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1),
        }
    }

    fn window_viable(config: &SimulationConfig) -> bool {
        WindowTrendViability::default().is_viable(&simulate(config).unwrap())
    }

    #[test]
    fn slow_consumption_is_stable() {
        let cfg = SimulationConfig {
            daily_consumption: 0.05,
            initial_stock: 40.0,
            reorder_threshold: 10.0,
            ..overloaded()
        };
        let found = find_stability_solutions(&cfg).unwrap();
        assert_eq!(found.max_viable_consumption, Some(0.05));
        assert_eq!(found.min_required_max_order, Some(10));
        assert_eq!(
            found.solutions,
            vec![
                Solution::ConsumptionOk {
                    current_value: 0.05
                },
                Solution::MaxOrderOk { current_value: 10 },
            ]
        );
        assert_eq!(found.status, StabilityStatus::Stable);
    }

    #[test]
    fn overloaded_consumption_is_reduced() {
        let cfg = overloaded();
        let found = find_stability_solutions(&cfg).unwrap();
        let suggested = found.max_viable_consumption.unwrap();
        assert!(suggested < 14.0);
        assert_eq!((14.0 - suggested) % CONSUMPTION_STEP, 0.0);
        assert!(window_viable(&SimulationConfig {
            daily_consumption: suggested,
            ..cfg
        }));
        assert!(matches!(
            found.solutions[0],
            Solution::ReduceConsumption {
                current_value,
                ..
            } if current_value == 14.0
        ));
        assert_eq!(found.status, StabilityStatus::Adjust);
    }

    #[test]
    fn capacity_scan_skips_misaligned_values() {
        let cfg = SimulationConfig {
            daily_consumption: 1.0,
            initial_stock: 40.0,
            reorder_threshold: 30.0,
            max_order_quantity: 9,
            ..overloaded()
        };
        let found = find_stability_solutions(&cfg).unwrap();
        // 9 is skipped, 10 fails, 12 is the first passing lot multiple
        assert_eq!(found.min_required_max_order, Some(12));
        assert_eq!(found.max_viable_consumption, Some(1.0));
        assert_eq!(
            found.solutions,
            vec![
                Solution::ConsumptionOk { current_value: 1.0 },
                Solution::IncreaseMaxOrder {
                    current_value: 9,
                    suggested_value: 12
                },
            ]
        );
        assert_eq!(found.status, StabilityStatus::Adjust);
    }

    #[test]
    fn nothing_found_reports_no_solution() {
        struct Never;
        impl ViabilityCheck for Never {
            fn name(&self) -> &'static str {
                "never"
            }
            fn is_viable(&self, _: &replenish_core::SimulationResult) -> bool {
                false
            }
        }
        let found = find_stability_solutions_with(&overloaded(), &Never).unwrap();
        assert!(found.solutions.is_empty());
        assert_eq!(found.status, StabilityStatus::NoSolution);
    }

    #[test]
    fn zero_lot_size_is_an_error() {
        let cfg = SimulationConfig {
            lot_size: 0,
            ..overloaded()
        };
        assert_eq!(
            find_stability_solutions(&cfg).unwrap_err(),
            ConfigurationError::ZeroLotSize
        );
    }

    #[test]
    fn solutions_serialize_with_type_tag() {
        let json = serde_json::to_value(Solution::IncreaseMaxOrder {
            current_value: 10,
            suggested_value: 12,
        })
        .unwrap();
        assert_eq!(json["type"], "increase_max_order");
        assert_eq!(json["suggested_value"], 12);
    }
}
