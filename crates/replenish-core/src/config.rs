//! Replenishment policy configuration and its guards.

use chrono::{Days, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Parameters of one simulation run.
///
/// A configuration is a plain value: searches clone it and mutate the clone,
/// so one probe never observes another probe's parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Units consumed per calendar day once sales have started (>= 0).
    pub daily_consumption: f64,
    /// Stock on hand on the first simulated day (>= 0).
    pub initial_stock: f64,
    /// Order when the stock projected at the delivery date is at or below this.
    pub reorder_threshold: f64,
    /// Stock level an order should not push the projected stock above.
    pub max_stock: f64,
    /// Smallest quantity per order; a multiple of `lot_size`.
    pub min_order_quantity: u32,
    /// Largest quantity per order (before flooring to `lot_size`).
    pub max_order_quantity: u32,
    /// Order quantities are multiples of this (> 0).
    pub lot_size: u32,
    /// Working days between placing an order and receiving it (> 0).
    pub delivery_lead_time_days: u32,
    /// Number of calendar days to simulate.
    pub simulation_days: u32,
    /// Stock required before sales begin on a cold start from zero stock.
    pub min_stock_to_start_sales: f64,
    /// First simulated day; today's local date when absent.
    pub start_date: Option<NaiveDate>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            daily_consumption: 4.25,
            initial_stock: 0.0,
            reorder_threshold: 36.0,
            max_stock: 45.0,
            min_order_quantity: 2,
            max_order_quantity: 10,
            lot_size: 2,
            delivery_lead_time_days: 3,
            simulation_days: 60,
            min_stock_to_start_sales: 36.0,
            start_date: None,
        }
    }
}

impl SimulationConfig {
    /// The configured start date, or the current local date.
    pub fn resolved_start_date(&self) -> NaiveDate {
        self.start_date.unwrap_or_else(|| Local::now().date_naive())
    }

    /// Round `quantity` down to a multiple of `lot_size`.
    ///
    /// Fractional quantities are truncated toward zero first, then floored to
    /// the lot, so negative inputs floor away from zero.
    pub fn floor_to_lot(&self, quantity: f64) -> i64 {
        let lot = i64::from(self.lot_size.max(1));
        (quantity.trunc() as i64).div_euclid(lot) * lot
    }
}

/// Configuration faults. Stockouts and declining stock are not errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigurationError {
    /// Lot size of zero would make every quantity undefined.
    #[error("lot size must be > 0")]
    ZeroLotSize,
    /// A zero lead time would deliver on the order day after intake has run.
    #[error("delivery lead time must be > 0 working days")]
    ZeroLeadTime,
    /// Daily consumption below zero.
    #[error("daily consumption must be >= 0, got {0}")]
    NegativeConsumption(f64),
    /// Numeric field is NaN or infinite.
    #[error("field `{0}` must be finite")]
    NonFinite(&'static str),
    /// Minimum order quantity not divisible by the lot size.
    #[error("min order quantity {min} is not a multiple of lot size {lot}")]
    MinOrderNotLotMultiple { min: u32, lot: u32 },
    /// Maximum order quantity below the minimum.
    #[error("max order quantity {max} is below min order quantity {min}")]
    MaxBelowMin { min: u32, max: u32 },
    /// With stock on hand, the threshold must sit below the initial stock.
    #[error("reorder threshold {threshold} must be below initial stock {initial}")]
    ThresholdNotBelowInitialStock { threshold: f64, initial: f64 },
    /// The horizon plus the last lead time runs past the calendar's end.
    #[error("{days} days from {start} run past the last representable date")]
    HorizonOutOfRange { start: NaiveDate, days: u32 },
}

/// Structural guards the simulator needs to run at all.
pub fn check_structure(config: &SimulationConfig) -> Result<(), ConfigurationError> {
    let reals = [
        ("daily_consumption", config.daily_consumption),
        ("initial_stock", config.initial_stock),
        ("reorder_threshold", config.reorder_threshold),
        ("max_stock", config.max_stock),
        ("min_stock_to_start_sales", config.min_stock_to_start_sales),
    ];
    for (name, value) in reals {
        if !value.is_finite() {
            return Err(ConfigurationError::NonFinite(name));
        }
    }
    if config.lot_size == 0 {
        return Err(ConfigurationError::ZeroLotSize);
    }
    if config.delivery_lead_time_days == 0 {
        return Err(ConfigurationError::ZeroLeadTime);
    }
    if config.daily_consumption < 0.0 {
        return Err(ConfigurationError::NegativeConsumption(
            config.daily_consumption,
        ));
    }
    // every 7 calendar days hold at most one Sunday, so a lead time of n
    // working days spans at most n + n / 6 + 1 calendar days
    let lead = u64::from(config.delivery_lead_time_days);
    let span = u64::from(config.simulation_days) + lead + lead / 6 + 1;
    let start = config.resolved_start_date();
    if start.checked_add_days(Days::new(span)).is_none() {
        return Err(ConfigurationError::HorizonOutOfRange {
            start,
            days: config.simulation_days,
        });
    }
    Ok(())
}

/// Structural guards plus the constraints callers are expected to enforce
/// before submitting a configuration.
pub fn validate_config(config: &SimulationConfig) -> Result<(), ConfigurationError> {
    check_structure(config)?;
    if config.min_order_quantity % config.lot_size != 0 {
        return Err(ConfigurationError::MinOrderNotLotMultiple {
            min: config.min_order_quantity,
            lot: config.lot_size,
        });
    }
    if config.max_order_quantity < config.min_order_quantity {
        return Err(ConfigurationError::MaxBelowMin {
            min: config.min_order_quantity,
            max: config.max_order_quantity,
        });
    }
    if config.initial_stock > 0.0 && config.reorder_threshold >= config.initial_stock {
        return Err(ConfigurationError::ThresholdNotBelowInitialStock {
            threshold: config.reorder_threshold,
            initial: config.initial_stock,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = SimulationConfig::default();
        assert_eq!(cfg.lot_size, 2);
        assert_eq!(cfg.simulation_days, 60);
        validate_config(&cfg).unwrap();
    }

    #[test]
    fn partial_config_uses_defaults() {
        let cfg: SimulationConfig =
            serde_json::from_str(r#"{"daily_consumption": 2.13, "start_date": "2024-01-01"}"#)
                .unwrap();
        assert_eq!(cfg.daily_consumption, 2.13);
        assert_eq!(cfg.max_order_quantity, 10);
        assert_eq!(cfg.start_date, NaiveDate::from_ymd_opt(2024, 1, 1));
    }

    #[test]
    fn zero_lot_size_is_rejected() {
        let cfg = SimulationConfig {
            lot_size: 0,
            ..SimulationConfig::default()
        };
        assert_eq!(check_structure(&cfg), Err(ConfigurationError::ZeroLotSize));
    }

    #[test]
    fn structural_guards() {
        let base = SimulationConfig::default();
        let nan = SimulationConfig {
            max_stock: f64::NAN,
            ..base.clone()
        };
        assert_eq!(
            check_structure(&nan),
            Err(ConfigurationError::NonFinite("max_stock"))
        );
        let negative = SimulationConfig {
            daily_consumption: -1.0,
            ..base.clone()
        };
        assert!(matches!(
            check_structure(&negative),
            Err(ConfigurationError::NegativeConsumption(_))
        ));
        let no_lead = SimulationConfig {
            delivery_lead_time_days: 0,
            ..base.clone()
        };
        assert_eq!(check_structure(&no_lead), Err(ConfigurationError::ZeroLeadTime));
        let idle = SimulationConfig {
            daily_consumption: 0.0,
            ..base
        };
        assert!(check_structure(&idle).is_ok());
    }

    #[test]
    fn horizon_past_calendar_end_is_rejected() {
        let late = SimulationConfig {
            start_date: Some(NaiveDate::MAX - Days::new(3)),
            simulation_days: 10,
            ..SimulationConfig::default()
        };
        assert!(matches!(
            check_structure(&late),
            Err(ConfigurationError::HorizonOutOfRange { days: 10, .. })
        ));
        let fits = SimulationConfig {
            start_date: Some(NaiveDate::MAX - Days::new(100)),
            ..late
        };
        assert!(check_structure(&fits).is_ok());
    }

    #[test]
    fn caller_constraints() {
        let base = SimulationConfig::default();
        let misaligned = SimulationConfig {
            min_order_quantity: 3,
            ..base.clone()
        };
        assert_eq!(
            validate_config(&misaligned),
            Err(ConfigurationError::MinOrderNotLotMultiple { min: 3, lot: 2 })
        );
        let inverted = SimulationConfig {
            min_order_quantity: 4,
            max_order_quantity: 2,
            ..base.clone()
        };
        assert_eq!(
            validate_config(&inverted),
            Err(ConfigurationError::MaxBelowMin { min: 4, max: 2 })
        );
        let high_threshold = SimulationConfig {
            initial_stock: 20.0,
            reorder_threshold: 20.0,
            ..base.clone()
        };
        assert!(matches!(
            validate_config(&high_threshold),
            Err(ConfigurationError::ThresholdNotBelowInitialStock { .. })
        ));
        // the threshold rule only applies to a warm start
        let cold = SimulationConfig {
            initial_stock: 0.0,
            reorder_threshold: 36.0,
            ..base
        };
        assert!(validate_config(&cold).is_ok());
    }

    #[test]
    fn floor_to_lot_truncates_then_floors() {
        let cfg = SimulationConfig::default();
        assert_eq!(cfg.floor_to_lot(51.39), 50);
        assert_eq!(cfg.floor_to_lot(43.52), 42);
        assert_eq!(cfg.floor_to_lot(1.9), 0);
        assert_eq!(cfg.floor_to_lot(-3.5), -4);
        let lot3 = SimulationConfig {
            lot_size: 3,
            ..cfg
        };
        assert_eq!(lot3.floor_to_lot(10.0), 9);
    }
}
