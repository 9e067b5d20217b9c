//! Viability oracles.
//!
//! Two predicates decide whether a trajectory is sustainable. They use
//! different windows and thresholds and can disagree on the same run, so
//! every search names the one it uses.

use replenish_core::{
    analyze_trend, simulate, ConfigurationError, SimulationConfig, SimulationResult, Trend,
    DEFAULT_TREND_WINDOW_DAYS,
};
use serde::Serialize;

/// A verdict on whether a simulated trajectory is sustainable.
pub trait ViabilityCheck {
    /// Short identifier used in logs and search traces.
    fn name(&self) -> &'static str;

    fn is_viable(&self, result: &SimulationResult) -> bool;
}

/// Compares the mean stock of the first and second half of a run, measured
/// on non-overlapping blocks of end-of-day stock.
///
/// Viable when the second half is no more than `tolerance` (a fraction of
/// the first-half mean) below the first half and the run had no stockout.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BlockTrendViability {
    pub block_days: usize,
    /// Shorter runs are never viable.
    pub min_days: usize,
    /// Fewer complete blocks are never viable.
    pub min_blocks: usize,
    pub tolerance: f64,
}

impl Default for BlockTrendViability {
    fn default() -> Self {
        Self {
            block_days: 3,
            min_days: 60,
            min_blocks: 10,
            tolerance: 0.05,
        }
    }
}

impl BlockTrendViability {
    /// Mean end-of-day stock of each complete block, in order. A trailing
    /// partial block is dropped.
    pub fn block_means(&self, result: &SimulationResult) -> Vec<f64> {
        let size = self.block_days.max(1);
        result
            .days
            .chunks_exact(size)
            .map(|block| block.iter().map(|d| d.stock_end).sum::<f64>() / size as f64)
            .collect()
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

impl ViabilityCheck for BlockTrendViability {
    fn name(&self) -> &'static str {
        "block_trend"
    }

    fn is_viable(&self, result: &SimulationResult) -> bool {
        if result.days.len() < self.min_days {
            return false;
        }
        let means = self.block_means(result);
        if means.len() < self.min_blocks.max(2) {
            return false;
        }
        let (first, second) = means.split_at(means.len() / 2);
        let first_mean = mean(first);
        let second_mean = mean(second);
        if second_mean < first_mean - self.tolerance * first_mean {
            return false;
        }
        result.statistics.stockouts_count == 0
    }
}

/// Stable or ascending over the trailing window (see
/// [`replenish_core::analyze_trend`]) and no stockout over the whole run.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WindowTrendViability {
    pub window_days: usize,
}

impl Default for WindowTrendViability {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_TREND_WINDOW_DAYS,
        }
    }
}

impl ViabilityCheck for WindowTrendViability {
    fn name(&self) -> &'static str {
        "window_trend"
    }

    fn is_viable(&self, result: &SimulationResult) -> bool {
        if result.statistics.stockouts_count > 0 {
            return false;
        }
        matches!(
            analyze_trend(&result.days, self.window_days).trend,
            Trend::Stable | Trend::Ascending
        )
    }
}

/// One oracle call made by a search.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Probe<T> {
    pub value: T,
    pub viable: bool,
    pub stockouts: u32,
    pub final_stock: f64,
}

impl<T> Probe<T> {
    pub fn new(value: T, viable: bool, result: &SimulationResult) -> Self {
        Self {
            value,
            viable,
            stockouts: result.statistics.stockouts_count,
            final_stock: result.statistics.final_stock,
        }
    }
}

/// Simulate `config` and ask `oracle` for a verdict.
pub fn run_probe<V: ViabilityCheck + ?Sized>(
    config: &SimulationConfig,
    oracle: &V,
) -> Result<(SimulationResult, bool), ConfigurationError> {
    let result = simulate(config)?;
    let viable = oracle.is_viable(&result);
    Ok((result, viable))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Days, NaiveDate};
    use replenish_core::{DayRecord, SimulationStatistics};

    fn run_from_ends(start: f64, ends: &[f64]) -> SimulationResult {
        let first = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut previous = start;
        let mut days = Vec::with_capacity(ends.len());
        for (i, &end) in ends.iter().enumerate() {
            days.push(DayRecord {
                date: first + Days::new(i as u64),
                weekday: String::new(),
                is_working_day: true,
                opening_stock: previous,
                stock_start: previous,
                deliveries: 0.0,
                consumption: previous - end,
                stock_end: end,
                order_placed: false,
                order_quantity: 0,
                order_id: None,
                delivery_id: None,
                threshold_crossed: false,
                stockout: end < 0.0,
            });
            previous = end;
        }
        SimulationResult {
            events: vec![],
            orders: vec![],
            statistics: SimulationStatistics {
                final_stock: previous,
                stockouts_count: days.iter().filter(|d| d.stockout).count() as u32,
                ..SimulationStatistics::default()
            },
            days,
        }
    }

    fn halves(first: f64, second: f64) -> Vec<f64> {
        let mut ends = vec![first; 30];
        ends.extend(std::iter::repeat(second).take(30));
        ends
    }

    #[test]
    fn short_runs_are_not_viable() {
        let oracle = BlockTrendViability::default();
        assert!(!oracle.is_viable(&run_from_ends(40.0, &[40.0; 59])));
        assert!(oracle.is_viable(&run_from_ends(40.0, &[40.0; 60])));
    }

    #[test]
    fn block_means_drop_partial_block() {
        let oracle = BlockTrendViability::default();
        let run = run_from_ends(0.0, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
        assert_eq!(oracle.block_means(&run), vec![2.0, 5.0]);
    }

    #[test]
    fn too_few_blocks_are_not_viable() {
        let oracle = BlockTrendViability {
            min_days: 0,
            ..BlockTrendViability::default()
        };
        assert!(!oracle.is_viable(&run_from_ends(40.0, &[40.0; 29])));
        assert!(oracle.is_viable(&run_from_ends(40.0, &[40.0; 30])));
    }

    #[test]
    fn five_percent_tolerance() {
        let oracle = BlockTrendViability::default();
        assert!(oracle.is_viable(&run_from_ends(100.0, &halves(100.0, 96.0))));
        assert!(oracle.is_viable(&run_from_ends(100.0, &halves(100.0, 95.0))));
        assert!(!oracle.is_viable(&run_from_ends(100.0, &halves(100.0, 94.0))));
        assert!(oracle.is_viable(&run_from_ends(0.0, &halves(10.0, 40.0))));
    }

    #[test]
    fn stockouts_fail_both_oracles() {
        let mut ends = vec![40.0; 60];
        ends[5] = -1.0;
        let run = run_from_ends(40.0, &ends);
        assert!(!BlockTrendViability::default().is_viable(&run));
        assert!(!WindowTrendViability::default().is_viable(&run));
    }

    #[test]
    fn oracles_can_disagree() {
        // flat, then a slow slide of 4 units over the last 30 days
        let mut ends = vec![100.0; 30];
        ends.extend((1..=30).map(|i| 100.0 - 4.0 * i as f64 / 30.0));
        let run = run_from_ends(100.0, &ends);
        assert!(BlockTrendViability::default().is_viable(&run));
        assert!(!WindowTrendViability::default().is_viable(&run));
    }

    #[test]
    fn window_oracle_accepts_stable_runs() {
        let run = run_from_ends(40.0, &[40.0; 45]);
        let oracle = WindowTrendViability::default();
        assert_eq!(oracle.name(), "window_trend");
        assert!(oracle.is_viable(&run));
    }
}
