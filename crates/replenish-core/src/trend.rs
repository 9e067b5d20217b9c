//! Trend classification over the tail of a stock trajectory.

use crate::simulator::DayRecord;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Window used when callers have no preference.
pub const DEFAULT_TREND_WINDOW_DAYS: usize = 30;

/// Average daily change strictly below this is a descending trend.
const DESCENDING_BELOW: f64 = -0.1;
/// Average daily change strictly above this is an ascending trend.
const ASCENDING_ABOVE: f64 = 0.5;
/// Projected stockouts further out than this are reported as long-term.
const STOCKOUT_HORIZON_DAYS: f64 = 60.0;

/// Direction of the stock level over an analysis window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Descending,
    Stable,
    Ascending,
    /// Empty window.
    Unknown,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Trend::Descending => "descending",
            Trend::Stable => "stable",
            Trend::Ascending => "ascending",
            Trend::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of [`analyze_trend`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrendAnalysis {
    pub trend: Trend,
    /// Not descending and no stockout inside the window.
    pub is_viable: bool,
    pub avg_change_per_day: f64,
    pub final_vs_initial: f64,
    /// Stock at the start of the window's first day.
    pub initial_stock: f64,
    /// Stock at the end of the window's last day.
    pub final_stock: f64,
    pub stockouts_in_period: usize,
    /// Window actually analysed, after clamping to the trajectory length.
    pub window_days: usize,
    /// Days until stock runs out at the current rate; descending trends only.
    pub days_to_stockout: Option<f64>,
    pub description: String,
}

/// Classify the last `window_days` records of a trajectory.
///
/// The window is clamped to the number of records available. A stockout
/// anywhere in the window makes the trajectory non-viable whatever its trend.
pub fn analyze_trend(days: &[DayRecord], window_days: usize) -> TrendAnalysis {
    let window = window_days.min(days.len());
    if window == 0 {
        return TrendAnalysis {
            trend: Trend::Unknown,
            is_viable: false,
            avg_change_per_day: 0.0,
            final_vs_initial: 0.0,
            initial_stock: 0.0,
            final_stock: 0.0,
            stockouts_in_period: 0,
            window_days: 0,
            days_to_stockout: None,
            description: "not enough data".to_string(),
        };
    }

    let period = &days[days.len() - window..];
    let initial_stock = period[0].stock_start;
    let final_stock = period[window - 1].stock_end;
    let total_change = final_stock - initial_stock;
    let avg_change = total_change / window as f64;

    let descending = avg_change < DESCENDING_BELOW;
    let (trend, mut is_viable, days_to_stockout, mut description) = if descending {
        // negative once the window already ends in deficit
        let days_left = final_stock / avg_change.abs();
        let outlook = if days_left <= 0.0 {
            "already out of stock".to_string()
        } else if days_left < STOCKOUT_HORIZON_DAYS {
            format!("stockout expected in ~{} days", days_left as u64)
        } else {
            "not sustainable long term".to_string()
        };
        (
            Trend::Descending,
            false,
            Some(days_left),
            format!("stock falling ({avg_change:+.2} units/day), {outlook}"),
        )
    } else if avg_change > ASCENDING_ABOVE {
        (
            Trend::Ascending,
            true,
            None,
            format!("stock rising ({avg_change:+.2} units/day)"),
        )
    } else {
        (
            Trend::Stable,
            true,
            None,
            format!("stock stable ({avg_change:+.2} units/day)"),
        )
    };

    let stockouts_in_period = period.iter().filter(|d| d.stockout).count();
    if stockouts_in_period > 0 {
        is_viable = false;
        description.push_str(&format!(
            "; {stockouts_in_period} stockout day(s) in window"
        ));
    }

    TrendAnalysis {
        trend,
        is_viable,
        avg_change_per_day: avg_change,
        final_vs_initial: total_change,
        initial_stock,
        final_stock,
        stockouts_in_period,
        window_days: window,
        days_to_stockout,
        description,
    }
}
