//! One-shot analysis of a configuration: simulate once, classify the tail,
//! attach stability suggestions and service metrics.

use crate::stability::{find_stability_solutions, StabilitySolutions};
use replenish_core::{
    analyze_trend, simulate, ConfigurationError, SimulationConfig, SimulationStatistics,
    TrendAnalysis,
};
use serde::Serialize;
use tracing::info;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnalysisMetrics {
    /// Mean stock expressed in days of consumption; 0 when nothing is consumed.
    pub average_days_of_stock: f64,
    pub average_order_size: f64,
    /// Orders per week.
    pub order_frequency: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ConfigurationAnalysis {
    pub is_viable: bool,
    /// Percentage of days without a stockout.
    pub service_level: f64,
    pub trend_analysis: TrendAnalysis,
    pub stability_solutions: StabilitySolutions,
    pub metrics: AnalysisMetrics,
    pub statistics: SimulationStatistics,
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Analyse `config` over its own horizon with a trailing window of
/// `window_days`.
pub fn analyze_configuration(
    config: &SimulationConfig,
    window_days: usize,
) -> Result<ConfigurationAnalysis, ConfigurationError> {
    let result = simulate(config)?;
    let trend_analysis = analyze_trend(&result.days, window_days);
    let stability_solutions = find_stability_solutions(config)?;
    let stats = result.statistics;

    let days = result.days.len() as f64;
    let service_level = if days > 0.0 {
        round2((days - f64::from(stats.stockouts_count)) / days * 100.0)
    } else {
        0.0
    };
    let metrics = AnalysisMetrics {
        average_days_of_stock: if config.daily_consumption > 0.0 {
            round2(stats.average_stock / config.daily_consumption)
        } else {
            0.0
        },
        average_order_size: if stats.total_orders > 0 {
            round2(stats.total_ordered as f64 / stats.total_orders as f64)
        } else {
            0.0
        },
        order_frequency: if days > 0.0 {
            round2(stats.total_orders as f64 / (days / 7.0))
        } else {
            0.0
        },
    };
    let is_viable = trend_analysis.is_viable && stats.stockouts_count == 0;

    info!(
        viable = is_viable,
        service_level,
        trend = %trend_analysis.trend,
        "configuration analysed"
    );

    Ok(ConfigurationAnalysis {
        is_viable,
        service_level,
        trend_analysis,
        stability_solutions,
        metrics,
        statistics: stats,
    })
}
