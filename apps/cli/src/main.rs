#![deny(warnings)]

//! Headless CLI: load a replenishment configuration, run one operation and
//! print the result as JSON.

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use replenish_core::{analyze_trend, simulate, validate_config, SimulationConfig};
use replenish_search::{analyze_configuration, calculate_equilibrium, find_stability_solutions};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "usage: replenish <simulate|trend|analyze|stability|optimize> \
[--config FILE] [--days N] [--start YYYY-MM-DD] [--consumption X] [--max-order N] [--window N]";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Operation {
    Simulate,
    Trend,
    Analyze,
    Stability,
    Optimize,
}

#[derive(Debug, Default, PartialEq)]
struct Args {
    operation: Option<Operation>,
    config: Option<PathBuf>,
    days: Option<u32>,
    start: Option<NaiveDate>,
    consumption: Option<f64>,
    max_order: Option<u32>,
    window: Option<usize>,
    version: bool,
}

fn value<T: std::str::FromStr>(flag: &str, raw: Option<String>) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw = raw.with_context(|| format!("{flag} expects a value"))?;
    raw.parse()
        .with_context(|| format!("invalid value for {flag}: {raw:?}"))
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Args> {
    let mut parsed = Args::default();
    let mut it = args.into_iter();
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "simulate" => parsed.operation = Some(Operation::Simulate),
            "trend" => parsed.operation = Some(Operation::Trend),
            "analyze" => parsed.operation = Some(Operation::Analyze),
            "stability" => parsed.operation = Some(Operation::Stability),
            "optimize" => parsed.operation = Some(Operation::Optimize),
            "--config" => {
                let path = it.next().context("--config expects a value")?;
                parsed.config = Some(PathBuf::from(path));
            }
            "--days" => parsed.days = Some(value("--days", it.next())?),
            "--start" => parsed.start = Some(value("--start", it.next())?),
            "--consumption" => parsed.consumption = Some(value("--consumption", it.next())?),
            "--max-order" => parsed.max_order = Some(value("--max-order", it.next())?),
            "--window" => parsed.window = Some(value("--window", it.next())?),
            "--version" | "-V" => parsed.version = true,
            other => bail!("unexpected argument {other:?}\n{USAGE}"),
        }
    }
    Ok(parsed)
}

fn load_config(args: &Args) -> Result<SimulationConfig> {
    let mut cfg = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            // YAML is a superset of JSON, so both formats load here
            serde_yaml::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => SimulationConfig::default(),
    };
    if let Some(days) = args.days {
        cfg.simulation_days = days;
    }
    if let Some(start) = args.start {
        cfg.start_date = Some(start);
    }
    if let Some(consumption) = args.consumption {
        cfg.daily_consumption = consumption;
    }
    if let Some(max_order) = args.max_order {
        cfg.max_order_quantity = max_order;
    }
    // pin the date so the printed config reproduces the run
    cfg.start_date = Some(cfg.resolved_start_date());
    validate_config(&cfg).context("invalid configuration")?;
    Ok(cfg)
}

fn main() -> Result<()> {
    // Logging setup; stdout carries the JSON result
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_max_level(Level::INFO)
        .with_writer(std::io::stderr)
        .init();

    let args = parse_args(std::env::args().skip(1))?;
    if args.version {
        println!(
            "replenish {} ({} {})",
            env!("CARGO_PKG_VERSION"),
            env!("GIT_SHA"),
            env!("BUILD_DATE")
        );
        return Ok(());
    }
    let Some(operation) = args.operation else {
        bail!("missing operation\n{USAGE}");
    };
    let cfg = load_config(&args)?;
    let window = args.window.unwrap_or(replenish_core::DEFAULT_TREND_WINDOW_DAYS);
    info!(?operation, config = ?args.config, "starting CLI");

    let output = match operation {
        Operation::Simulate => serde_json::to_value(simulate(&cfg)?)?,
        Operation::Trend => {
            let result = simulate(&cfg)?;
            serde_json::to_value(analyze_trend(&result.days, window))?
        }
        Operation::Analyze => serde_json::to_value(analyze_configuration(&cfg, window)?)?,
        Operation::Stability => serde_json::to_value(find_stability_solutions(&cfg)?)?,
        Operation::Optimize => serde_json::to_value(calculate_equilibrium(&cfg)?)?,
    };
    let report = serde_json::json!({ "config": cfg, "result": output });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
