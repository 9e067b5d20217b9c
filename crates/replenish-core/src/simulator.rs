//! Day-by-day replenishment state machine.
//!
//! Each calendar day runs, in this order: delivery intake (working days
//! only), the reorder decision (working days only, and only while no order
//! is pending), then consumption (every day). At most one order is ever
//! outstanding.

use crate::calendar::{advance_working_days, calendar_days_between, is_working_day, weekday_name};
use crate::config::{check_structure, ConfigurationError, SimulationConfig};
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// A replenishment order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Unique within one simulation run, starting at 1.
    pub order_id: u32,
    pub order_date: NaiveDate,
    /// `order_date` advanced by the lead time in working days.
    pub delivery_date: NaiveDate,
    pub quantity: u32,
    pub delivered: bool,
}

/// What happened in a [`SimulationEvent`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Delivery,
    Order,
    /// Stock reached the sales-start threshold; consumption begins today.
    SalesStarted,
    /// Still stocking up: no consumption today.
    AwaitingInitialStock,
    Consumption,
    /// Stock is negative after today's consumption.
    Stockout,
    /// Stock fell below the reorder threshold during consumption.
    ThresholdCrossed,
}

/// One entry of the chronological event log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationEvent {
    pub date: NaiveDate,
    pub kind: EventKind,
    pub stock_before: f64,
    pub stock_after: f64,
    pub quantity: f64,
    pub is_working_day: bool,
    pub order_id: Option<u32>,
}

/// Everything that happened on one simulated calendar day.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DayRecord {
    pub date: NaiveDate,
    pub weekday: String,
    pub is_working_day: bool,
    /// Stock carried over from the previous day, before any delivery.
    pub opening_stock: f64,
    /// Stock at day start, after today's delivery.
    pub stock_start: f64,
    pub deliveries: f64,
    /// Consumption applied today; zero while sales have not started.
    pub consumption: f64,
    pub stock_end: f64,
    pub order_placed: bool,
    pub order_quantity: u32,
    pub order_id: Option<u32>,
    pub delivery_id: Option<u32>,
    pub threshold_crossed: bool,
    pub stockout: bool,
}

/// Aggregates over a finished run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationStatistics {
    pub final_stock: f64,
    /// Days ending with negative stock.
    pub stockouts_count: u32,
    pub total_ordered: u64,
    pub total_orders: usize,
    pub total_events: usize,
    pub average_stock: f64,
    pub min_stock: f64,
    pub max_stock: f64,
}

/// Output of one simulation run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationResult {
    pub events: Vec<SimulationEvent>,
    pub orders: Vec<Order>,
    pub days: Vec<DayRecord>,
    pub statistics: SimulationStatistics,
}

impl SimulationResult {
    /// Number of days whose end-of-day stock is at or above `level`.
    pub fn days_at_or_above(&self, level: f64) -> usize {
        self.days.iter().filter(|d| d.stock_end >= level).count()
    }
}

/// Mutable state owned by one simulator.
#[derive(Clone, Debug)]
pub struct SimulationState {
    /// Negative values are a stockout deficit.
    pub current_stock: f64,
    /// Index into the simulator's order list of the outstanding order.
    pending: Option<usize>,
    next_order_id: u32,
    /// One-way: never reset once true.
    pub sales_started: bool,
    pub stockout_days: u32,
    stock_history: Vec<f64>,
}

impl SimulationState {
    fn new(config: &SimulationConfig) -> Self {
        Self {
            current_stock: config.initial_stock,
            pending: None,
            next_order_id: 1,
            // the sales-start threshold only gates a cold start from zero stock
            sales_started: config.initial_stock > 0.0,
            stockout_days: 0,
            stock_history: Vec::with_capacity(config.simulation_days as usize),
        }
    }
}

/// Order size for a reorder decision with the given delivery-date projection.
///
/// Fills up to `max_stock` in whole lots, capped by `max_order_quantity`.
/// The minimum order quantity always wins, even when it pushes the projected
/// stock above `max_stock`.
pub fn order_quantity(config: &SimulationConfig, projected_stock: f64) -> u32 {
    let lot = i64::from(config.lot_size.max(1));
    let min = i64::from(config.min_order_quantity);
    let allowed = config.floor_to_lot(config.max_stock - projected_stock);
    let mut quantity = i64::from(config.max_order_quantity).min(allowed);
    if quantity < min {
        quantity = min;
    }
    quantity = quantity.div_euclid(lot) * lot;
    quantity.max(min) as u32
}

/// Drives one configuration across its horizon.
pub struct ReplenishmentSimulator {
    config: SimulationConfig,
    start_date: NaiveDate,
    day_index: u32,
    state: SimulationState,
    orders: Vec<Order>,
    events: Vec<SimulationEvent>,
    days: Vec<DayRecord>,
}

impl ReplenishmentSimulator {
    /// Take ownership of a configuration snapshot and prepare day one.
    pub fn new(config: SimulationConfig) -> Result<Self, ConfigurationError> {
        check_structure(&config)?;
        let start_date = config.resolved_start_date();
        let state = SimulationState::new(&config);
        Ok(Self {
            start_date,
            day_index: 0,
            state,
            orders: Vec::new(),
            events: Vec::new(),
            days: Vec::with_capacity(config.simulation_days as usize),
            config,
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    /// Orders placed but not yet delivered (0 or 1).
    pub fn pending_orders(&self) -> usize {
        usize::from(self.state.pending.is_some())
    }

    pub fn is_finished(&self) -> bool {
        self.day_index >= self.config.simulation_days
    }

    /// Simulate the next calendar day. Returns `None` once the horizon is done.
    pub fn step(&mut self) -> Option<&DayRecord> {
        if self.is_finished() {
            return None;
        }
        let date = self.start_date + Days::new(u64::from(self.day_index));
        let working = is_working_day(date);
        let opening_stock = self.state.current_stock;

        let (deliveries, delivery_id) = if working {
            self.receive_deliveries(date)
        } else {
            (0.0, None)
        };
        let stock_start = self.state.current_stock;

        let placed = if working { self.reorder(date) } else { None };

        let consumption = self.consume(date);
        let stock_end = self.state.current_stock;

        let threshold = self.config.reorder_threshold;
        let record = DayRecord {
            date,
            weekday: weekday_name(date).to_string(),
            is_working_day: working,
            opening_stock,
            stock_start,
            deliveries,
            consumption,
            stock_end,
            order_placed: placed.is_some(),
            order_quantity: placed.map_or(0, |(_, quantity)| quantity),
            order_id: placed.map(|(id, _)| id),
            delivery_id,
            threshold_crossed: stock_start >= threshold && stock_end < threshold,
            stockout: stock_end < 0.0,
        };
        trace!(%date, stock_start, stock_end, consumption, "day simulated");
        self.days.push(record);
        self.day_index += 1;
        self.days.last()
    }

    /// Simulate every remaining day and collect the result.
    pub fn run(mut self) -> SimulationResult {
        while self.step().is_some() {}
        self.finish()
    }

    fn finish(self) -> SimulationResult {
        let history = &self.state.stock_history;
        let (average_stock, min_stock, max_stock) = if history.is_empty() {
            (0.0, 0.0, 0.0)
        } else {
            let sum: f64 = history.iter().sum();
            (
                sum / history.len() as f64,
                history.iter().copied().fold(f64::INFINITY, f64::min),
                history.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            )
        };
        let statistics = SimulationStatistics {
            final_stock: self.state.current_stock,
            stockouts_count: self.state.stockout_days,
            total_ordered: self.orders.iter().map(|o| u64::from(o.quantity)).sum(),
            total_orders: self.orders.len(),
            total_events: self.events.len(),
            average_stock,
            min_stock,
            max_stock,
        };
        SimulationResult {
            events: self.events,
            orders: self.orders,
            days: self.days,
            statistics,
        }
    }

    fn receive_deliveries(&mut self, date: NaiveDate) -> (f64, Option<u32>) {
        let Some(index) = self.state.pending else {
            return (0.0, None);
        };
        if self.orders[index].delivery_date != date {
            return (0.0, None);
        }
        let order = &mut self.orders[index];
        order.delivered = true;
        let order_id = order.order_id;
        let quantity = f64::from(order.quantity);
        self.state.pending = None;

        let stock_before = self.state.current_stock;
        self.state.current_stock += quantity;
        debug!(order_id, quantity, %date, "delivery received");
        let stock_after = self.state.current_stock;
        self.push_event(
            date,
            EventKind::Delivery,
            (stock_before, stock_after),
            quantity,
            Some(order_id),
        );
        (quantity, Some(order_id))
    }

    /// Place an order if the stock projected at the delivery date would be at
    /// or below the reorder threshold. Returns `(order_id, quantity)`.
    fn reorder(&mut self, date: NaiveDate) -> Option<(u32, u32)> {
        if self.state.pending.is_some() {
            return None;
        }
        let delivery_date = advance_working_days(date, self.config.delivery_lead_time_days);
        let days_until_delivery = calendar_days_between(date, delivery_date);
        let projected_stock =
            self.state.current_stock - days_until_delivery as f64 * self.config.daily_consumption;
        if projected_stock > self.config.reorder_threshold {
            return None;
        }

        let quantity = order_quantity(&self.config, projected_stock);
        let order_id = self.state.next_order_id;
        self.state.next_order_id += 1;
        self.orders.push(Order {
            order_id,
            order_date: date,
            delivery_date,
            quantity,
            delivered: false,
        });
        self.state.pending = Some(self.orders.len() - 1);

        debug!(order_id, quantity, projected_stock, %delivery_date, "order placed");
        let stock = self.state.current_stock;
        self.push_event(
            date,
            EventKind::Order,
            (stock, stock),
            f64::from(quantity),
            Some(order_id),
        );
        Some((order_id, quantity))
    }

    /// Apply today's consumption and return the amount actually consumed.
    fn consume(&mut self, date: NaiveDate) -> f64 {
        let stock_before = self.state.current_stock;
        if !self.state.sales_started {
            if stock_before >= self.config.min_stock_to_start_sales {
                self.state.sales_started = true;
                if self.config.min_stock_to_start_sales > 0.0 {
                    self.push_event(
                        date,
                        EventKind::SalesStarted,
                        (stock_before, stock_before),
                        0.0,
                        None,
                    );
                }
            } else {
                self.push_event(
                    date,
                    EventKind::AwaitingInitialStock,
                    (stock_before, stock_before),
                    0.0,
                    None,
                );
                self.state.stock_history.push(stock_before);
                return 0.0;
            }
        }

        let consumption = self.config.daily_consumption;
        self.state.current_stock -= consumption;
        let stock_after = self.state.current_stock;
        let moved = (stock_before, stock_after);
        self.push_event(date, EventKind::Consumption, moved, consumption, None);

        if stock_after < 0.0 {
            self.state.stockout_days += 1;
            self.push_event(date, EventKind::Stockout, moved, consumption, None);
        }
        let threshold = self.config.reorder_threshold;
        if stock_before >= threshold && stock_after < threshold {
            self.push_event(
                date,
                EventKind::ThresholdCrossed,
                moved,
                consumption,
                None,
            );
        }
        self.state.stock_history.push(stock_after);
        consumption
    }

    fn push_event(
        &mut self,
        date: NaiveDate,
        kind: EventKind,
        (stock_before, stock_after): (f64, f64),
        quantity: f64,
        order_id: Option<u32>,
    ) {
        self.events.push(SimulationEvent {
            date,
            kind,
            stock_before,
            stock_after,
            quantity,
            is_working_day: is_working_day(date),
            order_id,
        });
    }
}

/// Run one configuration end to end.
pub fn simulate(config: &SimulationConfig) -> Result<SimulationResult, ConfigurationError> {
    Ok(ReplenishmentSimulator::new(config.clone())?.run())
}
