//! Single-instrument trade simulation.
//!
//! Fill policy, identical for every strategy:
//!
//! - predicates are evaluated on the closed bar `i - 1` and act at bar `i`'s
//!   open;
//! - an open position is checked stop first, then target, then the strategy's
//!   exit signal; stop and target fill at their own price;
//! - a new entry only happens on a bar without an exit, and the entry bar's
//!   own range is checked against the fresh stop and target;
//! - a position still open after the last bar is closed at the last close
//!   with [`ExitReason::EndOfData`].
//!
//! Slippage moves every fill against the trader. Commission is charged per
//! fill and kept out of `realized_pnl`.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::error::BackfolioError;
use super::ohlcv::BarSeries;
use super::portfolio::EquityPoint;
use super::position::{Direction, EntryFill, ExitReason, Position, Trade};
use super::regime::RegimeCache;
use super::registry::IndicatorRegistry;
use super::strategy::{Strategy, StrategyContext};

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Capital allotted to this instrument.
    pub initial_capital: f64,
    /// Share of current equity committed per entry by the default sizing.
    pub capital_fraction: f64,
    pub commission_per_trade: f64,
    pub commission_pct: f64,
    pub slippage_pct: f64,
    /// Wall-clock budget for one instrument's walk.
    pub time_budget: Option<Duration>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            initial_capital: 100_000.0,
            capital_fraction: 1.0,
            commission_per_trade: 0.0,
            commission_pct: 0.0,
            slippage_pct: 0.0,
            time_budget: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillSide {
    Entry,
    Exit,
}

/// Calculate commission: flat_fee + (trade_value * pct / 100).
pub fn calculate_commission(trade_value: f64, config: &EngineConfig) -> f64 {
    config.commission_per_trade + (trade_value * config.commission_pct / 100.0)
}

/// Move `market_price` against the trader by `slippage_pct` percent.
///
/// Buying (long entry, short exit) pays more; selling (long exit, short
/// entry) receives less.
pub fn apply_slippage(market_price: f64, slippage_pct: f64, direction: Direction, side: FillSide) -> f64 {
    let buying = matches!(
        (direction, side),
        (Direction::Long, FillSide::Entry) | (Direction::Short, FillSide::Exit)
    );
    if buying {
        market_price * (1.0 + slippage_pct / 100.0)
    } else {
        market_price * (1.0 - slippage_pct / 100.0)
    }
}

/// Default sizing: `floor(equity * fraction / price)`, zero when that is not
/// a positive whole number.
pub fn default_quantity(equity: f64, fraction: f64, price: f64) -> u64 {
    let raw = (equity * fraction / price).floor();
    if raw.is_finite() && raw >= 1.0 {
        raw as u64
    } else {
        0
    }
}

/// Completed walk for one instrument.
#[derive(Debug, Clone, PartialEq)]
pub struct InstrumentRun {
    pub symbol: String,
    pub capital: f64,
    /// Every closed trade in exit order, end-of-data closures included.
    pub trades: Vec<Trade>,
    pub equity: Vec<EquityPoint>,
    pub skipped_entries: usize,
}

impl InstrumentRun {
    pub fn clean_trades(&self) -> impl Iterator<Item = &Trade> {
        self.trades.iter().filter(|t| t.is_clean())
    }

    /// Positions that were still open when the data ran out.
    pub fn open_trades(&self) -> impl Iterator<Item = &Trade> {
        self.trades.iter().filter(|t| !t.is_clean())
    }

    pub fn final_equity(&self) -> Option<f64> {
        self.equity.last().map(|p| p.equity)
    }
}

/// Bar-by-bar walk over one instrument.
///
/// Built over a registry the strategy has already prepared. Call
/// [`Simulation::step`] until it returns `None`, then [`Simulation::finish`].
pub struct Simulation<'a> {
    series: &'a BarSeries,
    strategy: &'a dyn Strategy,
    ctx: StrategyContext<'a>,
    config: &'a EngineConfig,
    warmup: Option<usize>,
    next: usize,
    position: Option<Position>,
    trades: Vec<Trade>,
    equity: Vec<EquityPoint>,
    /// Realized P&L net of every commission paid so far.
    realized: f64,
    skipped_entries: usize,
    started: Instant,
}

impl<'a> Simulation<'a> {
    pub fn new(
        series: &'a BarSeries,
        strategy: &'a dyn Strategy,
        registry: &'a IndicatorRegistry<'a>,
        regime: Option<&'a RegimeCache>,
        config: &'a EngineConfig,
    ) -> Result<Self, BackfolioError> {
        if series.is_empty() {
            return Err(BackfolioError::InsufficientData {
                symbol: series.symbol().to_string(),
                bars: 0,
                minimum: 1,
            });
        }
        if registry.bars().len() != series.len() {
            return Err(BackfolioError::Precondition {
                symbol: series.symbol().to_string(),
                reason: "indicator registry was prepared over a different series".to_string(),
            });
        }
        if !(config.initial_capital.is_finite() && config.initial_capital > 0.0) {
            return Err(BackfolioError::Precondition {
                symbol: series.symbol().to_string(),
                reason: format!("initial capital {} is not positive", config.initial_capital),
            });
        }

        Ok(Self {
            series,
            strategy,
            ctx: StrategyContext {
                symbol: series.symbol(),
                bars: series.bars(),
                indicators: registry,
                regime,
            },
            config,
            warmup: registry.warmup_index(),
            next: 0,
            position: None,
            trades: Vec::new(),
            equity: Vec::with_capacity(series.len()),
            realized: 0.0,
            skipped_entries: 0,
            started: Instant::now(),
        })
    }

    pub fn position(&self) -> Option<&Position> {
        self.position.as_ref()
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn equity(&self) -> &[EquityPoint] {
        &self.equity
    }

    pub fn is_done(&self) -> bool {
        self.next >= self.series.len()
    }

    /// Process the next bar and return its equity point, or `None` once
    /// every bar has been processed.
    pub fn step(&mut self) -> Result<Option<&EquityPoint>, BackfolioError> {
        if self.is_done() {
            return Ok(None);
        }
        if let Some(budget) = self.config.time_budget {
            if self.started.elapsed() >= budget {
                return Err(BackfolioError::Timeout {
                    symbol: self.series.symbol().to_string(),
                    budget,
                });
            }
        }

        let i = self.next;
        let mut exited = false;

        if let Some(position) = self.position.take() {
            match self.exit_decision(&position, i) {
                Some((price, reason)) => {
                    self.close(position, i, price, reason);
                    exited = true;
                }
                None => self.position = Some(position),
            }
        }

        if self.position.is_none() && !exited && i > 0 {
            let signal = i - 1;
            let warmed_up = self.warmup.is_some_and(|w| signal >= w);
            if warmed_up && self.strategy.should_enter(&self.ctx, signal) {
                self.enter(i, signal);
            }
        }

        self.record(i);
        self.next += 1;
        Ok(self.equity.last())
    }

    /// Close any open position at the last processed close and hand back
    /// the ledger and equity curve.
    pub fn finish(mut self) -> InstrumentRun {
        if let Some(position) = self.position.take() {
            if let Some(last) = self.next.checked_sub(1) {
                let series = self.series;
                let bar = &series.bars()[last];
                debug!(symbol = self.series.symbol(), date = %bar.date, "closing open position at end of data");
                let trade = position.close(last, bar.date, bar.close, 0.0, ExitReason::EndOfData);
                self.realized += trade.realized_pnl;
                self.trades.push(trade);
            }
        }

        InstrumentRun {
            symbol: self.series.symbol().to_string(),
            capital: self.config.initial_capital,
            trades: self.trades,
            equity: self.equity,
            skipped_entries: self.skipped_entries,
        }
    }

    fn exit_decision(&self, position: &Position, i: usize) -> Option<(f64, ExitReason)> {
        let bar = &self.series.bars()[i];
        if position.stop_hit(bar) {
            return position.fixed_stop().map(|p| (p, ExitReason::Stop));
        }
        if position.target_hit(bar) {
            return position.fixed_target().map(|p| (p, ExitReason::Target));
        }
        if i > 0 && self.strategy.should_exit(&self.ctx, i - 1, position) {
            return Some((bar.open, ExitReason::Signal));
        }
        None
    }

    fn enter(&mut self, i: usize, signal: usize) {
        let series = self.series;
        let bar = &series.bars()[i];
        let direction = self.strategy.direction();
        let price = apply_slippage(bar.open, self.config.slippage_pct, direction, FillSide::Entry);
        let plan = self.strategy.on_entry(&self.ctx, signal, price);

        let equity = self.config.initial_capital + self.realized;
        let quantity = plan
            .quantity
            .unwrap_or_else(|| default_quantity(equity, self.config.capital_fraction, price));
        if quantity == 0 {
            warn!(
                symbol = self.series.symbol(),
                date = %bar.date,
                price,
                equity,
                "entry skipped: position size is not positive"
            );
            self.skipped_entries += 1;
            return;
        }

        let commission = calculate_commission(quantity as f64 * price, self.config);
        self.realized -= commission;
        let position = Position::open(
            self.series.symbol(),
            EntryFill {
                direction,
                quantity,
                index: i,
                date: bar.date,
                price,
                commission,
                stop: plan.stop,
                target: plan.target,
                metadata: plan.metadata,
            },
        );
        debug!(
            symbol = self.series.symbol(),
            date = %bar.date,
            %direction,
            quantity,
            price,
            stop = ?position.fixed_stop(),
            target = ?position.fixed_target(),
            "entered"
        );

        // live for the rest of the entry bar
        if position.stop_hit(bar) {
            if let Some(stop) = position.fixed_stop() {
                self.close(position, i, stop, ExitReason::Stop);
                return;
            }
        }
        if position.target_hit(bar) {
            if let Some(target) = position.fixed_target() {
                self.close(position, i, target, ExitReason::Target);
                return;
            }
        }
        self.position = Some(position);
    }

    fn close(&mut self, position: Position, i: usize, market_price: f64, reason: ExitReason) {
        let series = self.series;
        let bar = &series.bars()[i];
        let price = apply_slippage(
            market_price,
            self.config.slippage_pct,
            position.direction(),
            FillSide::Exit,
        );
        let commission = calculate_commission(position.quantity() as f64 * price, self.config);
        let trade = position.close(i, bar.date, price, commission, reason);
        self.realized += trade.realized_pnl - commission;
        debug!(
            symbol = self.series.symbol(),
            date = %bar.date,
            price,
            pnl = trade.realized_pnl,
            reason = %reason,
            "exited"
        );
        self.trades.push(trade);
    }

    fn record(&mut self, i: usize) {
        let series = self.series;
        let bar = &series.bars()[i];
        let unrealized = self
            .position
            .as_ref()
            .map_or(0.0, |p| p.unrealized_pnl(bar.close));
        let contributed = self.config.initial_capital;
        self.equity.push(EquityPoint {
            date: bar.date,
            equity: contributed + self.realized + unrealized,
            realized: self.realized,
            unrealized,
            contributed,
        });
    }
}

/// Prepare `strategy` over `series` and walk every bar.
pub fn run_instrument(
    series: &BarSeries,
    strategy: &mut dyn Strategy,
    regime: Option<&RegimeCache>,
    config: &EngineConfig,
) -> Result<InstrumentRun, BackfolioError> {
    let mut registry = IndicatorRegistry::new(series.bars());
    strategy.prepare(&mut registry)?;
    let strategy: &dyn Strategy = strategy;
    let mut simulation = Simulation::new(series, strategy, &registry, regime, config)?;
    while simulation.step()?.is_some() {}
    Ok(simulation.finish())
}
