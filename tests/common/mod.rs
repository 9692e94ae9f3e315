#![allow(dead_code)]

use backfolio::domain::error::BackfolioError;
use backfolio::domain::indicator::IndicatorKind;
pub use backfolio::domain::ohlcv::{BarSeries, OhlcvBar};
use backfolio::domain::position::{Direction, Position};
use backfolio::domain::registry::{IndicatorHandle, IndicatorRegistry};
use backfolio::domain::strategy::{EntryPlan, Strategy, StrategyContext};
use backfolio::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::collections::HashMap;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<OhlcvBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, symbol: &str, bars: Vec<OhlcvBar>) -> Self {
        self.data.insert(symbol.to_string(), bars);
        self
    }

    pub fn with_error(mut self, symbol: &str, reason: &str) -> Self {
        self.errors.insert(symbol.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn fetch_bars(
        &self,
        symbol: &str,
        interval: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<BarSeries, BackfolioError> {
        if let Some(reason) = self.errors.get(symbol) {
            return Err(BackfolioError::Data {
                reason: reason.clone(),
            });
        }
        let bars: Vec<OhlcvBar> = self
            .data
            .get(symbol)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.date >= start_date && b.date <= end_date)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        if bars.is_empty() {
            return Err(BackfolioError::NoData {
                symbol: symbol.to_string(),
                interval: interval.to_string(),
            });
        }
        BarSeries::validated(symbol, bars)
    }

    fn list_symbols(&self, _interval: &str) -> Result<Vec<String>, BackfolioError> {
        let mut symbols: Vec<String> = self.data.keys().cloned().collect();
        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        symbol: &str,
        _interval: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, BackfolioError> {
        match self.data.get(symbol) {
            Some(bars) if !bars.is_empty() => {
                let min = bars.iter().map(|b| b.date).min().unwrap();
                let max = bars.iter().map(|b| b.date).max().unwrap();
                Ok(Some((min, max, bars.len())))
            }
            _ => Ok(None),
        }
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn make_bar(date: NaiveDate, open: f64, high: f64, low: f64, close: f64) -> OhlcvBar {
    OhlcvBar {
        date,
        open,
        high,
        low,
        close,
        volume: 10_000,
    }
}

/// One bar per calendar day from `start`, opening at the previous close and
/// spanning half a point either side of the body.
pub fn daily_bars(start: NaiveDate, closes: &[f64]) -> Vec<OhlcvBar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            make_bar(
                start + chrono::Duration::days(i as i64),
                open,
                open.max(close) + 0.5,
                open.min(close) - 0.5,
                close,
            )
        })
        .collect()
}

pub fn series(symbol: &str, start: NaiveDate, closes: &[f64]) -> BarSeries {
    BarSeries::new(symbol, daily_bars(start, closes)).unwrap()
}

/// Enters and exits on fixed signal bars; optional ATR-multiple stop.
#[derive(Debug, Clone)]
pub struct ScriptedStrategy {
    pub enter_on: Vec<usize>,
    pub exit_on: Vec<usize>,
    pub direction: Direction,
    pub atr_stop: Option<(usize, f64)>,
    pub quantity: Option<u64>,
    atr: Option<IndicatorHandle>,
}

impl ScriptedStrategy {
    pub fn new(enter_on: &[usize], exit_on: &[usize]) -> Self {
        Self {
            enter_on: enter_on.to_vec(),
            exit_on: exit_on.to_vec(),
            direction: Direction::Long,
            atr_stop: None,
            quantity: None,
            atr: None,
        }
    }

    pub fn short(mut self) -> Self {
        self.direction = Direction::Short;
        self
    }

    pub fn with_atr_stop(mut self, period: usize, multiple: f64) -> Self {
        self.atr_stop = Some((period, multiple));
        self
    }

    pub fn with_quantity(mut self, quantity: u64) -> Self {
        self.quantity = Some(quantity);
        self
    }
}

impl Strategy for ScriptedStrategy {
    fn name(&self) -> &str {
        "scripted"
    }

    fn direction(&self) -> Direction {
        self.direction
    }

    fn prepare(&mut self, registry: &mut IndicatorRegistry<'_>) -> Result<(), BackfolioError> {
        if let Some((period, _)) = self.atr_stop {
            self.atr = Some(registry.register(IndicatorKind::Atr(period)));
        }
        Ok(())
    }

    fn should_enter(&self, _ctx: &StrategyContext<'_>, index: usize) -> bool {
        self.enter_on.contains(&index)
    }

    fn should_exit(&self, _ctx: &StrategyContext<'_>, index: usize, _position: &Position) -> bool {
        self.exit_on.contains(&index)
    }

    fn on_entry(&self, ctx: &StrategyContext<'_>, index: usize, entry_price: f64) -> EntryPlan {
        let mut plan = EntryPlan {
            quantity: self.quantity,
            ..EntryPlan::default()
        };
        if let Some((_, multiple)) = self.atr_stop {
            let sign = self.direction.sign();
            plan.stop = ctx
                .value(self.atr, index)
                .map(|atr| entry_price - sign * multiple * atr);
        }
        plan
    }
}
