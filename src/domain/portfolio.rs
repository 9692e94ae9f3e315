//! Portfolio aggregation across instruments.
//!
//! Per-instrument equity curves are merged over the union of their dates.
//! An instrument contributes nothing before its first bar and holds its last
//! value after its last bar. When its history ends before the basket's, the
//! end-of-data close is final: the trade becomes [`ExitReason::HistoryEnd`]
//! and its P&L moves from unrealized to realized. Capital is split up front
//! by a [`CapitalAllocator`].

use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;
use serde::Serialize;

use super::engine::InstrumentRun;
use super::error::BackfolioError;
use super::position::{ExitReason, Trade};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EquityPoint {
    pub date: NaiveDate,
    /// Mark-to-market value: `contributed + realized + unrealized`.
    pub equity: f64,
    /// Cumulative realized P&L, net of commission.
    pub realized: f64,
    /// Open-position P&L at this bar's close.
    pub unrealized: f64,
    /// Capital deployed so far.
    pub contributed: f64,
}

impl EquityPoint {
    fn zero(date: NaiveDate) -> Self {
        Self {
            date,
            equity: 0.0,
            realized: 0.0,
            unrealized: 0.0,
            contributed: 0.0,
        }
    }

    /// Same value with the open P&L booked as realized.
    fn settled(&self) -> Self {
        Self {
            realized: self.realized + self.unrealized,
            unrealized: 0.0,
            ..*self
        }
    }

    fn accumulate(&mut self, other: &EquityPoint) {
        self.equity += other.equity;
        self.realized += other.realized;
        self.unrealized += other.unrealized;
        self.contributed += other.contributed;
    }
}

/// Splits total capital across the instruments of a basket.
pub trait CapitalAllocator: Send + Sync {
    /// One allocation per symbol, in the same order.
    fn allocate(&self, total: f64, symbols: &[String]) -> Result<Vec<f64>, BackfolioError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EqualWeight;

impl CapitalAllocator for EqualWeight {
    fn allocate(&self, total: f64, symbols: &[String]) -> Result<Vec<f64>, BackfolioError> {
        if symbols.is_empty() {
            return Ok(Vec::new());
        }
        let each = total / symbols.len() as f64;
        Ok(vec![each; symbols.len()])
    }
}

/// Fixed fraction of total capital per symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct FixedWeights {
    weights: HashMap<String, f64>,
}

impl FixedWeights {
    pub fn new(weights: HashMap<String, f64>) -> Result<Self, BackfolioError> {
        if let Some((symbol, w)) = weights.iter().find(|(_, w)| !w.is_finite() || **w <= 0.0) {
            return Err(weights_error(format!("weight for {} must be positive, got {}", symbol, w)));
        }
        let sum: f64 = weights.values().sum();
        if sum > 1.0 + 1e-9 {
            return Err(weights_error(format!("weights sum to {:.4}, above 1", sum)));
        }
        Ok(Self { weights })
    }

    /// Parse `SYMBOL:weight` pairs separated by commas.
    pub fn parse(input: &str) -> Result<Self, BackfolioError> {
        let mut weights = HashMap::new();
        for pair in input.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let (symbol, weight) = pair
                .split_once(':')
                .ok_or_else(|| weights_error(format!("expected SYMBOL:weight, got '{}'", pair)))?;
            let weight: f64 = weight
                .trim()
                .parse()
                .map_err(|_| weights_error(format!("invalid weight in '{}'", pair)))?;
            if weights.insert(symbol.trim().to_string(), weight).is_some() {
                return Err(weights_error(format!("duplicate weight for {}", symbol.trim())));
            }
        }
        Self::new(weights)
    }
}

impl CapitalAllocator for FixedWeights {
    fn allocate(&self, total: f64, symbols: &[String]) -> Result<Vec<f64>, BackfolioError> {
        symbols
            .iter()
            .map(|s| {
                self.weights
                    .get(s)
                    .map(|w| total * w)
                    .ok_or_else(|| weights_error(format!("no weight for {}", s)))
            })
            .collect()
    }
}

fn weights_error(reason: String) -> BackfolioError {
    BackfolioError::ConfigInvalid {
        section: "backtest".to_string(),
        key: "weights".to_string(),
        reason,
    }
}

/// Sorted union of every date on any curve.
pub fn build_unified_timeline(curves: &[&[EquityPoint]]) -> Vec<NaiveDate> {
    let unique_dates: BTreeSet<NaiveDate> = curves
        .iter()
        .flat_map(|curve| curve.iter().map(|p| p.date))
        .collect();
    unique_dates.into_iter().collect()
}

/// Forward-filled sum of several curves over their unified timeline.
pub fn merge_equity(curves: &[&[EquityPoint]]) -> Vec<EquityPoint> {
    let timeline = build_unified_timeline(curves);
    let mut cursors = vec![0usize; curves.len()];
    let mut last: Vec<Option<&EquityPoint>> = vec![None; curves.len()];

    timeline
        .into_iter()
        .map(|date| {
            let mut total = EquityPoint::zero(date);
            for (k, curve) in curves.iter().enumerate() {
                while cursors[k] < curve.len() && curve[cursors[k]].date <= date {
                    last[k] = Some(&curve[cursors[k]]);
                    cursors[k] += 1;
                }
                match last[k] {
                    Some(point) if cursors[k] == curve.len() && point.date < date => {
                        total.accumulate(&point.settled());
                    }
                    Some(point) => total.accumulate(point),
                    None => {}
                }
            }
            total
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioResult {
    pub symbols: Vec<String>,
    /// Every trade from every instrument, by exit date then symbol.
    pub trades: Vec<Trade>,
    pub equity: Vec<EquityPoint>,
}

impl PortfolioResult {
    pub fn total_capital(&self) -> f64 {
        self.equity.last().map_or(0.0, |p| p.contributed)
    }
}

pub fn aggregate(runs: &[InstrumentRun]) -> PortfolioResult {
    let curves: Vec<&[EquityPoint]> = runs.iter().map(|r| r.equity.as_slice()).collect();
    let equity = merge_equity(&curves);

    let end = equity.last().map(|p| p.date);
    let mut trades: Vec<Trade> = Vec::new();
    for run in runs {
        let ended_early = run.equity.last().map(|p| p.date) < end;
        trades.extend(run.trades.iter().cloned().map(|mut t| {
            if ended_early && t.exit_reason == ExitReason::EndOfData {
                t.exit_reason = ExitReason::HistoryEnd;
            }
            t
        }));
    }
    trades.sort_by(|a, b| {
        a.exit_date
            .cmp(&b.exit_date)
            .then_with(|| a.symbol.cmp(&b.symbol))
            .then_with(|| a.entry_date.cmp(&b.entry_date))
    });

    PortfolioResult {
        symbols: runs.iter().map(|r| r.symbol.clone()).collect(),
        trades,
        equity,
    }
}
