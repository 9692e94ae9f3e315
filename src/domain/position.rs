//! Open positions and the trades they close into.
//!
//! A [`Position`] exists between an entry fill and its exit fill. Its stop and
//! target are fixed when it is opened and there is no way to change them
//! afterwards; closing consumes the position and yields an immutable
//! [`Trade`].

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use super::ohlcv::OhlcvBar;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "long"),
            Direction::Short => write!(f, "short"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    Signal,
    Stop,
    Target,
    EndOfData,
    /// The instrument's history ended before the basket's; the last-close
    /// exit is final.
    HistoryEnd,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::Signal => write!(f, "signal"),
            ExitReason::Stop => write!(f, "stop"),
            ExitReason::Target => write!(f, "target"),
            ExitReason::EndOfData => write!(f, "end_of_data"),
            ExitReason::HistoryEnd => write!(f, "history_end"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    symbol: String,
    direction: Direction,
    quantity: u64,
    entry_index: usize,
    entry_date: NaiveDate,
    entry_price: f64,
    entry_commission: f64,
    fixed_stop: Option<f64>,
    fixed_target: Option<f64>,
    entry_metadata: BTreeMap<String, f64>,
}

/// Everything needed to open a position.
#[derive(Debug, Clone, PartialEq)]
pub struct EntryFill {
    pub direction: Direction,
    pub quantity: u64,
    pub index: usize,
    pub date: NaiveDate,
    pub price: f64,
    pub commission: f64,
    pub stop: Option<f64>,
    pub target: Option<f64>,
    pub metadata: BTreeMap<String, f64>,
}

impl Position {
    pub fn open(symbol: impl Into<String>, fill: EntryFill) -> Self {
        Self {
            symbol: symbol.into(),
            direction: fill.direction,
            quantity: fill.quantity,
            entry_index: fill.index,
            entry_date: fill.date,
            entry_price: fill.price,
            entry_commission: fill.commission,
            fixed_stop: fill.stop.filter(|s| s.is_finite() && *s > 0.0),
            fixed_target: fill.target.filter(|t| t.is_finite() && *t > 0.0),
            entry_metadata: fill.metadata,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn quantity(&self) -> u64 {
        self.quantity
    }

    pub fn entry_index(&self) -> usize {
        self.entry_index
    }

    pub fn entry_date(&self) -> NaiveDate {
        self.entry_date
    }

    pub fn entry_price(&self) -> f64 {
        self.entry_price
    }

    pub fn fixed_stop(&self) -> Option<f64> {
        self.fixed_stop
    }

    pub fn fixed_target(&self) -> Option<f64> {
        self.fixed_target
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        (price - self.entry_price) * self.quantity as f64 * self.direction.sign()
    }

    /// Did the bar's range reach the stop?
    pub fn stop_hit(&self, bar: &OhlcvBar) -> bool {
        match (self.fixed_stop, self.direction) {
            (Some(stop), Direction::Long) => bar.low <= stop,
            (Some(stop), Direction::Short) => bar.high >= stop,
            (None, _) => false,
        }
    }

    /// Did the bar's range reach the target?
    pub fn target_hit(&self, bar: &OhlcvBar) -> bool {
        match (self.fixed_target, self.direction) {
            (Some(target), Direction::Long) => bar.high >= target,
            (Some(target), Direction::Short) => bar.low <= target,
            (None, _) => false,
        }
    }

    /// Close the position, consuming it.
    pub fn close(
        self,
        exit_index: usize,
        exit_date: NaiveDate,
        exit_price: f64,
        exit_commission: f64,
        exit_reason: ExitReason,
    ) -> Trade {
        let realized_pnl = (exit_price - self.entry_price) * self.quantity as f64 * self.direction.sign();
        let entry_notional = self.entry_price * self.quantity as f64;
        let realized_pnl_pct = if entry_notional > 0.0 {
            realized_pnl / entry_notional * 100.0
        } else {
            0.0
        };

        Trade {
            symbol: self.symbol,
            direction: self.direction,
            quantity: self.quantity,
            entry_index: self.entry_index,
            entry_date: self.entry_date,
            entry_price: self.entry_price,
            exit_index,
            exit_date,
            exit_price,
            stop: self.fixed_stop,
            target: self.fixed_target,
            realized_pnl,
            realized_pnl_pct,
            commission: self.entry_commission + exit_commission,
            bars_held: exit_index.saturating_sub(self.entry_index),
            exit_reason,
            entry_metadata: self.entry_metadata,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trade {
    pub symbol: String,
    pub direction: Direction,
    pub quantity: u64,
    pub entry_index: usize,
    pub entry_date: NaiveDate,
    pub entry_price: f64,
    pub exit_index: usize,
    pub exit_date: NaiveDate,
    pub exit_price: f64,
    pub stop: Option<f64>,
    pub target: Option<f64>,
    /// `(exit_price - entry_price) * quantity * sign`, before commission.
    pub realized_pnl: f64,
    pub realized_pnl_pct: f64,
    pub commission: f64,
    pub bars_held: usize,
    pub exit_reason: ExitReason,
    /// Strategy values recorded at entry, such as the ATR behind the stop.
    pub entry_metadata: BTreeMap<String, f64>,
}

impl Trade {
    pub fn net_pnl(&self) -> f64 {
        self.realized_pnl - self.commission
    }

    /// A completed entry/exit cycle, as opposed to a forced end-of-data close.
    pub fn is_clean(&self) -> bool {
        self.exit_reason != ExitReason::EndOfData
    }
}
