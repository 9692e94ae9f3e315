//! Trailing-window views over a ledger and an equity curve.
//!
//! Every window ends at the last equity date. A window's baseline is the
//! last equity point on or before its nominal start; trades belong to the
//! window when they exit after the baseline date. When the history is
//! shorter than the window, the view starts at the first point and is
//! flagged `partial`.

use std::fmt;

use chrono::{Datelike, Months, NaiveDate};
use serde::Serialize;

use super::metrics::growth_index;
use super::portfolio::EquityPoint;
use super::position::Trade;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Window {
    #[serde(rename = "1Y")]
    OneYear,
    #[serde(rename = "3Y")]
    ThreeYear,
    #[serde(rename = "5Y")]
    FiveYear,
    #[serde(rename = "MAX")]
    Max,
}

impl Window {
    pub const ALL: [Window; 4] = [Window::OneYear, Window::ThreeYear, Window::FiveYear, Window::Max];

    pub fn years(&self) -> Option<u32> {
        match self {
            Window::OneYear => Some(1),
            Window::ThreeYear => Some(3),
            Window::FiveYear => Some(5),
            Window::Max => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Window::OneYear => "1Y",
            Window::ThreeYear => "3Y",
            Window::FiveYear => "5Y",
            Window::Max => "MAX",
        }
    }

    /// Nominal start for a history spanning `first..=last`, and whether it
    /// had to be clipped to `first`.
    pub fn start_for(&self, first: NaiveDate, last: NaiveDate) -> (NaiveDate, bool) {
        let Some(years) = self.years() else {
            return (first, false);
        };
        match last.checked_sub_months(Months::new(12 * years)) {
            Some(start) if start >= first => (start, false),
            _ => (first, true),
        }
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WindowView {
    pub window: Window,
    /// Baseline date: the first equity point of the view.
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub partial: bool,
    /// Clean trades that exited inside the window.
    pub trades: Vec<Trade>,
    /// Positions still open when the data ended, valued at the last close.
    pub open_positions: Vec<Trade>,
    pub equity: Vec<EquityPoint>,
}

impl WindowView {
    pub fn baseline(&self) -> Option<&EquityPoint> {
        self.equity.first()
    }

    pub fn last(&self) -> Option<&EquityPoint> {
        self.equity.last()
    }

    /// True when capital was added after the baseline.
    pub fn has_flows(&self) -> bool {
        match (self.equity.first(), self.equity.last()) {
            (Some(first), Some(last)) => (last.contributed - first.contributed).abs() > 1e-9,
            _ => false,
        }
    }

    /// The curve as a flow-adjusted index starting at `base`.
    pub fn rebased(&self, base: f64) -> Vec<(NaiveDate, f64)> {
        growth_index(&self.equity)
            .into_iter()
            .zip(&self.equity)
            .map(|(g, p)| (p.date, g * base))
            .collect()
    }

    /// Last equity point of each calendar month.
    pub fn monthly(&self) -> Vec<EquityPoint> {
        let mut months: Vec<EquityPoint> = Vec::new();
        for point in &self.equity {
            match months.last_mut() {
                Some(prev) if same_month(prev.date, point.date) => *prev = *point,
                _ => months.push(*point),
            }
        }
        months
    }
}

fn same_month(a: NaiveDate, b: NaiveDate) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

/// View of `trades` and `equity` for `window`; `None` for an empty curve.
pub fn slice(window: Window, trades: &[Trade], equity: &[EquityPoint]) -> Option<WindowView> {
    let first = equity.first()?.date;
    let end = equity.last()?.date;
    let (nominal, partial) = window.start_for(first, end);

    let base_idx = equity.partition_point(|p| p.date <= nominal).saturating_sub(1);
    let equity = equity[base_idx..].to_vec();
    let start = equity.first()?.date;

    let in_window = |t: &&Trade| t.exit_date > start && t.exit_date <= end;
    let (closed, open): (Vec<Trade>, Vec<Trade>) = trades
        .iter()
        .filter(in_window)
        .cloned()
        .partition(|t| t.is_clean());

    Some(WindowView {
        window,
        start,
        end,
        partial,
        trades: closed,
        open_positions: open,
        equity,
    })
}

/// One view per window in [`Window::ALL`] order.
pub fn slice_all(trades: &[Trade], equity: &[EquityPoint]) -> Vec<WindowView> {
    Window::ALL
        .iter()
        .filter_map(|w| slice(*w, trades, equity))
        .collect()
}
