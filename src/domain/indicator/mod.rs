//! Technical indicator functions and their aligned output series.
//!
//! Every indicator is a pure function `(&[OhlcvBar], params) -> IndicatorSeries`
//! whose output has exactly one slot per input bar. Slots without enough
//! look-back are `None`; they are never filled with zero.

pub mod atr;
pub mod channel;
pub mod rsi;
pub mod sma;

use crate::domain::ohlcv::OhlcvBar;
use std::fmt;

/// Built-in indicator identity + parameters. Serves as the registry's
/// de-duplication key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorKind {
    Sma(usize),
    Atr(usize),
    Rsi(usize),
    /// Highest high over the trailing window, current bar included.
    Highest(usize),
    /// Lowest low over the trailing window, current bar included.
    Lowest(usize),
}

impl IndicatorKind {
    pub fn compute(&self, bars: &[OhlcvBar]) -> IndicatorSeries {
        match *self {
            IndicatorKind::Sma(period) => sma::calculate_sma(bars, period),
            IndicatorKind::Atr(period) => atr::calculate_atr(bars, period),
            IndicatorKind::Rsi(period) => rsi::calculate_rsi(bars, period),
            IndicatorKind::Highest(period) => channel::calculate_highest(bars, period),
            IndicatorKind::Lowest(period) => channel::calculate_lowest(bars, period),
        }
    }
}

impl fmt::Display for IndicatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorKind::Sma(period) => write!(f, "SMA({})", period),
            IndicatorKind::Atr(period) => write!(f, "ATR({})", period),
            IndicatorKind::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorKind::Highest(period) => write!(f, "HIGHEST({})", period),
            IndicatorKind::Lowest(period) => write!(f, "LOWEST({})", period),
        }
    }
}

/// Position-aligned indicator output. `values[i]` belongs to bar `i`.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    label: String,
    values: Vec<Option<f64>>,
}

impl IndicatorSeries {
    /// Non-finite values are stored as undefined.
    pub fn new(label: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            label: label.into(),
            values: values
                .into_iter()
                .map(|v| v.filter(|x| x.is_finite()))
                .collect(),
        }
    }

    /// Build from raw floats, treating NaN/inf as undefined.
    pub fn from_raw(label: impl Into<String>, raw: Vec<f64>) -> Self {
        Self::new(label, raw.into_iter().map(Some).collect())
    }

    pub fn undefined(label: impl Into<String>, len: usize) -> Self {
        Self {
            label: label.into(),
            values: vec![None; len],
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Index of the first defined value, if any.
    pub fn first_defined(&self) -> Option<usize> {
        self.values.iter().position(|v| v.is_some())
    }

    pub(crate) fn set(&mut self, index: usize, value: Option<f64>) {
        if let Some(slot) = self.values.get_mut(index) {
            *slot = value.filter(|x| x.is_finite());
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_display() {
        assert_eq!(IndicatorKind::Sma(20).to_string(), "SMA(20)");
        assert_eq!(IndicatorKind::Atr(14).to_string(), "ATR(14)");
        assert_eq!(IndicatorKind::Highest(55).to_string(), "HIGHEST(55)");
    }

    #[test]
    fn kind_hash_eq() {
        use std::collections::HashMap;

        let mut map = HashMap::new();
        map.insert(IndicatorKind::Sma(20), 1);
        map.insert(IndicatorKind::Sma(50), 2);
        map.insert(IndicatorKind::Atr(20), 3);

        assert_eq!(map.get(&IndicatorKind::Sma(20)), Some(&1));
        assert_eq!(map.get(&IndicatorKind::Atr(20)), Some(&3));
        assert_eq!(map.get(&IndicatorKind::Rsi(20)), None);
    }

    #[test]
    fn series_normalises_non_finite() {
        let series = IndicatorSeries::from_raw("x", vec![1.0, f64::NAN, f64::INFINITY, 4.0]);
        assert_eq!(series.get(0), Some(1.0));
        assert_eq!(series.get(1), None);
        assert_eq!(series.get(2), None);
        assert_eq!(series.get(3), Some(4.0));
        assert_eq!(series.get(99), None);
    }

    #[test]
    fn first_defined_skips_warmup() {
        let series = IndicatorSeries::new("x", vec![None, None, Some(3.0)]);
        assert_eq!(series.first_defined(), Some(2));
        assert_eq!(IndicatorSeries::undefined("y", 4).first_defined(), None);
    }

    #[test]
    fn compute_is_aligned_for_every_kind() {
        let bars = test_support::make_bars(&[10.0, 11.0, 12.0, 11.0, 10.0, 12.0, 13.0]);
        let kinds = [
            IndicatorKind::Sma(3),
            IndicatorKind::Atr(3),
            IndicatorKind::Rsi(3),
            IndicatorKind::Highest(3),
            IndicatorKind::Lowest(3),
        ];
        for kind in kinds {
            assert_eq!(kind.compute(&bars).len(), bars.len(), "{kind}");
        }
    }
}
