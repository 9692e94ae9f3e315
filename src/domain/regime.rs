//! Benchmark trend regime detection.
//!
//! [`RegimeTracker`] keeps running sums for a short and a long simple moving
//! average so each new benchmark bar costs O(1). [`RegimeCache::build`] feeds
//! the benchmark through a tracker once, before any worker starts, and stores
//! the regime for every benchmark date. Workers only ever read the cache.

use std::collections::{HashMap, VecDeque};
use std::fmt;

use chrono::NaiveDate;

use super::ohlcv::OhlcvBar;

pub const DEFAULT_SHORT_PERIOD: usize = 50;
pub const DEFAULT_LONG_PERIOD: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Regime {
    /// Close above the long average, short average above the long one.
    Bullish,
    Neutral,
    /// Close below the long average, short average below the long one.
    Bearish,
    /// Not enough benchmark history for the long average.
    Unknown,
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Regime::Bullish => write!(f, "bullish"),
            Regime::Neutral => write!(f, "neutral"),
            Regime::Bearish => write!(f, "bearish"),
            Regime::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Debug, Clone)]
struct RunningSma {
    period: usize,
    window: VecDeque<f64>,
    sum: f64,
}

impl RunningSma {
    fn new(period: usize) -> Self {
        Self {
            period,
            window: VecDeque::with_capacity(period + 1),
            sum: 0.0,
        }
    }

    fn push(&mut self, value: f64) {
        self.window.push_back(value);
        self.sum += value;
        if self.window.len() > self.period {
            if let Some(old) = self.window.pop_front() {
                self.sum -= old;
            }
        }
    }

    fn value(&self) -> Option<f64> {
        (self.period > 0 && self.window.len() == self.period).then(|| self.sum / self.period as f64)
    }
}

/// Incremental short/long SMA state over benchmark closes.
#[derive(Debug, Clone)]
pub struct RegimeTracker {
    short: RunningSma,
    long: RunningSma,
    last_close: Option<f64>,
    updates: usize,
}

impl RegimeTracker {
    pub fn new(short_period: usize, long_period: usize) -> Self {
        Self {
            short: RunningSma::new(short_period),
            long: RunningSma::new(long_period),
            last_close: None,
            updates: 0,
        }
    }

    /// Feed one benchmark close and return the regime as of that bar.
    pub fn update(&mut self, close: f64) -> Regime {
        self.short.push(close);
        self.long.push(close);
        self.last_close = Some(close);
        self.updates += 1;
        self.current()
    }

    pub fn current(&self) -> Regime {
        let (Some(close), Some(short), Some(long)) =
            (self.last_close, self.short.value(), self.long.value())
        else {
            return Regime::Unknown;
        };
        if close > long && short > long {
            Regime::Bullish
        } else if close < long && short < long {
            Regime::Bearish
        } else {
            Regime::Neutral
        }
    }

    pub fn short_sma(&self) -> Option<f64> {
        self.short.value()
    }

    pub fn long_sma(&self) -> Option<f64> {
        self.long.value()
    }

    /// Number of bars fed so far.
    pub fn updates(&self) -> usize {
        self.updates
    }
}

/// Per-date regime table, built once per run and shared read-only.
#[derive(Debug, Clone, Default)]
pub struct RegimeCache {
    by_date: HashMap<NaiveDate, Regime>,
    dates: Vec<NaiveDate>,
    updates: usize,
}

impl RegimeCache {
    pub fn build(benchmark: &[OhlcvBar], short_period: usize, long_period: usize) -> Self {
        let mut tracker = RegimeTracker::new(short_period, long_period);
        let mut by_date = HashMap::with_capacity(benchmark.len());
        let mut dates = Vec::with_capacity(benchmark.len());
        for bar in benchmark {
            by_date.insert(bar.date, tracker.update(bar.close));
            dates.push(bar.date);
        }
        Self {
            by_date,
            dates,
            updates: tracker.updates(),
        }
    }

    /// Regime on `date`, or on the latest benchmark date before it.
    pub fn regime_at(&self, date: NaiveDate) -> Regime {
        if let Some(regime) = self.by_date.get(&date) {
            return *regime;
        }
        let idx = self.dates.partition_point(|d| *d <= date);
        if idx == 0 {
            return Regime::Unknown;
        }
        self.by_date
            .get(&self.dates[idx - 1])
            .copied()
            .unwrap_or(Regime::Unknown)
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// How many benchmark bars were fed through the tracker to build this.
    pub fn updates(&self) -> usize {
        self.updates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::make_bars;

    #[test]
    fn tracker_unknown_until_long_period() {
        let mut tracker = RegimeTracker::new(2, 4);
        assert_eq!(tracker.update(1.0), Regime::Unknown);
        assert_eq!(tracker.update(2.0), Regime::Unknown);
        assert_eq!(tracker.update(3.0), Regime::Unknown);
        assert_eq!(tracker.update(4.0), Regime::Bullish);
    }

    #[test]
    fn tracker_running_sums_match_window_means() {
        let mut tracker = RegimeTracker::new(2, 3);
        for close in [10.0, 20.0, 30.0, 40.0] {
            tracker.update(close);
        }
        assert!((tracker.short_sma().unwrap() - 35.0).abs() < 1e-12);
        assert!((tracker.long_sma().unwrap() - 30.0).abs() < 1e-12);
        assert_eq!(tracker.updates(), 4);
    }

    #[test]
    fn tracker_bearish_and_neutral() {
        let mut tracker = RegimeTracker::new(2, 4);
        for close in [40.0, 30.0, 20.0] {
            tracker.update(close);
        }
        assert_eq!(tracker.update(10.0), Regime::Bearish);

        let mut tracker = RegimeTracker::new(2, 4);
        for close in [10.0, 20.0, 30.0, 40.0] {
            tracker.update(close);
        }
        // short avg (40+10)/2 = 25 equals long avg 25
        assert_eq!(tracker.update(10.0), Regime::Neutral);
    }

    #[test]
    fn cache_feeds_each_bar_once() {
        let bars = make_bars(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let cache = RegimeCache::build(&bars, 2, 3);
        assert_eq!(cache.updates(), bars.len());
        assert_eq!(cache.len(), bars.len());
        assert_eq!(cache.regime_at(bars[0].date), Regime::Unknown);
        assert_eq!(cache.regime_at(bars[5].date), Regime::Bullish);
    }

    #[test]
    fn cache_falls_back_to_prior_date() {
        let bars = make_bars(&[1.0, 2.0, 3.0, 4.0]);
        let cache = RegimeCache::build(&bars, 2, 3);
        let after = bars[3].date + chrono::Duration::days(10);
        assert_eq!(cache.regime_at(after), cache.regime_at(bars[3].date));
        let before = bars[0].date - chrono::Duration::days(1);
        assert_eq!(cache.regime_at(before), Regime::Unknown);
    }

    #[test]
    fn empty_cache_is_unknown() {
        let cache = RegimeCache::default();
        assert!(cache.is_empty());
        assert_eq!(
            cache.regime_at(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
            Regime::Unknown
        );
    }
}
