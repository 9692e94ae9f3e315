//! OHLCV bars and the validated per-instrument bar series.

use chrono::NaiveDate;

use super::error::BackfolioError;

#[derive(Debug, Clone, PartialEq)]
pub struct OhlcvBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

impl OhlcvBar {
    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }

    /// High is the bar's maximum and low its minimum, all prices finite.
    pub fn is_consistent(&self) -> bool {
        let prices = [self.open, self.high, self.low, self.close];
        prices.iter().all(|p| p.is_finite())
            && self.high >= self.open.max(self.close).max(self.low)
            && self.low <= self.open.min(self.close)
    }
}

/// Immutable, strictly date-ordered bars for one instrument.
///
/// The only way to build one is through [`BarSeries::new`], which refuses
/// duplicate or out-of-order dates, so every consumer can rely on position
/// `i` preceding position `i + 1` in time.
#[derive(Debug, Clone, PartialEq)]
pub struct BarSeries {
    symbol: String,
    bars: Vec<OhlcvBar>,
}

impl BarSeries {
    pub fn new(symbol: impl Into<String>, bars: Vec<OhlcvBar>) -> Result<Self, BackfolioError> {
        let symbol = symbol.into();
        if let Some(pos) = bars.windows(2).position(|w| w[1].date <= w[0].date) {
            return Err(BackfolioError::Precondition {
                reason: format!(
                    "bar {} ({}) does not follow {}",
                    pos + 1,
                    bars[pos + 1].date,
                    bars[pos].date
                ),
                symbol,
            });
        }
        Ok(Self { symbol, bars })
    }

    /// Like [`BarSeries::new`] but also rejects bars whose OHLC values are
    /// internally inconsistent. Loaders use this.
    pub fn validated(symbol: impl Into<String>, bars: Vec<OhlcvBar>) -> Result<Self, BackfolioError> {
        let series = Self::new(symbol, bars)?;
        if let Some(bad) = series.bars.iter().find(|b| !b.is_consistent()) {
            return Err(BackfolioError::Precondition {
                symbol: series.symbol.clone(),
                reason: format!("inconsistent OHLC on {}", bad.date),
            });
        }
        Ok(series)
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bars(&self) -> &[OhlcvBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|b| b.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }

    /// Keep only bars within `[start, end]`.
    pub fn between(&self, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            symbol: self.symbol.clone(),
            bars: self
                .bars
                .iter()
                .filter(|b| b.date >= start && b.date <= end)
                .cloned()
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bar() -> OhlcvBar {
        OhlcvBar {
            date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            open: 100.0,
            high: 110.0,
            low: 90.0,
            close: 105.0,
            volume: 50_000,
        }
    }

    fn bar_on(day: u32) -> OhlcvBar {
        OhlcvBar {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            ..sample_bar()
        }
    }

    #[test]
    fn true_range_hl_dominates() {
        let bar = sample_bar();
        assert!((bar.true_range(100.0) - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn true_range_gap_up() {
        let bar = sample_bar();
        // |110-70| = 40 beats high-low = 20
        assert!((bar.true_range(70.0) - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn true_range_gap_down() {
        let bar = sample_bar();
        assert!((bar.true_range(130.0) - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn consistency_check() {
        assert!(sample_bar().is_consistent());
        let bad = OhlcvBar {
            high: 95.0,
            ..sample_bar()
        };
        assert!(!bad.is_consistent());
        let nan = OhlcvBar {
            close: f64::NAN,
            ..sample_bar()
        };
        assert!(!nan.is_consistent());
    }

    #[test]
    fn series_accepts_increasing_dates() {
        let series = BarSeries::new("BHP", vec![bar_on(1), bar_on(2), bar_on(5)]).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.symbol(), "BHP");
        assert_eq!(series.first_date(), NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(series.last_date(), NaiveDate::from_ymd_opt(2024, 1, 5));
    }

    #[test]
    fn series_rejects_duplicate_dates() {
        let err = BarSeries::new("BHP", vec![bar_on(1), bar_on(1)]).unwrap_err();
        assert!(matches!(err, BackfolioError::Precondition { .. }));
    }

    #[test]
    fn series_rejects_out_of_order_dates() {
        let err = BarSeries::new("BHP", vec![bar_on(2), bar_on(1)]).unwrap_err();
        match err {
            BackfolioError::Precondition { symbol, .. } => assert_eq!(symbol, "BHP"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn validated_rejects_inconsistent_bar() {
        let mut bad = bar_on(2);
        bad.low = 120.0;
        assert!(BarSeries::validated("BHP", vec![bar_on(1), bad]).is_err());
    }

    #[test]
    fn between_filters_inclusive() {
        let series = BarSeries::new("BHP", vec![bar_on(1), bar_on(2), bar_on(3)]).unwrap();
        let sub = series.between(
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
        );
        assert_eq!(sub.len(), 2);
        assert_eq!(sub.symbol(), "BHP");
    }
}
