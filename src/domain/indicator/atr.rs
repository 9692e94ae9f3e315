//! Average True Range with Wilder smoothing.
//!
//! TR[0] = high - low; TR[i] = true range against the previous close.
//! Seed at bar n-1 with the mean of the first n TRs, then
//! ATR[i] = (ATR[i-1] * (n-1) + TR[i]) / n.

use crate::domain::indicator::IndicatorSeries;
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_atr(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let label = format!("ATR({})", period);
    if period == 0 || bars.len() < period {
        return IndicatorSeries::undefined(label, bars.len());
    }

    let tr_values: Vec<f64> = bars
        .iter()
        .enumerate()
        .map(|(i, bar)| {
            if i == 0 {
                bar.high - bar.low
            } else {
                bar.true_range(bars[i - 1].close)
            }
        })
        .collect();

    let mut values = Vec::with_capacity(bars.len());
    let mut atr = 0.0;

    for i in 0..bars.len() {
        if i + 1 < period {
            values.push(None);
        } else if i + 1 == period {
            atr = tr_values[..=i].iter().sum::<f64>() / period as f64;
            values.push(Some(atr));
        } else {
            atr = (atr * (period - 1) as f64 + tr_values[i]) / period as f64;
            values.push(Some(atr));
        }
    }

    IndicatorSeries::new(label, values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_bar(day: u32, high: f64, low: f64, close: f64) -> OhlcvBar {
        OhlcvBar {
            date: NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            open: close,
            high,
            low,
            close,
            volume: 1000,
        }
    }

    #[test]
    fn atr_warmup() {
        let bars: Vec<OhlcvBar> = (1..=5).map(|d| make_bar(d, 110.0, 90.0, 100.0)).collect();
        let series = calculate_atr(&bars, 3);
        assert_eq!(series.len(), 5);
        assert_eq!(series.get(0), None);
        assert_eq!(series.get(1), None);
        assert_eq!(series.first_defined(), Some(2));
    }

    #[test]
    fn atr_seed_is_average() {
        let bars = vec![
            make_bar(1, 110.0, 100.0, 105.0),
            make_bar(2, 115.0, 105.0, 110.0),
            make_bar(3, 120.0, 110.0, 115.0),
        ];
        let series = calculate_atr(&bars, 3);
        assert!((series.get(2).unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn atr_wilder_smoothing() {
        let bars = vec![
            make_bar(1, 110.0, 100.0, 105.0),
            make_bar(2, 115.0, 105.0, 110.0),
            make_bar(3, 120.0, 110.0, 115.0),
            make_bar(4, 130.0, 115.0, 120.0),
        ];
        let series = calculate_atr(&bars, 3);
        // TR[3] = max(15, |130-115|, |115-115|) = 15
        let expected = (10.0 * 2.0 + 15.0) / 3.0;
        assert!((series.get(3).unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn atr_insufficient_bars_is_aligned() {
        let bars: Vec<OhlcvBar> = (1..=2).map(|d| make_bar(d, 110.0, 90.0, 100.0)).collect();
        let series = calculate_atr(&bars, 5);
        assert_eq!(series.len(), 2);
        assert_eq!(series.first_defined(), None);
    }

    #[test]
    fn atr_uses_gap_true_range() {
        let bars = vec![
            make_bar(1, 110.0, 100.0, 105.0),
            make_bar(2, 130.0, 120.0, 125.0),
        ];
        let series = calculate_atr(&bars, 2);
        // TR[0] = 10, TR[1] = |130-105| = 25
        assert!((series.get(1).unwrap() - 17.5).abs() < 1e-9);
    }
}
