//! Simple Moving Average over closing prices.
//!
//! SMA(n)[i] = mean(C[i-n+1..=i]), maintained as a running sum.
//! Warmup: first (n-1) bars are undefined.

use crate::domain::indicator::IndicatorSeries;
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_sma(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    let label = format!("SMA({})", period);
    if period == 0 {
        return IndicatorSeries::undefined(label, bars.len());
    }

    let mut values = Vec::with_capacity(bars.len());
    let mut sum = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        sum += bar.close;
        if i >= period {
            sum -= bars[i - period].close;
        }
        if i + 1 >= period {
            values.push(Some(sum / period as f64));
        } else {
            values.push(None);
        }
    }

    IndicatorSeries::new(label, values)
}
