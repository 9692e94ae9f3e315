//! Price channel bounds (Donchian style): trailing highest high and lowest low.

use crate::domain::indicator::IndicatorSeries;
use crate::domain::ohlcv::OhlcvBar;

pub fn calculate_highest(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    rolling_extreme(bars, period, format!("HIGHEST({})", period), |b| b.high, f64::max)
}

pub fn calculate_lowest(bars: &[OhlcvBar], period: usize) -> IndicatorSeries {
    rolling_extreme(bars, period, format!("LOWEST({})", period), |b| b.low, f64::min)
}

fn rolling_extreme(
    bars: &[OhlcvBar],
    period: usize,
    label: String,
    field: impl Fn(&OhlcvBar) -> f64,
    pick: impl Fn(f64, f64) -> f64,
) -> IndicatorSeries {
    let values = (0..bars.len())
        .map(|i| {
            if period == 0 || i + 1 < period {
                return None;
            }
            bars[i + 1 - period..=i].iter().map(&field).reduce(&pick)
        })
        .collect();
    IndicatorSeries::new(label, values)
}
