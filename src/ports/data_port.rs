//! Data access port trait.

use crate::domain::error::BackfolioError;
use crate::domain::ohlcv::BarSeries;
use chrono::NaiveDate;

pub trait DataPort {
    /// Bars for `symbol` at `interval` within `start_date..=end_date`.
    ///
    /// An empty result is reported as [`BackfolioError::NoData`]; a series is
    /// never returned partially filled.
    fn fetch_bars(
        &self,
        symbol: &str,
        interval: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<BarSeries, BackfolioError>;

    fn list_symbols(&self, interval: &str) -> Result<Vec<String>, BackfolioError>;

    /// First date, last date and bar count, or `None` when nothing is stored.
    fn get_data_range(
        &self,
        symbol: &str,
        interval: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, BackfolioError>;
}
