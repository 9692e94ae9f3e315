//! CSV file data adapter.
//!
//! Reads `<SYMBOL>_<INTERVAL>.csv` from the base directory, falling back to
//! `<SYMBOL>.csv`. Files carry a `date,open,high,low,close,volume` header.

use crate::domain::error::BackfolioError;
use crate::domain::ohlcv::{BarSeries, OhlcvBar};
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub struct CsvAdapter {
    base_path: PathBuf,
}

#[derive(Debug, Deserialize)]
struct CsvBar {
    date: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: i64,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, symbol: &str, interval: &str) -> Option<PathBuf> {
        let primary = self.base_path.join(format!("{}_{}.csv", symbol, interval));
        if primary.is_file() {
            return Some(primary);
        }
        let fallback = self.base_path.join(format!("{}.csv", symbol));
        fallback.is_file().then_some(fallback)
    }

    fn read_bars(&self, path: &Path) -> Result<Vec<OhlcvBar>, BackfolioError> {
        let content = fs::read_to_string(path).map_err(|e| BackfolioError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for (line, result) in rdr.deserialize::<CsvBar>().enumerate() {
            let row = result.map_err(|e| BackfolioError::Data {
                reason: format!("{}: CSV parse error: {}", path.display(), e),
            })?;
            let date = NaiveDate::parse_from_str(&row.date, "%Y-%m-%d").map_err(|e| {
                BackfolioError::Data {
                    reason: format!("{} row {}: invalid date format: {}", path.display(), line + 1, e),
                }
            })?;
            bars.push(OhlcvBar {
                date,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
            });
        }

        // rows stay in file order; BarSeries rejects anything not strictly increasing
        Ok(bars)
    }
}

impl DataPort for CsvAdapter {
    fn fetch_bars(
        &self,
        symbol: &str,
        interval: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<BarSeries, BackfolioError> {
        let no_data = || BackfolioError::NoData {
            symbol: symbol.to_string(),
            interval: interval.to_string(),
        };
        let path = self.csv_path(symbol, interval).ok_or_else(no_data)?;

        let bars: Vec<OhlcvBar> = self
            .read_bars(&path)?
            .into_iter()
            .filter(|b| b.date >= start_date && b.date <= end_date)
            .collect();
        if bars.is_empty() {
            return Err(no_data());
        }
        BarSeries::validated(symbol, bars)
    }

    fn list_symbols(&self, interval: &str) -> Result<Vec<String>, BackfolioError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| BackfolioError::Data {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let suffix = format!("_{}.csv", interval);
        let mut symbols = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|e| BackfolioError::Data {
                reason: format!("directory entry error: {}", e),
            })?;

            let name = entry.file_name();
            let name_str = name.to_string_lossy();

            if let Some(symbol) = name_str.strip_suffix(&suffix) {
                symbols.push(symbol.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(
        &self,
        symbol: &str,
        interval: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, BackfolioError> {
        let Some(path) = self.csv_path(symbol, interval) else {
            return Ok(None);
        };
        let bars = self.read_bars(&path)?;
        let first = bars.iter().map(|b| b.date).min();
        let last = bars.iter().map(|b| b.date).max();
        Ok(first.zip(last).map(|(first, last)| (first, last, bars.len())))
    }
}
