//! Universe module for basket backtesting.
//!
//! Parses code lists from configuration and loads each code's bars,
//! skipping codes without enough data.

use crate::domain::error::BackfolioError;
use crate::domain::ohlcv::BarSeries;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use std::collections::HashSet;
use tracing::{info, warn};

pub const MIN_OHLCV_BARS: usize = 30;

#[derive(Debug, Clone)]
pub struct Universe {
    pub codes: Vec<String>,
    pub interval: String,
}

impl Universe {
    pub fn count(&self) -> usize {
        self.codes.len()
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in code list")]
    EmptyToken,

    #[error("duplicate code: {0}")]
    DuplicateCode(String),
}

impl From<UniverseError> for BackfolioError {
    fn from(err: UniverseError) -> Self {
        BackfolioError::ConfigInvalid {
            section: "backtest".to_string(),
            key: "codes".to_string(),
            reason: err.to_string(),
        }
    }
}

pub fn parse_codes(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut codes = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let code = trimmed.to_uppercase();
        if !seen.insert(code.clone()) {
            return Err(UniverseError::DuplicateCode(code));
        }
        codes.push(code);
    }

    Ok(codes)
}

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    NoData,
    InsufficientBars { bars: usize },
    Invalid(String),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NoData => write!(f, "no data"),
            SkipReason::InsufficientBars { bars } => {
                write!(f, "only {} bars, minimum {} required", bars, MIN_OHLCV_BARS)
            }
            SkipReason::Invalid(reason) => write!(f, "{}", reason),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SkippedCode {
    pub code: String,
    pub reason: SkipReason,
}

#[derive(Debug)]
pub struct LoadedUniverse {
    pub universe: Universe,
    /// One series per code in `universe.codes`, same order.
    pub series: Vec<BarSeries>,
    pub skipped: Vec<SkippedCode>,
}

/// Fetch every code and keep those with at least [`MIN_OHLCV_BARS`] bars.
///
/// Per-code failures are recorded as skips. Only an entirely empty result is
/// an error.
pub fn load_universe(
    data_port: &dyn DataPort,
    codes: Vec<String>,
    interval: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<LoadedUniverse, BackfolioError> {
    let total = codes.len();
    let mut valid_codes = Vec::new();
    let mut series = Vec::new();
    let mut skipped = Vec::new();

    for code in codes {
        let reason = match data_port.fetch_bars(&code, interval, start_date, end_date) {
            Ok(bars) if bars.len() >= MIN_OHLCV_BARS => {
                info!(
                    code = %code,
                    bars = bars.len(),
                    first = ?bars.first_date(),
                    last = ?bars.last_date(),
                    "loaded"
                );
                valid_codes.push(code);
                series.push(bars);
                continue;
            }
            Ok(bars) if bars.is_empty() => SkipReason::NoData,
            Ok(bars) => SkipReason::InsufficientBars { bars: bars.len() },
            Err(BackfolioError::NoData { .. }) => SkipReason::NoData,
            Err(e) if e.is_instrument_scoped() => SkipReason::Invalid(e.to_string()),
            Err(e) => return Err(e),
        };
        warn!(code = %code, interval, reason = %reason, "skipping");
        skipped.push(SkippedCode { code, reason });
    }

    if valid_codes.is_empty() {
        return Err(BackfolioError::InsufficientData {
            symbol: "all".to_string(),
            bars: 0,
            minimum: MIN_OHLCV_BARS,
        });
    }

    if !skipped.is_empty() {
        info!(
            loaded = valid_codes.len(),
            requested = total,
            interval,
            "backtesting a partial basket"
        );
    }

    Ok(LoadedUniverse {
        universe: Universe {
            codes: valid_codes,
            interval: interval.to_string(),
        },
        series,
        skipped,
    })
}
