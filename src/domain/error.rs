//! Domain error types.

use std::time::Duration;

/// Top-level error type for backfolio.
#[derive(Debug, thiserror::Error)]
pub enum BackfolioError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("unknown strategy: {name}")]
    UnknownStrategy { name: String },

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no data for {symbol} ({interval})")]
    NoData { symbol: String, interval: String },

    #[error("insufficient data for {symbol}: have {bars} bars, need {minimum}")]
    InsufficientData {
        symbol: String,
        bars: usize,
        minimum: usize,
    },

    #[error("malformed bar series for {symbol}: {reason}")]
    Precondition { symbol: String, reason: String },

    #[error("indicator {label}: {reason}")]
    Indicator { label: String, reason: String },

    #[error("{symbol} exceeded its {budget:?} simulation budget")]
    Timeout { symbol: String, budget: Duration },

    #[error("worker for {symbol} failed: {reason}")]
    Worker { symbol: String, reason: String },

    #[error("no instrument completed: {failed} failed")]
    NoCompletedInstruments { failed: usize },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error("worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BackfolioError {
    /// Errors that only disqualify one instrument rather than the whole run.
    pub fn is_instrument_scoped(&self) -> bool {
        matches!(
            self,
            BackfolioError::Data { .. }
                | BackfolioError::NoData { .. }
                | BackfolioError::InsufficientData { .. }
                | BackfolioError::Precondition { .. }
                | BackfolioError::Indicator { .. }
                | BackfolioError::Timeout { .. }
                | BackfolioError::Worker { .. }
        )
    }
}

impl From<&BackfolioError> for std::process::ExitCode {
    fn from(err: &BackfolioError) -> Self {
        let code: u8 = match err {
            BackfolioError::Io(_)
            | BackfolioError::Report { .. }
            | BackfolioError::ThreadPool(_) => 1,
            BackfolioError::ConfigParse { .. }
            | BackfolioError::ConfigMissing { .. }
            | BackfolioError::ConfigInvalid { .. }
            | BackfolioError::UnknownStrategy { .. } => 2,
            BackfolioError::Data { .. } => 3,
            BackfolioError::Indicator { .. } => 4,
            BackfolioError::NoData { .. } | BackfolioError::InsufficientData { .. } => 5,
            BackfolioError::Precondition { .. }
            | BackfolioError::Timeout { .. }
            | BackfolioError::Worker { .. }
            | BackfolioError::NoCompletedInstruments { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
