//! Configuration validation.
//!
//! Validates every config field before a backtest runs.

use crate::domain::error::BackfolioError;
use crate::domain::strategy::STRATEGY_NAMES;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), BackfolioError> {
    validate_initial_capital(config)?;
    validate_capital_fraction(config)?;
    validate_commission(config)?;
    validate_slippage(config)?;
    validate_risk_free_rate(config)?;
    validate_dates(config)?;
    validate_threads(config)?;
    Ok(())
}

pub fn validate_strategy_config(config: &dyn ConfigPort) -> Result<(), BackfolioError> {
    match config.get_string("strategy", "name") {
        Some(name) if STRATEGY_NAMES.contains(&name.trim()) => Ok(()),
        Some(name) if !name.trim().is_empty() => Err(BackfolioError::UnknownStrategy {
            name: name.trim().to_string(),
        }),
        _ => Err(BackfolioError::ConfigMissing {
            section: "strategy".to_string(),
            key: "name".to_string(),
        }),
    }
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), BackfolioError> {
    match config.get_string("data", "path") {
        Some(s) if !s.trim().is_empty() => {}
        _ => {
            return Err(BackfolioError::ConfigMissing {
                section: "data".to_string(),
                key: "path".to_string(),
            });
        }
    }
    if let Some(interval) = config.get_string("data", "interval") {
        if interval.trim().is_empty() || interval.contains(['/', '\\']) {
            return Err(invalid("data", "interval", "interval must be a plain name such as 1d"));
        }
    }
    Ok(())
}

pub fn validate_regime_config(config: &dyn ConfigPort) -> Result<(), BackfolioError> {
    let short = config.get_int("regime", "short_period", 50);
    let long = config.get_int("regime", "long_period", 200);
    if short < 1 {
        return Err(invalid("regime", "short_period", "short_period must be at least 1"));
    }
    if long <= short {
        return Err(invalid("regime", "long_period", "long_period must exceed short_period"));
    }
    Ok(())
}

/// Codes must come from either the command line or `[backtest] codes`.
pub fn validate_codes(config: &dyn ConfigPort) -> Result<(), BackfolioError> {
    match config.get_string("backtest", "codes") {
        Some(c) if !c.trim().is_empty() => Ok(()),
        _ => Err(BackfolioError::ConfigMissing {
            section: "backtest".to_string(),
            key: "codes".to_string(),
        }),
    }
}

fn invalid(section: &str, key: &str, reason: &str) -> BackfolioError {
    BackfolioError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), BackfolioError> {
    let value = config.get_double("backtest", "initial_capital", 100_000.0);
    if value <= 0.0 {
        return Err(invalid("backtest", "initial_capital", "initial_capital must be positive"));
    }
    Ok(())
}

fn validate_capital_fraction(config: &dyn ConfigPort) -> Result<(), BackfolioError> {
    let value = config.get_double("backtest", "capital_fraction", 1.0);
    if value <= 0.0 || value > 1.0 {
        return Err(invalid(
            "backtest",
            "capital_fraction",
            "capital_fraction must be in (0, 1]",
        ));
    }
    Ok(())
}

fn validate_commission(config: &dyn ConfigPort) -> Result<(), BackfolioError> {
    let per_trade = config.get_double("backtest", "commission_per_trade", 0.0);
    if per_trade < 0.0 {
        return Err(invalid(
            "backtest",
            "commission_per_trade",
            "commission_per_trade must be non-negative",
        ));
    }
    let pct = config.get_double("backtest", "commission_pct", 0.0);
    if pct < 0.0 {
        return Err(invalid("backtest", "commission_pct", "commission_pct must be non-negative"));
    }
    Ok(())
}

fn validate_slippage(config: &dyn ConfigPort) -> Result<(), BackfolioError> {
    let value = config.get_double("backtest", "slippage_pct", 0.0);
    if value < 0.0 {
        return Err(invalid("backtest", "slippage_pct", "slippage_pct must be non-negative"));
    }
    Ok(())
}

fn validate_risk_free_rate(config: &dyn ConfigPort) -> Result<(), BackfolioError> {
    let value = config.get_double("backtest", "risk_free_rate", 0.0);
    if !(0.0..1.0).contains(&value) {
        return Err(invalid("backtest", "risk_free_rate", "risk_free_rate must be between 0 and 1"));
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), BackfolioError> {
    let start_str = config.get_string("backtest", "start_date");
    let end_str = config.get_string("backtest", "end_date");

    let start_date = parse_date(start_str.as_deref(), "start_date")?;
    let end_date = parse_date(end_str.as_deref(), "end_date")?;

    if start_date >= end_date {
        return Err(invalid("backtest", "start_date", "start_date must be before end_date"));
    }
    Ok(())
}

fn validate_threads(config: &dyn ConfigPort) -> Result<(), BackfolioError> {
    if config.get_int("backtest", "threads", 0) < 0 {
        return Err(invalid("backtest", "threads", "threads must be non-negative"));
    }
    if config.get_int("backtest", "worker_timeout_secs", 0) < 0 {
        return Err(invalid(
            "backtest",
            "worker_timeout_secs",
            "worker_timeout_secs must be non-negative",
        ));
    }
    Ok(())
}

pub(crate) fn parse_date(value: Option<&str>, field: &str) -> Result<NaiveDate, BackfolioError> {
    match value {
        None => Err(BackfolioError::ConfigMissing {
            section: "backtest".to_string(),
            key: field.to_string(),
        }),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
            BackfolioError::ConfigInvalid {
                section: "backtest".to_string(),
                key: field.to_string(),
                reason: format!("invalid {} format, expected YYYY-MM-DD", field),
            }
        }),
    }
}
