//! Run parameters for a basket backtest.
//!
//! `BacktestConfig` collects the `[backtest]` section into typed values and
//! derives the engine, basket and allocation settings from it.

use std::time::Duration;

use chrono::NaiveDate;

use super::basket::BasketConfig;
use super::config_validation::{parse_date, validate_backtest_config};
use super::engine::EngineConfig;
use super::error::BackfolioError;
use super::portfolio::{CapitalAllocator, EqualWeight, FixedWeights};
use crate::ports::config_port::ConfigPort;

const SECTION: &str = "backtest";

#[derive(Debug, Clone)]
pub struct BacktestConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_capital: f64,
    pub capital_fraction: f64,
    pub commission_per_trade: f64,
    pub commission_pct: f64,
    pub slippage_pct: f64,
    pub risk_free_rate: f64,
    pub threads: usize,
    pub worker_timeout: Option<Duration>,
    /// Fixed allocation; equal weight when absent.
    pub weights: Option<FixedWeights>,
}

impl BacktestConfig {
    /// Validate and read the `[backtest]` section.
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, BackfolioError> {
        validate_backtest_config(config)?;

        let start_date = parse_date(config.get_string(SECTION, "start_date").as_deref(), "start_date")?;
        let end_date = parse_date(config.get_string(SECTION, "end_date").as_deref(), "end_date")?;

        let timeout_secs = config.get_int(SECTION, "worker_timeout_secs", 0);
        let worker_timeout = (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs as u64));

        let weights = match config.get_string(SECTION, "weights") {
            Some(raw) if !raw.trim().is_empty() => Some(FixedWeights::parse(&raw)?),
            _ => None,
        };

        Ok(Self {
            start_date,
            end_date,
            initial_capital: config.get_double(SECTION, "initial_capital", 100_000.0),
            capital_fraction: config.get_double(SECTION, "capital_fraction", 1.0),
            commission_per_trade: config.get_double(SECTION, "commission_per_trade", 0.0),
            commission_pct: config.get_double(SECTION, "commission_pct", 0.0),
            slippage_pct: config.get_double(SECTION, "slippage_pct", 0.0),
            risk_free_rate: config.get_double(SECTION, "risk_free_rate", 0.0),
            threads: config.get_int(SECTION, "threads", 0).max(0) as usize,
            worker_timeout,
            weights,
        })
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            initial_capital: self.initial_capital,
            capital_fraction: self.capital_fraction,
            commission_per_trade: self.commission_per_trade,
            commission_pct: self.commission_pct,
            slippage_pct: self.slippage_pct,
            time_budget: self.worker_timeout,
        }
    }

    pub fn basket_config(&self) -> BasketConfig {
        BasketConfig {
            total_capital: self.initial_capital,
            engine: self.engine_config(),
            threads: self.threads,
            worker_timeout: self.worker_timeout,
            risk_free_rate: self.risk_free_rate,
        }
    }

    pub fn allocator(&self) -> Box<dyn CapitalAllocator> {
        match &self.weights {
            Some(weights) => Box::new(weights.clone()),
            None => Box::new(EqualWeight),
        }
    }
}
