//! Immutable strategy descriptions and the config-driven factory.
//!
//! Workers never share strategy instances. Each one calls
//! [`StrategySpec::build`] to get a fresh trait object with its own handles.

use crate::domain::error::BackfolioError;
use crate::domain::position::Direction;
use crate::ports::config_port::ConfigPort;

use super::{
    ChannelBreakout, ChannelBreakoutConfig, RiskConfig, RsiReversion, RsiReversionConfig,
    SmaCrossover, SmaCrossoverConfig, Strategy,
};

pub const STRATEGY_NAMES: [&str; 3] = ["sma_crossover", "rsi_reversion", "channel_breakout"];

const SECTION: &str = "strategy";

#[derive(Debug, Clone, PartialEq)]
pub enum StrategySpec {
    SmaCrossover(SmaCrossoverConfig),
    RsiReversion(RsiReversionConfig),
    ChannelBreakout(ChannelBreakoutConfig),
}

impl StrategySpec {
    pub fn name(&self) -> &'static str {
        match self {
            StrategySpec::SmaCrossover(_) => "sma_crossover",
            StrategySpec::RsiReversion(_) => "rsi_reversion",
            StrategySpec::ChannelBreakout(_) => "channel_breakout",
        }
    }

    pub fn build(&self) -> Box<dyn Strategy> {
        match self {
            StrategySpec::SmaCrossover(c) => Box::new(SmaCrossover::new(c.clone())),
            StrategySpec::RsiReversion(c) => Box::new(RsiReversion::new(c.clone())),
            StrategySpec::ChannelBreakout(c) => Box::new(ChannelBreakout::new(c.clone())),
        }
    }

    pub fn risk(&self) -> &RiskConfig {
        match self {
            StrategySpec::SmaCrossover(c) => &c.risk,
            StrategySpec::RsiReversion(c) => &c.risk,
            StrategySpec::ChannelBreakout(c) => &c.risk,
        }
    }

    /// Build a spec for `name` from the `[strategy]` section. Keys that are
    /// absent take the strategy's defaults.
    pub fn from_config(name: &str, config: &dyn ConfigPort) -> Result<Self, BackfolioError> {
        let risk = risk_from_config(config)?;
        match name {
            "sma_crossover" => {
                let defaults = SmaCrossoverConfig::default();
                let fast_period = period(config, "fast_period", defaults.fast_period)?;
                let slow_period = period(config, "slow_period", defaults.slow_period)?;
                if fast_period >= slow_period {
                    return Err(invalid("fast_period", "fast_period must be less than slow_period"));
                }
                let direction = match config.get_string(SECTION, "direction").as_deref() {
                    None | Some("long") => Direction::Long,
                    Some("short") => Direction::Short,
                    Some(other) => {
                        return Err(invalid(
                            "direction",
                            &format!("expected long or short, got '{}'", other),
                        ));
                    }
                };
                Ok(StrategySpec::SmaCrossover(SmaCrossoverConfig {
                    fast_period,
                    slow_period,
                    direction,
                    risk,
                }))
            }
            "rsi_reversion" => {
                let defaults = RsiReversionConfig::default();
                let rsi_period = period(config, "rsi_period", defaults.rsi_period)?;
                let oversold = optional_double(config, "oversold")?.unwrap_or(defaults.oversold);
                let exit_level =
                    optional_double(config, "exit_level")?.unwrap_or(defaults.exit_level);
                if !(0.0..100.0).contains(&oversold) || !(0.0..=100.0).contains(&exit_level) {
                    return Err(invalid("oversold", "RSI levels must lie within 0..100"));
                }
                if oversold >= exit_level {
                    return Err(invalid("oversold", "oversold must be below exit_level"));
                }
                let trend_period = match config.get_string(SECTION, "trend_period") {
                    Some(_) => Some(period(config, "trend_period", 0)?),
                    None => None,
                };
                Ok(StrategySpec::RsiReversion(RsiReversionConfig {
                    rsi_period,
                    oversold,
                    exit_level,
                    trend_period,
                    risk,
                }))
            }
            "channel_breakout" => {
                let defaults = ChannelBreakoutConfig::default();
                Ok(StrategySpec::ChannelBreakout(ChannelBreakoutConfig {
                    entry_period: period(config, "entry_period", defaults.entry_period)?,
                    exit_period: period(config, "exit_period", defaults.exit_period)?,
                    risk,
                }))
            }
            other => Err(BackfolioError::UnknownStrategy {
                name: other.to_string(),
            }),
        }
    }
}

fn risk_from_config(config: &dyn ConfigPort) -> Result<RiskConfig, BackfolioError> {
    let defaults = RiskConfig::default();
    let stop_atr_multiple = positive_multiple(config, "stop_atr")?;
    let target_atr_multiple = positive_multiple(config, "target_atr")?;
    Ok(RiskConfig {
        atr_period: period(config, "atr_period", defaults.atr_period)?,
        stop_atr_multiple,
        target_atr_multiple,
        regime_filter: config.get_bool(SECTION, "regime_filter", defaults.regime_filter),
    })
}

fn period(config: &dyn ConfigPort, key: &str, default: usize) -> Result<usize, BackfolioError> {
    let Some(raw) = config.get_string(SECTION, key) else {
        return Ok(default);
    };
    match raw.trim().parse::<usize>() {
        Ok(value) if value > 0 => Ok(value),
        _ => Err(invalid(key, &format!("expected a positive integer, got '{}'", raw))),
    }
}

fn optional_double(config: &dyn ConfigPort, key: &str) -> Result<Option<f64>, BackfolioError> {
    let Some(raw) = config.get_string(SECTION, key) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(Some)
        .ok_or_else(|| invalid(key, &format!("expected a number, got '{}'", raw)))
}

fn positive_multiple(config: &dyn ConfigPort, key: &str) -> Result<Option<f64>, BackfolioError> {
    match optional_double(config, key)? {
        Some(value) if value <= 0.0 => Err(invalid(key, "ATR multiple must be positive")),
        other => Ok(other),
    }
}

fn invalid(key: &str, reason: &str) -> BackfolioError {
    BackfolioError::ConfigInvalid {
        section: SECTION.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    #[test]
    fn sma_crossover_defaults() {
        let config = make_config("[strategy]\nname = sma_crossover\n");
        let spec = StrategySpec::from_config("sma_crossover", &config).unwrap();
        assert_eq!(spec, StrategySpec::SmaCrossover(SmaCrossoverConfig::default()));
        assert_eq!(spec.name(), "sma_crossover");
        assert_eq!(spec.build().name(), "sma_crossover");
    }

    #[test]
    fn sma_crossover_with_params() {
        let config = make_config(
            "[strategy]\nfast_period = 10\nslow_period = 30\ndirection = short\nstop_atr = 3\natr_period = 10\n",
        );
        let spec = StrategySpec::from_config("sma_crossover", &config).unwrap();
        match spec {
            StrategySpec::SmaCrossover(c) => {
                assert_eq!(c.fast_period, 10);
                assert_eq!(c.slow_period, 30);
                assert_eq!(c.direction, Direction::Short);
                assert_eq!(c.risk.stop_atr_multiple, Some(3.0));
                assert_eq!(c.risk.target_atr_multiple, None);
                assert_eq!(c.risk.atr_period, 10);
            }
            other => panic!("unexpected spec: {:?}", other),
        }
    }

    #[test]
    fn fast_must_be_below_slow() {
        let config = make_config("[strategy]\nfast_period = 50\nslow_period = 20\n");
        let err = StrategySpec::from_config("sma_crossover", &config).unwrap_err();
        assert!(matches!(err, BackfolioError::ConfigInvalid { .. }));
    }

    #[test]
    fn zero_period_rejected() {
        let config = make_config("[strategy]\nentry_period = 0\n");
        assert!(StrategySpec::from_config("channel_breakout", &config).is_err());
    }

    #[test]
    fn rsi_levels_validated() {
        let config = make_config("[strategy]\noversold = 80\nexit_level = 70\n");
        assert!(StrategySpec::from_config("rsi_reversion", &config).is_err());

        let config = make_config("[strategy]\noversold = 25\nexit_level = 55\ntrend_period = 100\n");
        match StrategySpec::from_config("rsi_reversion", &config).unwrap() {
            StrategySpec::RsiReversion(c) => {
                assert_eq!(c.oversold, 25.0);
                assert_eq!(c.exit_level, 55.0);
                assert_eq!(c.trend_period, Some(100));
            }
            other => panic!("unexpected spec: {:?}", other),
        }
    }

    #[test]
    fn negative_multiple_rejected() {
        let config = make_config("[strategy]\ntarget_atr = -2\n");
        assert!(StrategySpec::from_config("channel_breakout", &config).is_err());
    }

    #[test]
    fn regime_filter_flag() {
        let config = make_config("[strategy]\nregime_filter = true\n");
        let spec = StrategySpec::from_config("channel_breakout", &config).unwrap();
        assert!(spec.risk().regime_filter);
    }

    #[test]
    fn unknown_strategy() {
        let config = make_config("[strategy]\n");
        let err = StrategySpec::from_config("martingale", &config).unwrap_err();
        assert!(matches!(err, BackfolioError::UnknownStrategy { .. }));
    }

    #[test]
    fn every_listed_name_builds() {
        let config = make_config("[strategy]\n");
        for name in STRATEGY_NAMES {
            let spec = StrategySpec::from_config(name, &config).unwrap();
            assert_eq!(spec.name(), name);
        }
    }
}
