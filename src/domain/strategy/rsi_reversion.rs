//! RSI mean reversion: buy oversold, sell once momentum recovers.

use crate::domain::error::BackfolioError;
use crate::domain::indicator::IndicatorKind;
use crate::domain::position::{Direction, Position};
use crate::domain::registry::{IndicatorHandle, IndicatorRegistry};

use super::{EntryPlan, RiskConfig, Strategy, StrategyContext};

#[derive(Debug, Clone, PartialEq)]
pub struct RsiReversionConfig {
    pub rsi_period: usize,
    pub oversold: f64,
    pub exit_level: f64,
    /// When set, only buy while the close is above this SMA.
    pub trend_period: Option<usize>,
    pub risk: RiskConfig,
}

impl Default for RsiReversionConfig {
    fn default() -> Self {
        Self {
            rsi_period: 14,
            oversold: 30.0,
            exit_level: 70.0,
            trend_period: None,
            risk: RiskConfig::default(),
        }
    }
}

#[derive(Debug)]
pub struct RsiReversion {
    config: RsiReversionConfig,
    rsi: Option<IndicatorHandle>,
    trend: Option<IndicatorHandle>,
    atr: Option<IndicatorHandle>,
}

impl RsiReversion {
    pub fn new(config: RsiReversionConfig) -> Self {
        Self {
            config,
            rsi: None,
            trend: None,
            atr: None,
        }
    }

    fn entry_signal(&self, ctx: &StrategyContext<'_>, index: usize) -> Option<bool> {
        let rsi = ctx.value(self.rsi, index)?;
        if self.trend.is_some() {
            let trend = ctx.value(self.trend, index)?;
            if ctx.close(index)? <= trend {
                return Some(false);
            }
        }
        Some(rsi < self.config.oversold)
    }
}

impl Strategy for RsiReversion {
    fn name(&self) -> &str {
        "rsi_reversion"
    }

    fn prepare(&mut self, registry: &mut IndicatorRegistry<'_>) -> Result<(), BackfolioError> {
        self.rsi = Some(registry.register(IndicatorKind::Rsi(self.config.rsi_period)));
        self.trend = self
            .config
            .trend_period
            .map(|p| registry.register(IndicatorKind::Sma(p)));
        self.atr = self.config.risk.prepare(registry);
        Ok(())
    }

    fn should_enter(&self, ctx: &StrategyContext<'_>, index: usize) -> bool {
        self.entry_signal(ctx, index).unwrap_or(false)
            && self.config.risk.regime_allows(ctx, index, Direction::Long)
    }

    fn should_exit(&self, ctx: &StrategyContext<'_>, index: usize, _position: &Position) -> bool {
        ctx.value(self.rsi, index)
            .is_some_and(|rsi| rsi > self.config.exit_level)
    }

    fn on_entry(&self, ctx: &StrategyContext<'_>, index: usize, entry_price: f64) -> EntryPlan {
        let mut plan = self
            .config
            .risk
            .plan(ctx, self.atr, index, entry_price, Direction::Long);
        if let Some(rsi) = ctx.value(self.rsi, index) {
            plan.metadata.insert("entry_rsi".to_string(), rsi);
        }
        plan
    }
}
