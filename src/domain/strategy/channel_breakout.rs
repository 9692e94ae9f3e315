//! Donchian-style channel breakout.
//!
//! Enters when the close clears the highest high of the previous
//! `entry_period` bars and exits when it falls through the lowest low of the
//! previous `exit_period` bars.

use crate::domain::error::BackfolioError;
use crate::domain::indicator::IndicatorKind;
use crate::domain::position::{Direction, Position};
use crate::domain::registry::{IndicatorHandle, IndicatorRegistry};

use super::{EntryPlan, RiskConfig, Strategy, StrategyContext};

#[derive(Debug, Clone, PartialEq)]
pub struct ChannelBreakoutConfig {
    pub entry_period: usize,
    pub exit_period: usize,
    pub risk: RiskConfig,
}

impl Default for ChannelBreakoutConfig {
    fn default() -> Self {
        Self {
            entry_period: 55,
            exit_period: 20,
            risk: RiskConfig::default(),
        }
    }
}

#[derive(Debug)]
pub struct ChannelBreakout {
    config: ChannelBreakoutConfig,
    upper: Option<IndicatorHandle>,
    lower: Option<IndicatorHandle>,
    atr: Option<IndicatorHandle>,
}

impl ChannelBreakout {
    pub fn new(config: ChannelBreakoutConfig) -> Self {
        Self {
            config,
            upper: None,
            lower: None,
            atr: None,
        }
    }

    fn breakout(&self, ctx: &StrategyContext<'_>, index: usize) -> Option<bool> {
        let upper = ctx.value(self.upper, index.checked_sub(1)?)?;
        Some(ctx.close(index)? > upper)
    }

    fn breakdown(&self, ctx: &StrategyContext<'_>, index: usize) -> Option<bool> {
        let lower = ctx.value(self.lower, index.checked_sub(1)?)?;
        Some(ctx.close(index)? < lower)
    }
}

impl Strategy for ChannelBreakout {
    fn name(&self) -> &str {
        "channel_breakout"
    }

    fn prepare(&mut self, registry: &mut IndicatorRegistry<'_>) -> Result<(), BackfolioError> {
        self.upper = Some(registry.register(IndicatorKind::Highest(self.config.entry_period)));
        self.lower = Some(registry.register(IndicatorKind::Lowest(self.config.exit_period)));
        self.atr = self.config.risk.prepare(registry);
        Ok(())
    }

    fn should_enter(&self, ctx: &StrategyContext<'_>, index: usize) -> bool {
        self.breakout(ctx, index).unwrap_or(false)
            && self.config.risk.regime_allows(ctx, index, Direction::Long)
    }

    fn should_exit(&self, ctx: &StrategyContext<'_>, index: usize, _position: &Position) -> bool {
        self.breakdown(ctx, index).unwrap_or(false)
    }

    fn on_entry(&self, ctx: &StrategyContext<'_>, index: usize, entry_price: f64) -> EntryPlan {
        let mut plan = self
            .config
            .risk
            .plan(ctx, self.atr, index, entry_price, Direction::Long);
        if let Some(upper) = index.checked_sub(1).and_then(|i| ctx.value(self.upper, i)) {
            plan.metadata.insert("channel_high".to_string(), upper);
        }
        plan
    }
}
