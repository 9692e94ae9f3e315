//! Moving-average crossover trend follower.

use crate::domain::error::BackfolioError;
use crate::domain::indicator::IndicatorKind;
use crate::domain::position::{Direction, Position};
use crate::domain::registry::{IndicatorHandle, IndicatorRegistry};

use super::{EntryPlan, RiskConfig, Strategy, StrategyContext};

#[derive(Debug, Clone, PartialEq)]
pub struct SmaCrossoverConfig {
    pub fast_period: usize,
    pub slow_period: usize,
    /// Long enters on the fast average crossing above the slow one; short
    /// enters on the cross below.
    pub direction: Direction,
    pub risk: RiskConfig,
}

impl Default for SmaCrossoverConfig {
    fn default() -> Self {
        Self {
            fast_period: 20,
            slow_period: 50,
            direction: Direction::Long,
            risk: RiskConfig::default(),
        }
    }
}

#[derive(Debug)]
pub struct SmaCrossover {
    config: SmaCrossoverConfig,
    fast: Option<IndicatorHandle>,
    slow: Option<IndicatorHandle>,
    atr: Option<IndicatorHandle>,
}

impl SmaCrossover {
    pub fn new(config: SmaCrossoverConfig) -> Self {
        Self {
            config,
            fast: None,
            slow: None,
            atr: None,
        }
    }

    /// fast - slow, signed so that positive favours the configured direction.
    fn spread(&self, ctx: &StrategyContext<'_>, index: usize) -> Option<f64> {
        let fast = ctx.value(self.fast, index)?;
        let slow = ctx.value(self.slow, index)?;
        Some((fast - slow) * self.config.direction.sign())
    }

    fn crossed_in(&self, ctx: &StrategyContext<'_>, index: usize) -> Option<bool> {
        let prev = self.spread(ctx, index.checked_sub(1)?)?;
        let curr = self.spread(ctx, index)?;
        Some(prev <= 0.0 && curr > 0.0)
    }
}

impl Strategy for SmaCrossover {
    fn name(&self) -> &str {
        "sma_crossover"
    }

    fn direction(&self) -> Direction {
        self.config.direction
    }

    fn prepare(&mut self, registry: &mut IndicatorRegistry<'_>) -> Result<(), BackfolioError> {
        self.fast = Some(registry.register(IndicatorKind::Sma(self.config.fast_period)));
        self.slow = Some(registry.register(IndicatorKind::Sma(self.config.slow_period)));
        self.atr = self.config.risk.prepare(registry);
        Ok(())
    }

    fn should_enter(&self, ctx: &StrategyContext<'_>, index: usize) -> bool {
        self.crossed_in(ctx, index).unwrap_or(false)
            && self.config.risk.regime_allows(ctx, index, self.config.direction)
    }

    fn should_exit(&self, ctx: &StrategyContext<'_>, index: usize, _position: &Position) -> bool {
        self.spread(ctx, index).is_some_and(|s| s < 0.0)
    }

    fn on_entry(&self, ctx: &StrategyContext<'_>, index: usize, entry_price: f64) -> EntryPlan {
        self.config
            .risk
            .plan(ctx, self.atr, index, entry_price, self.config.direction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::make_bars;
    use crate::domain::position::EntryFill;
    use std::collections::BTreeMap;

    fn config(direction: Direction) -> SmaCrossoverConfig {
        SmaCrossoverConfig {
            fast_period: 2,
            slow_period: 3,
            direction,
            risk: RiskConfig::default(),
        }
    }

    fn position(bars: &[crate::domain::ohlcv::OhlcvBar], index: usize, direction: Direction) -> Position {
        Position::open(
            "BHP",
            EntryFill {
                direction,
                quantity: 1,
                index,
                date: bars[index].date,
                price: bars[index].open,
                commission: 0.0,
                stop: None,
                target: None,
                metadata: BTreeMap::new(),
            },
        )
    }

    #[test]
    fn enters_on_upward_cross_only() {
        // SMA2: -, 10, 9.5, 9.5, 11, 13.5  SMA3: -, -, 9.67, 9.67, 10.33, 12.33
        let bars = make_bars(&[10.0, 10.0, 9.0, 10.0, 12.0, 15.0]);
        let mut strategy = SmaCrossover::new(config(Direction::Long));
        let mut registry = IndicatorRegistry::new(&bars);
        strategy.prepare(&mut registry).unwrap();
        let ctx = StrategyContext {
            symbol: "BHP",
            bars: &bars,
            indicators: &registry,
            regime: None,
        };

        assert!(!strategy.should_enter(&ctx, 0));
        assert!(!strategy.should_enter(&ctx, 2));
        assert!(!strategy.should_enter(&ctx, 3));
        assert!(strategy.should_enter(&ctx, 4));
        assert!(!strategy.should_enter(&ctx, 5));
    }

    #[test]
    fn exits_when_fast_below_slow() {
        let bars = make_bars(&[10.0, 11.0, 12.0, 13.0, 9.0, 8.0]);
        let mut strategy = SmaCrossover::new(config(Direction::Long));
        let mut registry = IndicatorRegistry::new(&bars);
        strategy.prepare(&mut registry).unwrap();
        let ctx = StrategyContext {
            symbol: "BHP",
            bars: &bars,
            indicators: &registry,
            regime: None,
        };
        let pos = position(&bars, 3, Direction::Long);
        assert!(!strategy.should_exit(&ctx, 3, &pos));
        assert!(strategy.should_exit(&ctx, 5, &pos));
    }

    #[test]
    fn short_mirrors_long() {
        let bars = make_bars(&[10.0, 10.0, 11.0, 10.0, 8.0, 5.0]);
        let mut strategy = SmaCrossover::new(config(Direction::Short));
        let mut registry = IndicatorRegistry::new(&bars);
        strategy.prepare(&mut registry).unwrap();
        let ctx = StrategyContext {
            symbol: "BHP",
            bars: &bars,
            indicators: &registry,
            regime: None,
        };
        assert_eq!(strategy.direction(), Direction::Short);
        assert!(!strategy.should_enter(&ctx, 3));
        assert!(strategy.should_enter(&ctx, 4));
        assert!(!strategy.should_enter(&ctx, 5));
    }

    #[test]
    fn undefined_indicators_never_signal() {
        let bars = make_bars(&[1.0, 2.0]);
        let mut strategy = SmaCrossover::new(config(Direction::Long));
        let mut registry = IndicatorRegistry::new(&bars);
        strategy.prepare(&mut registry).unwrap();
        let ctx = StrategyContext {
            symbol: "BHP",
            bars: &bars,
            indicators: &registry,
            regime: None,
        };
        let pos = position(&bars, 1, Direction::Long);
        assert!(!strategy.should_enter(&ctx, 1));
        assert!(!strategy.should_exit(&ctx, 1, &pos));
    }
}
