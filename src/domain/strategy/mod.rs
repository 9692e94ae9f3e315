//! Strategy contract and the built-in strategies.
//!
//! A strategy is a trait object with four capabilities:
//!
//! - `prepare` declares indicators in the run's [`IndicatorRegistry`] and
//!   keeps the returned handles;
//! - `should_enter` / `should_exit` are predicates over a closed bar;
//! - `on_entry` returns the fixed stop, target and optional quantity for a
//!   new position.
//!
//! Predicates receive the index of the closed signal bar. The engine acts on
//! their answer at the following bar's open. Any undefined indicator value
//! makes a predicate false.

pub mod channel_breakout;
pub mod factory;
pub mod rsi_reversion;
pub mod sma_crossover;

use std::collections::BTreeMap;

use crate::domain::error::BackfolioError;
use crate::domain::indicator::IndicatorKind;
use crate::domain::ohlcv::OhlcvBar;
use crate::domain::position::{Direction, Position};
use crate::domain::regime::{Regime, RegimeCache};
use crate::domain::registry::{IndicatorHandle, IndicatorRegistry};

pub use channel_breakout::{ChannelBreakout, ChannelBreakoutConfig};
pub use factory::{STRATEGY_NAMES, StrategySpec};
pub use rsi_reversion::{RsiReversion, RsiReversionConfig};
pub use sma_crossover::{SmaCrossover, SmaCrossoverConfig};

/// Read-only view handed to every strategy call.
#[derive(Debug, Clone, Copy)]
pub struct StrategyContext<'a> {
    pub symbol: &'a str,
    pub bars: &'a [OhlcvBar],
    pub indicators: &'a IndicatorRegistry<'a>,
    pub regime: Option<&'a RegimeCache>,
}

impl<'a> StrategyContext<'a> {
    pub fn value(&self, handle: Option<IndicatorHandle>, index: usize) -> Option<f64> {
        handle.and_then(|h| self.indicators.value(h, index))
    }

    pub fn close(&self, index: usize) -> Option<f64> {
        self.bars.get(index).map(|b| b.close)
    }

    /// Benchmark regime on the date of bar `index`; `None` without a cache.
    pub fn regime_at(&self, index: usize) -> Option<Regime> {
        let bar = self.bars.get(index)?;
        self.regime.map(|cache| cache.regime_at(bar.date))
    }
}

/// What to do with a new position, decided once at entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryPlan {
    pub stop: Option<f64>,
    pub target: Option<f64>,
    /// Overrides the engine's default sizing when set.
    pub quantity: Option<u64>,
    pub metadata: BTreeMap<String, f64>,
}

pub trait Strategy: Send {
    fn name(&self) -> &str;

    fn direction(&self) -> Direction {
        Direction::Long
    }

    fn prepare(&mut self, registry: &mut IndicatorRegistry<'_>) -> Result<(), BackfolioError>;

    fn should_enter(&self, ctx: &StrategyContext<'_>, index: usize) -> bool;

    fn should_exit(&self, ctx: &StrategyContext<'_>, index: usize, position: &Position) -> bool;

    /// `index` is the signal bar, `entry_price` the actual fill.
    fn on_entry(&self, ctx: &StrategyContext<'_>, index: usize, entry_price: f64) -> EntryPlan;
}

/// Optional ATR-multiple stop and target shared by the built-in strategies.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskConfig {
    pub atr_period: usize,
    pub stop_atr_multiple: Option<f64>,
    pub target_atr_multiple: Option<f64>,
    /// Only enter while the benchmark regime is favourable.
    pub regime_filter: bool,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            atr_period: 14,
            stop_atr_multiple: None,
            target_atr_multiple: None,
            regime_filter: false,
        }
    }
}

impl RiskConfig {
    fn uses_atr(&self) -> bool {
        self.stop_atr_multiple.is_some() || self.target_atr_multiple.is_some()
    }

    pub(crate) fn prepare(&self, registry: &mut IndicatorRegistry<'_>) -> Option<IndicatorHandle> {
        self.uses_atr()
            .then(|| registry.register(IndicatorKind::Atr(self.atr_period)))
    }

    /// Regime gate for entries. Passes when the filter is off or no
    /// benchmark was supplied.
    pub(crate) fn regime_allows(&self, ctx: &StrategyContext<'_>, index: usize, direction: Direction) -> bool {
        if !self.regime_filter {
            return true;
        }
        match (ctx.regime_at(index), direction) {
            (None, _) => true,
            (Some(regime), Direction::Long) => regime == Regime::Bullish,
            (Some(regime), Direction::Short) => regime == Regime::Bearish,
        }
    }

    /// Stop and target at `entry_price -/+ multiple * ATR` of the signal bar.
    pub(crate) fn plan(
        &self,
        ctx: &StrategyContext<'_>,
        atr: Option<IndicatorHandle>,
        index: usize,
        entry_price: f64,
        direction: Direction,
    ) -> EntryPlan {
        let mut plan = EntryPlan::default();
        let Some(atr_value) = ctx.value(atr, index) else {
            return plan;
        };
        let sign = direction.sign();
        plan.stop = self.stop_atr_multiple.map(|m| entry_price - sign * m * atr_value);
        plan.target = self.target_atr_multiple.map(|m| entry_price + sign * m * atr_value);
        plan.metadata.insert("atr".to_string(), atr_value);
        plan
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::indicator::test_support::make_bars;

    #[test]
    fn plan_without_atr_is_empty() {
        let bars = make_bars(&[10.0, 11.0, 12.0]);
        let registry = IndicatorRegistry::new(&bars);
        let ctx = StrategyContext {
            symbol: "BHP",
            bars: &bars,
            indicators: &registry,
            regime: None,
        };
        let plan = RiskConfig::default().plan(&ctx, None, 2, 12.0, Direction::Long);
        assert_eq!(plan, EntryPlan::default());
    }

    #[test]
    fn atr_levels_mirror_for_short() {
        let mut bars = make_bars(&[100.0; 5]);
        for bar in &mut bars {
            bar.high = 101.0;
            bar.low = 99.0;
        }
        let risk = RiskConfig {
            atr_period: 3,
            stop_atr_multiple: Some(3.0),
            target_atr_multiple: Some(2.0),
            regime_filter: false,
        };
        let mut registry = IndicatorRegistry::new(&bars);
        let atr = risk.prepare(&mut registry);
        let ctx = StrategyContext {
            symbol: "BHP",
            bars: &bars,
            indicators: &registry,
            regime: None,
        };

        let long = risk.plan(&ctx, atr, 4, 100.0, Direction::Long);
        assert_eq!(long.stop, Some(94.0));
        assert_eq!(long.target, Some(104.0));
        assert_eq!(long.metadata.get("atr"), Some(&2.0));

        let short = risk.plan(&ctx, atr, 4, 100.0, Direction::Short);
        assert_eq!(short.stop, Some(106.0));
        assert_eq!(short.target, Some(96.0));
    }

    #[test]
    fn regime_filter_requires_matching_trend() {
        let bars = make_bars(&[1.0, 2.0, 3.0, 4.0]);
        let cache = RegimeCache::build(&bars, 2, 3);
        let registry = IndicatorRegistry::new(&bars);
        let ctx = StrategyContext {
            symbol: "BHP",
            bars: &bars,
            indicators: &registry,
            regime: Some(&cache),
        };
        let risk = RiskConfig {
            regime_filter: true,
            ..RiskConfig::default()
        };
        assert!(!risk.regime_allows(&ctx, 0, Direction::Long));
        assert!(risk.regime_allows(&ctx, 3, Direction::Long));
        assert!(!risk.regime_allows(&ctx, 3, Direction::Short));

        let no_regime = StrategyContext { regime: None, ..ctx };
        assert!(risk.regime_allows(&no_regime, 0, Direction::Long));
    }
}
